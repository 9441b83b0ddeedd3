//! Artifact loading
//!
//! Model and scaler artifacts are serde documents on local disk. The format
//! is picked from the file extension (`.json` or `.toml`).

use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while loading artifacts at startup
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("unsupported artifact format for {} (expected .json or .toml)", .path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("invalid {artifact} artifact: {reason}")]
    Invalid {
        artifact: &'static str,
        reason: String,
    },

    #[error("model does not fit a scaler with {features} features: {reason}")]
    ShapeMismatch { features: usize, reason: String },
}

impl ArtifactError {
    pub fn invalid(artifact: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            artifact,
            reason: reason.into(),
        }
    }
}

/// On-disk encoding of an artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactFormat {
    Json,
    Toml,
}

impl ArtifactFormat {
    /// Detect the format from the file extension (case-insensitive)
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(Self::Json),
            "toml" => Some(Self::Toml),
            _ => None,
        }
    }
}

/// Read and deserialize an artifact file
pub fn load<T: DeserializeOwned>(path: &Path) -> Result<T, ArtifactError> {
    let format = ArtifactFormat::from_path(path).ok_or_else(|| ArtifactError::UnsupportedFormat {
        path: path.to_path_buf(),
    })?;

    let content = std::fs::read_to_string(path).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    parse(&content, format).map_err(|message| ArtifactError::Parse {
        path: path.to_path_buf(),
        message,
    })
}

/// Deserialize artifact text in the given format
pub fn parse<T: DeserializeOwned>(content: &str, format: ArtifactFormat) -> Result<T, String> {
    match format {
        ArtifactFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
        ArtifactFormat::Toml => toml::from_str(content).map_err(|e| e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::Scaler;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static COUNTER: AtomicUsize = AtomicUsize::new(0);

    fn temp_file(name: &str, content: &str) -> PathBuf {
        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let dir = std::env::temp_dir().join(format!(
            "species-server-artifact-{}-{id}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ArtifactFormat::from_path(Path::new("model.json")),
            Some(ArtifactFormat::Json)
        );
        assert_eq!(
            ArtifactFormat::from_path(Path::new("dir/scaler.TOML")),
            Some(ArtifactFormat::Toml)
        );
        assert_eq!(ArtifactFormat::from_path(Path::new("model.pkl")), None);
        assert_eq!(ArtifactFormat::from_path(Path::new("model")), None);
    }

    #[test]
    fn test_load_json_scaler() {
        let path = temp_file(
            "scaler.json",
            r#"{"type":"standard","feature_names":["a","b"],"mean":[1.0,2.0],"scale":[0.5,4.0]}"#,
        );
        let scaler: Scaler = load(&path).unwrap();
        assert_eq!(scaler.feature_names(), ["a".to_string(), "b".to_string()]);
        assert_eq!(scaler.kind(), "standard");
    }

    #[test]
    fn test_load_toml_scaler() {
        let path = temp_file(
            "scaler.toml",
            "type = \"min_max\"\nfeature_names = [\"a\"]\nmin = [0.0]\nmax = [10.0]\n",
        );
        let scaler: Scaler = load(&path).unwrap();
        assert_eq!(scaler.kind(), "min_max");
        assert_eq!(scaler.n_features(), 1);
    }

    #[test]
    fn test_load_missing_file() {
        let path = std::env::temp_dir().join("species-server-does-not-exist.json");
        let err = load::<Scaler>(&path).unwrap_err();
        assert!(matches!(err, ArtifactError::Io { .. }));
    }

    #[test]
    fn test_load_unsupported_format() {
        let err = load::<Scaler>(Path::new("model.pkl")).unwrap_err();
        assert!(matches!(err, ArtifactError::UnsupportedFormat { .. }));
        assert!(err.to_string().contains("model.pkl"));
    }

    #[test]
    fn test_load_corrupt_file() {
        let path = temp_file("scaler.json", "{not json");
        let err = load::<Scaler>(&path).unwrap_err();
        assert!(matches!(err, ArtifactError::Parse { .. }));
    }
}
