// Configuration module entry point
// Loads layered configuration and holds the per-process application state

mod state;
mod types;

use std::net::SocketAddr;

// Re-export public types
pub use state::AppState;
pub use types::Config;

pub const DEFAULT_WELCOME_MESSAGE: &str = "Welcome to the flower species prediction model!";

impl Config {
    /// Load configuration from specified file path (without extension)
    /// Default config file is "config.toml" when no path specified
    ///
    /// Environment variables prefixed with `SERVER_` override file values,
    /// using `__` between sections (e.g. `SERVER_SERVER__PORT=9000`).
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("SERVER")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 5000)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", "combined")?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.write_timeout", 30)?
            .set_default("performance.shutdown_timeout", 5)?
            .set_default("http.server_name", "species-server")?
            .set_default("http.enable_cors", false)?
            .set_default("http.max_body_size", 65_536)? // 64KB
            .set_default("inference.model_path", "model.json")?
            .set_default("inference.scaler_path", "scaler.json")?
            .set_default("inference.timeout_ms", 1000)?
            .set_default("inference.welcome_message", DEFAULT_WELCOME_MESSAGE)?
            .build()?;

        settings.try_deserialize()
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}

#[cfg(test)]
pub mod test_support {
    use super::Config;

    /// Built-in defaults, as if no config file were present
    pub fn default_config() -> Config {
        Config::load_from("species-server-test-no-such-config").unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::default_config;
    use super::*;
    use std::path::Path;

    #[test]
    fn test_defaults() {
        let cfg = default_config();
        assert_eq!(cfg.server.port, 5000);
        assert_eq!(cfg.server.host, "127.0.0.1");
        assert_eq!(cfg.http.max_body_size, 65_536);
        assert_eq!(cfg.inference.model_path, Path::new("model.json"));
        assert_eq!(cfg.inference.scaler_path, Path::new("scaler.json"));
        assert_eq!(cfg.inference.welcome_message, DEFAULT_WELCOME_MESSAGE);
        assert_eq!(cfg.logging.access_log_format, "combined");
        assert!(cfg.health.enabled);
        assert_eq!(cfg.health.liveness_path, "/healthz");
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = std::env::temp_dir().join(format!("species-server-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("custom.toml");
        std::fs::write(
            &path,
            "[server]\nport = 8081\n\n[inference]\nmodel_path = \"artifacts/model.toml\"\ntimeout_ms = 250\n\n[health]\nenabled = false\n",
        )
        .unwrap();

        let stem = dir.join("custom");
        let cfg = Config::load_from(stem.to_str().unwrap()).unwrap();
        assert_eq!(cfg.server.port, 8081);
        assert_eq!(cfg.inference.model_path, Path::new("artifacts/model.toml"));
        assert_eq!(cfg.inference.timeout_ms, 250);
        assert!(!cfg.health.enabled);
        assert!(!cfg.health.is_probe("/healthz"));
        // Untouched keys keep their defaults
        assert_eq!(cfg.inference.scaler_path, Path::new("scaler.json"));
    }

    #[test]
    fn test_socket_addr() {
        let cfg = default_config();
        assert_eq!(cfg.get_socket_addr().unwrap().port(), 5000);

        let mut bad = default_config();
        bad.server.host = "not an address".to_string();
        assert!(bad.get_socket_addr().is_err());
    }
}
