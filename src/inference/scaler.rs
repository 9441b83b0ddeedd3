//! Feature scaler artifact
//!
//! A scaler is fitted during training and declares the ordered feature
//! names it was fitted on. Requests are validated against that list.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::artifact::ArtifactError;
use super::InferenceError;

/// Fitted feature transformer
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Scaler {
    /// Standardization: `(x - mean) / scale`
    Standard {
        feature_names: Vec<String>,
        mean: Vec<f64>,
        scale: Vec<f64>,
    },
    /// Range normalization: `(x - min) / (max - min)`
    MinMax {
        feature_names: Vec<String>,
        min: Vec<f64>,
        max: Vec<f64>,
    },
}

impl Scaler {
    pub fn feature_names(&self) -> &[String] {
        match self {
            Self::Standard { feature_names, .. } | Self::MinMax { feature_names, .. } => {
                feature_names
            }
        }
    }

    pub fn n_features(&self) -> usize {
        self.feature_names().len()
    }

    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Standard { .. } => "standard",
            Self::MinMax { .. } => "min_max",
        }
    }

    /// Check the structure of a freshly loaded scaler
    pub fn validate(&self) -> Result<(), ArtifactError> {
        let names = self.feature_names();
        if names.is_empty() {
            return Err(ArtifactError::invalid("scaler", "no feature names declared"));
        }

        let mut seen = HashSet::new();
        for name in names {
            if !seen.insert(name.as_str()) {
                return Err(ArtifactError::invalid(
                    "scaler",
                    format!("duplicate feature name '{name}'"),
                ));
            }
        }

        let (label_a, a, label_b, b) = match self {
            Self::Standard { mean, scale, .. } => ("mean", mean, "scale", scale),
            Self::MinMax { min, max, .. } => ("min", min, "max", max),
        };

        for (label, values) in [(label_a, a), (label_b, b)] {
            if values.len() != names.len() {
                return Err(ArtifactError::invalid(
                    "scaler",
                    format!(
                        "{label} has {} entries but {} features are declared",
                        values.len(),
                        names.len()
                    ),
                ));
            }
            if values.iter().any(|v| !v.is_finite()) {
                return Err(ArtifactError::invalid(
                    "scaler",
                    format!("{label} contains non-finite values"),
                ));
            }
        }

        Ok(())
    }

    /// Normalize one row of features, in declared order
    pub fn transform(&self, row: &[f64]) -> Result<Vec<f64>, InferenceError> {
        let expected = self.n_features();
        if row.len() != expected {
            return Err(InferenceError::DimensionMismatch {
                expected,
                actual: row.len(),
            });
        }

        let scaled: Vec<f64> = match self {
            Self::Standard { mean, scale, .. } => row
                .iter()
                .zip(mean.iter().zip(scale))
                .map(|(x, (m, s))| (x - m) / non_zero(*s))
                .collect(),
            Self::MinMax { min, max, .. } => row
                .iter()
                .zip(min.iter().zip(max))
                .map(|(x, (lo, hi))| (x - lo) / non_zero(hi - lo))
                .collect(),
        };

        // Extreme inputs can overflow once shifted and divided
        if let Some(i) = scaled.iter().position(|v| !v.is_finite()) {
            return Err(InferenceError::OutOfRange {
                name: self.feature_names()[i].clone(),
            });
        }

        Ok(scaled)
    }
}

// Constant features were fitted with a zero spread
fn non_zero(value: f64) -> f64 {
    if value.abs() < f64::EPSILON {
        1.0
    } else {
        value
    }
}
