//! Inference module
//!
//! Holds the two startup artifacts (scaler and classifier) and runs a single
//! observation through them. Everything here is immutable after load and is
//! shared between requests behind an `Arc`.

pub mod artifact;
pub mod classifier;
pub mod record;
pub mod scaler;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use thiserror::Error;

pub use artifact::ArtifactError;
pub use classifier::Classifier;
pub use record::FeatureRecord;
pub use scaler::Scaler;

/// Per-request inference failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InferenceError {
    #[error("missing features: {}", .0.join(", "))]
    MissingFeatures(Vec<String>),

    #[error("unknown features: {}", .0.join(", "))]
    UnknownFeatures(Vec<String>),

    #[error("feature '{name}' must be a finite number")]
    InvalidValue { name: String },

    #[error("feature '{name}' is out of range")]
    OutOfRange { name: String },

    #[error("expected {expected} features, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("model produced a non-finite score")]
    NonFiniteScore,
}

impl InferenceError {
    /// Whether the caller sent a record that does not match the schema
    pub const fn is_client_error(&self) -> bool {
        !matches!(self, Self::DimensionMismatch { .. } | Self::NonFiniteScore)
    }
}

/// Response body of `POST /predict`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prediction {
    pub prediction: String,
}

/// Response body of `GET /model`
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub model_type: &'static str,
    pub scaler_type: &'static str,
    pub feature_names: Vec<String>,
    pub classes: Vec<String>,
}

/// Scaler and classifier, checked against each other
#[derive(Debug)]
pub struct Predictor {
    scaler: Scaler,
    classifier: Classifier,
}

impl Predictor {
    pub fn new(scaler: Scaler, classifier: Classifier) -> Result<Self, ArtifactError> {
        scaler.validate()?;
        classifier.validate()?;
        classifier.check_features(scaler.n_features())?;
        Ok(Self { scaler, classifier })
    }

    /// Load both artifacts from disk
    pub fn load(model_path: &Path, scaler_path: &Path) -> Result<Self, ArtifactError> {
        let classifier: Classifier = artifact::load(model_path)?;
        let scaler: Scaler = artifact::load(scaler_path)?;
        Self::new(scaler, classifier)
    }

    pub fn feature_names(&self) -> &[String] {
        self.scaler.feature_names()
    }

    /// Validate, scale and classify one JSON feature object
    pub fn predict(&self, features: &Map<String, Value>) -> Result<Prediction, InferenceError> {
        let record = FeatureRecord::from_json(features, self.feature_names())?;
        let scaled = self.scaler.transform(record.values())?;
        let label = self.classifier.predict(&scaled)?;
        Ok(Prediction {
            prediction: label.to_string(),
        })
    }

    pub fn info(&self) -> ModelInfo {
        ModelInfo {
            model_type: self.classifier.kind(),
            scaler_type: self.scaler.kind(),
            feature_names: self.feature_names().to_vec(),
            classes: self.classifier.classes().to_vec(),
        }
    }
}
