// Application state module
// Immutable per-process state handed to every request

use std::sync::Arc;

use super::types::Config;
use crate::inference::Predictor;

/// Application state
pub struct AppState {
    pub config: Config,
    pub predictor: Arc<Predictor>,
}

impl AppState {
    pub fn new(config: Config, predictor: Predictor) -> Self {
        Self {
            config,
            predictor: Arc::new(predictor),
        }
    }
}
