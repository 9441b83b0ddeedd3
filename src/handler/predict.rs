//! Prediction endpoint
//!
//! `POST /predict`: read a bounded JSON body, run it through the shared
//! predictor on the blocking pool under a timeout, answer
//! `{"prediction": <label>}` or a structured error.

use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::header::CONTENT_LENGTH;
use hyper::{Request, Response, StatusCode};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::config::AppState;
use crate::http;
use crate::inference::{InferenceError, Prediction};
use crate::logger;

/// Everything that can go wrong while serving one prediction
#[derive(Debug, Error)]
pub enum PredictError {
    #[error("request body is empty")]
    EmptyBody,

    #[error("request body exceeds {limit} bytes")]
    BodyTooLarge { limit: u64 },

    #[error("failed to read request body: {0}")]
    Body(String),

    #[error("request body is not valid JSON: {0}")]
    MalformedJson(#[from] serde_json::Error),

    #[error("request body must be a JSON object mapping feature names to numbers")]
    NotAnObject,

    #[error("inference timed out after {0} ms")]
    Timeout(u64),

    #[error("inference worker failed: {0}")]
    Worker(String),

    #[error(transparent)]
    Inference(#[from] InferenceError),
}

impl PredictError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::EmptyBody | Self::Body(_) | Self::MalformedJson(_) | Self::NotAnObject => {
                StatusCode::BAD_REQUEST
            }
            Self::BodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Timeout(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Worker(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Inference(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            Self::Inference(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to clients; internal details stay in the log
    fn public_message(&self) -> String {
        if self.status() == StatusCode::INTERNAL_SERVER_ERROR {
            "Prediction failed due to an internal error".to_string()
        } else {
            self.to_string()
        }
    }
}

/// Handle `POST /predict`
pub async fn handle_predict<B>(req: Request<B>, state: &Arc<AppState>) -> Response<Full<Bytes>>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    match predict(req, state).await {
        Ok(prediction) => {
            logger::log_debug(&format!("Predicted '{}'", prediction.prediction));
            http::build_json_response(StatusCode::OK, &prediction)
        }
        Err(e) => {
            let status = e.status();
            if status.is_server_error() {
                logger::log_error(&format!("Prediction failed: {e}"));
            } else {
                logger::log_debug(&format!("Rejected prediction request: {e}"));
            }
            match e {
                PredictError::BodyTooLarge { limit } => http::build_413_response(limit),
                other => http::build_error_response(status, &other.public_message()),
            }
        }
    }
}

async fn predict<B>(req: Request<B>, state: &Arc<AppState>) -> Result<Prediction, PredictError>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let limit = state.config.http.max_body_size;
    if declared_length(&req).is_some_and(|len| len > limit) {
        return Err(PredictError::BodyTooLarge { limit });
    }
    let bytes = read_body(req.into_body(), limit).await?;
    let features = parse_features(&bytes)?;

    let predictor = Arc::clone(&state.predictor);
    let timeout_ms = state.config.inference.timeout_ms;
    let task = tokio::task::spawn_blocking(move || predictor.predict(&features));

    match tokio::time::timeout(Duration::from_millis(timeout_ms), task).await {
        Ok(Ok(result)) => Ok(result?),
        Ok(Err(join_error)) => Err(PredictError::Worker(join_error.to_string())),
        Err(_) => Err(PredictError::Timeout(timeout_ms)),
    }
}

/// `Content-Length` of the request, when present and well formed
fn declared_length<B>(req: &Request<B>) -> Option<u64> {
    req.headers()
        .get(CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

/// Collect the body, failing once it grows past `limit` bytes
async fn read_body<B>(body: B, limit: u64) -> Result<Bytes, PredictError>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let max = usize::try_from(limit).unwrap_or(usize::MAX);
    match Limited::new(body, max).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            Err(PredictError::BodyTooLarge { limit })
        }
        Err(e) => Err(PredictError::Body(e.to_string())),
    }
}

/// Parse the body as a single JSON object
fn parse_features(bytes: &[u8]) -> Result<Map<String, Value>, PredictError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(PredictError::EmptyBody);
    }

    match serde_json::from_slice(bytes)? {
        Value::Object(map) => Ok(map),
        _ => Err(PredictError::NotAnObject),
    }
}
