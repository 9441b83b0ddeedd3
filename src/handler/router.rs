//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: probe endpoints, method
//! validation, route dispatch, common headers and access logging.

use crate::config::AppState;
use crate::handler::predict;
use crate::http;
use crate::logger::{self, AccessLogEntry};
use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::{Method, Request, Response, StatusCode, Version};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

const ALLOW_READ: &str = "GET, HEAD, OPTIONS";
const ALLOW_PREDICT: &str = "POST, OPTIONS";

/// Main entry point for HTTP request handling
///
/// Generic over the body type so the same path serves hyper's `Incoming`
/// bodies and in-memory bodies.
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let started = Instant::now();
    let entry = state
        .config
        .logging
        .access_log
        .then(|| access_entry(&req, &peer_addr));

    let mut response = route_request(req, &state).await;
    http::apply_common_headers(
        &mut response,
        &state.config.http.server_name,
        state.config.http.enable_cors,
    );

    if let Some(mut entry) = entry {
        entry.status = response.status().as_u16();
        entry.body_bytes = response.body().size_hint().exact().unwrap_or(0);
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

/// Dispatch on path and method
async fn route_request<B>(req: Request<B>, state: &Arc<AppState>) -> Response<Full<Bytes>>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let enable_cors = state.config.http.enable_cors;
    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    let is_head = method == Method::HEAD;

    // Probes take priority over everything else
    if state.config.health.is_probe(&path) {
        return match method {
            Method::GET | Method::HEAD => http::build_health_response("ok", is_head),
            Method::OPTIONS => http::build_options_response(ALLOW_READ, enable_cors),
            _ => http::build_405_response(ALLOW_READ),
        };
    }

    let allow = match path.as_str() {
        "/" | "/model" => ALLOW_READ,
        "/predict" => ALLOW_PREDICT,
        _ => return http::build_404_response(&path),
    };

    match (method, path.as_str()) {
        (Method::OPTIONS, _) => http::build_options_response(allow, enable_cors),
        (Method::GET | Method::HEAD, "/") => http::build_text_response(
            StatusCode::OK,
            &state.config.inference.welcome_message,
            is_head,
        ),
        (Method::GET | Method::HEAD, "/model") => {
            let response = http::build_json_response(StatusCode::OK, &state.predictor.info());
            if is_head {
                http::into_head_response(response)
            } else {
                response
            }
        }
        (Method::POST, "/predict") => predict::handle_predict(req, state).await,
        (method, _) => {
            logger::log_warning(&format!("Method not allowed: {method} {path}"));
            http::build_405_response(allow)
        }
    }
}

fn access_entry<B>(req: &Request<B>, peer_addr: &SocketAddr) -> AccessLogEntry {
    let header = |name: &str| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
    };

    let mut entry = AccessLogEntry::new(peer_addr, req.method().as_str(), req.uri().path());
    entry.query = req.uri().query().map(ToString::to_string);
    entry.http_version = match req.version() {
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        _ => "1.1",
    }
    .to_string();
    entry.referer = header("referer");
    entry.user_agent = header("user-agent");
    entry
}
