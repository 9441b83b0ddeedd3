//! HTTP response building module
//!
//! Builders for the responses the prediction server sends. None of them
//! panic: a builder failure is logged and replaced by a bare response.

use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::header::{HeaderValue, ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_LENGTH, SERVER};
use hyper::{Response, StatusCode};
use serde::Serialize;

const JSON: &str = "application/json";
const TEXT: &str = "text/plain; charset=utf-8";

/// Error body: `{"error": {"code": 400, "message": "..."}}`
#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: ErrorDetail<'a>,
}

#[derive(Debug, Serialize)]
struct ErrorDetail<'a> {
    code: u16,
    message: &'a str,
}

/// Build a plain text response; HEAD requests get headers only
pub fn build_text_response(
    status: StatusCode,
    content: &str,
    is_head: bool,
) -> Response<Full<Bytes>> {
    let body = if is_head {
        Bytes::new()
    } else {
        Bytes::from(content.to_string())
    };

    Response::builder()
        .status(status)
        .header("Content-Type", TEXT)
        .header("Content-Length", content.len())
        .body(Full::new(body))
        .unwrap_or_else(|e| {
            log_build_error(status.as_str(), &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build JSON response
pub fn build_json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    match serde_json::to_vec(body) {
        Ok(json) => Response::builder()
            .status(status)
            .header("Content-Type", JSON)
            .body(Full::new(Bytes::from(json)))
            .unwrap_or_else(|e| {
                log_build_error(status.as_str(), &e);
                Response::new(Full::new(Bytes::new()))
            }),
        Err(e) => {
            crate::logger::log_error(&format!("Failed to serialize response: {e}"));
            build_error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

/// Drop the body of a GET response so it can answer HEAD, keeping its headers
pub fn into_head_response(response: Response<Full<Bytes>>) -> Response<Full<Bytes>> {
    let (mut parts, body) = response.into_parts();
    if let Some(len) = body.size_hint().exact() {
        parts.headers.insert(CONTENT_LENGTH, HeaderValue::from(len));
    }
    Response::from_parts(parts, Full::new(Bytes::new()))
}

/// Build a structured JSON error response
pub fn build_error_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    let body = ErrorBody {
        error: ErrorDetail {
            code: status.as_u16(),
            message,
        },
    };
    // ErrorBody only holds a number and a string
    let json = serde_json::to_vec(&body).unwrap_or_default();

    Response::builder()
        .status(status)
        .header("Content-Type", JSON)
        .body(Full::new(Bytes::from(json)))
        .unwrap_or_else(|e| {
            log_build_error(status.as_str(), &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build 404 Not Found response
pub fn build_404_response(path: &str) -> Response<Full<Bytes>> {
    build_error_response(StatusCode::NOT_FOUND, &format!("No route for {path}"))
}

/// Build 405 Method Not Allowed response
pub fn build_405_response(allow: &str) -> Response<Full<Bytes>> {
    let mut response =
        build_error_response(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed");
    if let Ok(value) = HeaderValue::from_str(allow) {
        response.headers_mut().insert("Allow", value);
    }
    response
}

/// Build 413 Payload Too Large response
pub fn build_413_response(limit: u64) -> Response<Full<Bytes>> {
    build_error_response(
        StatusCode::PAYLOAD_TOO_LARGE,
        &format!("Request body exceeds {limit} bytes"),
    )
}

/// Build OPTIONS response (preflight request)
pub fn build_options_response(allow: &str, enable_cors: bool) -> Response<Full<Bytes>> {
    let mut builder = Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Allow", allow);

    if enable_cors {
        builder = builder
            .header("Access-Control-Allow-Methods", allow)
            .header("Access-Control-Allow-Headers", "Content-Type")
            .header("Access-Control-Max-Age", "86400");
    }

    builder.body(Full::new(Bytes::new())).unwrap_or_else(|e| {
        log_build_error("OPTIONS", &e);
        Response::new(Full::new(Bytes::new()))
    })
}

/// Build liveness/readiness probe response
pub fn build_health_response(status: &str, is_head: bool) -> Response<Full<Bytes>> {
    build_text_response(StatusCode::OK, status, is_head)
}

/// Add headers every response carries (server name, CORS origin)
pub fn apply_common_headers(
    response: &mut Response<Full<Bytes>>,
    server_name: &str,
    enable_cors: bool,
) {
    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(server_name) {
        headers.insert(SERVER, value);
    }
    if enable_cors {
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    }
}

/// Log response build error
fn log_build_error(status: &str, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}
