//! Access log format module
//!
//! Supported formats:
//! - `combined` (Apache/Nginx combined format)
//! - `common` (Common Log Format - CLF)
//! - `json` (one JSON object per line)
//! - Custom patterns with `$variable` substitution

use chrono::{DateTime, Local};
use std::net::SocketAddr;

const CLF_TIME: &str = "%d/%b/%Y:%H:%M:%S %z";

/// One served request, as written to the access log
#[derive(Debug, Clone)]
pub struct AccessLogEntry {
    pub remote_addr: String,
    pub time: DateTime<Local>,
    pub method: String,
    pub path: String,
    /// Query string (without leading ?)
    pub query: Option<String>,
    pub http_version: String,
    pub status: u16,
    pub body_bytes: u64,
    pub referer: Option<String>,
    pub user_agent: Option<String>,
    /// Time spent in the handler, in microseconds
    pub request_time_us: u64,
}

impl AccessLogEntry {
    /// Start an entry for a request received now
    pub fn new(remote_addr: &SocketAddr, method: &str, path: &str) -> Self {
        Self {
            remote_addr: remote_addr.ip().to_string(),
            time: Local::now(),
            method: method.to_string(),
            path: path.to_string(),
            query: None,
            http_version: "1.1".to_string(),
            status: 200,
            body_bytes: 0,
            referer: None,
            user_agent: None,
            request_time_us: 0,
        }
    }

    /// Render the entry in the given format
    pub fn format(&self, format: &str) -> String {
        match format {
            "combined" => format!(
                "{} \"{}\" \"{}\"",
                self.format_common(),
                self.referer.as_deref().unwrap_or("-"),
                self.user_agent.as_deref().unwrap_or("-"),
            ),
            "common" => self.format_common(),
            "json" => self.format_json(),
            pattern => self.format_custom(pattern),
        }
    }

    fn request_uri(&self) -> String {
        match &self.query {
            Some(q) => format!("{}?{q}", self.path),
            None => self.path.clone(),
        }
    }

    fn request_line(&self) -> String {
        format!(
            "{} {} HTTP/{}",
            self.method,
            self.request_uri(),
            self.http_version
        )
    }

    fn format_common(&self) -> String {
        format!(
            "{} - - [{}] \"{}\" {} {}",
            self.remote_addr,
            self.time.format(CLF_TIME),
            self.request_line(),
            self.status,
            self.body_bytes,
        )
    }

    fn format_json(&self) -> String {
        serde_json::json!({
            "remote_addr": self.remote_addr,
            "time": self.time.to_rfc3339(),
            "method": self.method,
            "path": self.path,
            "query": self.query,
            "http_version": self.http_version,
            "status": self.status,
            "body_bytes": self.body_bytes,
            "referer": self.referer,
            "user_agent": self.user_agent,
            "request_time_us": self.request_time_us,
        })
        .to_string()
    }

    /// Custom format with variable substitution
    ///
    /// Supported variables: `$remote_addr`, `$time_local`, `$time_iso8601`,
    /// `$request`, `$request_method`, `$request_uri`, `$request_time`
    /// (seconds, 3 decimals), `$status`, `$body_bytes_sent`,
    /// `$http_referer`, `$http_user_agent`.
    fn format_custom(&self, pattern: &str) -> String {
        #[allow(clippy::cast_precision_loss)]
        let request_time = self.request_time_us as f64 / 1_000_000.0;

        // Longer names first so `$request` does not eat `$request_time`
        let variables = [
            ("$remote_addr", self.remote_addr.clone()),
            ("$time_local", self.time.format(CLF_TIME).to_string()),
            ("$time_iso8601", self.time.to_rfc3339()),
            ("$request_time", format!("{request_time:.3}")),
            ("$request_method", self.method.clone()),
            ("$request_uri", self.request_uri()),
            ("$request", self.request_line()),
            ("$status", self.status.to_string()),
            ("$body_bytes_sent", self.body_bytes.to_string()),
            ("$http_referer", self.referer.clone().unwrap_or_else(|| "-".into())),
            ("$http_user_agent", self.user_agent.clone().unwrap_or_else(|| "-".into())),
        ];

        variables
            .iter()
            .fold(pattern.to_string(), |line, (name, value)| line.replace(name, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn predict_entry() -> AccessLogEntry {
        let addr: SocketAddr = "10.0.0.7:51234".parse().unwrap();
        let mut entry = AccessLogEntry::new(&addr, "POST", "/predict");
        entry.query = Some("debug=1".to_string());
        entry.status = 400;
        entry.body_bytes = 57;
        entry.user_agent = Some("curl/8.5.0".to_string());
        entry.request_time_us = 2600;
        entry
    }

    #[test]
    fn test_format_combined() {
        let log = predict_entry().format("combined");
        assert!(log.starts_with("10.0.0.7 - - ["));
        assert!(log.contains("\"POST /predict?debug=1 HTTP/1.1\" 400 57"));
        assert!(log.ends_with("\"-\" \"curl/8.5.0\""));
    }

    #[test]
    fn test_format_common_omits_agent() {
        let log = predict_entry().format("common");
        assert!(log.contains("\"POST /predict?debug=1 HTTP/1.1\" 400 57"));
        assert!(!log.contains("curl"));
    }

    #[test]
    fn test_format_json_is_valid() {
        let log = predict_entry().format("json");
        let value: serde_json::Value = serde_json::from_str(&log).unwrap();
        assert_eq!(value["method"], "POST");
        assert_eq!(value["status"], 400);
        assert_eq!(value["referer"], serde_json::Value::Null);
        assert_eq!(value["request_time_us"], 2600);
    }

    #[test]
    fn test_format_custom() {
        let log = predict_entry().format("$request_method $request_uri -> $status in $request_time");
        assert_eq!(log, "POST /predict?debug=1 -> 400 in 0.003");
    }
}
