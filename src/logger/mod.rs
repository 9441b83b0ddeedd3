//! Logger module
//!
//! Provides logging utilities for the prediction server:
//! - Startup logging (configuration, loaded artifacts)
//! - Access logging with multiple formats
//! - Leveled error, warning, info and debug messages
//! - File-based logging support

mod format;
pub mod writer;

pub use format::AccessLogEntry;

use std::io;
use std::net::SocketAddr;

use crate::config::Config;
use crate::inference::ModelInfo;

/// Message severity, ordered from least to most verbose
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
}

impl LogLevel {
    pub fn parse(level: &str) -> Option<Self> {
        match level.trim().to_ascii_lowercase().as_str() {
            "error" => Some(Self::Error),
            "warn" | "warning" => Some(Self::Warn),
            "info" => Some(Self::Info),
            "debug" | "trace" => Some(Self::Debug),
            _ => None,
        }
    }
}

/// Initialize the logger with configuration
///
/// Should be called once at application startup.
pub fn init(config: &Config) -> io::Result<()> {
    let level = LogLevel::parse(&config.logging.level).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("Unknown log level '{}'", config.logging.level),
        )
    })?;

    writer::init(
        level,
        config.logging.access_log_file.as_deref(),
        config.logging.error_log_file.as_deref(),
    )
}

// Before init everything is printed
fn enabled(level: LogLevel) -> bool {
    writer::get().map_or(true, |w| level <= w.level())
}

fn write_info(level: LogLevel, message: &str) {
    if !enabled(level) {
        return;
    }
    match writer::get() {
        Some(w) => w.write_info(message),
        None => println!("{message}"),
    }
}

fn write_error(level: LogLevel, message: &str) {
    if !enabled(level) {
        return;
    }
    match writer::get() {
        Some(w) => w.write_error(message),
        None => eprintln!("{message}"),
    }
}

pub fn log_server_start(addr: &SocketAddr, config: &Config) {
    let info = |message: &str| write_info(LogLevel::Info, message);
    info("======================================");
    info("Species prediction server started");
    info(&format!("Listening on: http://{addr}"));
    info(&format!("Log level: {}", config.logging.level));
    if let Some(workers) = config.server.workers {
        info(&format!("Worker threads: {workers}"));
    }
    if let Some(ref path) = config.logging.access_log_file {
        info(&format!("Access log: {path}"));
    }
    if let Some(ref path) = config.logging.error_log_file {
        info(&format!("Error log: {path}"));
    }
    info(&format!("Max body size: {} bytes", config.http.max_body_size));
    info(&format!("Inference timeout: {} ms", config.inference.timeout_ms));
    info("Endpoints:");
    info("  GET  /         welcome message");
    info("  GET  /model    model metadata");
    info("  POST /predict  classify one feature record");
    if config.health.enabled {
        info(&format!(
            "  GET  {} / {}  health probes",
            config.health.liveness_path, config.health.readiness_path
        ));
    }
    info("======================================\n");
}

pub fn log_artifacts_loaded(config: &Config, model: &ModelInfo) {
    write_info(
        LogLevel::Info,
        &format!(
            "[Artifacts] Model '{}' loaded from {}",
            model.model_type,
            config.inference.model_path.display()
        ),
    );
    write_info(
        LogLevel::Info,
        &format!(
            "[Artifacts] Scaler '{}' loaded from {}",
            model.scaler_type,
            config.inference.scaler_path.display()
        ),
    );
    write_info(
        LogLevel::Info,
        &format!(
            "[Artifacts] Features: [{}], classes: [{}]",
            model.feature_names.join(", "),
            model.classes.join(", ")
        ),
    );
}

pub fn log_connection_accepted(peer_addr: &SocketAddr) {
    write_info(
        LogLevel::Debug,
        &format!("[Connection] Accepted from: {peer_addr}"),
    );
}

pub fn log_connection_error(err: &impl std::fmt::Debug) {
    write_error(
        LogLevel::Error,
        &format!("[ERROR] Failed to serve connection: {err:?}"),
    );
}

pub fn log_error(message: &str) {
    write_error(LogLevel::Error, &format!("[ERROR] {message}"));
}

pub fn log_warning(message: &str) {
    write_error(LogLevel::Warn, &format!("[WARN] {message}"));
}

pub fn log_info(message: &str) {
    write_info(LogLevel::Info, &format!("[INFO] {message}"));
}

pub fn log_debug(message: &str) {
    write_info(LogLevel::Debug, &format!("[DEBUG] {message}"));
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    let line = entry.format(format);
    match writer::get() {
        Some(w) => w.write_access(&line),
        None => println!("{line}"),
    }
}

pub fn log_shutdown_requested(signal: &str) {
    write_info(
        LogLevel::Info,
        &format!("\n[Shutdown] {signal} received, no longer accepting connections"),
    );
}

pub fn log_shutdown_complete(remaining: usize) {
    let (level, message) = shutdown_complete_message(remaining);
    if level == LogLevel::Info {
        write_info(level, &message);
    } else {
        write_error(level, &message);
    }
}

fn shutdown_complete_message(remaining: usize) -> (LogLevel, String) {
    if remaining == 0 {
        (LogLevel::Info, "[Shutdown] All connections closed".to_string())
    } else {
        (
            LogLevel::Warn,
            format!("[Shutdown] Grace period elapsed with {remaining} connection(s) still open"),
        )
    }
}
