//! # Observability
//!
//! Structured logging for the readpace crates.
//!
//! Binaries call [`init_with_config`] once at startup and use the standard
//! `tracing` macros everywhere else. Every event is appended as one JSON
//! line to `~/.readpace/logs/readpace.jsonl`; a compact stderr layer can be
//! switched on for foreground runs.
//!
//! Field values whose names look like credentials are masked before they
//! reach the file.
//!
//! ## Usage
//!
//! ```rust,ignore
//! observability::init_with_config(observability::LogConfig {
//!     service_name: "readpace".into(),
//!     default_level: "debug".into(),
//!     also_stderr: true,
//!     ..Default::default()
//! })?;
//! tracing::info!("ready");
//! ```

mod file;
mod json_layer;

use std::io;
use std::path::PathBuf;

pub use file::{default_log_path, AppendWriter};
pub use json_layer::{JsonLayer, LogEntry, REDACTED};

/// Field names masked by default.
pub const DEFAULT_REDACTED_FIELDS: &[&str] = &["token", "session_key", "cookie", "secret"];

/// Configuration for the logging system.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Name of the service, included in every log line.
    pub service_name: String,

    /// Default log level filter (e.g., "debug", "info", "warn").
    /// Can be overridden by `RUST_LOG` environment variable.
    pub default_level: String,

    /// Optional custom log file path.
    /// Defaults to `~/.readpace/logs/readpace.jsonl`.
    pub log_path: Option<PathBuf>,

    /// Also emit logs to stderr.
    pub also_stderr: bool,

    /// Level filter for the stderr layer.
    pub stderr_level: String,

    /// Field names whose values are masked in the file output.
    pub redacted_fields: Vec<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "unknown".into(),
            default_level: "info".into(),
            log_path: None,
            also_stderr: false,
            stderr_level: "info".into(),
            redacted_fields: DEFAULT_REDACTED_FIELDS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Initialize logging with default settings for `service_name`.
pub fn init(service_name: &str) -> io::Result<PathBuf> {
    init_with_config(LogConfig {
        service_name: service_name.into(),
        ..Default::default()
    })
}

/// Initialize logging with custom configuration.
///
/// Returns the path of the log file. Fails if the file cannot be opened or
/// no home directory is known and no path was given. Installing a second
/// subscriber is a no-op.
pub fn init_with_config(config: LogConfig) -> io::Result<PathBuf> {
    file::init_file_subscriber(&config)
}

/// Parse a log level string into a tracing Level.
pub fn parse_level(level: &str) -> tracing::Level {
    match level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" | "warning" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    }
}

pub use tracing::{debug, error, info, instrument, trace, warn};

pub use tracing::span;

pub use tracing::Level;
