//! Configuration error types.

use thiserror::Error;

/// Errors raised while assembling a session from configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Environment variable present but unparsable
    #[error("Invalid value for {name}: {value:?}")]
    InvalidEnv { name: &'static str, value: String },

    /// Captured curl command unusable
    #[error("Invalid curl command: {0}")]
    Curl(String),

    /// Built-in pattern failed to compile
    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),

    /// Push settings rejected
    #[error("Push configuration error: {0}")]
    Push(#[from] push_notify::PushError),

    /// Path error (e.g., home directory not found)
    #[error("Path error: {0}")]
    Path(String),

    /// Semantic configuration error
    #[error("Configuration error: {0}")]
    Invalid(String),
}

/// Result type alias using ConfigError.
pub type ConfigResult<T> = Result<T, ConfigError>;
