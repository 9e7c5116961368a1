//! Error types for push delivery.

use thiserror::Error;

/// Errors that can occur while delivering a push notification.
#[derive(Error, Debug)]
pub enum PushError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Push service rejected the message
    #[error("Push service error: {status} - {message}")]
    ApiError { status: u16, message: String },

    /// Selected method lacks a required credential
    #[error("Missing push credential: {0}")]
    MissingCredential(&'static str),

    /// Method name not recognised
    #[error("Unknown push method: {0}")]
    UnknownMethod(String),
}

/// Result type alias using PushError.
pub type PushResult<T> = Result<T, PushError>;
