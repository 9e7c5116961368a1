//! Session engine error types.

use crate::transport::TransportError;
use thiserror::Error;

/// Session engine error type.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Network failure or timeout talking to the remote service
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Remote answered with a non-200 status
    #[error("Transport rejected with HTTP {status}")]
    TransportRejected { status: u16 },

    /// Progress report accepted by the transport but lacking the success marker
    #[error("Session expired (success marker missing)")]
    AuthExpired,

    /// Renewal call succeeded but carried no session cookie
    #[error("No session token found in renewal response")]
    NoTokenFound,

    /// Refresh retries exhausted
    #[error("Credential refresh failed after {0} attempts")]
    RefreshExhausted(u32),

    /// Submission failures exceeded the general retry ceiling
    #[error("Progress submission failed {0} times without a success")]
    RetryExhausted(u32),

    /// Invalid state transition in the session FSM
    #[error("Invalid session state transition: {0}")]
    InvalidStateTransition(String),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl EngineError {
    /// Returns true if the engine recovers locally from this error through
    /// refresh and backoff.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            EngineError::Transport(_)
                | EngineError::TransportRejected { .. }
                | EngineError::AuthExpired
                | EngineError::NoTokenFound
        )
    }

    /// Returns true if this error terminates the run.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            EngineError::RefreshExhausted(_) | EngineError::RetryExhausted(_)
        )
    }
}

/// Result type alias using EngineError.
pub type EngineResult<T> = Result<T, EngineError>;
