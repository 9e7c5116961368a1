//! Reading session state machine using rust-fsm.
//!
//! ## State Diagram
//!
//! ```text
//! ┌─────────────────┐  SubmitSucceeded / RolledBack / DriftReset
//! │     Active      │ ◄──────────────────────────┐
//! └──┬──────┬───────┘                            │
//!    │      │ SubmitRejected / PreventiveRefresh │
//!    │      ▼                                    │
//!    │  ┌─────────────────┐  RefreshSucceeded    │
//!    │  │   Refreshing    │ ─────────────────────┘
//!    │  └──┬──────────┬───┘  RefreshDeferred
//!    │     │          │ RefreshFailed
//!    │     │          ▼
//!    │     │   ┌─────────────────┐
//!    │     │   │     Backoff     │ ── BackoffElapsed ──► Refreshing
//!    │     │   └─────────────────┘
//!    │     │ RefreshExhausted
//!    │     ▼
//!    │  TerminatedFailure ◄── RetryExhausted (from Active)
//!    │
//!    │ Completed
//!    ▼
//!  TerminatedSuccess
//! ```

use rust_fsm::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;

state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub session_machine(Active)

    Active => {
        SubmitSucceeded => Active,
        RolledBack => Active,
        DriftReset => Active,
        SubmitRejected => Refreshing,
        PreventiveRefresh => Refreshing,
        Completed => TerminatedSuccess,
        RetryExhausted => TerminatedFailure
    },
    Refreshing => {
        RefreshSucceeded => Active,
        // Preventive refresh failed; keep reading on the current token
        RefreshDeferred => Active,
        RefreshFailed => Backoff,
        RefreshExhausted => TerminatedFailure
    },
    Backoff => {
        BackoffElapsed => Refreshing
    }
}

pub use session_machine::Input as SessionMachineInput;
pub use session_machine::State as SessionMachineState;
pub use session_machine::StateMachine as SessionMachine;

/// Session state for logs and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Submitting progress reports.
    Active,
    /// Renewing the session token.
    Refreshing,
    /// Waiting before the next refresh attempt.
    Backoff,
    /// Plan completed.
    TerminatedSuccess,
    /// Gave up.
    TerminatedFailure,
}

impl SessionState {
    /// Returns true once the run is over.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::TerminatedSuccess | SessionState::TerminatedFailure
        )
    }
}

impl From<&SessionMachineState> for SessionState {
    fn from(state: &SessionMachineState) -> Self {
        match state {
            SessionMachineState::Active => SessionState::Active,
            SessionMachineState::Refreshing => SessionState::Refreshing,
            SessionMachineState::Backoff => SessionState::Backoff,
            SessionMachineState::TerminatedSuccess => SessionState::TerminatedSuccess,
            SessionMachineState::TerminatedFailure => SessionState::TerminatedFailure,
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SessionState::Active => "active",
            SessionState::Refreshing => "refreshing",
            SessionState::Backoff => "backoff",
            SessionState::TerminatedSuccess => "terminated_success",
            SessionState::TerminatedFailure => "terminated_failure",
        };
        f.write_str(s)
    }
}

/// Retry, drift and refresh ceilings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Failed recovery cycles before giving up.
    pub max_refresh_retries: u32,
    /// Failed submissions since the last success before giving up.
    pub max_failures: u32,
    /// Consecutive failures that trigger a payload reset.
    pub drift_reset_threshold: u32,
    /// Successful submissions between preventive refreshes (0 disables).
    pub preventive_refresh_every: u64,
    /// Upper bound of the exponential part of the backoff.
    pub backoff_cap_secs: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_refresh_retries: 5,
            max_failures: 10,
            drift_reset_threshold: 3,
            preventive_refresh_every: 8,
            backoff_cap_secs: 30,
        }
    }
}

impl RetryPolicy {
    /// Backoff before the next refresh: `min(cap, 2^retry_count)` seconds
    /// plus `jitter` (expected in `[0, 1)`).
    pub fn backoff_delay(&self, retry_count: u32, jitter: f64) -> Duration {
        let exponential = 2u64.saturating_pow(retry_count).min(self.backoff_cap_secs);
        Duration::from_secs(exponential) + Duration::from_secs_f64(jitter.clamp(0.0, 1.0))
    }
}
