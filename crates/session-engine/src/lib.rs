//! Reading session engine.
//!
//! This crate provides:
//! - Request signing (SHA-256 security signature and rolling-hash digest)
//! - A typed progress payload with pass-through extra fields
//! - Credential store and two-tier session renewal
//! - Human-paced scheduling and simulated page turns
//! - An explicit FSM-driven session loop with backoff and drift reset

mod credentials;
mod engine;
mod error;
mod fsm;
mod notifier;
pub mod pacing;
mod payload;
mod progress;
mod refresher;
pub mod signer;
mod transport;

#[cfg(test)]
mod testing;

pub use credentials::{
    extract_session_key, redact, Credentials, DEFAULT_SESSION_COOKIE, SESSION_KEY_LEN,
};
pub use engine::{AttemptCounters, EngineConfig, SessionContext, SessionEngine, SessionReport};
pub use error::{EngineError, EngineResult};
pub use fsm::session_machine;
pub use fsm::{RetryPolicy, SessionMachine, SessionMachineInput, SessionMachineState, SessionState};
pub use notifier::{Notifier, NullNotifier, RecordingNotifier};
pub use pacing::{generate_intervals, PacingMode, PacingScheduler};
pub use payload::{is_private_key, Payload, DIGEST_KEY, NONCE_MAX};
pub use progress::{advance, position_token, rollback, PageTurn, ProgressModel, ProgressPolicy, ProgressState};
pub use refresher::{CredentialRefresher, Endpoints};
pub use transport::{
    render_cookie_header, InboundResponse, Method, OutboundRequest, ReqwestTransport, Transport,
    TransportError, DEFAULT_REQUEST_TIMEOUT,
};
