//! Push notifications for finished reading sessions.
//!
//! Implements the engine's `Notifier` over PushPlus, WxPusher and Telegram.
//! Delivery is retried a few times and failures are only logged.

mod client;
mod config;
mod error;

pub use client::{build_request, check_response, PushNotifier, PushRequest};
pub use config::{PushConfig, PushMethod};
pub use error::{PushError, PushResult};
