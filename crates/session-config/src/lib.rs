//! Configuration for readpace.
//!
//! Loads `~/.readpace/config.json` and environment overrides, parses a
//! captured cURL command into credentials, and turns the result into the
//! inputs of a reading session.

mod bootstrap;
mod config;
mod curl;
mod defaults;
mod error;
mod logging;
mod paths;

pub use bootstrap::{Bootstrap, CredentialSource};
pub use config::{Config, DEFAULT_LOG_LEVEL};
pub use curl::{parse_cookie_string, parse_curl, CapturedRequest};
pub use defaults::{default_cookies, default_headers, default_payload};
pub use error::{ConfigError, ConfigResult};
pub use logging::{init_logging, log_config, SERVICE_NAME};
pub use paths::Paths;
