//! Assemble everything a session run needs from a loaded `Config`.

use push_notify::{PushConfig, PushMethod};
use session_engine::{Credentials, EngineConfig, Payload};
use tracing::{debug, warn};

use crate::curl::parse_curl;
use crate::defaults::{default_cookies, default_headers, default_payload};
use crate::{Config, ConfigResult};

/// Where the starting credentials came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Curl,
    Config,
    BuiltIn,
}

/// Session inputs resolved from configuration.
#[derive(Debug, Clone)]
pub struct Bootstrap {
    pub credentials: Credentials,
    pub payload: Payload,
    pub engine: EngineConfig,
    pub push: PushConfig,
    pub source: CredentialSource,
}

impl Bootstrap {
    /// Resolve credentials, payload, engine and push settings.
    ///
    /// A captured cURL command wins over configured cookies and headers,
    /// which win over the built-in sample. A payload in the captured body
    /// wins over the configured one.
    pub fn from_config(config: &Config) -> ConfigResult<Self> {
        config.validate()?;
        let session_cookie = config.endpoints.session_cookie.clone();

        let mut captured_body = None;
        let (credentials, source) = match config.curl_command.as_deref() {
            Some(command) => {
                let captured = parse_curl(command)?;
                debug!(
                    headers = captured.headers.len(),
                    cookies = captured.cookies.len(),
                    "Parsed captured curl command"
                );
                captured_body = captured.body;
                (
                    Credentials::from_parts(session_cookie, captured.cookies, captured.headers),
                    CredentialSource::Curl,
                )
            }
            None if !config.cookies.is_empty() => {
                let headers = if config.headers.is_empty() {
                    default_headers()
                } else {
                    config.headers.clone()
                };
                (
                    Credentials::from_parts(session_cookie, config.cookies.clone(), headers),
                    CredentialSource::Config,
                )
            }
            None => (
                Credentials::from_parts(session_cookie, default_cookies(), default_headers()),
                CredentialSource::BuiltIn,
            ),
        };

        let mut payload = resolve_payload(config, captured_body.as_deref())?;
        payload.strip_digest();

        let push = PushConfig {
            method: match config.push_method.as_deref() {
                Some(raw) => PushMethod::parse(raw)?,
                None => None,
            },
            pushplus_token: config.pushplus_token.clone(),
            wxpusher_spt: config.wxpusher_spt.clone(),
            telegram_bot_token: config.telegram_bot_token.clone(),
            telegram_chat_id: config.telegram_chat_id.clone(),
            ..PushConfig::default()
        };
        push.validate()?;

        let engine = EngineConfig {
            endpoints: config.endpoints.clone(),
            pacing: config.pacing_mode(),
            retry: config.retry.clone(),
            progress: config.progress.clone(),
            preflight: config.preflight,
            request_timeout_secs: config.request_timeout_secs,
            seed: config.seed,
        };

        Ok(Self {
            credentials,
            payload,
            engine,
            push,
            source,
        })
    }
}

fn resolve_payload(config: &Config, captured_body: Option<&str>) -> ConfigResult<Payload> {
    if let Some(body) = captured_body.filter(|b| !b.trim().is_empty()) {
        match Payload::from_json(body) {
            Ok(payload) => return Ok(payload),
            Err(e) => warn!(error = %e, "Captured request body is not a progress payload"),
        }
    }
    match &config.payload {
        Some(value) => Ok(serde_json::from_value(value.clone())?),
        None => Ok(default_payload()),
    }
}
