//! Configuration management.
//!
//! Values come from built-in defaults, then `~/.readpace/config.json` if it
//! exists, then environment variables. CLI flags are applied last by the
//! binary.

use crate::{ConfigError, ConfigResult, Paths};
use serde::{Deserialize, Serialize};
use session_engine::{Endpoints, PacingMode, ProgressPolicy, RetryPolicy};
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;
use url::Url;

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Main configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Target reading time in minutes (fixed-duration pacing).
    pub read_minutes: i64,
    /// Fixed number of reports; selects per-attempt pacing when set.
    pub read_attempts: Option<u64>,
    pub min_interval_secs: u64,
    pub max_interval_secs: u64,
    /// pushplus, wxpusher or telegram; blank disables push.
    pub push_method: Option<String>,
    pub pushplus_token: Option<String>,
    pub wxpusher_spt: Option<String>,
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    /// Browser "copy as cURL" of a progress report.
    pub curl_command: Option<String>,
    /// Cookies used when no cURL command is given.
    pub cookies: BTreeMap<String, String>,
    /// Headers used when no cURL command is given.
    pub headers: BTreeMap<String, String>,
    /// Initial progress payload.
    pub payload: Option<serde_json::Value>,
    pub seed: Option<u64>,
    pub preflight: bool,
    pub request_timeout_secs: u64,
    pub endpoints: Endpoints,
    pub retry: RetryPolicy,
    pub progress: ProgressPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            read_minutes: 60,
            read_attempts: None,
            min_interval_secs: 25,
            max_interval_secs: 45,
            push_method: None,
            pushplus_token: None,
            wxpusher_spt: None,
            telegram_bot_token: None,
            telegram_chat_id: None,
            curl_command: None,
            cookies: BTreeMap::new(),
            headers: BTreeMap::new(),
            payload: None,
            seed: None,
            preflight: true,
            request_timeout_secs: 10,
            endpoints: Endpoints::default(),
            retry: RetryPolicy::default(),
            progress: ProgressPolicy::default(),
        }
    }
}

fn non_empty(raw: String) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn parse_env<T: FromStr>(name: &'static str, raw: String) -> ConfigResult<T> {
    raw.parse()
        .map_err(|_| ConfigError::InvalidEnv { name, value: raw })
}

impl Config {
    /// Defaults overridden from the environment.
    pub fn new() -> ConfigResult<Self> {
        let mut config = Self::default();
        config.load_from_env()?;
        Ok(config)
    }

    /// Load the config file if present, then apply environment overrides.
    pub fn load(paths: &Paths) -> ConfigResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.load_from_env()?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the config file.
    pub fn save(&self, paths: &Paths) -> ConfigResult<()> {
        paths.ensure_dirs()?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(paths.config_file(), content)?;
        Ok(())
    }

    /// Override configuration from process environment variables.
    pub fn load_from_env(&mut self) -> ConfigResult<()> {
        self.apply_env(|name| std::env::var(name).ok())
    }

    /// Override configuration from `lookup`. Blank values are ignored;
    /// numbers that do not parse are an error.
    pub fn apply_env<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).and_then(non_empty);

        if let Some(v) = get("READ_TIME") {
            self.read_minutes = parse_env("READ_TIME", v)?;
        }
        if let Some(v) = get("READ_NUM") {
            self.read_attempts = Some(parse_env("READ_NUM", v)?);
        }
        if let Some(v) = get("READ_MIN_INTERVAL") {
            self.min_interval_secs = parse_env("READ_MIN_INTERVAL", v)?;
        }
        if let Some(v) = get("READ_MAX_INTERVAL") {
            self.max_interval_secs = parse_env("READ_MAX_INTERVAL", v)?;
        }
        if let Some(v) = get("READPACE_LOG_LEVEL") {
            self.log_level = v;
        }
        if let Some(v) = get("PUSH_METHOD") {
            self.push_method = Some(v);
        }
        if let Some(v) = get("PUSHPLUS_TOKEN") {
            self.pushplus_token = Some(v);
        }
        if let Some(v) = get("WXPUSHER_SPT") {
            self.wxpusher_spt = Some(v);
        }
        if let Some(v) = get("TELEGRAM_BOT_TOKEN") {
            self.telegram_bot_token = Some(v);
        }
        if let Some(v) = get("TELEGRAM_CHAT_ID") {
            self.telegram_chat_id = Some(v);
        }
        if let Some(v) = get("WXREAD_CURL_BASH") {
            self.curl_command = Some(v);
        }
        Ok(())
    }

    /// Pacing strategy selected by this configuration.
    pub fn pacing_mode(&self) -> PacingMode {
        match self.read_attempts {
            Some(attempts) => PacingMode::PerAttempt {
                attempts,
                min_interval_secs: self.min_interval_secs,
                max_interval_secs: self.max_interval_secs,
            },
            None => PacingMode::FixedDuration {
                target_minutes: self.read_minutes,
                min_interval_secs: self.min_interval_secs,
                max_interval_secs: self.max_interval_secs,
            },
        }
    }

    /// Check endpoint URLs and interval bounds.
    pub fn validate(&self) -> ConfigResult<()> {
        for url in [
            &self.endpoints.read_url,
            &self.endpoints.renew_url,
            &self.endpoints.root_url,
        ] {
            Url::parse(url)?;
        }
        if self.min_interval_secs == 0 || self.max_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "reading intervals must be at least one second".to_string(),
            ));
        }
        if self.endpoints.session_cookie.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "session cookie name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
