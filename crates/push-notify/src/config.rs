//! Push method selection and credentials.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{PushError, PushResult};

/// Supported push services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PushMethod {
    PushPlus,
    WxPusher,
    Telegram,
}

impl PushMethod {
    /// Parse a method name. Blank input means "no push" and yields `None`.
    pub fn parse(raw: &str) -> PushResult<Option<Self>> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        trimmed.parse().map(Some)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PushMethod::PushPlus => "pushplus",
            PushMethod::WxPusher => "wxpusher",
            PushMethod::Telegram => "telegram",
        }
    }
}

impl FromStr for PushMethod {
    type Err = PushError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pushplus" => Ok(PushMethod::PushPlus),
            "wxpusher" => Ok(PushMethod::WxPusher),
            "telegram" => Ok(PushMethod::Telegram),
            other => Err(PushError::UnknownMethod(other.to_string())),
        }
    }
}

impl fmt::Display for PushMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Push configuration. With no method set, notifications are dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PushConfig {
    pub method: Option<PushMethod>,
    pub pushplus_token: Option<String>,
    pub wxpusher_spt: Option<String>,
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    /// Delivery attempts per message.
    pub max_attempts: u32,
    /// Base delay between attempts; attempt `n` waits `n` times this.
    pub retry_delay_secs: u64,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            method: None,
            pushplus_token: None,
            wxpusher_spt: None,
            telegram_bot_token: None,
            telegram_chat_id: None,
            max_attempts: 3,
            retry_delay_secs: 2,
        }
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl PushConfig {
    pub fn is_enabled(&self) -> bool {
        self.method.is_some()
    }

    /// Check that the selected method has what it needs.
    pub fn validate(&self) -> PushResult<()> {
        match self.method {
            None => Ok(()),
            Some(PushMethod::PushPlus) => self.pushplus_token().map(|_| ()),
            Some(PushMethod::WxPusher) => self.wxpusher_spt().map(|_| ()),
            Some(PushMethod::Telegram) => self.telegram().map(|_| ()),
        }
    }

    pub(crate) fn pushplus_token(&self) -> PushResult<&str> {
        present(&self.pushplus_token).ok_or(PushError::MissingCredential("pushplus_token"))
    }

    pub(crate) fn wxpusher_spt(&self) -> PushResult<&str> {
        present(&self.wxpusher_spt).ok_or(PushError::MissingCredential("wxpusher_spt"))
    }

    pub(crate) fn telegram(&self) -> PushResult<(&str, &str)> {
        let token = present(&self.telegram_bot_token)
            .ok_or(PushError::MissingCredential("telegram_bot_token"))?;
        let chat_id = present(&self.telegram_chat_id)
            .ok_or(PushError::MissingCredential("telegram_chat_id"))?;
        Ok((token, chat_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_methods() {
        assert_eq!(PushMethod::parse("pushplus").unwrap(), Some(PushMethod::PushPlus));
        assert_eq!(PushMethod::parse(" WxPusher ").unwrap(), Some(PushMethod::WxPusher));
        assert_eq!(PushMethod::parse("telegram").unwrap(), Some(PushMethod::Telegram));
    }

    #[test]
    fn test_parse_blank_is_none() {
        assert_eq!(PushMethod::parse("").unwrap(), None);
        assert_eq!(PushMethod::parse("   ").unwrap(), None);
    }

    #[test]
    fn test_parse_unknown() {
        let err = PushMethod::parse("pigeon").unwrap_err();
        assert!(matches!(err, PushError::UnknownMethod(m) if m == "pigeon"));
    }

    #[test]
    fn test_method_serde_lowercase() {
        assert_eq!(
            serde_json::to_string(&PushMethod::WxPusher).unwrap(),
            "\"wxpusher\""
        );
        assert_eq!(PushMethod::Telegram.to_string(), "telegram");
    }

    #[test]
    fn test_validate_requires_credentials() {
        let mut config = PushConfig {
            method: Some(PushMethod::Telegram),
            telegram_bot_token: Some("123:abc".into()),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(PushError::MissingCredential("telegram_chat_id"))
        ));

        config.telegram_chat_id = Some("42".into());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_blank_credential_is_missing() {
        let config = PushConfig {
            method: Some(PushMethod::PushPlus),
            pushplus_token: Some("  ".into()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_disabled_config_is_valid() {
        let config = PushConfig::default();
        assert!(!config.is_enabled());
        assert!(config.validate().is_ok());
    }
}
