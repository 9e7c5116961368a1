//! Push delivery over HTTP.

use async_trait::async_trait;
use serde_json::{json, Value};
use session_engine::Notifier;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::{PushConfig, PushMethod};
use crate::error::{PushError, PushResult};

const PUSHPLUS_URL: &str = "https://www.pushplus.plus/send";
const WXPUSHER_URL: &str = "https://wxpusher.zjiecode.com/api/send/message";
const TELEGRAM_API_URL: &str = "https://api.telegram.org";
const PUSH_TITLE: &str = "readpace";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// One HTTP call to a push service.
#[derive(Debug, Clone, PartialEq)]
pub struct PushRequest {
    pub url: String,
    /// JSON body; `None` means GET.
    pub body: Option<Value>,
}

/// Build the request for `message` with the configured method.
pub fn build_request(
    method: PushMethod,
    config: &PushConfig,
    message: &str,
) -> PushResult<PushRequest> {
    match method {
        PushMethod::PushPlus => Ok(PushRequest {
            url: PUSHPLUS_URL.to_string(),
            body: Some(json!({
                "token": config.pushplus_token()?,
                "title": PUSH_TITLE,
                "content": message,
            })),
        }),
        PushMethod::WxPusher => Ok(PushRequest {
            url: format!(
                "{}/{}/{}",
                WXPUSHER_URL,
                config.wxpusher_spt()?,
                urlencoding::encode(message)
            ),
            body: None,
        }),
        PushMethod::Telegram => {
            let (token, chat_id) = config.telegram()?;
            Ok(PushRequest {
                url: format!("{}/bot{}/sendMessage", TELEGRAM_API_URL, token),
                body: Some(json!({
                    "chat_id": chat_id,
                    "text": message,
                })),
            })
        }
    }
}

/// Interpret a push service response.
///
/// Every service answers 200 even for some rejections, so the body's own
/// status is checked as well.
pub fn check_response(method: PushMethod, status: u16, body: &str) -> PushResult<()> {
    if !(200..300).contains(&status) {
        return Err(PushError::ApiError {
            status,
            message: body.chars().take(200).collect(),
        });
    }

    let parsed: Value = serde_json::from_str(body).unwrap_or(Value::Null);
    let accepted = match method {
        PushMethod::PushPlus => parsed.get("code").and_then(Value::as_i64) == Some(200),
        PushMethod::WxPusher => {
            parsed.get("success").and_then(Value::as_bool) == Some(true)
                || parsed.get("code").and_then(Value::as_i64) == Some(1000)
        }
        PushMethod::Telegram => parsed.get("ok").and_then(Value::as_bool) == Some(true),
    };

    if accepted {
        Ok(())
    } else {
        let message = parsed
            .get("msg")
            .or_else(|| parsed.get("description"))
            .and_then(Value::as_str)
            .unwrap_or("rejected")
            .to_string();
        Err(PushError::ApiError { status, message })
    }
}

/// Delivers end-of-run reports to the configured push service.
#[derive(Clone, Debug)]
pub struct PushNotifier {
    http_client: reqwest::Client,
    config: PushConfig,
}

impl PushNotifier {
    /// Create a notifier. Fails if the selected method lacks credentials.
    pub fn new(config: PushConfig) -> PushResult<Self> {
        config.validate()?;
        let http_client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http_client,
            config,
        })
    }

    pub fn config(&self) -> &PushConfig {
        &self.config
    }

    /// Wait before retry `attempt` (1-based).
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        Duration::from_secs(self.config.retry_delay_secs.saturating_mul(u64::from(attempt)))
    }

    /// Deliver once.
    pub async fn send(&self, message: &str) -> PushResult<()> {
        let Some(method) = self.config.method else {
            return Ok(());
        };
        let request = build_request(method, &self.config, message)?;

        debug!(method = %method, "Sending push notification");

        let builder = match &request.body {
            Some(body) => self.http_client.post(&request.url).json(body),
            None => self.http_client.get(&request.url),
        };
        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();

        check_response(method, status, &body)
    }

    /// Deliver with retries. Returns the last error if every attempt failed.
    pub async fn send_with_retry(&self, message: &str) -> PushResult<()> {
        let attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.send(message).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < attempts => {
                    warn!(error = %e, attempt, "Push delivery failed, retrying");
                    tokio::time::sleep(self.retry_delay(attempt)).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl Notifier for PushNotifier {
    async fn notify(&self, message: &str) {
        let Some(method) = self.config.method else {
            debug!("No push method configured, skipping notification");
            return;
        };
        match self.send_with_retry(message).await {
            Ok(()) => info!(method = %method, "Push notification delivered"),
            Err(e) => warn!(method = %method, error = %e, "Push notification failed"),
        }
    }
}
