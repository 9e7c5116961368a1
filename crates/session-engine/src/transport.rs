//! HTTP transport seam.
//!
//! The engine talks to the remote service only through [`Transport`], so the
//! state machine can be driven by a scripted stub in tests and by
//! [`ReqwestTransport`] in production. Requests carry cookies as an explicit
//! map that is rendered into a single `Cookie` header; every `Set-Cookie`
//! header of the response is handed back verbatim.

use async_trait::async_trait;
use reqwest::header::{COOKIE, SET_COOKIE};
use reqwest::Client;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::credentials::Credentials;

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Transport-level failure (no HTTP status was obtained).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Connection, DNS or TLS failure
    #[error("network failure: {0}")]
    Network(String),

    /// Request exceeded its timeout
    #[error("request timed out")]
    Timeout,

    /// Response body could not be read or decoded
    #[error("response decode failure: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else if e.is_decode() || e.is_body() {
            TransportError::Decode(e.to_string())
        } else {
            TransportError::Network(e.to_string())
        }
    }
}

/// HTTP method used by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// A request as the engine builds it.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub cookies: BTreeMap<String, String>,
    pub body: Option<String>,
}

impl OutboundRequest {
    /// Authenticated POST carrying a pre-serialized JSON body.
    pub fn post(url: &str, credentials: &Credentials, body: String) -> Self {
        Self {
            method: Method::Post,
            url: url.to_string(),
            headers: credentials.headers.clone(),
            cookies: credentials.cookies.clone(),
            body: Some(body),
        }
    }

    /// GET with the given cookie set and the credential headers.
    pub fn get(url: &str, credentials: &Credentials) -> Self {
        Self {
            method: Method::Get,
            url: url.to_string(),
            headers: credentials.headers.clone(),
            cookies: credentials.cookies.clone(),
            body: None,
        }
    }
}

/// A response reduced to what the engine interprets.
#[derive(Debug, Clone, Default)]
pub struct InboundResponse {
    pub status: u16,
    pub set_cookies: Vec<String>,
    pub body: String,
}

impl InboundResponse {
    /// Only a literal 200 counts as transport-level success.
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    /// Parse the body as JSON.
    pub fn json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}

/// Render a cookie map into a `Cookie` header value.
pub fn render_cookie_header(cookies: &BTreeMap<String, String>) -> String {
    cookies
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("; ")
}

/// The engine's only path to the network.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one request and wait for the full response.
    async fn send(&self, request: OutboundRequest) -> Result<InboundResponse, TransportError>;

    /// Acquire an independent transport context (own connection pool),
    /// used by the full session reset.
    fn fresh_context(&self) -> Result<Arc<dyn Transport>, TransportError>;
}

/// Production transport backed by reqwest.
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    client: Client,
    timeout: Duration,
}

impl ReqwestTransport {
    /// Create a transport whose requests all time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, timeout })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: OutboundRequest) -> Result<InboundResponse, TransportError> {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
        };

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !request.cookies.is_empty() {
            builder = builder.header(COOKIE, render_cookie_header(&request.cookies));
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        debug!(url = %request.url, method = ?request.method, "Sending request");

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let set_cookies = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(str::to_string)
            .collect();
        let body = response.text().await?;

        Ok(InboundResponse {
            status,
            set_cookies,
            body,
        })
    }

    fn fresh_context(&self) -> Result<Arc<dyn Transport>, TransportError> {
        Ok(Arc::new(Self::new(self.timeout)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_cookie_header_sorted() {
        let mut cookies = BTreeMap::new();
        cookies.insert("wr_skey".to_string(), "abc".to_string());
        cookies.insert("RK".to_string(), "x".to_string());
        assert_eq!(render_cookie_header(&cookies), "RK=x; wr_skey=abc");
    }

    #[test]
    fn test_render_cookie_header_empty() {
        assert_eq!(render_cookie_header(&BTreeMap::new()), "");
    }

    #[test]
    fn test_only_200_is_ok() {
        let ok = InboundResponse {
            status: 200,
            ..Default::default()
        };
        let created = InboundResponse {
            status: 201,
            ..Default::default()
        };
        assert!(ok.is_ok());
        assert!(!created.is_ok());
    }

    #[test]
    fn test_post_carries_credentials() {
        let mut credentials = Credentials::new("wr_skey");
        credentials.set_session_key("AB12CD34");
        credentials
            .headers
            .insert("user-agent".to_string(), "test".to_string());

        let request = OutboundRequest::post("https://example.test/read", &credentials, "{}".into());
        assert_eq!(request.method, Method::Post);
        assert_eq!(request.cookies.get("wr_skey").unwrap(), "AB12CD34");
        assert_eq!(request.headers.get("user-agent").unwrap(), "test");
        assert_eq!(request.body.as_deref(), Some("{}"));
    }

    #[test]
    fn test_reqwest_transport_builds() {
        assert!(ReqwestTransport::new(DEFAULT_REQUEST_TIMEOUT).is_ok());
    }
}
