//! Session token renewal.
//!
//! Recovery runs in two tiers: a direct renewal call with the current
//! credentials, then a full reset through a fresh transport context that
//! warms up the cookie jar before renewing.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::credentials::{extract_session_key, redact, Credentials, DEFAULT_SESSION_COOKIE};
use crate::error::{EngineError, EngineResult};
use crate::transport::{OutboundRequest, Transport};

/// Page the renewal call claims to be refreshing, pre-encoded as the
/// remote expects.
const RENEW_RETURN_PATH: &str = "%2Fweb%2Fbook%2Fread";

/// Remote endpoints and protocol constants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    /// Progress report endpoint.
    pub read_url: String,
    /// Session renewal endpoint.
    pub renew_url: String,
    /// Root resource used to warm up a fresh context.
    pub root_url: String,
    /// Cookie carrying the session token.
    pub session_cookie: String,
    /// Response key whose presence marks an accepted report.
    pub success_marker: String,
    /// Shared secret mixed into the security signature.
    pub signing_secret: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            read_url: "https://weread.qq.com/web/book/read".to_string(),
            renew_url: "https://weread.qq.com/web/login/renewal".to_string(),
            root_url: "https://weread.qq.com/".to_string(),
            session_cookie: DEFAULT_SESSION_COOKIE.to_string(),
            success_marker: "succ".to_string(),
            signing_secret: "3c5c8717f3daf09iop3423zafeqoi".to_string(),
        }
    }
}

/// Renews the session token.
pub struct CredentialRefresher {
    endpoints: Endpoints,
    transport: Arc<dyn Transport>,
}

impl CredentialRefresher {
    pub fn new(endpoints: Endpoints, transport: Arc<dyn Transport>) -> Self {
        Self {
            endpoints,
            transport,
        }
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    fn renewal_body() -> String {
        json!({
            "rq": RENEW_RETURN_PATH,
            "ql": true,
            "ts": chrono::Utc::now().timestamp_millis(),
        })
        .to_string()
    }

    /// One renewal call. Returns the token and every `Set-Cookie` directive.
    async fn renew(
        &self,
        transport: &dyn Transport,
        credentials: &Credentials,
    ) -> EngineResult<(String, Vec<String>)> {
        let request =
            OutboundRequest::post(&self.endpoints.renew_url, credentials, Self::renewal_body());
        let response = transport.send(request).await?;

        if !response.is_ok() {
            return Err(EngineError::TransportRejected {
                status: response.status,
            });
        }

        let token = extract_session_key(&response.set_cookies, credentials.session_cookie())
            .ok_or(EngineError::NoTokenFound)?;
        Ok((token, response.set_cookies))
    }

    /// Direct renewal with the current credentials. On success the new
    /// token replaces the old one in the store and is returned.
    pub async fn refresh(&self, credentials: &mut Credentials) -> EngineResult<String> {
        let (token, _) = self.renew(self.transport.as_ref(), credentials).await?;
        credentials.set_session_key(&token);
        info!(token = %redact(&token), "Session token renewed");
        Ok(token)
    }

    /// Renewal through a fresh transport context after a warm-up request.
    ///
    /// The warm-up is best effort: its failure is ignored and any cookies it
    /// returns are replayed into the renewal. All cookies returned along the
    /// way are merged into the store.
    pub async fn full_reset(&self, credentials: &mut Credentials) -> EngineResult<String> {
        let fresh = self.transport.fresh_context()?;
        let mut replay = credentials.clone();

        match fresh
            .send(OutboundRequest::get(&self.endpoints.root_url, &replay))
            .await
        {
            Ok(response) => {
                let merged = replay.merge_set_cookies(&response.set_cookies);
                debug!(status = response.status, merged, "Warm-up request completed");
            }
            Err(e) => debug!(error = %e, "Warm-up request failed, continuing"),
        }

        let (token, set_cookies) = self.renew(fresh.as_ref(), &replay).await?;
        replay.merge_set_cookies(&set_cookies);
        credentials.cookies.extend(replay.cookies);
        credentials.set_session_key(&token);

        info!(token = %redact(&token), "Session token renewed after full reset");
        Ok(token)
    }

    /// Direct renewal, falling back to a full reset.
    pub async fn recover(&self, credentials: &mut Credentials) -> EngineResult<String> {
        match self.refresh(credentials).await {
            Ok(token) => Ok(token),
            Err(e) => {
                warn!(error = %e, "Direct renewal failed, attempting full reset");
                self.full_reset(credentials).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{status, with_cookies, ScriptedTransport};
    use crate::transport::TransportError;

    fn endpoints() -> Endpoints {
        Endpoints {
            session_cookie: "session_key".to_string(),
            ..Default::default()
        }
    }

    fn credentials() -> Credentials {
        let mut credentials = Credentials::new("session_key");
        credentials.set_session_key("OLDKEY00");
        credentials.cookies.insert("RK".into(), "x".into());
        credentials
    }

    fn refresher(transport: &ScriptedTransport) -> CredentialRefresher {
        CredentialRefresher::new(endpoints(), Arc::new(transport.clone()))
    }

    #[tokio::test]
    async fn test_refresh_updates_store() {
        let transport = ScriptedTransport::new();
        transport.push(
            &endpoints().renew_url,
            with_cookies(200, &["session_key=AB12CD34;"]),
        );
        let mut creds = credentials();

        let token = refresher(&transport).refresh(&mut creds).await.unwrap();

        assert_eq!(token, "AB12CD34");
        assert_eq!(creds.session_key(), Some("AB12CD34"));
        assert_eq!(creds.cookies.get("RK").unwrap(), "x");
    }

    #[tokio::test]
    async fn test_refresh_sends_renewal_body() {
        let transport = ScriptedTransport::new();
        transport.push(
            &endpoints().renew_url,
            with_cookies(200, &["session_key=AB12CD34;"]),
        );
        refresher(&transport)
            .refresh(&mut credentials())
            .await
            .unwrap();

        let requests = transport.requests();
        let body: serde_json::Value =
            serde_json::from_str(requests[0].body.as_deref().unwrap()).unwrap();
        assert_eq!(body["rq"], "%2Fweb%2Fbook%2Fread");
        assert_eq!(body["ql"], true);
        assert!(body["ts"].is_i64());
        assert_eq!(requests[0].cookies.get("session_key").unwrap(), "OLDKEY00");
    }

    #[tokio::test]
    async fn test_refresh_without_cookie() {
        let transport = ScriptedTransport::new();
        transport.push(&endpoints().renew_url, with_cookies(200, &["other=1"]));
        let mut creds = credentials();

        let err = refresher(&transport).refresh(&mut creds).await.unwrap_err();
        assert!(matches!(err, EngineError::NoTokenFound));
        assert_eq!(creds.session_key(), Some("OLDKEY00"));
    }

    #[tokio::test]
    async fn test_refresh_rejected_status() {
        let transport = ScriptedTransport::new();
        transport.push(&endpoints().renew_url, status(403));

        let err = refresher(&transport)
            .refresh(&mut credentials())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::TransportRejected { status: 403 }));
    }

    #[tokio::test]
    async fn test_refresh_transport_failure() {
        let transport = ScriptedTransport::new();
        transport.push(&endpoints().renew_url, Err(TransportError::Timeout));

        let err = refresher(&transport)
            .refresh(&mut credentials())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Transport(TransportError::Timeout)));
    }

    #[tokio::test]
    async fn test_full_reset_merges_warm_up_cookies() {
        let endpoints = endpoints();
        let transport = ScriptedTransport::new();
        transport.push(&endpoints.root_url, with_cookies(200, &["wr_fp=123; Path=/"]));
        transport.push(
            &endpoints.renew_url,
            with_cookies(200, &["session_key=NEWKEY99; Path=/", "wr_vid=7"]),
        );
        let mut creds = credentials();

        let token = refresher(&transport).full_reset(&mut creds).await.unwrap();

        assert_eq!(token, "NEWKEY99");
        assert_eq!(transport.fresh_contexts(), 1);
        assert_eq!(creds.session_key(), Some("NEWKEY99"));
        assert_eq!(creds.cookies.get("wr_fp").unwrap(), "123");
        assert_eq!(creds.cookies.get("wr_vid").unwrap(), "7");

        // Warm-up cookies are replayed into the renewal
        let renewal = transport
            .requests()
            .into_iter()
            .find(|r| r.url == endpoints.renew_url)
            .unwrap();
        assert_eq!(renewal.cookies.get("wr_fp").unwrap(), "123");
    }

    #[tokio::test]
    async fn test_full_reset_ignores_warm_up_failure() {
        let endpoints = endpoints();
        let transport = ScriptedTransport::new();
        transport.push(&endpoints.root_url, Err(TransportError::Timeout));
        transport.push(
            &endpoints.renew_url,
            with_cookies(200, &["session_key=NEWKEY99"]),
        );

        let token = refresher(&transport)
            .full_reset(&mut credentials())
            .await
            .unwrap();
        assert_eq!(token, "NEWKEY99");
    }

    #[tokio::test]
    async fn test_recover_falls_back_to_full_reset() {
        let endpoints = endpoints();
        let transport = ScriptedTransport::new();
        transport.push(&endpoints.renew_url, status(500));
        transport.push(&endpoints.root_url, status(200));
        transport.push(
            &endpoints.renew_url,
            with_cookies(200, &["session_key=RESET123"]),
        );
        let mut creds = credentials();

        let token = refresher(&transport).recover(&mut creds).await.unwrap();

        assert_eq!(token, "RESET123");
        assert_eq!(transport.requests_to(&endpoints.renew_url), 2);
        assert_eq!(transport.fresh_contexts(), 1);
    }

    #[tokio::test]
    async fn test_recover_skips_reset_on_direct_success() {
        let endpoints = endpoints();
        let transport = ScriptedTransport::new();
        transport.push(
            &endpoints.renew_url,
            with_cookies(200, &["session_key=DIRECT12"]),
        );

        refresher(&transport)
            .recover(&mut credentials())
            .await
            .unwrap();
        assert_eq!(transport.fresh_contexts(), 0);
        assert_eq!(transport.requests_to(&endpoints.root_url), 0);
    }
}
