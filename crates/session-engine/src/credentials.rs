//! Credential store for the reading session.
//!
//! Holds the cookie jar and transport headers captured at start-up. Only the
//! session cookie expires; the refresher replaces it in place without
//! rebuilding the rest of the bundle.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Cookie name the remote uses for the short-lived session token.
pub const DEFAULT_SESSION_COOKIE: &str = "wr_skey";

/// Length of a session token as the remote issues it.
pub const SESSION_KEY_LEN: usize = 8;

/// Cookies and headers proving the reading session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Cookie name → value.
    pub cookies: BTreeMap<String, String>,
    /// Transport headers (user-agent, accept, locale, baggage...).
    pub headers: BTreeMap<String, String>,
    /// Name of the expiring session cookie.
    session_cookie: String,
}

impl Credentials {
    /// Create an empty bundle whose session token lives in `session_cookie`.
    pub fn new(session_cookie: impl Into<String>) -> Self {
        Self {
            cookies: BTreeMap::new(),
            headers: BTreeMap::new(),
            session_cookie: session_cookie.into(),
        }
    }

    /// Create a bundle from captured cookies and headers.
    pub fn from_parts(
        session_cookie: impl Into<String>,
        cookies: BTreeMap<String, String>,
        headers: BTreeMap<String, String>,
    ) -> Self {
        Self {
            cookies,
            headers,
            session_cookie: session_cookie.into(),
        }
    }

    /// Name of the session cookie.
    pub fn session_cookie(&self) -> &str {
        &self.session_cookie
    }

    /// Current session token, if any.
    pub fn session_key(&self) -> Option<&str> {
        self.cookies
            .get(&self.session_cookie)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Replace the session token. Empty tokens are ignored.
    ///
    /// Returns true if the store changed.
    pub fn set_session_key(&mut self, key: &str) -> bool {
        if key.is_empty() {
            return false;
        }
        self.cookies
            .insert(self.session_cookie.clone(), key.to_string());
        true
    }

    /// `Cookie` header value for the current jar.
    pub fn cookie_header(&self) -> String {
        crate::transport::render_cookie_header(&self.cookies)
    }

    /// Merge `Set-Cookie` directives into the jar. Only the leading
    /// `name=value` pair of each directive is kept; attributes are dropped.
    ///
    /// Returns the number of cookies written.
    pub fn merge_set_cookies(&mut self, directives: &[String]) -> usize {
        let mut merged = 0;
        for directive in directives {
            let Some(pair) = directive.split(';').next() else {
                continue;
            };
            let Some((name, value)) = pair.split_once('=') else {
                continue;
            };
            let (name, value) = (name.trim(), value.trim());
            if name.is_empty() || value.is_empty() {
                continue;
            }
            self.cookies.insert(name.to_string(), value.to_string());
            merged += 1;
        }
        merged
    }
}

/// Scan `Set-Cookie` directives for the session cookie and return its token.
///
/// Directives are split on `;` and `,` so folded headers and attribute lists
/// are both handled. The token is cut to the remote's 8-character format.
pub fn extract_session_key(directives: &[String], cookie_name: &str) -> Option<String> {
    directives
        .iter()
        .flat_map(|d| d.split([';', ',']))
        .filter_map(|segment| segment.trim().split_once('='))
        .find(|(name, value)| name.trim() == cookie_name && !value.trim().is_empty())
        .map(|(_, value)| value.trim().chars().take(SESSION_KEY_LEN).collect())
}

/// Redacted view of a token for logs.
pub fn redact(token: &str) -> String {
    let prefix: String = token.chars().take(2).collect();
    format!("{}…({} chars)", prefix, token.chars().count())
}
