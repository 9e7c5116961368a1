//! Progress report payload.
//!
//! The wire format is a flat JSON object with terse keys. Known keys are
//! typed fields; anything else captured from the bootstrap request rides in
//! `extra` so it round-trips untouched. Keys in `extra` starting with `_`
//! are local bookkeeping and are never submitted or signed.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::signer;

/// Wire key of the rolling-hash digest.
pub const DIGEST_KEY: &str = "s";

/// Upper bound (inclusive) of the per-attempt nonce.
pub const NONCE_MAX: u32 = 1000;

/// One progress report.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Payload {
    #[serde(rename = "appId")]
    pub app_id: String,
    #[serde(rename = "b")]
    pub book_id: String,
    #[serde(rename = "c")]
    pub chapter_uid: String,
    #[serde(rename = "ci")]
    pub chapter_index: u32,
    #[serde(rename = "co")]
    pub content_offset: u64,
    #[serde(rename = "sm")]
    pub summary: String,
    #[serde(rename = "pr")]
    pub progress: u32,
    #[serde(rename = "rt")]
    pub reading_time: u64,
    #[serde(rename = "ts")]
    pub timestamp_ms: i64,
    #[serde(rename = "rn")]
    pub nonce: u32,
    #[serde(rename = "sg")]
    pub security_signature: String,
    #[serde(rename = "ct")]
    pub timestamp_s: i64,
    #[serde(rename = "ps")]
    pub previous_position: String,
    #[serde(rename = "pc")]
    pub current_position: String,
    #[serde(rename = "s", skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Whether a key is local bookkeeping that must never leave the process.
pub fn is_private_key(key: &str) -> bool {
    key.starts_with('_')
}

impl Payload {
    /// Parse a payload from a JSON object.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Regenerate the per-attempt fields: both timestamps, the nonce and the
    /// security signature. Any digest from a previous use is dropped first.
    pub fn stamp(&mut self, now_ms: i64, nonce: u32, secret: &str) {
        self.strip_digest();
        self.timestamp_ms = now_ms;
        self.timestamp_s = now_ms.div_euclid(1000);
        self.nonce = nonce;
        self.security_signature = signer::security_signature(now_ms, nonce, secret);
    }

    /// Compute the digest over the current state. Always the last mutation
    /// before submission.
    pub fn seal(&mut self) -> &str {
        self.strip_digest();
        let digest = signer::rolling_hash(&signer::encode(self));
        self.digest.insert(digest)
    }

    /// Remove the digest, returning it if one was present.
    pub fn strip_digest(&mut self) -> Option<String> {
        self.digest.take()
    }

    /// Every submitted field except the digest, sorted by key.
    pub fn signed_fields(&self) -> BTreeMap<String, Value> {
        let mut fields = self.wire_fields();
        fields.remove(DIGEST_KEY);
        fields
    }

    /// Every submitted field, digest included when present, sorted by key.
    pub fn wire_fields(&self) -> BTreeMap<String, Value> {
        let value = match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => return BTreeMap::new(),
        };
        value
            .into_iter()
            .filter(|(k, _)| !is_private_key(k))
            .collect()
    }

    /// Compact JSON body for submission.
    pub fn to_wire(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.wire_fields())
    }
}
