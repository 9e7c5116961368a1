//! Request signing.
//!
//! Two independent signatures travel with every progress report:
//!
//! - `sg`: SHA-256 over `timestamp_ms ‖ nonce ‖ shared secret`
//! - `s`: a 31-bit rolling hash over the canonical encoding of every other
//!   field
//!
//! The rolling hash is a compatibility contract with the remote service. Its
//! seed, walk order, shift amounts and masks must not change.

use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use crate::payload::Payload;

const HASH_SEED: u64 = 0x1505_1505;
const HASH_MASK: u64 = 0x7fff_ffff;

/// Canonical `k1=v1&k2=v2` encoding of a payload's submitted fields.
///
/// Keys are sorted ascending; values are percent-encoded with no safe
/// characters beyond the unreserved set.
pub fn encode(payload: &Payload) -> String {
    encode_fields(&payload.signed_fields())
}

/// Canonical encoding of an arbitrary field map.
pub fn encode_fields(fields: &BTreeMap<String, Value>) -> String {
    fields
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(&value_text(v))))
        .collect::<Vec<_>>()
        .join("&")
}

/// Text form of a scalar as the remote's reference client renders it.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Null => "None".to_string(),
        other => other.to_string(),
    }
}

/// 31-bit rolling hash, returned as lowercase hex without prefix.
pub fn rolling_hash(input: &str) -> String {
    let chars: Vec<u64> = input.chars().map(|c| c as u64).collect();
    let len = chars.len();
    let mut a = HASH_SEED;
    let mut b = HASH_SEED;

    let mut i = len.saturating_sub(1);
    while i > 0 {
        a = HASH_MASK & (a ^ (chars[i] << ((len - i) % 30)));
        b = HASH_MASK & (b ^ (chars[i - 1] << (i % 30)));
        if i < 2 {
            break;
        }
        i -= 2;
    }

    format!("{:x}", a + b)
}

/// SHA-256 security signature over timestamp, nonce and shared secret.
pub fn security_signature(timestamp_ms: i64, nonce: u32, secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(timestamp_ms.to_string().as_bytes());
    hasher.update(nonce.to_string().as_bytes());
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}
