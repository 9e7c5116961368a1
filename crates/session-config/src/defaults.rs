//! Built-in sample credentials and progress payload.
//!
//! These only let the binary start; a real run needs captured cookies
//! (config file or `WXREAD_CURL_BASH`).

use serde_json::json;
use session_engine::Payload;
use std::collections::BTreeMap;

fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

pub fn default_cookies() -> BTreeMap<String, String> {
    map(&[
        ("RK", "xzsh0fMOVJ"),
        (
            "ptcz",
            "626491ceda7231fb30fe8ec33d45412f8c7ff2c43debfe9f9b751367454ba191",
        ),
        ("pac_uid", "0_e63870bcecc18"),
        ("iip", "0"),
        ("_qimei_uuid42", "191150d120510054c6141a3309bda049b26a822f6d"),
        (
            "wr_avatar",
            "https%3A%2F%2Fthirdwx.qlogo.cn%2Fmmopen%2Fvi_32%2FPiajxSqBRaEIbibQ84hicAvZ2gZXpCCc41wxM1ZnSe0yUB9VxPSpeG1DZtkacPZYnxE0N2O67czsS1bwPmkDPVbQjCfkSYWrdQ2Ru1w7JmSW1TnPQNzsQiaBbQ%2F132",
        ),
        ("wr_gender", "0"),
    ])
}

pub fn default_headers() -> BTreeMap<String, String> {
    map(&[
        ("accept", "application/json, text/plain, */*"),
        (
            "accept-language",
            "zh-CN,zh;q=0.9,en;q=0.8,en-GB;q=0.7,en-US;q=0.6,ko;q=0.5",
        ),
        (
            "baggage",
            "sentry-environment=production,sentry-release=dev-1730698697208,sentry-public_key=ed67ed71f7804a038e898ba54bd66e44,sentry-trace_id=1ff5a0725f8841088b42f97109c45862",
        ),
        (
            "user-agent",
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36 Edg/131.0.0.0",
        ),
    ])
}

pub fn default_payload() -> Payload {
    let value = json!({
        "appId": "wb182564874663h776775553",
        "b": "612327107189997b612511d",
        "c": "1c3321802231c383cd30bb3",
        "ci": 35,
        "co": 419,
        "sm": "5.9　移位和循环指令TIA博途软件移位",
        "pr": 99,
        "rt": 14,
        "ts": 1742110495206_i64,
        "rn": 604,
        "sg": "7fd6df8f2262dcb802731aa432ac230f3c099bf8cb2abbd03a3d3e234c4a2722",
        "ct": 1742110495,
        "ps": "272326e07a623fe7g018361",
        "pc": "6bd322007a623fe8g01005f"
    });
    serde_json::from_value(value).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_payload_fields() {
        let payload = default_payload();
        assert_eq!(payload.app_id, "wb182564874663h776775553");
        assert_eq!(payload.chapter_index, 35);
        assert_eq!(payload.progress, 99);
        assert!(payload.extra.is_empty());
        assert!(payload.digest.is_none());
    }

    #[test]
    fn test_default_cookies_lack_session_token() {
        let cookies = default_cookies();
        assert_eq!(cookies.len(), 7);
        assert!(!cookies.contains_key("wr_skey"));
    }

    #[test]
    fn test_default_headers_have_user_agent() {
        assert!(default_headers()["user-agent"].starts_with("Mozilla/5.0"));
    }
}
