//! Extract credentials from a browser "copy as cURL (bash)" command.
//!
//! Headers come from every `-H 'Name: value'`. Cookies come from `-b '…'`
//! when present, otherwise from the `Cookie` header, which is then dropped
//! from the header set. The target URL and a `--data-raw` body are kept
//! when present so the captured progress report can seed the payload.

use regex::Regex;
use std::collections::BTreeMap;

use crate::{ConfigError, ConfigResult};

/// What a captured request carried.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedRequest {
    pub url: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub cookies: BTreeMap<String, String>,
    pub body: Option<String>,
}

const HEADER_PATTERN: &str = r"-H '([^:]+): ([^']+)'";
const COOKIE_FLAG_PATTERN: &str = r"(?:-b|--cookie) '([^']+)'";
const URL_PATTERN: &str = r"curl\s+'([^']+)'";
const BODY_PATTERN: &str = r"--data(?:-raw|-binary)? '([^']*)'";

/// Split a `name=value; name2=value2` cookie string.
pub fn parse_cookie_string(raw: &str) -> BTreeMap<String, String> {
    raw.split("; ")
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .filter(|(k, _)| !k.is_empty())
        .collect()
}

/// Parse a cURL command.
///
/// Fails when the command carries neither headers nor cookies.
pub fn parse_curl(command: &str) -> ConfigResult<CapturedRequest> {
    let mut all_headers = BTreeMap::new();
    for captures in Regex::new(HEADER_PATTERN)?.captures_iter(command) {
        all_headers.insert(captures[1].to_string(), captures[2].to_string());
    }

    let cookie_header = all_headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("cookie"))
        .map(|(_, v)| v.clone());
    let cookie_string = Regex::new(COOKIE_FLAG_PATTERN)?
        .captures(command)
        .map(|c| c[1].to_string())
        .or(cookie_header)
        .unwrap_or_default();

    let headers: BTreeMap<String, String> = all_headers
        .into_iter()
        .filter(|(k, _)| !k.eq_ignore_ascii_case("cookie"))
        .collect();
    let cookies = parse_cookie_string(&cookie_string);

    if headers.is_empty() && cookies.is_empty() {
        return Err(ConfigError::Curl("no headers or cookies found".to_string()));
    }

    Ok(CapturedRequest {
        url: Regex::new(URL_PATTERN)?
            .captures(command)
            .map(|c| c[1].to_string()),
        headers,
        cookies,
        body: Regex::new(BODY_PATTERN)?
            .captures(command)
            .map(|c| c[1].to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CURL: &str = r#"curl 'https://weread.qq.com/web/book/read' \
  -H 'accept: application/json, text/plain, */*' \
  -H 'accept-language: zh-CN,zh;q=0.9' \
  -H 'content-type: application/json;charset=UTF-8' \
  -b 'RK=xzsh0fMOVJ; wr_skey=AB12CD34; wr_vid=42' \
  -H 'user-agent: Mozilla/5.0' \
  --data-raw '{"appId":"wb1","b":"book","ci":3}'"#;

    #[test]
    fn test_parse_headers_and_cookie_flag() {
        let captured = parse_curl(CURL).unwrap();

        assert_eq!(captured.headers.len(), 4);
        assert_eq!(captured.headers["user-agent"], "Mozilla/5.0");
        assert_eq!(captured.headers["accept-language"], "zh-CN,zh;q=0.9");
        assert_eq!(captured.cookies["wr_skey"], "AB12CD34");
        assert_eq!(captured.cookies["RK"], "xzsh0fMOVJ");
        assert_eq!(
            captured.url.as_deref(),
            Some("https://weread.qq.com/web/book/read")
        );
        assert_eq!(
            captured.body.as_deref(),
            Some(r#"{"appId":"wb1","b":"book","ci":3}"#)
        );
    }

    #[test]
    fn test_cookie_header_used_and_removed() {
        let command = "curl 'https://x.test/' -H 'Cookie: a=1; b=two=2' -H 'accept: */*'";
        let captured = parse_curl(command).unwrap();

        assert_eq!(captured.cookies["a"], "1");
        assert_eq!(captured.cookies["b"], "two=2");
        assert!(!captured.headers.contains_key("Cookie"));
        assert_eq!(captured.headers.len(), 1);
        assert!(captured.body.is_none());
    }

    #[test]
    fn test_cookie_flag_wins_over_header() {
        let command = "curl 'https://x.test/' -H 'cookie: a=header' -b 'a=flag'";
        let captured = parse_curl(command).unwrap();
        assert_eq!(captured.cookies["a"], "flag");
        assert!(captured.headers.is_empty());
    }

    #[test]
    fn test_empty_command_rejected() {
        assert!(matches!(parse_curl("curl 'https://x.test/'"), Err(ConfigError::Curl(_))));
    }

    #[test]
    fn test_parse_cookie_string_skips_malformed() {
        let cookies = parse_cookie_string("a=1; junk; =empty; b=2");
        assert_eq!(cookies.len(), 2);
        assert_eq!(cookies["b"], "2");
    }
}
