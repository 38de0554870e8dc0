//! Immutable session bundle shared by every outbound request.

use std::collections::HashMap;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::{QnaError, Result};

/// Cookie key holding the device fingerprint.
pub const DEVICE_FINGERPRINT_COOKIE: &str = "DFID";

/// Browser-like headers sent with every request, before the cookie and user agent.
const BASE_HEADERS: &[(&str, &str)] = &[
    ("authority", "www.chegg.com"),
    ("accept-encoding", "gzip, deflate, br"),
    ("accept-language", "en-US,en;q=0.9"),
    (
        "sec-ch-ua",
        "\" Not;A Brand\";v=\"99\", \"Google Chrome\";v=\"91\", \"Chromium\";v=\"91\"",
    ),
    ("sec-ch-ua-mobile", "?0"),
    ("upgrade-insecure-requests", "1"),
    (
        "accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.9",
    ),
    ("sec-fetch-site", "cross-site"),
    ("sec-fetch-mode", "navigate"),
    ("sec-fetch-user", "?1"),
    ("sec-fetch-dest", "document"),
];

/// Session cookie, user agent and header template for one pipeline.
///
/// Built once and never mutated afterwards, so it can be shared freely
/// between concurrent readers.
#[derive(Debug, Clone)]
pub struct SessionContext {
    cookie_header: String,
    cookie_pairs: HashMap<String, String>,
    user_agent: String,
    device_fingerprint: Option<String>,
    base_headers: HeaderMap,
}

impl SessionContext {
    /// Builds a session from a raw `k=v; k=v` cookie string and a user agent.
    ///
    /// # Errors
    ///
    /// Returns [`QnaError::InvalidCookie`] when a segment has no `=`, and
    /// [`QnaError::InvalidHeader`] when the cookie or user agent cannot be sent
    /// as a header value.
    pub fn new(cookie: &str, user_agent: &str) -> Result<Self> {
        let cookie_header = cookie.trim().to_string();
        let cookie_pairs = parse_cookie_pairs(&cookie_header)?;
        let device_fingerprint = cookie_pairs.get(DEVICE_FINGERPRINT_COOKIE).cloned();

        let mut base_headers = HeaderMap::new();
        for &(name, value) in BASE_HEADERS {
            base_headers.insert(name, HeaderValue::from_static(value));
        }
        base_headers.insert(
            reqwest::header::COOKIE,
            HeaderValue::from_str(&cookie_header).map_err(|_| QnaError::InvalidHeader("cookie".to_string()))?,
        );
        base_headers.insert(
            reqwest::header::USER_AGENT,
            HeaderValue::from_str(user_agent).map_err(|_| QnaError::InvalidHeader("user-agent".to_string()))?,
        );

        let mut keys: Vec<&String> = cookie_pairs.keys().collect();
        keys.sort();
        tracing::debug!(cookie_keys = ?keys, user_agent, "session context created");

        Ok(Self { cookie_header, cookie_pairs, user_agent: user_agent.to_string(), device_fingerprint, base_headers })
    }

    /// The cookie exactly as it is sent upstream.
    pub fn cookie_header(&self) -> &str {
        &self.cookie_header
    }

    /// Looks up a single cookie value by key.
    pub fn cookie(&self, key: &str) -> Option<&str> {
        self.cookie_pairs.get(key).map(String::as_str)
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Value of the `DFID` cookie, if the session has one.
    pub fn device_fingerprint(&self) -> Option<&str> {
        self.device_fingerprint.as_deref()
    }

    pub fn base_headers(&self) -> &HeaderMap {
        &self.base_headers
    }

    /// Base headers with `extra` layered on top; `extra` wins on conflict.
    pub fn merged_headers(&self, extra: &[(&str, String)]) -> Result<HeaderMap> {
        let mut headers = self.base_headers.clone();
        for (key, value) in extra {
            let name = HeaderName::from_bytes(key.as_bytes()).map_err(|_| QnaError::InvalidHeader(key.to_string()))?;
            let value = HeaderValue::from_str(value).map_err(|_| QnaError::InvalidHeader(key.to_string()))?;
            headers.insert(name, value);
        }
        Ok(headers)
    }
}

/// Splits a cookie header into key/value pairs, trimming both sides.
fn parse_cookie_pairs(cookie: &str) -> Result<HashMap<String, String>> {
    let mut pairs = HashMap::new();
    for segment in cookie.split(';') {
        if segment.trim().is_empty() {
            continue;
        }
        let (key, value) = segment
            .split_once('=')
            .ok_or_else(|| QnaError::InvalidCookie(format!("segment without '=': {}", segment.trim())))?;
        pairs.insert(key.trim().to_string(), value.trim().to_string());
    }
    Ok(pairs)
}
