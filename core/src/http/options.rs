use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::Method;
use reqwest::header::{
    AUTHORIZATION, CONTENT_TYPE, COOKIE, HeaderMap, HeaderName, HeaderValue, PROXY_AUTHORIZATION,
};
use serde_json::Value as JsonValue;

/// Plain header mapping as supplied by callers (e.g. authentication headers).
pub type Headers = BTreeMap<String, String>;

/// Options for a single [`ApiClient::request`](super::ApiClient::request) call.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    /// Overlaid on top of `Content-Type: application/json`; caller values win.
    pub headers: Headers,
    /// Serialized to JSON text when present; no body is sent otherwise.
    pub body: Option<JsonValue>,
    /// Per-request timeout, overriding the client default.
    pub timeout: Option<Duration>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self::new(Method::GET)
    }
}

impl RequestOptions {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            headers: Headers::new(),
            body: None,
            timeout: None,
        }
    }

    pub fn get() -> Self {
        Self::new(Method::GET)
    }

    pub fn post() -> Self {
        Self::new(Method::POST)
    }

    pub fn put() -> Self {
        Self::new(Method::PUT)
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn headers(mut self, headers: &Headers) -> Self {
        self.headers
            .extend(headers.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    #[must_use]
    pub fn body(mut self, body: JsonValue) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Converts caller headers into a [`HeaderMap`], starting from
/// `base`. Names are case-insensitive, so a caller's `content-type` replaces
/// the default `Content-Type`.
pub(crate) fn merge_headers(mut base: HeaderMap, headers: &Headers) -> Result<HeaderMap, String> {
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| format!("Invalid header name '{name}': {e}"))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| format!("Invalid value for header '{name}': {e}"))?;
        base.insert(name, value);
    }
    Ok(base)
}

/// Default JSON headers merged with the caller's.
pub(crate) fn json_headers(headers: &Headers) -> Result<HeaderMap, String> {
    let mut base = HeaderMap::new();
    base.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    merge_headers(base, headers)
}

/// Header map rendered for logs, with credentials masked.
pub(crate) fn redacted(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            let shown = if *name == AUTHORIZATION || *name == COOKIE || *name == PROXY_AUTHORIZATION {
                "<redacted>".to_string()
            } else {
                value.to_str().unwrap_or("<binary>").to_string()
            };
            (name.to_string(), shown)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caller_headers_override_defaults() {
        let mut headers = Headers::new();
        headers.insert("content-type".into(), "text/plain".into());
        headers.insert("X-Token".into(), "abc".into());

        let merged = json_headers(&headers).unwrap();
        assert_eq!(merged.get(CONTENT_TYPE).unwrap(), "text/plain");
        assert_eq!(merged.get("x-token").unwrap(), "abc");
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn default_content_type_is_json() {
        let merged = json_headers(&Headers::new()).unwrap();
        assert_eq!(merged.get(CONTENT_TYPE).unwrap(), "application/json");
    }

    #[test]
    fn invalid_header_is_reported() {
        let mut headers = Headers::new();
        headers.insert("bad header".into(), "x".into());
        assert!(json_headers(&headers).unwrap_err().contains("bad header"));
    }

    #[test]
    fn credentials_are_masked_in_logs() {
        let mut headers = Headers::new();
        headers.insert("Authorization".into(), "Bearer secret".into());
        let shown = redacted(&json_headers(&headers).unwrap());
        assert!(shown.contains(&("authorization".to_string(), "<redacted>".to_string())));
        assert!(shown.contains(&("content-type".to_string(), "application/json".to_string())));
    }
}
