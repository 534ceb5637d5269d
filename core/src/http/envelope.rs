use std::collections::BTreeMap;

use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Outcome of [`ApiClient::request`](super::ApiClient::request): exactly one
/// of `{data}` or `{error, response}`.
pub type Envelope = Result<ApiSuccess, ApiFailure>;

/// A 2xx response and its parsed body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiSuccess {
    pub data: JsonValue,
}

/// A transport failure or non-2xx response.
///
/// Displays as the best-effort error message, so `?` callers see the server's
/// own wording when it sent one.
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[error("{error}")]
pub struct ApiFailure {
    pub error: String,
    pub response: FailureResponse,
}

/// What is known about the response behind an [`ApiFailure`].
///
/// `status` is `None` when no response was received at all.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureResponse {
    /// Parsed body, or `{}` when absent or not JSON.
    pub data: JsonValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
}

impl ApiFailure {
    /// Failure without any response, e.g. connection refused.
    pub(crate) fn transport(message: String, url: Option<String>) -> Self {
        let response = FailureResponse {
            data: empty_body(),
            url,
            ..FailureResponse::default()
        };
        let error = failure_message(&response.data, Some(&message), None, None);
        Self { error, response }
    }

    /// Failure carrying a received non-2xx response and its parsed body.
    pub(crate) fn status(status: StatusCode, url: String, headers: &HeaderMap, data: JsonValue) -> Self {
        let status_text = status.canonical_reason().map(str::to_string);
        // For status failures the thrown message is the status text itself.
        let error = failure_message(&data, status_text.as_deref(), status_text.as_deref(), Some(status));
        Self {
            error,
            response: FailureResponse {
                data,
                status: Some(status.as_u16()),
                status_text,
                url: Some(url),
                headers: header_pairs(headers),
            },
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        self.response.status
    }
}

/// Body substituted when a response body is missing or not JSON.
pub fn empty_body() -> JsonValue {
    JsonValue::Object(Map::new())
}

/// Picks the first available message: body `error`, body `message`, the
/// thrown error's message, the status text, and finally the bare status code.
pub(crate) fn failure_message(
    data: &JsonValue,
    thrown: Option<&str>,
    status_text: Option<&str>,
    status: Option<StatusCode>,
) -> String {
    body_field(data, "error")
        .or_else(|| body_field(data, "message"))
        .or_else(|| thrown.filter(|m| !m.is_empty()).map(str::to_string))
        .or_else(|| status_text.filter(|m| !m.is_empty()).map(str::to_string))
        .unwrap_or_else(|| match status {
            Some(status) => format!("HTTP status {}", status.as_u16()),
            None => "Request failed".to_string(),
        })
}

/// JavaScript truthiness: null, false, zero and the empty string are falsy.
pub(crate) fn is_truthy(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null | JsonValue::Bool(false) => false,
        JsonValue::String(s) => !s.is_empty(),
        JsonValue::Number(n) => n.as_f64() != Some(0.0),
        _ => true,
    }
}

/// A body field counts only if it is truthy.
fn body_field(data: &JsonValue, key: &str) -> Option<String> {
    match data.get(key).filter(|value| is_truthy(value))? {
        JsonValue::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn header_pairs(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| Some((name.to_string(), value.to_str().ok()?.to_string())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn truthiness_follows_javascript() {
        for falsy in [json!(null), json!(false), json!(0), json!(0.0), json!("")] {
            assert!(!is_truthy(&falsy), "{falsy}");
        }
        for truthy in [json!(true), json!(1), json!("0"), json!({}), json!([])] {
            assert!(is_truthy(&truthy), "{truthy}");
        }
    }

    #[test]
    fn error_field_wins() {
        let data = json!({ "error": "server down", "message": "ignored" });
        let msg = failure_message(&data, Some("Internal Server Error"), None, None);
        assert_eq!(msg, "server down");
    }

    #[test]
    fn message_field_is_second() {
        let data = json!({ "error": "", "message": "bad input" });
        assert_eq!(failure_message(&data, Some("Bad Request"), None, None), "bad input");
    }

    #[test]
    fn non_string_fields_are_stringified() {
        let data = json!({ "error": { "code": 7 } });
        assert_eq!(failure_message(&data, None, None, None), r#"{"code":7}"#);
        let data = json!({ "error": 0, "message": false });
        assert_eq!(failure_message(&data, Some("boom"), None, None), "boom");
    }

    #[test]
    fn falls_back_to_status() {
        let data = empty_body();
        assert_eq!(failure_message(&data, None, Some("Not Found"), None), "Not Found");
        let code = StatusCode::from_u16(599).unwrap();
        assert_eq!(failure_message(&data, None, None, Some(code)), "HTTP status 599");
    }

    #[test]
    fn status_failure_uses_reason_phrase() {
        let failure = ApiFailure::status(
            StatusCode::SERVICE_UNAVAILABLE,
            "http://localhost/v1/chat".into(),
            &HeaderMap::new(),
            json!([1, 2]),
        );
        assert_eq!(failure.error, "Service Unavailable");
        assert_eq!(failure.status_code(), Some(503));
        assert_eq!(failure.to_string(), "Service Unavailable");
    }

    #[test]
    fn wire_shape() {
        let failure = ApiFailure::transport("connection refused".into(), None);
        let value = serde_json::to_value(&failure).unwrap();
        assert_eq!(value, json!({ "error": "connection refused", "response": { "data": {} } }));

        let success = ApiSuccess { data: json!({ "ok": true }) };
        assert_eq!(serde_json::to_value(&success).unwrap(), json!({ "data": { "ok": true } }));
    }
}
