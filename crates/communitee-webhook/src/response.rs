//! Webhook responses and dispatch results.

use std::time::Duration;

use jiff::Timestamp;
use serde::{Serialize, Serializer};
use serde_json::Value;
use uuid::Uuid;

/// Raw outcome of one HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body as text (empty if unreadable).
    pub body: String,
    /// Time from sending the request to reading the body.
    pub elapsed: Duration,
}

impl TransportResponse {
    /// Creates a new transport response.
    pub fn new(status: u16, body: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            status,
            body: body.into(),
            elapsed,
        }
    }

    /// Returns whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Body of a successful webhook response.
///
/// Endpoints are not required to answer with JSON. A body that does not
/// parse is kept as [`ResponseBody::Placeholder`] so callers can tell it
/// apart from a genuine response.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// The response body parsed as JSON.
    Json(Value),
    /// The response body was empty or not valid JSON.
    Placeholder,
}

impl ResponseBody {
    /// Parses a response body, falling back to the placeholder.
    pub fn parse(text: &str) -> Self {
        match serde_json::from_str(text) {
            Ok(value) => Self::Json(value),
            Err(_) => Self::Placeholder,
        }
    }

    /// Whether the body is the placeholder.
    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Placeholder)
    }

    /// Returns the parsed JSON, if any.
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Placeholder => None,
        }
    }

    /// Returns the body as a JSON value, substituting the placeholder object.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Json(value) => value.clone(),
            Self::Placeholder => serde_json::json!({
                "message": "Webhook accepted",
                "parsed": false,
            }),
        }
    }

    /// Extracts the correlation id of the remote execution.
    pub fn correlation_id(&self) -> Option<String> {
        self.as_json().and_then(correlation_id)
    }
}

impl Serialize for ResponseBody {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

/// Returns `executionId` or else `id`, whichever is first found as a string.
pub fn correlation_id(body: &Value) -> Option<String> {
    ["executionId", "id"]
        .into_iter()
        .find_map(|key| body.get(key).and_then(Value::as_str))
        .map(str::to_owned)
}

/// Final value of a successful dispatch.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchResult {
    /// Always `true` for a returned result.
    pub success: bool,
    /// HTTP status of the successful attempt.
    pub status: u16,
    /// Parsed response body, or the placeholder.
    pub data: ResponseBody,
    /// When the dispatch resolved.
    pub timestamp: Timestamp,
    /// Correlation id of the triggered remote execution.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_id: Option<String>,
    /// Identifier shared by every attempt of the dispatch.
    pub request_id: Uuid,
    /// Number of attempts made, including the successful one.
    pub attempts: u32,
}

impl DispatchResult {
    /// Builds a result from the successful attempt's response.
    pub fn from_response(response: &TransportResponse, request_id: Uuid, attempts: u32) -> Self {
        let data = ResponseBody::parse(&response.body);
        let execution_id = data.correlation_id();

        Self {
            success: true,
            status: response.status,
            data,
            timestamp: Timestamp::now(),
            execution_id,
            request_id,
            attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_correlation_id_prefers_execution_id() {
        let body = json!({"executionId": "exec-1", "id": "other"});
        assert_eq!(correlation_id(&body), Some("exec-1".to_owned()));

        let body = json!({"id": "wf-9"});
        assert_eq!(correlation_id(&body), Some("wf-9".to_owned()));
    }

    #[test]
    fn test_correlation_id_requires_string() {
        let body = json!({"executionId": 42, "id": "fallback"});
        assert_eq!(correlation_id(&body), Some("fallback".to_owned()));

        let body = json!({"executionId": 42, "id": 7});
        assert_eq!(correlation_id(&body), None);

        assert_eq!(correlation_id(&json!([1, 2])), None);
    }

    #[test]
    fn test_non_json_body_is_placeholder() {
        let body = ResponseBody::parse("Workflow was started");
        assert!(body.is_placeholder());
        assert_eq!(body.correlation_id(), None);
        assert_eq!(body.to_value()["parsed"], false);

        assert!(ResponseBody::parse("").is_placeholder());
    }

    #[test]
    fn test_result_serialization() {
        let response = TransportResponse::new(
            200,
            r#"{"executionId":"exec-1"}"#,
            Duration::from_millis(12),
        );
        let result = DispatchResult::from_response(&response, Uuid::now_v7(), 1);

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["status"], 200);
        assert_eq!(value["executionId"], "exec-1");
        assert_eq!(value["data"]["executionId"], "exec-1");
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn test_result_omits_missing_execution_id() {
        let response = TransportResponse::new(204, "", Duration::ZERO);
        let result = DispatchResult::from_response(&response, Uuid::now_v7(), 2);

        let value = serde_json::to_value(&result).unwrap();
        assert!(value.get("executionId").is_none());
        assert_eq!(value["data"]["message"], "Webhook accepted");
    }
}
