//! Webhook action payloads and per-attempt requests.

use std::time::Duration;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{AsRefStr, Display, EnumString, IntoStaticStr};
use url::Url;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::target::WebhookTarget;

/// Header carrying the client identifier.
pub const HEADER_CLIENT_ID: &str = "X-Client-Id";
/// Header carrying the per-dispatch request id.
pub const HEADER_REQUEST_ID: &str = "X-Request-Id";
/// Header carrying the 1-based attempt number.
pub const HEADER_ATTEMPT: &str = "X-Attempt-Number";

/// Actions an automation webhook can be asked to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(AsRefStr, Display, EnumString, IntoStaticStr, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum WebhookAction {
    /// Start the workflow.
    Run,
    /// Stop a running workflow.
    Stop,
}

/// JSON object sent to a webhook endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct WebhookPayload {
    fields: Map<String, Value>,
}

impl WebhookPayload {
    /// Builds the `{ action, source, timestamp }` payload for a run/stop trigger.
    pub fn action(action: WebhookAction, source: &str) -> Self {
        let mut fields = Map::new();
        fields.insert("action".into(), Value::from(action.as_ref()));
        fields.insert("source".into(), Value::from(source));
        fields.insert("timestamp".into(), Value::from(Timestamp::now().to_string()));
        Self { fields }
    }

    /// Wraps an arbitrary JSON value, which must be an object.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(Error::validation().with_message(format!(
                "Webhook payload must be a JSON object, got {}",
                json_type_name(&other)
            ))),
        }
    }

    /// Returns a field of the payload.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Returns the payload as a JSON value.
    pub fn to_value(&self) -> Value {
        Value::Object(self.fields.clone())
    }

    /// Returns the body of one attempt: the payload plus `requestId` and `attempt`.
    pub fn for_attempt(&self, request_id: Uuid, attempt: u32) -> Value {
        let mut fields = self.fields.clone();
        fields.insert("requestId".into(), Value::from(request_id.to_string()));
        fields.insert("attempt".into(), Value::from(attempt));
        Value::Object(fields)
    }
}

impl TryFrom<Value> for WebhookPayload {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        Self::from_value(value)
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A single physical HTTP request within a dispatch.
#[derive(Debug, Clone)]
pub struct AttemptRequest {
    /// Identifier shared by every attempt of one dispatch.
    pub request_id: Uuid,
    /// 1-based attempt number.
    pub attempt: u32,
    /// Destination of the request.
    pub url: Url,
    /// Encoded JSON body.
    pub body: Vec<u8>,
    /// Upper bound for this attempt.
    pub timeout: Duration,
    /// Headers to send, in addition to the transport defaults.
    pub headers: Vec<(String, String)>,
}

impl AttemptRequest {
    /// Builds an attempt for `payload`, encoding it with the attempt metadata.
    pub fn new(
        target: &WebhookTarget,
        payload: &WebhookPayload,
        request_id: Uuid,
        attempt: u32,
        timeout: Duration,
        client_id: &str,
    ) -> Result<Self> {
        let body = serde_json::to_vec(&payload.for_attempt(request_id, attempt))?;

        let headers = vec![
            ("Content-Type".to_owned(), "application/json".to_owned()),
            (HEADER_CLIENT_ID.to_owned(), client_id.to_owned()),
            (HEADER_REQUEST_ID.to_owned(), request_id.to_string()),
            (HEADER_ATTEMPT.to_owned(), attempt.to_string()),
        ];

        Ok(Self {
            request_id,
            attempt,
            url: target.as_url().clone(),
            body,
            timeout,
            headers,
        })
    }

    /// Returns the value of a header, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Decodes the body back into JSON.
    pub fn json(&self) -> Result<Value> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_action_payload_shape() {
        let payload = WebhookPayload::action(WebhookAction::Stop, "communitee-control-hub");

        assert_eq!(payload.get("action"), Some(&Value::from("stop")));
        assert_eq!(
            payload.get("source"),
            Some(&Value::from("communitee-control-hub"))
        );

        let timestamp = payload.get("timestamp").and_then(Value::as_str).unwrap();
        assert!(Timestamp::from_str(timestamp).is_ok());
    }

    #[test]
    fn test_from_value_requires_object() {
        assert!(WebhookPayload::from_value(serde_json::json!({"key": 1})).is_ok());

        let error = WebhookPayload::from_value(serde_json::json!([1, 2])).unwrap_err();
        assert_eq!(error.kind(), crate::ErrorKind::Validation);
        assert!(error.to_string().contains("array"));
    }

    #[test]
    fn test_attempt_request_merges_metadata() {
        let target = WebhookTarget::parse("https://hooks.example.com/run").unwrap();
        let payload = WebhookPayload::action(WebhookAction::Run, "hub");
        let request_id = Uuid::now_v7();

        let request = AttemptRequest::new(
            &target,
            &payload,
            request_id,
            2,
            Duration::from_secs(30),
            "hub",
        )
        .unwrap();

        let body = request.json().unwrap();
        assert_eq!(body["action"], "run");
        assert_eq!(body["attempt"], 2);
        assert_eq!(body["requestId"], request_id.to_string());

        assert_eq!(request.header("x-attempt-number"), Some("2"));
        assert_eq!(request.header("X-Client-Id"), Some("hub"));
        assert_eq!(
            request.header("content-type"),
            Some("application/json")
        );
    }

    #[test]
    fn test_action_from_str() {
        assert_eq!(WebhookAction::from_str("run").unwrap(), WebhookAction::Run);
        assert_eq!(WebhookAction::from_str("stop").unwrap(), WebhookAction::Stop);
        assert!(WebhookAction::from_str("pause").is_err());
    }
}
