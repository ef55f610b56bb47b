//! JSON rendering of dispatch results and failures.

use communitee_webhook::{DispatchResult, Error, ErrorContext, ErrorKind, WebhookTarget};
use serde::Serialize;

/// Exit code for failed dispatches.
pub const EXIT_FAILURE: i32 = 1;
/// Exit code for rejected input or configuration.
pub const EXIT_USAGE: i32 = 2;

/// Failure document written to stderr.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDocument<'a> {
    pub kind: ErrorKind,
    pub message: String,
    pub is_retryable: bool,
    pub status_hint: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<&'a ErrorContext>,
}

impl<'a> From<&'a Error> for ErrorDocument<'a> {
    fn from(error: &'a Error) -> Self {
        Self {
            kind: error.kind(),
            message: error
                .message
                .clone()
                .unwrap_or_else(|| error.kind().to_string()),
            is_retryable: error.is_retryable(),
            status_hint: error.status_hint(),
            context: error.context(),
        }
    }
}

/// One line of a bulk report.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkEntry<'a> {
    pub url: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<&'a DispatchResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDocument<'a>>,
}

/// Pairs each target with its outcome, in order.
pub fn bulk_report<'a>(
    targets: &[WebhookTarget],
    results: &'a [communitee_webhook::Result<DispatchResult>],
) -> Vec<BulkEntry<'a>> {
    targets
        .iter()
        .zip(results)
        .map(|(target, result)| match result {
            Ok(result) => BulkEntry {
                url: target.sanitized(),
                success: true,
                result: Some(result),
                error: None,
            },
            Err(error) => BulkEntry {
                url: target.sanitized(),
                success: false,
                result: None,
                error: Some(ErrorDocument::from(error)),
            },
        })
        .collect()
}

/// Process exit code for a dispatch error.
pub fn exit_code(error: &Error) -> i32 {
    match error.kind() {
        ErrorKind::Validation | ErrorKind::Configuration => EXIT_USAGE,
        _ => EXIT_FAILURE,
    }
}

/// Pretty-prints a value as JSON.
pub fn to_json<T: Serialize>(value: &T) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use communitee_webhook::TransportResponse;
    use serde_json::{Value, json};
    use uuid::Uuid;

    use super::*;

    #[test]
    fn test_error_document_shape() {
        let error = Error::new(ErrorKind::ExhaustedRetries)
            .with_message("Webhook dispatch failed after 3 attempts: HTTP 503")
            .with_retryable(true)
            .with_context(
                ErrorContext::new("https://hooks.example.com/run", json!({"action": "run"}))
                    .with_attempt(3)
                    .with_status(503),
            );

        let document: Value = serde_json::from_str(&to_json(&ErrorDocument::from(&error)).unwrap())
            .unwrap();

        assert_eq!(document["kind"], "exhausted_retries");
        assert_eq!(document["isRetryable"], true);
        assert_eq!(document["statusHint"], 503);
        assert_eq!(document["context"]["attempt"], 3);
        assert_eq!(document["context"]["status"], 503);
        assert!(document["message"].as_str().unwrap().contains("3 attempts"));
    }

    #[test]
    fn test_error_document_without_message_or_context() {
        let error = Error::validation();
        let document = serde_json::to_value(ErrorDocument::from(&error)).unwrap();

        assert_eq!(document["message"], "validation");
        assert_eq!(document["statusHint"], 400);
        assert!(document.get("context").is_none());
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_code(&Error::validation()), EXIT_USAGE);
        assert_eq!(exit_code(&Error::configuration()), EXIT_USAGE);
        assert_eq!(exit_code(&Error::new(ErrorKind::Http)), EXIT_FAILURE);
        assert_eq!(exit_code(&Error::new(ErrorKind::ExhaustedRetries)), EXIT_FAILURE);
    }

    #[test]
    fn test_bulk_report_keeps_order() {
        let targets = vec![
            WebhookTarget::parse("https://a.example.com/hook?token=secret").unwrap(),
            WebhookTarget::parse("https://b.example.com/hook").unwrap(),
        ];
        let response = TransportResponse::new(200, r#"{"id":"exec-1"}"#, Duration::ZERO);
        let results = vec![
            Ok(DispatchResult::from_response(&response, Uuid::now_v7(), 1)),
            Err(Error::new(ErrorKind::Http).with_message("HTTP 404")),
        ];

        let report = bulk_report(&targets, &results);
        let value = serde_json::to_value(&report).unwrap();

        assert_eq!(value[0]["url"], "https://a.example.com/hook");
        assert_eq!(value[0]["success"], true);
        assert_eq!(value[0]["result"]["executionId"], "exec-1");
        assert!(value[0].get("error").is_none());

        assert_eq!(value[1]["success"], false);
        assert_eq!(value[1]["error"]["kind"], "http");
        assert!(value[1].get("result").is_none());
    }
}
