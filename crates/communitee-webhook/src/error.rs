//! Structured error handling for webhook dispatch.

use std::time::Duration;

use serde::Serialize;
use strum::{AsRefStr, Display, EnumString, IntoStaticStr};
use thiserror::Error;

/// Type alias for boxed dynamic errors that can be sent across threads.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Type alias for Results with our custom Error type.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Maximum number of characters of a response body kept in error context.
pub const MAX_ERROR_BODY_CHARS: usize = 1024;

/// Categories of errors that can occur during a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(AsRefStr, Display, EnumString, IntoStaticStr, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The target or payload was rejected before any request was made.
    Validation,
    /// The request never produced an HTTP response.
    Transport,
    /// The endpoint answered with a non-2xx status.
    Http,
    /// Every allowed attempt failed with a retryable error.
    ExhaustedRetries,
    /// The payload could not be encoded.
    Serialization,
    /// The client could not be constructed.
    Configuration,
}

/// Structured context attached to dispatch failures.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorContext {
    /// Target with query string, fragment and credentials removed.
    pub url: String,
    /// The payload that was (or would have been) sent.
    pub payload: serde_json::Value,
    /// Number of the attempt that produced this failure (0 if none was made).
    pub attempt: u32,
    /// HTTP status of the last response, if one was received.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Truncated body of the last response, if one was received.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_body: Option<String>,
    /// Elapsed time of the last attempt.
    #[serde(
        rename = "responseTimeMs",
        serialize_with = "serialize_millis",
        skip_serializing_if = "Option::is_none"
    )]
    pub response_time: Option<Duration>,
}

fn serialize_millis<S>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match value {
        Some(duration) => serializer.serialize_u64(duration.as_millis() as u64),
        None => serializer.serialize_none(),
    }
}

impl ErrorContext {
    /// Creates a context for the given sanitized url and payload.
    pub fn new(url: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            url: url.into(),
            payload,
            ..Default::default()
        }
    }

    /// Sets the attempt number.
    pub fn with_attempt(mut self, attempt: u32) -> Self {
        self.attempt = attempt;
        self
    }

    /// Sets the HTTP status of the response.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Sets the response body, truncated to [`MAX_ERROR_BODY_CHARS`].
    pub fn with_response_body(mut self, body: &str) -> Self {
        self.response_body = Some(body.chars().take(MAX_ERROR_BODY_CHARS).collect());
        self
    }

    /// Sets the elapsed time of the attempt.
    pub fn with_response_time(mut self, elapsed: Duration) -> Self {
        self.response_time = Some(elapsed);
        self
    }
}

/// Structured error type with classification and context tracking.
///
/// The `retryable` flag reflects only the most recent attempt. It tells an
/// outer caller whether repeating the whole dispatch later may succeed.
#[must_use]
#[derive(Debug, Error)]
#[error("[{kind}]{}", message.as_ref().map(|m| format!(": {m}")).unwrap_or_default())]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Primary error message.
    pub message: Option<String>,
    /// Dispatch context, when the failure happened inside a dispatch.
    pub context: Option<Box<ErrorContext>>,
    /// Whether the last attempt failed in a retryable way.
    pub retryable: bool,
    /// Set for transport failures that were caused by a timeout.
    pub timed_out: bool,
    /// Underlying source error, if any.
    #[source]
    pub source: Option<BoxedError>,
}

impl Error {
    /// Creates a new, non-retryable error with the given kind.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            context: None,
            retryable: false,
            timed_out: false,
            source: None,
        }
    }

    /// Creates a new validation error.
    pub fn validation() -> Self {
        Self::new(ErrorKind::Validation)
    }

    /// Creates a new serialization error.
    pub fn serialization() -> Self {
        Self::new(ErrorKind::Serialization)
    }

    /// Creates a new configuration error.
    pub fn configuration() -> Self {
        Self::new(ErrorKind::Configuration)
    }

    /// Adds a message to this error.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Sets the source of the error.
    pub fn with_source(mut self, source: impl Into<BoxedError>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Attaches dispatch context.
    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = Some(Box::new(context));
        self
    }

    /// Sets the retryable classification.
    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    /// Marks the error as caused by a timeout.
    pub fn with_timed_out(mut self, timed_out: bool) -> Self {
        self.timed_out = timed_out;
        self
    }

    /// Returns the error kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the dispatch context, if any.
    pub fn context(&self) -> Option<&ErrorContext> {
        self.context.as_deref()
    }

    /// Whether the last attempt was classified as retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.retryable
    }

    /// HTTP status a calling route should surface for this failure.
    pub fn status_hint(&self) -> u16 {
        match self.kind {
            ErrorKind::Validation => 400,
            ErrorKind::Transport if self.timed_out => 408,
            ErrorKind::ExhaustedRetries if self.timed_out => 408,
            _ if self.retryable => 503,
            _ => 500,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Self::serialization()
            .with_message("Failed to encode webhook payload")
            .with_source(error)
    }
}

impl From<url::ParseError> for Error {
    fn from(error: url::ParseError) -> Self {
        Self::validation()
            .with_message(format!("Invalid webhook URL: {error}"))
            .with_source(error)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_error_new_is_not_retryable() {
        let error = Error::new(ErrorKind::Http);
        assert_eq!(error.kind, ErrorKind::Http);
        assert!(error.message.is_none());
        assert!(error.context.is_none());
        assert!(!error.is_retryable());
    }

    #[test]
    fn test_error_display() {
        let error = Error::new(ErrorKind::ExhaustedRetries).with_message("HTTP 500");
        assert_eq!(error.to_string(), "[exhausted_retries]: HTTP 500");

        let bare = Error::validation();
        assert_eq!(bare.to_string(), "[validation]");
    }

    #[test]
    fn test_status_hint() {
        assert_eq!(Error::validation().status_hint(), 400);

        let timeout = Error::new(ErrorKind::Transport)
            .with_retryable(true)
            .with_timed_out(true);
        assert_eq!(timeout.status_hint(), 408);

        let exhausted = Error::new(ErrorKind::ExhaustedRetries).with_retryable(true);
        assert_eq!(exhausted.status_hint(), 503);

        assert_eq!(Error::new(ErrorKind::Http).status_hint(), 500);
    }

    #[test]
    fn test_context_truncates_body() {
        let body = "x".repeat(MAX_ERROR_BODY_CHARS + 50);
        let context = ErrorContext::new("https://hooks.example.com/run", serde_json::Value::Null)
            .with_response_body(&body);

        assert_eq!(
            context.response_body.map(|b| b.len()),
            Some(MAX_ERROR_BODY_CHARS)
        );
    }

    #[test]
    fn test_context_serialization() {
        let context = ErrorContext::new("https://hooks.example.com/run", serde_json::json!({}))
            .with_attempt(3)
            .with_status(500)
            .with_response_time(Duration::from_millis(250));

        let value = serde_json::to_value(&context).unwrap();
        assert_eq!(value["attempt"], 3);
        assert_eq!(value["status"], 500);
        assert_eq!(value["responseTimeMs"], 250);
        assert!(value.get("responseBody").is_none());
    }

    #[test]
    fn test_from_str() {
        assert_eq!(
            ErrorKind::from_str("exhausted_retries").unwrap(),
            ErrorKind::ExhaustedRetries
        );
        assert_eq!(
            ErrorKind::from_str("validation").unwrap(),
            ErrorKind::Validation
        );
        assert!(ErrorKind::from_str("unknown").is_err());
    }
}
