//! The seam between the retry engine and the network.

use strum::{AsRefStr, Display, IntoStaticStr};
use thiserror::Error;

use crate::request::AttemptRequest;
use crate::response::TransportResponse;

/// Message fragments that identify transient network failures.
const TRANSIENT_MARKERS: &[&str] = &[
    "connection reset",
    "econnreset",
    "timed out",
    "etimedout",
    "host not found",
    "enotfound",
    "dns error",
    "network",
];

/// How a request failed before producing an HTTP response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(AsRefStr, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum TransportErrorKind {
    /// The attempt exceeded its timeout and was aborted.
    Timeout,
    /// The connection could not be established.
    Connect,
    /// The request could not be built or sent.
    Request,
    /// The response body could not be read.
    Body,
}

/// Failure of a single attempt below the HTTP layer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{kind} error: {message}")]
pub struct TransportError {
    /// Failure category.
    pub kind: TransportErrorKind,
    /// Description, including the underlying error chain.
    pub message: String,
}

impl TransportError {
    /// Creates a new transport error.
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Creates a timeout error.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Timeout, message)
    }

    /// Whether the failure was a timeout.
    pub fn is_timeout(&self) -> bool {
        self.kind == TransportErrorKind::Timeout
    }

    /// Timeouts and known transient network failures are retryable.
    pub fn is_retryable(&self) -> bool {
        if self.is_timeout() {
            return true;
        }

        let message = self.message.to_ascii_lowercase();
        TRANSIENT_MARKERS
            .iter()
            .any(|marker| message.contains(marker))
    }
}

/// Sends one attempt of a dispatch.
///
/// Implementations perform exactly one HTTP request per call and never retry.
/// Any HTTP status, including 4xx and 5xx, is returned as `Ok`.
#[async_trait::async_trait]
pub trait WebhookTransport: Send + Sync {
    /// Delivers a single attempt.
    async fn send(&self, request: &AttemptRequest) -> Result<TransportResponse, TransportError>;
}

#[async_trait::async_trait]
impl<T> WebhookTransport for std::sync::Arc<T>
where
    T: WebhookTransport + ?Sized,
{
    async fn send(&self, request: &AttemptRequest) -> Result<TransportResponse, TransportError> {
        (**self).send(request).await
    }
}
