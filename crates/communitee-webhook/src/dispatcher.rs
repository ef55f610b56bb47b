//! Webhook dispatch with retries.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::time::Instant;
use uuid::Uuid;

use crate::config::DispatchConfig;
use crate::error::{Error, ErrorContext, ErrorKind, Result};
use crate::policy::{RetryPolicy, is_retryable_status};
use crate::request::{AttemptRequest, WebhookAction, WebhookPayload};
use crate::response::{DispatchResult, TransportResponse};
use crate::target::WebhookTarget;
use crate::transport::{TransportError, WebhookTransport};

/// Tracing target for dispatch operations.
pub const TRACING_TARGET: &str = "communitee_webhook::dispatch";

/// Why a single attempt did not succeed.
enum AttemptFailure {
    /// The endpoint answered with a non-2xx status.
    Http(TransportResponse),
    /// No HTTP response was received.
    Transport {
        error: TransportError,
        elapsed: Duration,
    },
}

impl AttemptFailure {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Http(response) => is_retryable_status(response.status),
            Self::Transport { error, .. } => error.is_retryable(),
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Http(response) => format!("HTTP {}", response.status),
            Self::Transport { error, .. } => error.to_string(),
        }
    }

    /// Converts the failure of the final attempt into the caller-facing error.
    fn into_error(self, context: ErrorContext, attempts: u32) -> Error {
        let retryable = self.is_retryable();
        let message = self.describe();

        let error = match self {
            Self::Http(response) => Error::new(ErrorKind::Http).with_context(
                context
                    .with_status(response.status)
                    .with_response_body(&response.body)
                    .with_response_time(response.elapsed),
            ),
            Self::Transport { error, elapsed } => Error::new(ErrorKind::Transport)
                .with_timed_out(error.is_timeout())
                .with_context(context.with_response_time(elapsed))
                .with_source(error),
        };

        if retryable {
            Error {
                kind: ErrorKind::ExhaustedRetries,
                ..error
            }
            .with_message(format!(
                "Webhook dispatch failed after {attempts} attempts: {message}"
            ))
            .with_retryable(true)
        } else {
            error.with_message(message).with_retryable(false)
        }
    }
}

/// Inner state shared by clones of a dispatcher.
struct DispatcherInner {
    transport: Arc<dyn WebhookTransport>,
    config: DispatchConfig,
    policy: RetryPolicy,
}

/// Delivers action payloads to webhook endpoints, retrying transient failures.
///
/// The dispatcher holds no mutable state: concurrent dispatches are fully
/// independent and every call starts its own attempt sequence. Clones share
/// the same transport.
///
/// # Examples
///
/// ```rust,ignore
/// use communitee_webhook::reqwest::{ReqwestConfig, ReqwestTransport};
/// use communitee_webhook::{DispatchConfig, WebhookAction, WebhookDispatcher, WebhookTarget};
///
/// let transport = ReqwestTransport::new(ReqwestConfig::default())?;
/// let dispatcher = WebhookDispatcher::new(transport, DispatchConfig::default());
///
/// let target = WebhookTarget::parse("https://hooks.example.com/webhook/run")?;
/// let result = dispatcher.dispatch(&target, WebhookAction::Run).await?;
/// ```
#[derive(Clone)]
pub struct WebhookDispatcher {
    inner: Arc<DispatcherInner>,
}

impl fmt::Debug for WebhookDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookDispatcher")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl WebhookDispatcher {
    /// Creates a dispatcher sending through `transport`.
    pub fn new<T>(transport: T, config: DispatchConfig) -> Self
    where
        T: WebhookTransport + 'static,
    {
        let policy = config.retry_policy();

        tracing::debug!(
            target: TRACING_TARGET,
            client_id = config.effective_client_id(),
            max_attempts = policy.max_attempts(),
            base_delay_ms = policy.base_delay().as_millis(),
            max_delay_ms = policy.max_delay().as_millis(),
            timeout_ms = config.effective_timeout().as_millis(),
            "Creating webhook dispatcher"
        );

        let inner = DispatcherInner {
            transport: Arc::new(transport),
            config,
            policy,
        };

        Self {
            inner: Arc::new(inner),
        }
    }

    /// Gets the dispatcher configuration.
    pub fn config(&self) -> &DispatchConfig {
        &self.inner.config
    }

    /// Gets the retry policy.
    pub fn policy(&self) -> &RetryPolicy {
        &self.inner.policy
    }

    /// Triggers `action` on `target`.
    pub async fn dispatch(
        &self,
        target: &WebhookTarget,
        action: WebhookAction,
    ) -> Result<DispatchResult> {
        let payload = WebhookPayload::action(action, self.inner.config.effective_client_id());
        self.dispatch_with_retry(target, payload).await
    }

    /// Validates `url` and triggers `action` on it.
    ///
    /// An invalid URL fails without any network call.
    pub async fn dispatch_raw(&self, url: &str, action: WebhookAction) -> Result<DispatchResult> {
        let target = WebhookTarget::parse(url).inspect_err(|err| {
            tracing::warn!(
                target: TRACING_TARGET,
                error = %err,
                "Rejected webhook target"
            );
        })?;

        self.dispatch(&target, action).await
    }

    /// Delivers an arbitrary payload to `target`.
    pub async fn dispatch_with_retry(
        &self,
        target: &WebhookTarget,
        payload: WebhookPayload,
    ) -> Result<DispatchResult> {
        self.run(target, &payload, self.inner.config.effective_timeout())
            .await
    }

    /// Triggers `action` on every target concurrently.
    ///
    /// Each dispatch is independent and uses the bulk timeout for every
    /// attempt. Results are returned in the order of `targets`.
    pub async fn dispatch_bulk(
        &self,
        targets: &[WebhookTarget],
        action: WebhookAction,
    ) -> Vec<Result<DispatchResult>> {
        let timeout = self.inner.config.bulk_timeout();
        let client_id = self.inner.config.effective_client_id();

        tracing::info!(
            target: TRACING_TARGET,
            targets = targets.len(),
            action = %action,
            timeout_ms = timeout.as_millis(),
            "Starting bulk dispatch"
        );

        let dispatches = targets.iter().map(|target| {
            let payload = WebhookPayload::action(action, client_id);
            async move { self.run(target, &payload, timeout).await }
        });

        let results = join_all(dispatches).await;

        tracing::info!(
            target: TRACING_TARGET,
            targets = targets.len(),
            succeeded = results.iter().filter(|r| r.is_ok()).count(),
            "Bulk dispatch completed"
        );

        results
    }

    /// Runs the attempt sequence of one dispatch.
    async fn run(
        &self,
        target: &WebhookTarget,
        payload: &WebhookPayload,
        timeout: Duration,
    ) -> Result<DispatchResult> {
        let policy = self.inner.policy;
        let client_id = self.inner.config.effective_client_id();
        let request_id = Uuid::now_v7();
        let started_at = Instant::now();
        let mut attempt = 0;

        loop {
            attempt += 1;

            let request =
                AttemptRequest::new(target, payload, request_id, attempt, timeout, client_id)
                    .map_err(|err| {
                        err.with_context(
                            ErrorContext::new(target.sanitized(), payload.to_value())
                                .with_attempt(attempt),
                        )
                    })?;

            tracing::debug!(
                target: TRACING_TARGET,
                request_id = %request_id,
                url = %target,
                attempt,
                max_attempts = policy.max_attempts(),
                "Sending webhook attempt"
            );

            let failure = match self.attempt(&request).await {
                Ok(response) if response.is_success() => {
                    tracing::info!(
                        target: TRACING_TARGET,
                        request_id = %request_id,
                        url = %target,
                        status_code = response.status,
                        attempt,
                        elapsed_ms = started_at.elapsed().as_millis(),
                        "Webhook dispatched"
                    );

                    let result = DispatchResult::from_response(&response, request_id, attempt);
                    if result.data.is_placeholder() {
                        tracing::warn!(
                            target: TRACING_TARGET,
                            request_id = %request_id,
                            status_code = response.status,
                            body_len = response.body.len(),
                            "Webhook response is not JSON, using placeholder body"
                        );
                    }

                    return Ok(result);
                }
                Ok(response) => AttemptFailure::Http(response),
                Err((error, elapsed)) => AttemptFailure::Transport { error, elapsed },
            };

            let retryable = failure.is_retryable();
            if policy.should_retry(attempt, retryable) {
                let delay = policy.next_backoff(attempt);

                tracing::warn!(
                    target: TRACING_TARGET,
                    request_id = %request_id,
                    url = %target,
                    attempt,
                    max_attempts = policy.max_attempts(),
                    error = %failure.describe(),
                    backoff_ms = delay.as_millis(),
                    "Webhook attempt failed, retrying"
                );

                tokio::time::sleep(delay).await;
                continue;
            }

            let context = ErrorContext::new(
                target.sanitized(),
                payload.for_attempt(request_id, attempt),
            )
            .with_attempt(attempt);
            let error = failure.into_error(context, attempt);

            tracing::error!(
                target: TRACING_TARGET,
                request_id = %request_id,
                url = %target,
                attempt,
                kind = %error.kind,
                retryable = error.is_retryable(),
                elapsed_ms = started_at.elapsed().as_millis(),
                error = %error,
                "Webhook dispatch failed"
            );

            return Err(error);
        }
    }

    /// Sends one attempt, bounded by the attempt's timeout.
    async fn attempt(
        &self,
        request: &AttemptRequest,
    ) -> std::result::Result<TransportResponse, (TransportError, Duration)> {
        let started_at = Instant::now();
        let send = self.inner.transport.send(request);

        match tokio::time::timeout(request.timeout, send).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(error)) => Err((error, started_at.elapsed())),
            Err(_) => Err((
                TransportError::timeout(format!(
                    "attempt aborted after {}ms",
                    request.timeout.as_millis()
                )),
                started_at.elapsed(),
            )),
        }
    }
}
