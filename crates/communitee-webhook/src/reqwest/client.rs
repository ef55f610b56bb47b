//! Reqwest-based HTTP transport for webhook dispatch.

use std::sync::Arc;
use std::time::Instant;

use reqwest::Client;

use super::{ReqwestConfig, TRACING_TARGET, transport_error};
use crate::error::{Error, Result};
use crate::request::AttemptRequest;
use crate::response::TransportResponse;
use crate::transport::{TransportError, WebhookTransport};

/// Inner transport that holds the HTTP client and configuration.
struct ReqwestTransportInner {
    http: Client,
    config: ReqwestConfig,
}

/// Reqwest-based transport that sends one webhook attempt per call.
///
/// Retries are not performed here; wrap the transport in a
/// [`WebhookDispatcher`](crate::WebhookDispatcher) for that.
#[derive(Clone)]
pub struct ReqwestTransport {
    inner: Arc<ReqwestTransportInner>,
}

impl std::fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestTransport")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl ReqwestTransport {
    /// Creates a new transport with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the HTTP client cannot be created.
    pub fn new(config: ReqwestConfig) -> Result<Self> {
        let timeout = config.effective_timeout();
        let connect_timeout = config.effective_connect_timeout();
        let user_agent = config.effective_user_agent();

        tracing::debug!(
            target: TRACING_TARGET,
            timeout_ms = timeout.as_millis(),
            connect_timeout_ms = connect_timeout.as_millis(),
            user_agent = %user_agent,
            "Creating reqwest transport"
        );

        let http = Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .user_agent(&user_agent)
            .build()
            .map_err(|err| {
                Error::configuration()
                    .with_message("Failed to create HTTP client")
                    .with_source(err)
            })?;

        let inner = ReqwestTransportInner { http, config };
        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Gets the transport configuration.
    pub fn config(&self) -> &ReqwestConfig {
        &self.inner.config
    }
}

#[async_trait::async_trait]
impl WebhookTransport for ReqwestTransport {
    async fn send(&self, request: &AttemptRequest) -> Result<TransportResponse, TransportError> {
        let started_at = Instant::now();

        let mut http_request = self
            .inner
            .http
            .post(request.url.as_str())
            .timeout(request.timeout);

        for (name, value) in &request.headers {
            http_request = http_request.header(name, value);
        }

        let http_response = http_request
            .body(request.body.clone())
            .send()
            .await
            .map_err(|err| {
                let error = transport_error(&err);
                tracing::debug!(
                    target: TRACING_TARGET,
                    request_id = %request.request_id,
                    attempt = request.attempt,
                    error = %error,
                    elapsed_ms = started_at.elapsed().as_millis(),
                    "Webhook request failed"
                );
                error
            })?;

        let status = http_response.status().as_u16();

        // An unreadable body on a received response is not a transport failure;
        // the status decides the outcome.
        let body = match http_response.text().await {
            Ok(body) => body,
            Err(err) if err.is_timeout() => return Err(transport_error(&err)),
            Err(err) => {
                tracing::debug!(
                    target: TRACING_TARGET,
                    request_id = %request.request_id,
                    error = %err,
                    "Failed to read webhook response body"
                );
                String::new()
            }
        };

        let elapsed = started_at.elapsed();

        tracing::debug!(
            target: TRACING_TARGET,
            request_id = %request.request_id,
            attempt = request.attempt,
            status_code = status,
            elapsed_ms = elapsed.as_millis(),
            "Webhook request completed"
        );

        Ok(TransportResponse::new(status, body, elapsed))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use url::Url;
    use uuid::Uuid;
    use wiremock::matchers::{body_partial_json, header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::transport::TransportErrorKind;

    fn attempt(server: &MockServer, timeout: Duration) -> AttemptRequest {
        attempt_to(&server.uri(), timeout)
    }

    fn attempt_to(base: &str, timeout: Duration) -> AttemptRequest {
        let request_id = Uuid::now_v7();
        AttemptRequest {
            request_id,
            attempt: 1,
            url: Url::parse(&format!("{base}/webhook/run")).unwrap(),
            body: serde_json::to_vec(&json!({"action": "run", "attempt": 1})).unwrap(),
            timeout,
            headers: vec![
                ("Content-Type".into(), "application/json".into()),
                ("X-Client-Id".into(), "communitee-control-hub".into()),
                ("X-Request-Id".into(), request_id.to_string()),
                ("X-Attempt-Number".into(), "1".into()),
            ],
        }
    }

    #[test]
    fn test_transport_creation() {
        let transport = ReqwestTransport::new(ReqwestConfig::default()).unwrap();
        assert!(transport.config().user_agent.is_none());
    }

    #[tokio::test]
    async fn test_sends_json_body_and_headers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/webhook/run"))
            .and(header("content-type", "application/json"))
            .and(header("x-client-id", "communitee-control-hub"))
            .and(header("x-attempt-number", "1"))
            .and(header_exists("x-request-id"))
            .and(header_exists("user-agent"))
            .and(body_partial_json(json!({"action": "run"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"executionId": "exec-1"})))
            .expect(1)
            .mount(&server)
            .await;

        let transport = ReqwestTransport::new(ReqwestConfig::default()).unwrap();
        let response = transport
            .send(&attempt(&server, Duration::from_secs(5)))
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert!(response.is_success());
        assert!(response.body.contains("exec-1"));
    }

    #[tokio::test]
    async fn test_error_statuses_are_returned() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let transport = ReqwestTransport::new(ReqwestConfig::default()).unwrap();
        let response = transport
            .send(&attempt(&server, Duration::from_secs(5)))
            .await
            .unwrap();

        assert_eq!(response.status, 503);
        assert_eq!(response.body, "maintenance");
    }

    #[tokio::test]
    async fn test_slow_endpoint_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let transport = ReqwestTransport::new(ReqwestConfig::default()).unwrap();
        let error = transport
            .send(&attempt(&server, Duration::from_millis(100)))
            .await
            .unwrap_err();

        assert_eq!(error.kind, TransportErrorKind::Timeout);
        assert!(error.is_retryable());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let server_uri = format!("http://127.0.0.1:{port}");
        let request = attempt_to(&server_uri, Duration::from_secs(5));

        let transport = ReqwestTransport::new(ReqwestConfig::default()).unwrap();
        let error = transport.send(&request).await.unwrap_err();

        assert_eq!(error.kind, TransportErrorKind::Connect);
        assert!(error.message.starts_with("network error"));
        assert!(error.is_retryable());
    }
}
