//! Scripted in-memory transport.
//!
//! [`MockTransport`] replays a fixed sequence of outcomes and records every
//! attempt it receives. Once the script runs out, the last outcome repeats.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use crate::request::AttemptRequest;
use crate::response::TransportResponse;
use crate::transport::{TransportError, WebhookTransport};

/// One scripted reaction to an attempt.
#[derive(Debug, Clone)]
pub enum MockOutcome {
    /// Answer with an HTTP status and body.
    Respond {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },
    /// Fail below the HTTP layer.
    Fail(TransportError),
    /// Never answer; the attempt only ends through its timeout.
    Hang,
}

impl MockOutcome {
    /// Answers with `status` and an empty body.
    pub fn status(status: u16) -> Self {
        Self::text(status, "")
    }

    /// Answers with `status` and a text body.
    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self::Respond {
            status,
            body: body.into(),
        }
    }

    /// Answers with `status` and a JSON body.
    pub fn json(status: u16, body: serde_json::Value) -> Self {
        Self::text(status, body.to_string())
    }
}

#[derive(Debug, Default)]
struct MockState {
    script: VecDeque<MockOutcome>,
    last: Option<MockOutcome>,
    requests: Vec<AttemptRequest>,
}

/// Transport that replays scripted outcomes.
#[derive(Debug, Default)]
pub struct MockTransport {
    state: Mutex<MockState>,
}

impl MockTransport {
    /// Creates a transport replaying `outcomes` in order.
    pub fn new(outcomes: impl IntoIterator<Item = MockOutcome>) -> Self {
        let state = MockState {
            script: outcomes.into_iter().collect(),
            ..Default::default()
        };

        Self {
            state: Mutex::new(state),
        }
    }

    /// Number of attempts received.
    pub fn calls(&self) -> usize {
        self.lock().requests.len()
    }

    /// Every attempt received, in order.
    pub fn requests(&self) -> Vec<AttemptRequest> {
        self.lock().requests.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn next_outcome(&self, request: &AttemptRequest) -> Option<MockOutcome> {
        let mut state = self.lock();
        state.requests.push(request.clone());

        match state.script.pop_front() {
            Some(outcome) => {
                state.last = Some(outcome.clone());
                Some(outcome)
            }
            None => state.last.clone(),
        }
    }
}

#[async_trait::async_trait]
impl WebhookTransport for MockTransport {
    async fn send(&self, request: &AttemptRequest) -> Result<TransportResponse, TransportError> {
        match self.next_outcome(request) {
            Some(MockOutcome::Respond { status, body }) => {
                Ok(TransportResponse::new(status, body, Duration::ZERO))
            }
            Some(MockOutcome::Fail(error)) => Err(error),
            Some(MockOutcome::Hang) => std::future::pending().await,
            None => Ok(TransportResponse::new(200, "", Duration::ZERO)),
        }
    }
}
