#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod config;
mod dispatcher;
mod error;
mod policy;
mod request;
mod response;
mod target;
mod transport;

#[cfg(any(test, feature = "mock"))]
#[cfg_attr(docsrs, doc(cfg(feature = "mock")))]
pub mod mock;

#[cfg(feature = "reqwest")]
#[cfg_attr(docsrs, doc(cfg(feature = "reqwest")))]
pub mod reqwest;

pub use config::{
    BULK_TIMEOUT_FACTOR, DEFAULT_CLIENT_ID, DEFAULT_TIMEOUT_SECS, DispatchConfig, MAX_TIMEOUT_SECS,
};
pub use dispatcher::{TRACING_TARGET, WebhookDispatcher};
pub use error::{BoxedError, Error, ErrorContext, ErrorKind, Result};
pub use policy::{
    DEFAULT_BASE_DELAY, DEFAULT_JITTER_RATIO, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_DELAY,
    MAX_JITTER_RATIO, RetryPolicy, is_retryable_status,
};
pub use request::{
    AttemptRequest, HEADER_ATTEMPT, HEADER_CLIENT_ID, HEADER_REQUEST_ID, WebhookAction,
    WebhookPayload,
};
pub use response::{DispatchResult, ResponseBody, TransportResponse, correlation_id};
pub use target::{WebhookTarget, sanitize_url};
pub use transport::{TransportError, TransportErrorKind, WebhookTransport};
