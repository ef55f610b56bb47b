//! Reqwest-based HTTP transport for webhook dispatch.
//!
//! This module provides a reqwest-based implementation of the [`WebhookTransport`] trait.
//!
//! # Example
//!
//! ```rust,ignore
//! use communitee_webhook::reqwest::{ReqwestConfig, ReqwestTransport};
//! use communitee_webhook::{DispatchConfig, WebhookDispatcher};
//!
//! // Create a transport with default configuration
//! let transport = ReqwestTransport::new(ReqwestConfig::default())?;
//!
//! // Wrap it in a dispatcher to get retries
//! let dispatcher = WebhookDispatcher::new(transport, DispatchConfig::default());
//! ```
//!
//! [`WebhookTransport`]: crate::WebhookTransport

mod client;
mod config;
mod error;

pub use client::ReqwestTransport;
pub use config::ReqwestConfig;
pub use error::transport_error;

/// Tracing target for reqwest transport operations.
pub const TRACING_TARGET: &str = "communitee_webhook::reqwest";
