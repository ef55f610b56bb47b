//! Reqwest client configuration.

use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

use crate::config::{BULK_TIMEOUT_FACTOR, DEFAULT_TIMEOUT_SECS};

/// Default ceiling for a whole HTTP exchange: the bulk attempt timeout.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = DEFAULT_TIMEOUT_SECS * BULK_TIMEOUT_FACTOR as u64;

/// Default bound for establishing a connection.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Configuration of the HTTP client behind [`ReqwestTransport`].
///
/// Attempts carry their own timeout, applied per request. `http_timeout` only
/// caps requests whose attempt timeout is longer.
///
/// [`ReqwestTransport`]: super::ReqwestTransport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct ReqwestConfig {
    /// Upper bound for a whole HTTP exchange in seconds
    #[cfg_attr(
        feature = "config",
        arg(long = "http-timeout", env = "HTTP_TIMEOUT", default_value_t = DEFAULT_HTTP_TIMEOUT_SECS)
    )]
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout: u64,

    /// Upper bound for establishing a connection in seconds
    #[cfg_attr(
        feature = "config",
        arg(long = "http-connect-timeout", env = "HTTP_CONNECT_TIMEOUT", default_value_t = DEFAULT_CONNECT_TIMEOUT_SECS)
    )]
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout: u64,

    /// User-Agent header sent with every attempt
    #[cfg_attr(
        feature = "config",
        arg(long = "http-user-agent", env = "HTTP_USER_AGENT")
    )]
    #[serde(default)]
    pub user_agent: Option<String>,
}

fn default_http_timeout_secs() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECS
}

fn default_connect_timeout_secs() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

impl Default for ReqwestConfig {
    fn default() -> Self {
        Self {
            http_timeout: DEFAULT_HTTP_TIMEOUT_SECS,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT_SECS,
            user_agent: None,
        }
    }
}

impl ReqwestConfig {
    /// Creates a configuration with the given exchange ceiling in seconds.
    pub fn new(http_timeout: u64) -> Self {
        Self {
            http_timeout,
            ..Self::default()
        }
    }

    /// Exchange ceiling; zero falls back to the default.
    pub fn effective_timeout(&self) -> Duration {
        match self.http_timeout {
            0 => Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            secs => Duration::from_secs(secs),
        }
    }

    /// Connect bound; zero falls back to the default.
    pub fn effective_connect_timeout(&self) -> Duration {
        match self.connect_timeout {
            0 => Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            secs => Duration::from_secs(secs),
        }
    }

    /// User agent to send; blank or missing values use
    /// `communitee-control-hub/<version>`.
    pub fn effective_user_agent(&self) -> String {
        match self.user_agent.as_deref().map(str::trim) {
            Some(agent) if !agent.is_empty() => agent.to_owned(),
            _ => format!("communitee-control-hub/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Set the exchange ceiling in seconds.
    #[must_use]
    pub fn with_timeout(mut self, http_timeout: u64) -> Self {
        self.http_timeout = http_timeout;
        self
    }

    /// Set the connect bound in seconds.
    #[must_use]
    pub fn with_connect_timeout(mut self, connect_timeout: u64) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    /// Set the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }
}
