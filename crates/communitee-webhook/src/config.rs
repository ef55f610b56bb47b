//! Dispatch configuration.

use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::policy::{
    DEFAULT_BASE_DELAY, DEFAULT_JITTER_RATIO, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_DELAY,
    MAX_JITTER_RATIO, RetryPolicy,
};

/// Default client identifier sent with every request.
pub const DEFAULT_CLIENT_ID: &str = "communitee-control-hub";

/// Default per-attempt timeout for a single dispatch: 30 seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Largest accepted per-attempt timeout: one hour.
pub const MAX_TIMEOUT_SECS: u64 = 3600;

/// Bulk dispatches use this multiple of the single-dispatch timeout.
pub const BULK_TIMEOUT_FACTOR: u32 = 2;

/// Configuration for the webhook dispatcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct DispatchConfig {
    /// Client identifier sent as payload `source` and in request headers
    #[cfg_attr(
        feature = "config",
        arg(long = "client-id", env = "CLIENT_ID", default_value = DEFAULT_CLIENT_ID)
    )]
    #[serde(default = "default_client_id")]
    pub client_id: String,

    /// Per-attempt timeout in seconds
    #[cfg_attr(
        feature = "config",
        arg(long = "dispatch-timeout", env = "DISPATCH_TIMEOUT", default_value_t = DEFAULT_TIMEOUT_SECS)
    )]
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum number of attempts per dispatch
    #[cfg_attr(
        feature = "config",
        arg(long = "max-attempts", env = "DISPATCH_MAX_ATTEMPTS", default_value_t = DEFAULT_MAX_ATTEMPTS)
    )]
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the second attempt in milliseconds
    #[cfg_attr(
        feature = "config",
        arg(long = "base-delay-ms", env = "DISPATCH_BASE_DELAY_MS", default_value_t = default_base_delay_ms())
    )]
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Upper bound of the backoff delay in milliseconds
    #[cfg_attr(
        feature = "config",
        arg(long = "max-delay-ms", env = "DISPATCH_MAX_DELAY_MS", default_value_t = default_max_delay_ms())
    )]
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Share of the backoff delay added as random jitter (at most 0.1)
    #[cfg_attr(
        feature = "config",
        arg(long = "jitter-ratio", env = "DISPATCH_JITTER_RATIO", default_value_t = DEFAULT_JITTER_RATIO)
    )]
    #[serde(default = "default_jitter_ratio")]
    pub jitter_ratio: f64,
}

fn default_client_id() -> String {
    DEFAULT_CLIENT_ID.to_owned()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_base_delay_ms() -> u64 {
    DEFAULT_BASE_DELAY.as_millis() as u64
}

fn default_max_delay_ms() -> u64 {
    DEFAULT_MAX_DELAY.as_millis() as u64
}

fn default_jitter_ratio() -> f64 {
    DEFAULT_JITTER_RATIO
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            client_id: default_client_id(),
            timeout_secs: default_timeout_secs(),
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter_ratio: default_jitter_ratio(),
        }
    }
}

impl DispatchConfig {
    /// Returns the per-attempt timeout, using the default if zero.
    pub fn effective_timeout(&self) -> Duration {
        if self.timeout_secs == 0 {
            Duration::from_secs(DEFAULT_TIMEOUT_SECS)
        } else {
            Duration::from_secs(self.timeout_secs)
        }
    }

    /// Returns the per-attempt timeout used by bulk dispatches.
    pub fn bulk_timeout(&self) -> Duration {
        self.effective_timeout().saturating_mul(BULK_TIMEOUT_FACTOR)
    }

    /// Returns the client identifier, using the default if empty.
    pub fn effective_client_id(&self) -> &str {
        let client_id = self.client_id.trim();
        if client_id.is_empty() {
            DEFAULT_CLIENT_ID
        } else {
            client_id
        }
    }

    /// Builds the retry policy described by this configuration.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.base_delay_ms),
            Duration::from_millis(self.max_delay_ms),
        )
        .with_jitter_ratio(self.jitter_ratio)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs > MAX_TIMEOUT_SECS {
            return Err(Error::configuration().with_message(format!(
                "timeout ({}s) cannot exceed {MAX_TIMEOUT_SECS}s",
                self.timeout_secs
            )));
        }
        if self.max_attempts == 0 {
            return Err(Error::configuration().with_message("max_attempts must be at least 1"));
        }
        if self.base_delay_ms > self.max_delay_ms {
            return Err(Error::configuration().with_message(format!(
                "base delay ({}ms) cannot exceed max delay ({}ms)",
                self.base_delay_ms, self.max_delay_ms
            )));
        }
        if !(0.0..=MAX_JITTER_RATIO).contains(&self.jitter_ratio) {
            return Err(Error::configuration().with_message(format!(
                "jitter ratio {} must be within 0..={MAX_JITTER_RATIO}",
                self.jitter_ratio
            )));
        }
        Ok(())
    }

    /// Set the client identifier.
    #[must_use]
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    /// Set the per-attempt timeout in seconds.
    #[must_use]
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Set the maximum number of attempts.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the base and maximum backoff delays in milliseconds.
    #[must_use]
    pub fn with_delays(mut self, base_delay_ms: u64, max_delay_ms: u64) -> Self {
        self.base_delay_ms = base_delay_ms;
        self.max_delay_ms = max_delay_ms;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DispatchConfig::default();
        assert_eq!(config.effective_client_id(), "communitee-control-hub");
        assert_eq!(config.effective_timeout(), Duration::from_secs(30));
        assert_eq!(config.bulk_timeout(), Duration::from_secs(60));
        assert_eq!(config.retry_policy(), RetryPolicy::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_effective_values_fall_back() {
        let config = DispatchConfig::default().with_timeout(0).with_client_id("  ");
        assert_eq!(config.effective_timeout(), Duration::from_secs(30));
        assert_eq!(config.effective_client_id(), DEFAULT_CLIENT_ID);
    }

    #[test]
    fn test_validation() {
        assert!(DispatchConfig::default().with_max_attempts(0).validate().is_err());
        assert!(DispatchConfig::default().with_delays(5000, 100).validate().is_err());

        let config = DispatchConfig {
            jitter_ratio: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_jitter_ratio_above_default_is_rejected() {
        let config = DispatchConfig {
            jitter_ratio: 0.2,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = DispatchConfig {
            jitter_ratio: 0.05,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_huge_timeout_is_rejected_and_bulk_timeout_saturates() {
        let config = DispatchConfig::default().with_timeout(u64::MAX);
        assert!(config.validate().is_err());
        assert_eq!(config.bulk_timeout(), Duration::MAX);

        let config = DispatchConfig::default().with_timeout(MAX_TIMEOUT_SECS);
        assert!(config.validate().is_ok());
        assert_eq!(config.bulk_timeout(), Duration::from_secs(2 * MAX_TIMEOUT_SECS));
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: DispatchConfig = serde_json::from_str(r#"{"max_attempts": 5}"#).unwrap();
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(config.client_id, DEFAULT_CLIENT_ID);
    }
}
