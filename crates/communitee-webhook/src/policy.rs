//! Retry policy and failure classification.

use std::time::Duration;

/// Default number of attempts per dispatch.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// Default delay before the second attempt.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);
/// Default upper bound of the exponential delay, before jitter.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_millis(10_000);
/// Default share of the delay added as random jitter.
pub const DEFAULT_JITTER_RATIO: f64 = 0.1;
/// Largest accepted jitter ratio; delays stay within `1.1 × base`.
pub const MAX_JITTER_RATIO: f64 = DEFAULT_JITTER_RATIO;

/// Exponential backoff with additive, one-sided jitter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
    jitter_ratio: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            jitter_ratio: DEFAULT_JITTER_RATIO,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with the default jitter ratio.
    ///
    /// `max_attempts` is clamped to at least one.
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
            jitter_ratio: DEFAULT_JITTER_RATIO,
        }
    }

    /// Sets the jitter ratio, clamped to `0.0..=MAX_JITTER_RATIO`.
    #[must_use]
    pub fn with_jitter_ratio(mut self, ratio: f64) -> Self {
        self.jitter_ratio = if ratio.is_finite() {
            ratio.clamp(0.0, MAX_JITTER_RATIO)
        } else {
            0.0
        };
        self
    }

    /// Maximum number of attempts per dispatch.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before the second attempt.
    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Upper bound of the delay before jitter.
    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Share of the delay added as jitter.
    pub fn jitter_ratio(&self) -> f64 {
        self.jitter_ratio
    }

    /// Whether another attempt should follow a failed `attempt`.
    pub fn should_retry(&self, attempt: u32, retryable: bool) -> bool {
        retryable && attempt < self.max_attempts
    }

    /// `min(base * 2^(attempt - 1), max)` for the wait after `attempt`.
    pub fn base_backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }

    /// Backoff after `attempt` with jitter drawn from `sample` in `[0, 1)`.
    pub fn backoff_with_sample(&self, attempt: u32, sample: f64) -> Duration {
        let delay = self.base_backoff(attempt);
        let sample = if sample.is_finite() {
            sample.clamp(0.0, 1.0)
        } else {
            0.0
        };
        delay + delay.mul_f64(self.jitter_ratio * sample)
    }

    /// Backoff after `attempt` with random jitter.
    pub fn next_backoff(&self, attempt: u32) -> Duration {
        self.backoff_with_sample(attempt, rand::random::<f64>())
    }
}

/// Whether a non-2xx HTTP status may succeed if repeated.
pub fn is_retryable_status(status: u16) -> bool {
    status >= 500 || status == 408 || status == 429
}
