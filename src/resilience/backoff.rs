//! Capped exponential backoff for redelivered events.

use crate::config::BackoffConfig;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    initial_delay: Duration,
    max_delay: Duration,
    multiplier: f64,
}

impl BackoffPolicy {
    pub fn new(initial_delay: Duration, max_delay: Duration, multiplier: f64) -> Self {
        Self {
            initial_delay,
            max_delay,
            multiplier: multiplier.max(1.0),
        }
    }

    pub fn from_config(config: &BackoffConfig) -> Self {
        Self::new(
            Duration::from_millis(config.initial_delay_ms),
            Duration::from_millis(config.max_delay_ms),
            config.multiplier,
        )
    }

    /// Delay before the given attempt is retried. Attempt 1 is the first retry.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let exponent = attempt.saturating_sub(1).min(63) as i32;
        let scaled = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);
        if !scaled.is_finite() || scaled >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::from_secs_f64(scaled)
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::from_config(&BackoffConfig::default())
    }
}
