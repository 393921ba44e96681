//! # Backoff Policy
//!
//! Exponential backoff with optional jitter for repeated attempts of one
//! operation. Pure computation, no I/O.
//!
//! ```text
//! delay(i) = min(base * exponential_base^i, max)
//! jitter:    delay(i) * U[0.5, 1.0)
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Parameters of an exponential backoff sequence
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BackoffPolicy {
    /// Delay before the first retry
    pub base_delay: Duration,

    /// Upper bound for any computed delay
    pub max_delay: Duration,

    /// Multiplier applied per attempt
    pub exponential_base: f64,

    /// Scale each delay by a random factor in [0.5, 1.0)
    pub jitter: bool,
}

impl BackoffPolicy {
    pub fn new(base_delay: Duration, max_delay: Duration, exponential_base: f64, jitter: bool) -> Self {
        Self {
            base_delay,
            max_delay,
            exponential_base,
            jitter,
        }
    }

    /// Same policy with jitter disabled
    pub fn deterministic(self) -> Self {
        Self {
            jitter: false,
            ..self
        }
    }

    /// Delay to wait after the attempt with 0-based index `attempt`
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        calculate_backoff(
            attempt,
            self.base_delay,
            self.max_delay,
            self.exponential_base,
            self.jitter,
        )
    }

    /// Capped exponential value before jitter is applied
    pub fn undithered_delay(&self, attempt: u32) -> Duration {
        capped_exponential(attempt, self.base_delay, self.max_delay, self.exponential_base)
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(crate::constants::system::DEFAULT_BASE_DELAY_MS),
            max_delay: Duration::from_millis(crate::constants::system::DEFAULT_MAX_DELAY_MS),
            exponential_base: crate::constants::system::DEFAULT_EXPONENTIAL_BASE,
            jitter: true,
        }
    }
}

/// Calculate the backoff delay for a 0-based attempt index
pub fn calculate_backoff(
    attempt: u32,
    base_delay: Duration,
    max_delay: Duration,
    exponential_base: f64,
    jitter: bool,
) -> Duration {
    let delay = capped_exponential(attempt, base_delay, max_delay, exponential_base);

    if jitter {
        // fastrand::f64() is in [0.0, 1.0)
        let factor = 0.5 + fastrand::f64() * 0.5;
        let jittered = delay.mul_f64(factor);
        // nanosecond rounding must not push the upper bound back to `delay`
        if jittered >= delay {
            delay.saturating_sub(Duration::from_nanos(1))
        } else {
            jittered
        }
    } else {
        delay
    }
}

fn capped_exponential(
    attempt: u32,
    base_delay: Duration,
    max_delay: Duration,
    exponential_base: f64,
) -> Duration {
    let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
    let nanos = base_delay.as_nanos() as f64 * exponential_base.powi(exponent);

    if !nanos.is_finite() || nanos >= max_delay.as_nanos() as f64 {
        return max_delay;
    }

    Duration::from_nanos(nanos.max(0.0).round() as u64).min(max_delay)
}
