//! # Circuit Breaker Configuration
//!
//! Runtime configuration for a single breaker. System-wide settings with
//! per-service overrides live in `crate::config::CircuitBreakerSettings`,
//! which converts into this type.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a single circuit breaker
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Number of consecutive failures before opening circuit
    pub failure_threshold: u32,

    /// Time to wait in open state before admitting probe calls
    pub recovery_timeout: Duration,

    /// Probe calls admitted during one half-open episode
    pub half_open_max_calls: u32,

    /// Successful probes required to close the circuit
    pub success_threshold: u32,
}

impl CircuitBreakerConfig {
    pub fn new(failure_threshold: u32, recovery_timeout: Duration) -> Self {
        Self {
            failure_threshold,
            recovery_timeout,
            ..Self::default()
        }
    }

    /// Slow third-party sources such as tribunals and registries
    pub fn for_external_source() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(60),
            half_open_max_calls: 1,
            success_threshold: 1,
        }
    }

    /// Sources behind aggressive rate limits, probed with a few calls at once
    pub fn for_rate_limited_source() -> Self {
        Self {
            failure_threshold: 3,
            recovery_timeout: Duration::from_secs(120),
            half_open_max_calls: 2,
            success_threshold: 2,
        }
    }

    pub fn with_half_open(mut self, max_calls: u32, success_threshold: u32) -> Self {
        self.half_open_max_calls = max_calls;
        self.success_threshold = success_threshold;
        self
    }

    /// Copy with every threshold at least 1 and `success_threshold` capped at
    /// `half_open_max_calls`, so a half-open episode can always close
    pub fn normalized(self) -> Self {
        let half_open_max_calls = self.half_open_max_calls.max(1);
        Self {
            failure_threshold: self.failure_threshold.max(1),
            recovery_timeout: self.recovery_timeout,
            half_open_max_calls,
            success_threshold: self.success_threshold.clamp(1, half_open_max_calls),
        }
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), String> {
        if self.failure_threshold == 0 {
            return Err("failure_threshold must be greater than 0".to_string());
        }

        if self.recovery_timeout.is_zero() {
            return Err("recovery_timeout must be greater than 0".to_string());
        }

        if self.half_open_max_calls == 0 {
            return Err("half_open_max_calls must be greater than 0".to_string());
        }

        if self.success_threshold == 0 {
            return Err("success_threshold must be greater than 0".to_string());
        }

        if self.success_threshold > self.half_open_max_calls {
            return Err(format!(
                "success_threshold ({}) must not exceed half_open_max_calls ({})",
                self.success_threshold, self.half_open_max_calls
            ));
        }

        Ok(())
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        use crate::constants::system;

        Self {
            failure_threshold: system::DEFAULT_FAILURE_THRESHOLD,
            recovery_timeout: Duration::from_secs(system::DEFAULT_RECOVERY_TIMEOUT_SECS),
            half_open_max_calls: system::DEFAULT_HALF_OPEN_MAX_CALLS,
            success_threshold: system::DEFAULT_SUCCESS_THRESHOLD,
        }
    }
}
