//! Point-in-time views of breaker activity.
//!
//! The live counters are atomics inside each
//! [`CircuitBreaker`](crate::resilience::CircuitBreaker); these types are
//! the plain snapshots handed out for introspection.

use crate::constants::system::{HEALTH_MAX_FAILURE_RATE, HEALTH_MIN_CALLS};
use crate::resilience::CircuitState;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Snapshot of one breaker
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CircuitBreakerMetrics {
    pub current_state: CircuitState,
    /// Calls admitted and executed since creation
    pub total_calls: u64,
    pub success_count: u64,
    pub failure_count: u64,
    /// Calls turned away without executing
    pub rejected_count: u64,
    pub consecutive_failures: u64,
    /// Probes admitted in the current half-open episode
    pub half_open_calls: u64,
    pub total_duration: Duration,
    pub average_duration: Duration,
    pub failure_rate: f64,
    pub success_rate: f64,
}

impl CircuitBreakerMetrics {
    /// Closed, and either too new to judge or failing less than the health threshold.
    ///
    /// Open and half-open breakers are never healthy.
    pub fn is_healthy(&self) -> bool {
        self.current_state == CircuitState::Closed
            && (self.total_calls < HEALTH_MIN_CALLS || self.failure_rate < HEALTH_MAX_FAILURE_RATE)
    }
}

/// Snapshot of every breaker in a registry, keyed by service name
#[derive(Debug, Clone, Serialize)]
pub struct SystemCircuitBreakerMetrics {
    pub breakers: BTreeMap<String, CircuitBreakerMetrics>,
    pub collected_at: DateTime<Utc>,
}

impl SystemCircuitBreakerMetrics {
    /// Share of healthy breakers in `[0.0, 1.0]`; 1.0 when there are none
    pub fn health_score(&self) -> f64 {
        if self.breakers.is_empty() {
            return 1.0;
        }
        let healthy = self.breakers.values().filter(|m| m.is_healthy()).count();
        healthy as f64 / self.breakers.len() as f64
    }
}

impl FromIterator<(String, CircuitBreakerMetrics)> for SystemCircuitBreakerMetrics {
    fn from_iter<I: IntoIterator<Item = (String, CircuitBreakerMetrics)>>(iter: I) -> Self {
        Self {
            breakers: iter.into_iter().collect(),
            collected_at: Utc::now(),
        }
    }
}
