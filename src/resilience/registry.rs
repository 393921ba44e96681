//! # Circuit Breaker Registry
//!
//! Owns at most one breaker per service name and hands out shared handles.
//! The registry is an explicitly constructed value that callers inject where
//! needed; clones share the same underlying map.

use crate::config::{CircuitBreakerSettings, InvestigationCoreConfig};
use crate::resilience::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerStatus, SystemCircuitBreakerMetrics,
};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Registry of circuit breakers keyed by service name
#[derive(Debug, Clone)]
pub struct CircuitBreakerRegistry {
    breakers: Arc<DashMap<String, Arc<CircuitBreaker>>>,

    settings: Arc<CircuitBreakerSettings>,
}

impl CircuitBreakerRegistry {
    pub fn new(settings: CircuitBreakerSettings) -> Self {
        info!(
            max_circuit_breakers = settings.global_settings.max_circuit_breakers,
            component_overrides = settings.component_configs.len(),
            "Initializing circuit breaker registry"
        );

        Self {
            breakers: Arc::new(DashMap::new()),
            settings: Arc::new(settings),
        }
    }

    pub fn from_config(config: &InvestigationCoreConfig) -> Self {
        Self::new(config.circuit_breakers.clone())
    }

    pub fn settings(&self) -> &CircuitBreakerSettings {
        &self.settings
    }

    /// Breaker for `service`, created from the configured overrides or defaults on first use
    pub fn get_or_create(&self, service: &str) -> Arc<CircuitBreaker> {
        if let Some(existing) = self.get(service) {
            return existing;
        }

        let config = self
            .settings
            .config_for_component(service)
            .to_resilience_config();
        self.get_or_create_with(service, config)
    }

    /// Breaker for `service`, created with `config` if none exists yet.
    ///
    /// An existing breaker is never replaced; when two callers race with
    /// different configurations the first registration wins.
    pub fn get_or_create_with(&self, service: &str, config: CircuitBreakerConfig) -> Arc<CircuitBreaker> {
        if let Some(existing) = self.get(service) {
            return existing;
        }

        // len() walks every shard, so it must run before entry() holds one
        let current_count = self.breakers.len();
        let max_allowed = self.settings.global_settings.max_circuit_breakers;
        if current_count >= max_allowed {
            warn!(
                component = service,
                current_count = current_count,
                max_allowed = max_allowed,
                "Maximum circuit breaker count reached, registering anyway"
            );
        }

        self.breakers
            .entry(service.to_string())
            .or_insert_with(|| Arc::new(CircuitBreaker::new(service, config)))
            .value()
            .clone()
    }

    pub fn get(&self, service: &str) -> Option<Arc<CircuitBreaker>> {
        self.breakers
            .get(service)
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Status of every breaker, sorted by service name
    pub fn list_status(&self) -> Vec<CircuitBreakerStatus> {
        let mut statuses: Vec<CircuitBreakerStatus> = self
            .snapshot_breakers()
            .iter()
            .map(|breaker| breaker.status())
            .collect();
        statuses.sort_by(|a, b| a.name.cmp(&b.name));
        statuses
    }

    /// Reset one breaker to Closed. Returns `false` for an unknown service.
    pub fn reset(&self, service: &str) -> bool {
        match self.get(service) {
            Some(breaker) => {
                breaker.reset();
                true
            }
            None => false,
        }
    }

    pub fn system_metrics(&self) -> SystemCircuitBreakerMetrics {
        self.snapshot_breakers()
            .iter()
            .map(|breaker| (breaker.name().to_string(), breaker.metrics()))
            .collect()
    }

    /// Fraction of healthy breakers (0.0 to 1.0)
    pub fn health_score(&self) -> f64 {
        self.system_metrics().health_score()
    }

    pub fn len(&self) -> usize {
        self.breakers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.breakers.is_empty()
    }

    /// Clone the handles out so no shard lock is held while breakers are queried
    fn snapshot_breakers(&self) -> Vec<Arc<CircuitBreaker>> {
        self.breakers
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }
}

impl Default for CircuitBreakerRegistry {
    fn default() -> Self {
        Self::new(CircuitBreakerSettings::default())
    }
}
