//! # Investigation Core Configuration
//!
//! Typed configuration for the resilience layer and the orchestrator, loaded
//! from layered TOML files plus environment variables.
//!
//! ## Layering
//!
//! 1. `<config_dir>/base.toml` (required)
//! 2. `<config_dir>/<environment>.toml` (optional)
//! 3. `INVESTIGATION__<SECTION>__<KEY>` environment variables
//!
//! Every field has a default, so each layer only needs the keys it changes.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use investigation_core::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let retry = manager.config().retry.to_retry_policy();
//! let tribunal = manager.config().circuit_breakers.config_for_component("tribunal");
//! # let _ = (retry, tribunal);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use crate::constants::system;
use crate::resilience::{BackoffPolicy, FailureKind, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct InvestigationCoreConfig {
    pub circuit_breakers: CircuitBreakerSettings,
    pub retry: RetrySettings,
    pub aggregation: AggregationConfig,
    pub orchestration: OrchestrationConfig,
    pub logging: LoggingConfig,
}

/// Circuit breaker configuration with per-service overrides
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerSettings {
    pub global_settings: CircuitBreakerGlobalSettings,

    /// Configuration for services without an override
    pub default_config: CircuitBreakerComponentConfig,

    /// Overrides keyed by service name
    pub component_configs: HashMap<String, CircuitBreakerComponentConfig>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerGlobalSettings {
    /// Registry size above which new registrations are logged as a warning
    pub max_circuit_breakers: usize,
}

/// Circuit breaker configuration for one service
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerComponentConfig {
    pub failure_threshold: u32,

    /// Time to wait in open state before probing (seconds, fractions allowed)
    pub recovery_timeout_seconds: f64,

    pub half_open_max_calls: u32,

    pub success_threshold: u32,
}

impl CircuitBreakerSettings {
    /// Get configuration for a specific service
    pub fn config_for_component(&self, component_name: &str) -> CircuitBreakerComponentConfig {
        self.component_configs
            .get(component_name)
            .cloned()
            .unwrap_or_else(|| self.default_config.clone())
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.global_settings.max_circuit_breakers == 0 {
            return Err(ConfigurationError::invalid_value(
                "circuit_breakers.global_settings.max_circuit_breakers",
                "0",
                "must be greater than 0",
            ));
        }

        self.default_config
            .validate("circuit_breakers.default_config")?;

        let mut names: Vec<&String> = self.component_configs.keys().collect();
        names.sort();
        for name in names {
            if let Some(component) = self.component_configs.get(name) {
                component.validate(&format!("circuit_breakers.component_configs.{name}"))?;
            }
        }

        Ok(())
    }
}

impl CircuitBreakerComponentConfig {
    /// Convert to the resilience module's runtime format
    pub fn to_resilience_config(&self) -> crate::resilience::CircuitBreakerConfig {
        crate::resilience::CircuitBreakerConfig {
            failure_threshold: self.failure_threshold,
            recovery_timeout: Duration::try_from_secs_f64(self.recovery_timeout_seconds)
                .unwrap_or(Duration::from_secs(system::DEFAULT_RECOVERY_TIMEOUT_SECS)),
            half_open_max_calls: self.half_open_max_calls,
            success_threshold: self.success_threshold,
        }
    }

    fn validate(&self, field_prefix: &str) -> Result<(), ConfigurationError> {
        if !self.recovery_timeout_seconds.is_finite() || self.recovery_timeout_seconds <= 0.0 {
            return Err(ConfigurationError::invalid_value(
                format!("{field_prefix}.recovery_timeout_seconds"),
                self.recovery_timeout_seconds.to_string(),
                "must be a positive, finite number of seconds",
            ));
        }

        self.to_resilience_config()
            .validate()
            .map_err(|reason| ConfigurationError::invalid_value(field_prefix, "component config", reason))
    }
}

impl Default for CircuitBreakerGlobalSettings {
    fn default() -> Self {
        Self {
            max_circuit_breakers: system::DEFAULT_MAX_CIRCUIT_BREAKERS,
        }
    }
}

impl Default for CircuitBreakerComponentConfig {
    fn default() -> Self {
        Self {
            failure_threshold: system::DEFAULT_FAILURE_THRESHOLD,
            recovery_timeout_seconds: system::DEFAULT_RECOVERY_TIMEOUT_SECS as f64,
            half_open_max_calls: system::DEFAULT_HALF_OPEN_MAX_CALLS,
            success_threshold: system::DEFAULT_SUCCESS_THRESHOLD,
        }
    }
}

/// Retry and backoff configuration shared by every guarded call
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub exponential_base: f64,
    pub jitter: bool,
    pub retryable_kinds: Vec<FailureKind>,
    /// Status codes on successful responses that are retried (429, 503, ...)
    pub retryable_status_codes: Vec<u16>,
}

impl RetrySettings {
    pub fn backoff_policy(&self) -> BackoffPolicy {
        BackoffPolicy::new(
            Duration::from_millis(self.base_delay_ms),
            Duration::from_millis(self.max_delay_ms),
            self.exponential_base,
            self.jitter,
        )
    }

    pub fn to_retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, self.backoff_policy())
            .with_retryable_kinds(self.retryable_kinds.iter().copied())
            .with_retryable_status_codes(self.retryable_status_codes.iter().copied())
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !self.exponential_base.is_finite() || self.exponential_base < 1.0 {
            return Err(ConfigurationError::invalid_value(
                "retry.exponential_base",
                self.exponential_base.to_string(),
                "must be a finite number >= 1.0",
            ));
        }

        if self.base_delay_ms > self.max_delay_ms {
            return Err(ConfigurationError::invalid_value(
                "retry.base_delay_ms",
                self.base_delay_ms.to_string(),
                format!("must not exceed retry.max_delay_ms ({})", self.max_delay_ms),
            ));
        }

        if self.retryable_kinds.contains(&FailureKind::CircuitOpen) {
            return Err(ConfigurationError::invalid_value(
                "retry.retryable_kinds",
                FailureKind::CircuitOpen.to_string(),
                "circuit breaker rejections are never retryable",
            ));
        }

        if let Some(code) = self
            .retryable_status_codes
            .iter()
            .find(|code| !(100..=599).contains(*code))
        {
            return Err(ConfigurationError::invalid_value(
                "retry.retryable_status_codes",
                code.to_string(),
                "must be a valid HTTP status code",
            ));
        }

        Ok(())
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: system::DEFAULT_MAX_RETRIES,
            base_delay_ms: system::DEFAULT_BASE_DELAY_MS,
            max_delay_ms: system::DEFAULT_MAX_DELAY_MS,
            exponential_base: system::DEFAULT_EXPONENTIAL_BASE,
            jitter: true,
            retryable_kinds: FailureKind::default_retryable(),
            retryable_status_codes: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AggregationConfig {
    /// Numeric payload field averaged across successful sources
    pub score_field: String,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            score_field: system::DEFAULT_SCORE_FIELD.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct OrchestrationConfig {
    /// Call the completion notifier after a Completed transition
    pub notify_on_completion: bool,

    /// Hand every source outcome to the audit sink
    pub audit_source_outcomes: bool,
}

impl Default for OrchestrationConfig {
    fn default() -> Self {
        Self {
            notify_on_completion: true,
            audit_source_outcomes: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,

    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl InvestigationCoreConfig {
    /// Validate configuration for consistency and required fields
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.circuit_breakers.validate()?;
        self.retry.validate()?;

        if self.aggregation.score_field.trim().is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "aggregation.score_field",
                "aggregation configuration",
            ));
        }

        if self.logging.level.trim().is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "logging.level",
                "logging configuration",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = InvestigationCoreConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.retry.retryable_kinds, FailureKind::default_retryable());
    }

    #[test]
    fn test_component_override_lookup() {
        let mut settings = CircuitBreakerSettings::default();
        settings.component_configs.insert(
            "tribunal".to_string(),
            CircuitBreakerComponentConfig {
                failure_threshold: 2,
                recovery_timeout_seconds: 0.5,
                half_open_max_calls: 2,
                success_threshold: 2,
            },
        );

        let tribunal = settings.config_for_component("tribunal").to_resilience_config();
        assert_eq!(tribunal.failure_threshold, 2);
        assert_eq!(tribunal.recovery_timeout, Duration::from_millis(500));
        assert_eq!(tribunal.half_open_max_calls, 2);

        let other = settings.config_for_component("credit_bureau");
        assert_eq!(other, settings.default_config);
    }

    #[test]
    fn test_rejects_circuit_open_as_retryable() {
        let mut config = InvestigationCoreConfig::default();
        config.retry.retryable_kinds.push(FailureKind::CircuitOpen);

        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidValue { ref field, .. } if field == "retry.retryable_kinds"));
    }

    #[test]
    fn test_rejects_inverted_delays_and_small_base() {
        let mut config = InvestigationCoreConfig::default();
        config.retry.base_delay_ms = 10_000;
        config.retry.max_delay_ms = 1_000;
        assert!(config.validate().is_err());

        let mut config = InvestigationCoreConfig::default();
        config.retry.exponential_base = 0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_unreachable_half_open_close() {
        let mut config = InvestigationCoreConfig::default();
        config.circuit_breakers.default_config.success_threshold = 3;
        config.circuit_breakers.default_config.half_open_max_calls = 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_non_positive_recovery_timeout() {
        let mut config = InvestigationCoreConfig::default();
        config.circuit_breakers.component_configs.insert(
            "land_registry".to_string(),
            CircuitBreakerComponentConfig {
                recovery_timeout_seconds: 0.0,
                ..CircuitBreakerComponentConfig::default()
            },
        );

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("land_registry"));
    }

    #[test]
    fn test_retry_policy_conversion() {
        let settings = RetrySettings {
            max_retries: 2,
            base_delay_ms: 10,
            max_delay_ms: 100,
            exponential_base: 3.0,
            jitter: false,
            retryable_kinds: vec![FailureKind::Timeout],
            retryable_status_codes: vec![429],
        };

        let policy = settings.to_retry_policy();
        assert_eq!(policy.max_attempts(), 3);
        assert!(policy.is_retryable(FailureKind::Timeout));
        assert!(!policy.is_retryable(FailureKind::Connection));
        assert!(policy.is_retryable_status(429));
        assert_eq!(policy.backoff.delay_for_attempt(1), Duration::from_millis(30));
    }
}
