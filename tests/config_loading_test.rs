//! Loading of the shipped configuration files

use investigation_core::config::{ConfigManager, ConfigurationError};
use investigation_core::resilience::{CircuitBreakerRegistry, FailureKind, ResilienceContext};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

fn shipped_config_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config")
}

#[test]
fn test_shipped_base_configuration_is_valid() {
    let manager = ConfigManager::load_from_directory_with_env(Some(shipped_config_dir()), "development")
        .expect("shipped configuration loads");
    let config = manager.config();

    assert_eq!(manager.environment(), "development");
    assert_eq!(config.retry.max_retries, 3);
    assert_eq!(config.retry.retryable_status_codes, vec![429, 502, 503, 504]);
    assert_eq!(
        config.retry.retryable_kinds,
        vec![FailureKind::Connection, FailureKind::Timeout, FailureKind::Io]
    );
    assert!(!config.logging.json);

    let tribunal = config.circuit_breakers.config_for_component("tribunal");
    assert_eq!(tribunal.failure_threshold, 3);
    let unknown = config.circuit_breakers.config_for_component("unlisted_agency");
    assert_eq!(unknown, config.circuit_breakers.default_config);
}

#[test]
fn test_test_environment_shortens_timeouts() {
    let manager = ConfigManager::load_from_directory_with_env(Some(shipped_config_dir()), "test")
        .expect("test configuration loads");
    let config = manager.config();

    assert_eq!(config.retry.max_retries, 2);
    assert_eq!(config.retry.base_delay_ms, 1);
    assert!(!config.retry.jitter);
    // Keys absent from test.toml keep their base values
    assert_eq!(config.retry.retryable_status_codes, vec![429, 502, 503, 504]);

    let registry = CircuitBreakerRegistry::from_config(config);
    let breaker = registry.get_or_create("credit_bureau");
    assert_eq!(breaker.config().recovery_timeout, Duration::from_millis(100));
    assert_eq!(breaker.config().half_open_max_calls, 2);
}

#[test]
fn test_production_environment_enables_json_logging() {
    let manager = ConfigManager::load_from_directory_with_env(Some(shipped_config_dir()), "production")
        .expect("production configuration loads");
    let config = manager.config();

    assert!(config.logging.json);
    assert_eq!(config.retry.max_retries, 4);
    assert_eq!(config.retry.max_delay_ms, 60_000);
    assert_eq!(config.circuit_breakers.global_settings.max_circuit_breakers, 500);

    let resilience = ResilienceContext::from_config(config);
    assert_eq!(resilience.retry_policy().max_attempts(), 5);
}

#[test]
fn test_environment_variables_override_files() {
    std::env::set_var("INVESTIGATION__ORCHESTRATION__AUDIT_SOURCE_OUTCOMES", "false");
    let manager = ConfigManager::load_from_directory_with_env(Some(shipped_config_dir()), "development");
    std::env::remove_var("INVESTIGATION__ORCHESTRATION__AUDIT_SOURCE_OUTCOMES");

    let manager = manager.expect("configuration loads");
    assert!(!manager.config().orchestration.audit_source_outcomes);
    assert!(manager.config().orchestration.notify_on_completion);
}

#[test]
fn test_half_open_budget_below_success_threshold_is_rejected() {
    let dir = TempDir::new().expect("temp dir");
    fs::write(
        dir.path().join("base.toml"),
        r#"
[circuit_breakers.default_config]
failure_threshold = 5
recovery_timeout_seconds = 10
half_open_max_calls = 1
success_threshold = 3
"#,
    )
    .expect("write base.toml");

    let err = ConfigManager::load_from_directory_with_env(Some(dir.path().to_path_buf()), "test")
        .unwrap_err();
    assert!(matches!(err, ConfigurationError::InvalidValue { .. }));
}

#[test]
fn test_circuit_open_cannot_be_configured_retryable() {
    let dir = TempDir::new().expect("temp dir");
    fs::write(
        dir.path().join("base.toml"),
        r#"
[retry]
retryable_kinds = ["connection", "circuit_open"]
"#,
    )
    .expect("write base.toml");

    let err = ConfigManager::load_from_directory_with_env(Some(dir.path().to_path_buf()), "test")
        .unwrap_err();
    assert!(matches!(err, ConfigurationError::InvalidValue { .. }));
}
