//! # Structured Logging Module
//!
//! Environment-aware structured logging. Human readable output during
//! development and tests, JSON lines in production. `RUST_LOG` always wins
//! over the environment's default level.

use crate::config::LoggingConfig;
use chrono::Utc;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging from environment variables
pub fn init_structured_logging() {
    let environment = get_environment();
    let settings = LoggingConfig {
        level: get_log_level(&environment).to_string(),
        json: environment == "production",
    };
    init_with_config(&settings, &environment);
}

/// Initialize structured logging from loaded configuration. Only the first
/// call in a process has any effect.
pub fn init_with_config(settings: &LoggingConfig, environment: &str) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(settings.level.clone()));

        let layer = if settings.json {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_ansi(false)
                .json()
                .with_filter(filter)
                .boxed()
        } else {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .with_filter(filter)
                .boxed()
        };

        // An embedding application may already own the global subscriber
        if tracing_subscriber::registry().with(layer).try_init().is_err() {
            tracing::debug!("Global tracing subscriber already initialized - keeping existing subscriber");
        }

        tracing::info!(
            pid = std::process::id(),
            environment = %environment,
            json = settings.json,
            "Structured logging initialized"
        );
    });
}

/// Current environment from `INVESTIGATION_ENV`, then `APP_ENV`
fn get_environment() -> String {
    std::env::var("INVESTIGATION_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

/// Default log level for an environment
fn get_log_level(environment: &str) -> &'static str {
    match environment {
        "test" | "development" => "debug",
        "production" => "info",
        _ => "debug",
    }
}

/// Log structured data for investigation lifecycle operations
pub fn log_investigation_operation(
    operation: &str,
    investigation_id: Option<uuid::Uuid>,
    target_document: Option<&str>,
    status: &str,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        investigation_id = ?investigation_id,
        target_document = target_document,
        status = %status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "INVESTIGATION_OPERATION"
    );
}

/// Log structured data for one consulted source
pub fn log_source_operation(
    operation: &str,
    source: &str,
    investigation_id: Option<uuid::Uuid>,
    status: &str,
    duration_ms: Option<u64>,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        source = %source,
        investigation_id = ?investigation_id,
        status = %status,
        duration_ms = duration_ms,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "SOURCE_OPERATION"
    );
}
