//! Per-source outcomes of an aggregation round

use crate::resilience::{ClassifiedError, FailureKind, ResilienceError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Why a source produced no payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceErrorSummary {
    /// `None` when the query never returned (it panicked or was aborted)
    pub kind: Option<FailureKind>,
    pub message: String,
    /// Present when the source's circuit breaker rejected the call
    pub retry_after: Option<Duration>,
}

impl SourceErrorSummary {
    pub fn aborted(message: impl Into<String>) -> Self {
        Self {
            kind: None,
            message: message.into(),
            retry_after: None,
        }
    }
}

impl From<&ResilienceError> for SourceErrorSummary {
    fn from(err: &ResilienceError) -> Self {
        Self {
            kind: Some(err.failure_kind()),
            message: err.to_string(),
            retry_after: err.retry_after(),
        }
    }
}

/// Result of consulting one source. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceOutcome {
    source: String,
    success: bool,
    status: Option<u16>,
    payload: Option<Value>,
    error: Option<SourceErrorSummary>,
    consulted_at: DateTime<Utc>,
    elapsed: Duration,
}

impl SourceOutcome {
    pub fn succeeded(
        source: impl Into<String>,
        status: Option<u16>,
        payload: Value,
        consulted_at: DateTime<Utc>,
        elapsed: Duration,
    ) -> Self {
        Self {
            source: source.into(),
            success: true,
            status,
            payload: Some(payload),
            error: None,
            consulted_at,
            elapsed,
        }
    }

    pub fn failed(
        source: impl Into<String>,
        error: SourceErrorSummary,
        consulted_at: DateTime<Utc>,
        elapsed: Duration,
    ) -> Self {
        Self {
            source: source.into(),
            success: false,
            status: None,
            payload: None,
            error: Some(error),
            consulted_at,
            elapsed,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Status code of the final response, if the source reports one
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn payload(&self) -> Option<&Value> {
        self.payload.as_ref()
    }

    pub fn error(&self) -> Option<&SourceErrorSummary> {
        self.error.as_ref()
    }

    pub fn consulted_at(&self) -> DateTime<Utc> {
        self.consulted_at
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Short status label for logs and audit records
    pub fn status_label(&self) -> &'static str {
        match (self.success, &self.error) {
            (true, _) => "succeeded",
            (false, Some(SourceErrorSummary { kind: Some(FailureKind::CircuitOpen), .. })) => {
                "circuit_open"
            }
            (false, Some(SourceErrorSummary { kind: None, .. })) => "aborted",
            (false, _) => "failed",
        }
    }
}
