//! # Resilience Error Types
//!
//! Failure taxonomy for guarded external calls. Raw transport failures are
//! classified into a [`FailureKind`] at the point where the call returns, so
//! the retry layer decides on a tag instead of inspecting messages.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Classification of a failed external call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Connection refused, reset or DNS failure
    Connection,
    /// The transport gave up waiting for a response
    Timeout,
    /// Generic I/O failure while talking to the source
    Io,
    /// The source answered with an unsuccessful HTTP status
    HttpStatus,
    /// The source answered but rejected the request (bad document, no access)
    Business,
    /// The circuit breaker rejected the call without executing it
    CircuitOpen,
}

impl FailureKind {
    /// Kinds the retry layer treats as transient unless configured otherwise
    pub fn default_retryable() -> Vec<FailureKind> {
        vec![FailureKind::Connection, FailureKind::Timeout, FailureKind::Io]
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connection => write!(f, "connection"),
            Self::Timeout => write!(f, "timeout"),
            Self::Io => write!(f, "io"),
            Self::HttpStatus => write!(f, "http_status"),
            Self::Business => write!(f, "business"),
            Self::CircuitOpen => write!(f, "circuit_open"),
        }
    }
}

/// Errors that can be classified into a [`FailureKind`]
pub trait ClassifiedError {
    fn failure_kind(&self) -> FailureKind;
}

/// Failure raised by the transport collaborator for one external call
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExternalCallError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("HTTP status {status}: {message}")]
    HttpStatus { status: u16, message: String },

    #[error("Source rejected request: {0}")]
    Business(String),
}

impl ExternalCallError {
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::Io(message.into())
    }

    pub fn business(message: impl Into<String>) -> Self {
        Self::Business(message.into())
    }

    pub fn http_status(status: u16, message: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            message: message.into(),
        }
    }
}

impl ClassifiedError for ExternalCallError {
    fn failure_kind(&self) -> FailureKind {
        match self {
            Self::Connection(_) => FailureKind::Connection,
            Self::Timeout(_) => FailureKind::Timeout,
            Self::Io(_) => FailureKind::Io,
            Self::HttpStatus { .. } => FailureKind::HttpStatus,
            Self::Business(_) => FailureKind::Business,
        }
    }
}

impl From<std::io::Error> for ExternalCallError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::TimedOut => Self::Timeout(Duration::ZERO),
            std::io::ErrorKind::ConnectionRefused
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::NotConnected => Self::Connection(err.to_string()),
            _ => Self::Io(err.to_string()),
        }
    }
}

impl From<tokio::time::error::Elapsed> for ExternalCallError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        Self::Timeout(Duration::ZERO)
    }
}

/// Failure of a guarded call as seen by callers of the resilience layer.
///
/// `CircuitOpen` and `RetriesExhausted` are the two "source unavailable"
/// signals; `Rejected` carries a non-retryable source error through untouched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResilienceError {
    #[error("Circuit breaker is open for {service}, retry after {retry_after:?}")]
    CircuitOpen {
        service: String,
        retry_after: Duration,
    },

    #[error("Retries exhausted for {service} after {attempts} attempts: {last_cause}")]
    RetriesExhausted {
        service: String,
        attempts: u32,
        last_cause: ExternalCallError,
    },

    #[error("Non-retryable failure from {service}: {cause}")]
    Rejected {
        service: String,
        cause: ExternalCallError,
    },
}

impl ResilienceError {
    /// Service name the failure belongs to
    pub fn service(&self) -> &str {
        match self {
            Self::CircuitOpen { service, .. }
            | Self::RetriesExhausted { service, .. }
            | Self::Rejected { service, .. } => service,
        }
    }

    /// Fail-fast rejection because the dependency is known to be unhealthy
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, Self::CircuitOpen { .. })
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::CircuitOpen { retry_after, .. } => Some(*retry_after),
            _ => None,
        }
    }
}

impl ClassifiedError for ResilienceError {
    fn failure_kind(&self) -> FailureKind {
        match self {
            Self::CircuitOpen { .. } => FailureKind::CircuitOpen,
            Self::RetriesExhausted { last_cause, .. } => last_cause.failure_kind(),
            Self::Rejected { cause, .. } => cause.failure_kind(),
        }
    }
}
