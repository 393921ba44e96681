use crate::aggregation::AggregationError;
use crate::config::ConfigurationError;
use crate::events::{AuditError, NotificationError, PublishError};
use crate::orchestration::OrchestrationError;
use crate::resilience::ResilienceError;
use crate::state_machine::{PersistenceError, StateMachineError};
use thiserror::Error;

/// Crate-level error wrapping every module's error type
#[derive(Debug, Error)]
pub enum InvestigationError {
    #[error("Resilience error: {0}")]
    Resilience(#[from] ResilienceError),

    #[error("Aggregation error: {0}")]
    Aggregation(#[from] AggregationError),

    #[error("State transition error: {0}")]
    StateMachine(#[from] StateMachineError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Orchestration error: {0}")]
    Orchestration(#[from] OrchestrationError),

    #[error("Notification error: {0}")]
    Notification(#[from] NotificationError),

    #[error("Audit error: {0}")]
    Audit(#[from] AuditError),

    #[error("Event error: {0}")]
    Event(#[from] PublishError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
}

impl InvestigationError {
    /// The failing dependency is known to be unhealthy
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, Self::Resilience(err) if err.is_circuit_open())
    }
}

pub type Result<T> = std::result::Result<T, InvestigationError>;
