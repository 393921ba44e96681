use crate::state_machine::InvestigationState;
use thiserror::Error;
use uuid::Uuid;

pub type StateMachineResult<T> = Result<T, StateMachineError>;

/// Error types for investigation state machine operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StateMachineError {
    #[error("Invalid state transition from {from} on event '{event}'")]
    InvalidTransition {
        from: InvestigationState,
        event: String,
    },

    #[error("Guard condition failed: {reason}")]
    GuardFailed { reason: String },

    #[error("Persistence operation failed: {0}")]
    Persistence(#[from] PersistenceError),
}

/// Failures of the persistence collaborator
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PersistenceError {
    #[error("Investigation {0} not found")]
    NotFound(Uuid),

    /// Compare-and-set lost: the stored state was not the expected one
    #[error("Investigation {id} is {actual}, expected {expected}")]
    StaleState {
        id: Uuid,
        expected: InvestigationState,
        actual: InvestigationState,
    },

    #[error("Storage error: {0}")]
    Storage(String),
}
