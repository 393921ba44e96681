use crate::state_machine::{InvestigationState, StateMachineError};
use thiserror::Error;
use uuid::Uuid;

pub type OrchestrationResult<T> = Result<T, OrchestrationError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum OrchestrationError {
    #[error("Orchestrator requires an investigation repository")]
    MissingRepository,

    #[error("Category '{name}' registered more than once")]
    DuplicateCategory { name: String },

    /// Only pending investigations can be run
    #[error("Investigation {investigation_id} is {status}, expected pending")]
    NotPending {
        investigation_id: Uuid,
        status: InvestigationState,
    },

    #[error("State machine error: {0}")]
    StateMachine(#[from] StateMachineError),
}
