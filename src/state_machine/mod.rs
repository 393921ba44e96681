//! Investigation lifecycle state machine and its persistence boundary

pub mod errors;
pub mod events;
pub mod guards;
pub mod investigation_state_machine;
pub mod persistence;
pub mod states;

pub use errors::{PersistenceError, StateMachineError, StateMachineResult};
pub use events::InvestigationEvent;
pub use guards::{StateGuard, TargetDocumentPresentGuard};
pub use investigation_state_machine::InvestigationStateMachine;
pub use persistence::{InMemoryInvestigationRepository, InvestigationRepository, PersistenceResult};
pub use states::InvestigationState;
