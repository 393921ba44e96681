use super::{
    errors::{PersistenceError, StateMachineError, StateMachineResult},
    events::InvestigationEvent,
    persistence::InvestigationRepository,
    states::InvestigationState,
};
use crate::models::Investigation;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Lifecycle state machine for one investigation.
///
/// ```text
/// Pending --Start--> InProgress --Complete--> Completed
///                               --Fail------> Failed
/// ```
///
/// Terminal states accept no events. Each transition is a single
/// compare-and-set against the repository.
pub struct InvestigationStateMachine {
    investigation_id: Uuid,
    repository: Arc<dyn InvestigationRepository>,
}

impl InvestigationStateMachine {
    pub fn new(investigation_id: Uuid, repository: Arc<dyn InvestigationRepository>) -> Self {
        Self {
            investigation_id,
            repository,
        }
    }

    pub fn investigation_id(&self) -> Uuid {
        self.investigation_id
    }

    /// Get the current state of the investigation
    pub async fn current_state(&self) -> StateMachineResult<InvestigationState> {
        let investigation = self
            .repository
            .find(self.investigation_id)
            .await?
            .ok_or(PersistenceError::NotFound(self.investigation_id))?;
        Ok(investigation.status)
    }

    /// Attempt to transition the investigation
    pub async fn transition(&self, event: InvestigationEvent) -> StateMachineResult<Investigation> {
        let current_state = self.current_state().await?;
        let target_state = Self::determine_target_state(current_state, &event)?;

        debug!(
            investigation_id = %self.investigation_id,
            from_state = %current_state,
            to_state = %target_state,
            event = event.event_type(),
            "Transitioning investigation"
        );

        let (counters, failure_reason) = match event {
            InvestigationEvent::Start => (None, None),
            InvestigationEvent::Complete(counters) => (Some(counters), None),
            InvestigationEvent::Fail(reason) => (None, Some(reason)),
        };

        let investigation = self
            .repository
            .transition(
                self.investigation_id,
                current_state,
                target_state,
                counters,
                failure_reason,
            )
            .await?;

        info!(
            investigation_id = %self.investigation_id,
            from_state = %current_state,
            to_state = %target_state,
            "Investigation state transition persisted"
        );

        Ok(investigation)
    }

    /// Determine the target state based on current state and event
    pub fn determine_target_state(
        current_state: InvestigationState,
        event: &InvestigationEvent,
    ) -> StateMachineResult<InvestigationState> {
        let target = match (current_state, event) {
            (InvestigationState::Pending, InvestigationEvent::Start) => InvestigationState::InProgress,
            (InvestigationState::InProgress, InvestigationEvent::Complete(_)) => {
                InvestigationState::Completed
            }
            (InvestigationState::InProgress, InvestigationEvent::Fail(_)) => InvestigationState::Failed,
            (from, _) => {
                return Err(StateMachineError::InvalidTransition {
                    from,
                    event: event.event_type().to_string(),
                })
            }
        };

        Ok(target)
    }
}
