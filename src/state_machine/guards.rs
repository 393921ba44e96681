use super::errors::{StateMachineError, StateMachineResult};
use crate::models::Investigation;

/// Precondition checked before an investigation is worked
pub trait StateGuard: Send + Sync {
    fn check(&self, investigation: &Investigation) -> StateMachineResult<()>;

    /// Get a description of this guard for logging
    fn description(&self) -> &'static str;
}

/// Every source is queried by target document, so it must be present
pub struct TargetDocumentPresentGuard;

impl StateGuard for TargetDocumentPresentGuard {
    fn check(&self, investigation: &Investigation) -> StateMachineResult<()> {
        if investigation.target_document.trim().is_empty() {
            return Err(StateMachineError::GuardFailed {
                reason: format!(
                    "Investigation {} has no target document",
                    investigation.investigation_id
                ),
            });
        }
        Ok(())
    }

    fn description(&self) -> &'static str {
        "target document is present"
    }
}
