use super::category::{CategoryError, CategoryOutput, CategoryQuery};
use super::errors::{OrchestrationError, OrchestrationResult};
use crate::aggregation::{ConsolidatedValue, SourceOutcome};
use crate::config::OrchestrationConfig;
use crate::constants::events::{INVESTIGATION_COMPLETED, INVESTIGATION_FAILED, INVESTIGATION_STARTED};
use crate::events::{CompletionNotification, CompletionNotifier, NoopAuditSink, SourceAuditSink};
use crate::logging::{log_investigation_operation, log_source_operation};
use crate::models::{EntityCounters, Investigation};
use crate::state_machine::{
    InvestigationEvent, InvestigationRepository, InvestigationState, InvestigationStateMachine,
    PersistenceError, StateGuard, StateMachineError, TargetDocumentPresentGuard,
};
use futures::FutureExt;
use serde::Serialize;
use std::any::Any;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// How a category fared in one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryStatus {
    Succeeded,
    /// Its sources were unavailable; the run carried on without it
    Unavailable,
    /// It hit a defect and failed the run
    Defective,
}

/// Per-category entry of a run report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryRecord {
    pub name: String,
    pub status: CategoryStatus,
    pub entity_count: Option<u64>,
    pub consolidated: Option<ConsolidatedValue>,
    pub outcomes: Vec<SourceOutcome>,
    pub error: Option<String>,
}

/// Everything a run decided, in category order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvestigationRunReport {
    pub investigation_id: Uuid,
    pub final_state: InvestigationState,
    /// Entity counters written with the final transition; empty when failed
    pub counters: EntityCounters,
    pub categories: Vec<CategoryRecord>,
    pub failure_reason: Option<String>,
    /// Whether the completion notifier accepted the notice
    pub notified: bool,
}

impl InvestigationRunReport {
    pub fn is_completed(&self) -> bool {
        self.final_state == InvestigationState::Completed
    }

    pub fn category(&self, name: &str) -> Option<&CategoryRecord> {
        self.categories.iter().find(|record| record.name == name)
    }

    pub fn unavailable_categories(&self) -> Vec<&str> {
        self.categories
            .iter()
            .filter(|record| record.status == CategoryStatus::Unavailable)
            .map(|record| record.name.as_str())
            .collect()
    }
}

/// Drives one investigation from Pending to Completed or Failed.
///
/// Categories run sequentially in registration order. Source-level failures
/// leave a category unavailable without stopping the run; a defect (or a
/// panic inside a category) fails the investigation with no counters.
pub struct InvestigationOrchestrator {
    repository: Arc<dyn InvestigationRepository>,
    categories: Vec<Arc<dyn CategoryQuery>>,
    notifier: Option<Arc<dyn CompletionNotifier>>,
    audit_sink: Arc<dyn SourceAuditSink>,
    guards: Vec<Arc<dyn StateGuard>>,
    config: OrchestrationConfig,
}

impl std::fmt::Debug for InvestigationOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvestigationOrchestrator")
            .field("categories", &self.category_names())
            .field("notifier", &self.notifier.is_some())
            .field("config", &self.config)
            .finish()
    }
}

impl InvestigationOrchestrator {
    pub fn builder() -> InvestigationOrchestratorBuilder {
        InvestigationOrchestratorBuilder::default()
    }

    pub fn category_names(&self) -> Vec<&str> {
        self.categories.iter().map(|c| c.name()).collect()
    }

    /// Work the pending investigation `investigation_id` to a terminal state.
    ///
    /// Errors are returned only when the investigation cannot be started, or
    /// when neither the completion nor the fallback failure can be persisted.
    /// Everything else ends up in the report.
    #[instrument(skip(self), fields(categories = self.categories.len()))]
    pub async fn run(&self, investigation_id: Uuid) -> OrchestrationResult<InvestigationRunReport> {
        let investigation = self.load_pending(investigation_id).await?;
        let state_machine = InvestigationStateMachine::new(investigation_id, Arc::clone(&self.repository));

        state_machine.transition(InvestigationEvent::Start).await?;
        log_investigation_operation(
            INVESTIGATION_STARTED,
            Some(investigation_id),
            Some(investigation.target_document.as_str()),
            "in_progress",
            None,
        );

        if let Some(reason) = self.violated_precondition(&investigation) {
            return self
                .fail(&state_machine, &investigation, Vec::new(), reason)
                .await;
        }

        let mut counters = EntityCounters::new();
        let mut records = Vec::with_capacity(self.categories.len());

        for category in &self.categories {
            let name = category.name().to_string();
            let result = AssertUnwindSafe(category.run(&investigation.target_document))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| {
                    Err(CategoryError::Defect(format!(
                        "category '{name}' panicked: {}",
                        panic_message(&*panic)
                    )))
                });

            match result {
                Ok(CategoryOutput {
                    entity_count,
                    outcomes,
                    consolidated,
                }) => {
                    self.audit(investigation_id, &outcomes).await;
                    info!(
                        investigation_id = %investigation_id,
                        category = %name,
                        entity_count = entity_count,
                        "Category succeeded"
                    );
                    counters.insert(name.clone(), entity_count);
                    records.push(CategoryRecord {
                        name,
                        status: CategoryStatus::Succeeded,
                        entity_count: Some(entity_count),
                        consolidated,
                        outcomes,
                        error: None,
                    });
                }
                Err(CategoryError::Source { message, outcomes }) => {
                    self.audit(investigation_id, &outcomes).await;
                    warn!(
                        investigation_id = %investigation_id,
                        category = %name,
                        error = %message,
                        "Category unavailable, continuing without it"
                    );
                    records.push(CategoryRecord {
                        name,
                        status: CategoryStatus::Unavailable,
                        entity_count: None,
                        consolidated: None,
                        outcomes,
                        error: Some(message),
                    });
                }
                Err(CategoryError::Defect(reason)) => {
                    error!(
                        investigation_id = %investigation_id,
                        category = %name,
                        reason = %reason,
                        "Category defect, failing investigation"
                    );
                    records.push(CategoryRecord {
                        name,
                        status: CategoryStatus::Defective,
                        entity_count: None,
                        consolidated: None,
                        outcomes: Vec::new(),
                        error: Some(reason.clone()),
                    });
                    return self.fail(&state_machine, &investigation, records, reason).await;
                }
            }
        }

        if let Err(err) = state_machine
            .transition(InvestigationEvent::Complete(counters.clone()))
            .await
        {
            error!(
                investigation_id = %investigation_id,
                error = %err,
                "Completion could not be persisted, failing investigation"
            );
            let reason = format!("completion could not be persisted: {err}");
            return self.fail(&state_machine, &investigation, records, reason).await;
        }

        let details = format!(
            "{} of {} categories available",
            counters.len(),
            self.categories.len()
        );
        log_investigation_operation(
            INVESTIGATION_COMPLETED,
            Some(investigation_id),
            Some(investigation.target_document.as_str()),
            "completed",
            Some(details.as_str()),
        );

        let notified = self.notify(&investigation, &counters).await;

        Ok(InvestigationRunReport {
            investigation_id,
            final_state: InvestigationState::Completed,
            counters,
            categories: records,
            failure_reason: None,
            notified,
        })
    }

    async fn load_pending(&self, investigation_id: Uuid) -> OrchestrationResult<Investigation> {
        let investigation = self
            .repository
            .find(investigation_id)
            .await
            .map_err(StateMachineError::from)?
            .ok_or(StateMachineError::Persistence(PersistenceError::NotFound(
                investigation_id,
            )))?;

        if investigation.status != InvestigationState::Pending {
            return Err(OrchestrationError::NotPending {
                investigation_id,
                status: investigation.status,
            });
        }

        Ok(investigation)
    }

    fn violated_precondition(&self, investigation: &Investigation) -> Option<String> {
        self.guards.iter().find_map(|guard| match guard.check(investigation) {
            Ok(()) => None,
            Err(err) => {
                warn!(
                    investigation_id = %investigation.investigation_id,
                    guard = guard.description(),
                    error = %err,
                    "Investigation precondition violated"
                );
                Some(err.to_string())
            }
        })
    }

    async fn fail(
        &self,
        state_machine: &InvestigationStateMachine,
        investigation: &Investigation,
        categories: Vec<CategoryRecord>,
        reason: String,
    ) -> OrchestrationResult<InvestigationRunReport> {
        state_machine
            .transition(InvestigationEvent::Fail(reason.clone()))
            .await?;

        log_investigation_operation(
            INVESTIGATION_FAILED,
            Some(investigation.investigation_id),
            Some(investigation.target_document.as_str()),
            "failed",
            Some(reason.as_str()),
        );

        Ok(InvestigationRunReport {
            investigation_id: investigation.investigation_id,
            final_state: InvestigationState::Failed,
            counters: EntityCounters::new(),
            categories,
            failure_reason: Some(reason),
            notified: false,
        })
    }

    async fn audit(&self, investigation_id: Uuid, outcomes: &[SourceOutcome]) {
        for outcome in outcomes {
            log_source_operation(
                "consult",
                outcome.source(),
                Some(investigation_id),
                outcome.status_label(),
                Some(outcome.elapsed().as_millis() as u64),
                outcome.error().map(|e| e.message.as_str()),
            );

            if !self.config.audit_source_outcomes {
                continue;
            }
            if let Err(err) = self.audit_sink.record(investigation_id, outcome).await {
                warn!(
                    investigation_id = %investigation_id,
                    source = %outcome.source(),
                    error = %err,
                    "Failed to record source outcome"
                );
            }
        }
    }

    async fn notify(&self, investigation: &Investigation, counters: &EntityCounters) -> bool {
        let Some(notifier) = self.notifier.as_ref().filter(|_| self.config.notify_on_completion) else {
            return false;
        };

        let notification = CompletionNotification {
            investigation_id: investigation.investigation_id,
            target_document: investigation.target_document.clone(),
            counts: counters.clone(),
        };

        match notifier.notify_completed(notification).await {
            Ok(()) => true,
            Err(err) => {
                warn!(
                    investigation_id = %investigation.investigation_id,
                    error = %err,
                    "Completion notification failed, investigation stays completed"
                );
                false
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Builder for [`InvestigationOrchestrator`]
#[derive(Default)]
pub struct InvestigationOrchestratorBuilder {
    repository: Option<Arc<dyn InvestigationRepository>>,
    categories: Vec<Arc<dyn CategoryQuery>>,
    notifier: Option<Arc<dyn CompletionNotifier>>,
    audit_sink: Option<Arc<dyn SourceAuditSink>>,
    guards: Vec<Arc<dyn StateGuard>>,
    config: OrchestrationConfig,
}

impl InvestigationOrchestratorBuilder {
    pub fn repository(mut self, repository: Arc<dyn InvestigationRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    /// Append a category; categories run in the order they are added
    pub fn category(mut self, category: Arc<dyn CategoryQuery>) -> Self {
        self.categories.push(category);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn CompletionNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn audit_sink(mut self, audit_sink: Arc<dyn SourceAuditSink>) -> Self {
        self.audit_sink = Some(audit_sink);
        self
    }

    /// Extra precondition checked after the investigation is started
    pub fn guard(mut self, guard: Arc<dyn StateGuard>) -> Self {
        self.guards.push(guard);
        self
    }

    pub fn config(mut self, config: OrchestrationConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> OrchestrationResult<InvestigationOrchestrator> {
        let repository = self.repository.ok_or(OrchestrationError::MissingRepository)?;

        let mut seen = HashSet::with_capacity(self.categories.len());
        for category in &self.categories {
            if !seen.insert(category.name().to_string()) {
                return Err(OrchestrationError::DuplicateCategory {
                    name: category.name().to_string(),
                });
            }
        }

        let mut guards: Vec<Arc<dyn StateGuard>> = vec![Arc::new(TargetDocumentPresentGuard)];
        guards.extend(self.guards);

        Ok(InvestigationOrchestrator {
            repository,
            categories: self.categories,
            notifier: self.notifier,
            audit_sink: self.audit_sink.unwrap_or_else(|| Arc::new(NoopAuditSink)),
            guards,
            config: self.config,
        })
    }
}
