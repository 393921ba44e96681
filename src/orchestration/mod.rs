//! # Investigation Orchestration
//!
//! Runs every configured category of an investigation in order and settles
//! the investigation into exactly one terminal state.
//!
//! ## Failure handling
//!
//! - **Source-level failures** (open circuits, exhausted retries, rejected
//!   requests, aggregation rounds where every source failed) mark the
//!   category unavailable. The run continues and completes without it.
//! - **Defects** (a category reporting [`CategoryError::Defect`], a panic
//!   inside a category, a violated precondition) fail the investigation with
//!   the reason and no counters.
//!
//! Counters of succeeded categories are written atomically with the
//! Completed transition. The completion notifier and the audit sink are best
//! effort: their failures are logged and never change the outcome.

pub mod category;
pub mod errors;
pub mod orchestrator;

pub use category::{
    count_entities, AggregatedCategory, CategoryError, CategoryOutput, CategoryQuery,
    GuardedSourceCategory,
};
pub use errors::{OrchestrationError, OrchestrationResult};
pub use orchestrator::{
    CategoryRecord, CategoryStatus, InvestigationOrchestrator, InvestigationOrchestratorBuilder,
    InvestigationRunReport,
};
