#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Investigation Core
//!
//! External-call resilience and multi-source aggregation for building
//! investigation records out of many unreliable third-party sources.
//!
//! ## Overview
//!
//! An investigation queries tribunals, land registries, credit bureaus and
//! other agencies about one target document. Any of them may fail, rate
//! limit or hang. This crate keeps one saturated dependency from cascading
//! into a failed investigation and keeps the data already obtained when a
//! single source fails.
//!
//! ```text
//! InvestigationOrchestrator
//!   -> CategoryQuery (sequential, fixed order)
//!        -> ResilientCallGuard = RetryExecutor( CircuitBreaker( source ) )
//!        -> MultiSourceAggregator (concurrent fan-out of guarded sources)
//! ```
//!
//! ## Module Organization
//!
//! - [`resilience`] - Circuit breakers, retry with backoff, and their composition
//! - [`aggregation`] - Concurrent multi-source fan-out and consolidation
//! - [`orchestration`] - Investigation runs and per-category failure handling
//! - [`state_machine`] - Investigation lifecycle and the persistence boundary
//! - [`events`] - Event publishing, completion notification, source audit
//! - [`config`] - Layered TOML and environment configuration
//! - [`logging`] - Structured logging setup
//! - [`error`] - Crate-level error type
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use investigation_core::config::ConfigManager;
//! use investigation_core::orchestration::{GuardedSourceCategory, InvestigationOrchestrator};
//! use investigation_core::resilience::ResilienceContext;
//! use investigation_core::state_machine::InMemoryInvestigationRepository;
//! use investigation_core::aggregation::SourceQuery;
//! use investigation_core::models::Investigation;
//! use std::sync::Arc;
//!
//! # async fn example(tribunal: Arc<dyn SourceQuery>) -> investigation_core::Result<()> {
//! investigation_core::logging::init_structured_logging();
//!
//! let manager = ConfigManager::load()?;
//! let resilience = ResilienceContext::from_config(manager.config());
//! let repository = Arc::new(InMemoryInvestigationRepository::new());
//! let id = repository.insert(Investigation::new("12345678901"));
//!
//! let orchestrator = InvestigationOrchestrator::builder()
//!     .repository(repository)
//!     .config(manager.config().orchestration.clone())
//!     .category(Arc::new(
//!         GuardedSourceCategory::new(tribunal, &resilience).with_entity_field("lawsuits"),
//!     ))
//!     .build()?;
//!
//! let report = orchestrator.run(id).await?;
//! println!("{:?}: {:?}", report.final_state, report.counters);
//! # Ok(())
//! # }
//! ```

pub mod aggregation;
pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod logging;
pub mod models;
pub mod orchestration;
pub mod resilience;
pub mod state_machine;

pub use aggregation::{
    AggregatedResult, AverageScoreConsolidator, ConsolidatedValue, MultiSourceAggregator,
    SourceOutcome, SourceQuery,
};
pub use config::{ConfigManager, InvestigationCoreConfig};
pub use constants::{status_groups, system, InvestigationStatus};
pub use error::{InvestigationError, Result};
pub use events::{CompletionNotifier, EventPublisher, SourceAuditSink};
pub use models::{EntityCounters, Investigation};
pub use orchestration::{InvestigationOrchestrator, InvestigationRunReport};
pub use resilience::{
    CircuitBreaker, CircuitBreakerRegistry, ExternalCallError, ResilienceContext, ResilienceError,
    ResilientCallGuard, RetryPolicy,
};
pub use state_machine::{InMemoryInvestigationRepository, InvestigationRepository, InvestigationState};
