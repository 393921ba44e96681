//! # System Constants
//!
//! Event names, operational defaults and status groupings shared across the
//! resilience and orchestration layers.

pub use crate::state_machine::InvestigationState as InvestigationStatus;

/// Lifecycle events published by the orchestrator
pub mod events {
    // Investigation lifecycle events
    pub const INVESTIGATION_STARTED: &str = "investigation.started";
    pub const INVESTIGATION_COMPLETED: &str = "investigation.completed";
    pub const INVESTIGATION_FAILED: &str = "investigation.failed";

    // Source events
    pub const SOURCE_CONSULTED: &str = "source.consulted";
}

/// Defaults used when no configuration overrides them
pub mod system {
    /// Consecutive failures before a breaker opens
    pub const DEFAULT_FAILURE_THRESHOLD: u32 = 5;

    /// Seconds an open breaker waits before admitting probes
    pub const DEFAULT_RECOVERY_TIMEOUT_SECS: u64 = 60;

    /// Probe calls per half-open episode
    pub const DEFAULT_HALF_OPEN_MAX_CALLS: u32 = 1;

    /// Successful probes needed to close
    pub const DEFAULT_SUCCESS_THRESHOLD: u32 = 1;

    /// Breakers a registry holds before warning
    pub const DEFAULT_MAX_CIRCUIT_BREAKERS: usize = 100;

    /// Calls a closed breaker needs before its failure rate counts against health
    pub const HEALTH_MIN_CALLS: u64 = 10;

    /// Failure rate at or above which a closed breaker is unhealthy
    pub const HEALTH_MAX_FAILURE_RATE: f64 = 0.1;

    pub const DEFAULT_MAX_RETRIES: u32 = 3;
    pub const DEFAULT_BASE_DELAY_MS: u64 = 1_000;
    pub const DEFAULT_MAX_DELAY_MS: u64 = 30_000;
    pub const DEFAULT_EXPONENTIAL_BASE: f64 = 2.0;

    /// Payload field averaged by the default consolidator
    pub const DEFAULT_SCORE_FIELD: &str = "score";

    /// Buffer size of the event publisher's broadcast channel
    pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 1_000;
}

/// Status groupings for validation and logic
pub mod status_groups {
    use super::InvestigationStatus;

    /// Statuses from which no further transition is allowed
    pub const TERMINAL_STATES: &[InvestigationStatus] =
        &[InvestigationStatus::Completed, InvestigationStatus::Failed];

    /// Statuses in which an investigation is still being worked
    pub const ACTIVE_STATES: &[InvestigationStatus] =
        &[InvestigationStatus::Pending, InvestigationStatus::InProgress];
}
