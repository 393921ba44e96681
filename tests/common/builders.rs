//! Collaborator doubles and fixture builders

#![allow(dead_code)]

use async_trait::async_trait;
use investigation_core::aggregation::SourceOutcome;
use investigation_core::events::{
    AuditError, CompletionNotification, CompletionNotifier, NotificationError, SourceAuditSink,
};
use investigation_core::models::{EntityCounters, Investigation};
use investigation_core::resilience::{
    BackoffPolicy, CircuitBreakerRegistry, FailureKind, ResilienceContext, RetryPolicy,
};
use investigation_core::state_machine::{
    InMemoryInvestigationRepository, InvestigationRepository, InvestigationState, PersistenceError,
};
use investigation_core::config::{CircuitBreakerComponentConfig, CircuitBreakerSettings};
use parking_lot::Mutex;
use std::time::Duration;
use uuid::Uuid;

/// Notifier that records every notice and optionally fails delivery
#[derive(Default)]
pub struct RecordingNotifier {
    notifications: Mutex<Vec<CompletionNotification>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            notifications: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn notifications(&self) -> Vec<CompletionNotification> {
        self.notifications.lock().clone()
    }
}

#[async_trait]
impl CompletionNotifier for RecordingNotifier {
    async fn notify_completed(&self, notification: CompletionNotification) -> Result<(), NotificationError> {
        self.notifications.lock().push(notification);
        if self.fail {
            return Err(NotificationError::Delivery("mail relay unavailable".to_string()));
        }
        Ok(())
    }
}

/// Audit sink that keeps every recorded outcome and optionally rejects them
#[derive(Default)]
pub struct RecordingAuditSink {
    records: Mutex<Vec<(Uuid, SourceOutcome)>>,
    reject: bool,
}

impl RecordingAuditSink {
    pub fn rejecting() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            reject: true,
        }
    }

    pub fn records(&self) -> Vec<(Uuid, SourceOutcome)> {
        self.records.lock().clone()
    }

    pub fn sources(&self) -> Vec<String> {
        self.records
            .lock()
            .iter()
            .map(|(_, outcome)| outcome.source().to_string())
            .collect()
    }
}

#[async_trait]
impl SourceAuditSink for RecordingAuditSink {
    async fn record(&self, investigation_id: Uuid, outcome: &SourceOutcome) -> Result<(), AuditError> {
        self.records.lock().push((investigation_id, outcome.clone()));
        if self.reject {
            return Err(AuditError::Rejected("audit store read-only".to_string()));
        }
        Ok(())
    }
}

/// Repository whose writes into one target state fail with a storage error
pub struct RejectingRepository {
    inner: InMemoryInvestigationRepository,
    rejected: InvestigationState,
}

impl RejectingRepository {
    pub fn new(inner: InMemoryInvestigationRepository, rejected: InvestigationState) -> Self {
        Self { inner, rejected }
    }
}

#[async_trait]
impl InvestigationRepository for RejectingRepository {
    async fn find(&self, investigation_id: Uuid) -> Result<Option<Investigation>, PersistenceError> {
        self.inner.find(investigation_id).await
    }

    async fn transition(
        &self,
        investigation_id: Uuid,
        expected_from: InvestigationState,
        to: InvestigationState,
        counters: Option<EntityCounters>,
        failure_reason: Option<String>,
    ) -> Result<Investigation, PersistenceError> {
        if to == self.rejected {
            return Err(PersistenceError::Storage(format!("write to {to} refused")));
        }
        self.inner
            .transition(investigation_id, expected_from, to, counters, failure_reason)
            .await
    }
}

/// Insert a pending investigation and return its id
pub fn pending_investigation(repository: &InMemoryInvestigationRepository, target_document: &str) -> Uuid {
    repository.insert(Investigation::new(target_document).with_target_name("Test Subject"))
}

/// Millisecond backoff so retry tests stay fast
pub fn fast_retry_policy(max_retries: u32) -> RetryPolicy {
    RetryPolicy::new(
        max_retries,
        BackoffPolicy::new(Duration::from_millis(1), Duration::from_millis(5), 2.0, false),
    )
    .with_retryable_kinds(FailureKind::default_retryable())
    .with_retryable_status_codes([429, 503])
}

/// Resilience wiring with a short recovery timeout for every breaker
pub fn fast_resilience(failure_threshold: u32, recovery_timeout: Duration, max_retries: u32) -> ResilienceContext {
    let settings = CircuitBreakerSettings {
        default_config: CircuitBreakerComponentConfig {
            failure_threshold,
            recovery_timeout_seconds: recovery_timeout.as_secs_f64(),
            half_open_max_calls: 1,
            success_threshold: 1,
        },
        ..CircuitBreakerSettings::default()
    };

    ResilienceContext::new(
        CircuitBreakerRegistry::new(settings),
        fast_retry_policy(max_retries),
    )
}
