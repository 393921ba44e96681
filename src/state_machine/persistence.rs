use super::errors::PersistenceError;
use super::states::InvestigationState;
use crate::models::{EntityCounters, Investigation};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Storage boundary for investigations
#[async_trait]
pub trait InvestigationRepository: Send + Sync {
    async fn find(&self, investigation_id: Uuid) -> PersistenceResult<Option<Investigation>>;

    /// Atomically move `investigation_id` from `expected_from` to `to`.
    ///
    /// `counters` and `failure_reason` are written in the same update as the
    /// status. Fails with [`PersistenceError::StaleState`] when the stored
    /// status is not `expected_from`.
    async fn transition(
        &self,
        investigation_id: Uuid,
        expected_from: InvestigationState,
        to: InvestigationState,
        counters: Option<EntityCounters>,
        failure_reason: Option<String>,
    ) -> PersistenceResult<Investigation>;
}

/// DashMap-backed repository for tests and embedding
#[derive(Debug, Clone, Default)]
pub struct InMemoryInvestigationRepository {
    investigations: Arc<DashMap<Uuid, Investigation>>,
}

impl InMemoryInvestigationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an investigation, replacing any record with the same id
    pub fn insert(&self, investigation: Investigation) -> Uuid {
        let id = investigation.investigation_id;
        self.investigations.insert(id, investigation);
        id
    }

    pub fn get(&self, investigation_id: Uuid) -> Option<Investigation> {
        self.investigations
            .get(&investigation_id)
            .map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.investigations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.investigations.is_empty()
    }
}

#[async_trait]
impl InvestigationRepository for InMemoryInvestigationRepository {
    async fn find(&self, investigation_id: Uuid) -> PersistenceResult<Option<Investigation>> {
        Ok(self.get(investigation_id))
    }

    async fn transition(
        &self,
        investigation_id: Uuid,
        expected_from: InvestigationState,
        to: InvestigationState,
        counters: Option<EntityCounters>,
        failure_reason: Option<String>,
    ) -> PersistenceResult<Investigation> {
        // The entry guard holds the shard lock for the whole compare-and-set
        let mut entry = self
            .investigations
            .get_mut(&investigation_id)
            .ok_or(PersistenceError::NotFound(investigation_id))?;
        let investigation = entry.value_mut();

        if investigation.status != expected_from {
            return Err(PersistenceError::StaleState {
                id: investigation_id,
                expected: expected_from,
                actual: investigation.status,
            });
        }

        let now = Utc::now();
        investigation.status = to;
        investigation.updated_at = now;
        if let Some(counters) = counters {
            investigation.entity_counters = counters;
        }
        if failure_reason.is_some() {
            investigation.failure_reason = failure_reason;
        }
        if to.is_terminal() {
            investigation.completed_at = Some(now);
        }

        Ok(investigation.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_transition_compare_and_set() {
        let repository = InMemoryInvestigationRepository::new();
        let id = repository.insert(Investigation::new("123"));

        let updated = repository
            .transition(id, InvestigationState::Pending, InvestigationState::InProgress, None, None)
            .await
            .unwrap();
        assert_eq!(updated.status, InvestigationState::InProgress);

        let stale = repository
            .transition(id, InvestigationState::Pending, InvestigationState::InProgress, None, None)
            .await;
        assert_eq!(
            stale,
            Err(PersistenceError::StaleState {
                id,
                expected: InvestigationState::Pending,
                actual: InvestigationState::InProgress,
            })
        );
    }

    #[tokio::test]
    async fn test_completion_writes_counters_with_status() {
        let repository = InMemoryInvestigationRepository::new();
        let id = repository.insert(Investigation::new("123"));
        repository
            .transition(id, InvestigationState::Pending, InvestigationState::InProgress, None, None)
            .await
            .unwrap();

        let counters = EntityCounters::from([("lawsuits".to_string(), 4)]);
        let completed = repository
            .transition(
                id,
                InvestigationState::InProgress,
                InvestigationState::Completed,
                Some(counters.clone()),
                None,
            )
            .await
            .unwrap();

        assert_eq!(completed.entity_counters, counters);
        assert!(completed.completed_at.is_some());
        assert_eq!(repository.get(id).unwrap().entity_counters, counters);
    }

    #[tokio::test]
    async fn test_unknown_investigation() {
        let repository = InMemoryInvestigationRepository::new();
        let id = Uuid::new_v4();

        assert_eq!(repository.find(id).await, Ok(None));
        assert_eq!(
            repository
                .transition(id, InvestigationState::Pending, InvestigationState::InProgress, None, None)
                .await,
            Err(PersistenceError::NotFound(id))
        );
    }
}
