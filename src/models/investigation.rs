use crate::state_machine::InvestigationState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Entities found per category, ordered by category name
pub type EntityCounters = BTreeMap<String, u64>;

/// Composite record built from many third-party sources about one subject
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Investigation {
    pub investigation_id: Uuid,
    /// Subject identifier every source is queried with (tax id, registry number)
    pub target_document: String,
    pub target_name: Option<String>,
    pub status: InvestigationState,
    /// Written once, together with the Completed transition
    pub entity_counters: EntityCounters,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Investigation {
    /// New Pending investigation for `target_document`
    pub fn new(target_document: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            investigation_id: Uuid::new_v4(),
            target_document: target_document.into(),
            target_name: None,
            status: InvestigationState::Pending,
            entity_counters: EntityCounters::new(),
            failure_reason: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    pub fn with_target_name(mut self, target_name: impl Into<String>) -> Self {
        self.target_name = Some(target_name.into());
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Sum of all entity counters
    pub fn total_entities(&self) -> u64 {
        self.entity_counters.values().sum()
    }
}
