use crate::models::EntityCounters;
use serde::{Deserialize, Serialize};

/// Events that can trigger investigation state transitions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum InvestigationEvent {
    /// Begin consulting sources
    Start,
    /// Every category ran; carries the counters of the categories that succeeded
    Complete(EntityCounters),
    /// Orchestration defect with its reason
    Fail(String),
}

impl InvestigationEvent {
    /// Get a string representation of the event type for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Complete(_) => "complete",
            Self::Fail(_) => "fail",
        }
    }

    /// Extract error message if this is a failure event
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Fail(msg) => Some(msg),
            _ => None,
        }
    }

    /// Check if this event represents a terminal transition
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete(_) | Self::Fail(_))
    }
}
