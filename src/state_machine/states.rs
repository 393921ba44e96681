use serde::{Deserialize, Serialize};
use std::fmt;

/// Investigation lifecycle states
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvestigationState {
    /// Created by a collaborator, not yet picked up
    #[default]
    Pending,
    /// Sources are being consulted
    InProgress,
    /// Every category ran; counters are final
    Completed,
    /// An orchestration-level defect stopped the run
    Failed,
}

impl InvestigationState {
    /// Check if this is a terminal state (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Check if the investigation is currently being processed
    pub fn is_active(&self) -> bool {
        matches!(self, Self::InProgress)
    }
}

impl fmt::Display for InvestigationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for InvestigationState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Invalid investigation state: {s}")),
        }
    }
}
