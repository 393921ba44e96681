use crate::models::EntityCounters;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Payload handed to the notifier once an investigation completes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionNotification {
    pub investigation_id: Uuid,
    pub target_document: String,
    /// Entities found per category
    pub counts: EntityCounters,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum NotificationError {
    #[error("Notification delivery failed: {0}")]
    Delivery(String),

    #[error("Notification serialization failed: {0}")]
    Serialization(String),
}

/// Delivery of completion notices. Failures are reported to the caller but
/// never change the investigation's status.
#[async_trait]
pub trait CompletionNotifier: Send + Sync {
    async fn notify_completed(&self, notification: CompletionNotification) -> Result<(), NotificationError>;
}
