use super::audit::{AuditError, SourceAuditSink};
use super::notification::{CompletionNotification, CompletionNotifier, NotificationError};
use crate::aggregation::SourceOutcome;
use crate::constants::events::{INVESTIGATION_COMPLETED, SOURCE_CONSULTED};
use crate::constants::system::DEFAULT_EVENT_CHANNEL_CAPACITY;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

/// Broadcast publisher for investigation lifecycle events
#[derive(Debug, Clone)]
pub struct EventPublisher {
    sender: broadcast::Sender<PublishedEvent>,
}

/// Event that has been published
#[derive(Debug, Clone)]
pub struct PublishedEvent {
    pub name: String,
    pub context: Value,
    pub published_at: chrono::DateTime<chrono::Utc>,
}

impl EventPublisher {
    /// Create a new event publisher with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Serialize `context` and broadcast it under `event_name`
    pub async fn publish<C: Serialize + ?Sized>(
        &self,
        event_name: impl Into<String>,
        context: &C,
    ) -> Result<(), PublishError> {
        let event = PublishedEvent {
            name: event_name.into(),
            context: serde_json::to_value(context)?,
            published_at: chrono::Utc::now(),
        };

        // No subscribers is not an error
        if let Err(broadcast::error::SendError(event)) = self.sender.send(event) {
            debug!(event = %event.name, "Event published without subscribers");
        }
        Ok(())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PublishedEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CHANNEL_CAPACITY)
    }
}

/// Error types for event publishing
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Event context could not be serialized: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[async_trait]
impl CompletionNotifier for EventPublisher {
    async fn notify_completed(&self, notification: CompletionNotification) -> Result<(), NotificationError> {
        self.publish(INVESTIGATION_COMPLETED, &notification)
            .await
            .map_err(|e| NotificationError::Serialization(e.to_string()))
    }
}

#[derive(Serialize)]
struct SourceConsulted<'a> {
    investigation_id: Uuid,
    outcome: &'a SourceOutcome,
}

#[async_trait]
impl SourceAuditSink for EventPublisher {
    async fn record(&self, investigation_id: Uuid, outcome: &SourceOutcome) -> Result<(), AuditError> {
        let context = SourceConsulted {
            investigation_id,
            outcome,
        };
        self.publish(SOURCE_CONSULTED, &context)
            .await
            .map_err(|e| AuditError::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntityCounters;
    use serde_json::json;
    use chrono::Utc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_publish_without_subscribers_is_ok() {
        let publisher = EventPublisher::default();
        assert_eq!(publisher.subscriber_count(), 0);
        publisher
            .publish("investigation.started", &json!({}))
            .await
            .unwrap();
    }

    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: serde::Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("unsupported context"))
        }
    }

    #[tokio::test]
    async fn test_unserializable_context_is_rejected() {
        let publisher = EventPublisher::new(8);
        let mut receiver = publisher.subscribe();

        let err = publisher
            .publish("investigation.started", &Unserializable)
            .await
            .unwrap_err();

        assert!(matches!(err, PublishError::Serialization(_)));
        assert!(err.to_string().contains("unsupported context"));
        assert!(receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_completion_notification_is_broadcast() {
        let publisher = EventPublisher::new(8);
        let mut receiver = publisher.subscribe();

        let mut counts = EntityCounters::new();
        counts.insert("lawsuits".to_string(), 3);
        let id = Uuid::new_v4();

        publisher
            .notify_completed(CompletionNotification {
                investigation_id: id,
                target_document: "12345678901".to_string(),
                counts,
            })
            .await
            .unwrap();

        let event = receiver.recv().await.unwrap();
        assert_eq!(event.name, INVESTIGATION_COMPLETED);
        assert_eq!(event.context["investigation_id"], json!(id));
        assert_eq!(event.context["counts"]["lawsuits"], json!(3));
    }

    #[tokio::test]
    async fn test_source_outcome_is_audited() {
        let publisher = EventPublisher::new(8);
        let mut receiver = publisher.subscribe();
        let outcome = SourceOutcome::succeeded(
            "tribunal",
            None,
            json!({"lawsuits": []}),
            Utc::now(),
            Duration::from_millis(5),
        );

        publisher.record(Uuid::new_v4(), &outcome).await.unwrap();

        let event = receiver.recv().await.unwrap();
        assert_eq!(event.name, SOURCE_CONSULTED);
        assert_eq!(event.context["outcome"]["source"], json!("tribunal"));
        assert_eq!(event.context["outcome"]["success"], json!(true));
    }
}
