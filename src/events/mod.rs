//! # Events
//!
//! Broadcast event publishing and the notification and audit boundaries the
//! orchestrator reports through.

pub mod audit;
pub mod notification;
pub mod publisher;

pub use audit::{AuditError, NoopAuditSink, SourceAuditSink};
pub use notification::{CompletionNotification, CompletionNotifier, NotificationError};
pub use publisher::{EventPublisher, PublishError, PublishedEvent};
