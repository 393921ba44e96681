use crate::aggregation::SourceOutcome;
use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AuditError {
    #[error("Audit record rejected: {0}")]
    Rejected(String),

    #[error("Audit record serialization failed: {0}")]
    Serialization(String),
}

/// Receives every source outcome produced while working an investigation
#[async_trait]
pub trait SourceAuditSink: Send + Sync {
    async fn record(&self, investigation_id: Uuid, outcome: &SourceOutcome) -> Result<(), AuditError>;
}

/// Discards audit records
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAuditSink;

#[async_trait]
impl SourceAuditSink for NoopAuditSink {
    async fn record(&self, _investigation_id: Uuid, _outcome: &SourceOutcome) -> Result<(), AuditError> {
        Ok(())
    }
}
