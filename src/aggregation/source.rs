use crate::resilience::ExternalCallError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Response of one source, optionally carrying the HTTP status it arrived with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceResponse {
    pub status: Option<u16>,
    pub payload: Value,
}

impl SourceResponse {
    pub fn new(payload: Value) -> Self {
        Self {
            status: None,
            payload,
        }
    }

    pub fn with_status(status: u16, payload: Value) -> Self {
        Self {
            status: Some(status),
            payload,
        }
    }
}

impl From<Value> for SourceResponse {
    fn from(payload: Value) -> Self {
        Self::new(payload)
    }
}

/// One named external data source queried by subject identifier.
///
/// Implementations own transport and parsing; they classify failures into
/// [`ExternalCallError`] where the raw call returns.
#[async_trait]
pub trait SourceQuery: Send + Sync {
    /// Unique source name, also the circuit breaker key
    fn name(&self) -> &str;

    async fn fetch(&self, subject: &str) -> Result<Value, ExternalCallError>;

    /// Sources that surface response status codes override this so that
    /// retryable statuses (429, 503, ...) reach the retry layer
    async fn fetch_response(&self, subject: &str) -> Result<SourceResponse, ExternalCallError> {
        self.fetch(subject).await.map(SourceResponse::new)
    }
}
