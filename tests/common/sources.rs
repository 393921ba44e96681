//! Scripted sources for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use investigation_core::aggregation::{SourceQuery, SourceResponse};
use investigation_core::resilience::ExternalCallError;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Source that replays a fixed script of responses, repeating the last one
/// once the script runs out
pub struct ScriptedSource {
    name: String,
    script: Mutex<VecDeque<Result<SourceResponse, ExternalCallError>>>,
    last: Mutex<Option<Result<SourceResponse, ExternalCallError>>>,
    delay: Option<Duration>,
    calls: AtomicU32,
}

impl ScriptedSource {
    pub fn new(name: &str, script: Vec<Result<SourceResponse, ExternalCallError>>) -> Self {
        Self {
            name: name.to_string(),
            script: Mutex::new(script.into()),
            last: Mutex::new(None),
            delay: None,
            calls: AtomicU32::new(0),
        }
    }

    pub fn ok(name: &str, payload: Value) -> Self {
        Self::new(name, vec![Ok(SourceResponse::new(payload))])
    }

    pub fn failing(name: &str, error: ExternalCallError) -> Self {
        Self::new(name, vec![Err(error)])
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    fn next_response(&self) -> Result<SourceResponse, ExternalCallError> {
        let next = self.script.lock().pop_front();
        let mut last = self.last.lock();
        match next {
            Some(response) => {
                *last = Some(response.clone());
                response
            }
            None => last
                .clone()
                .unwrap_or_else(|| Err(ExternalCallError::io("empty script"))),
        }
    }
}

#[async_trait]
impl SourceQuery for ScriptedSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, subject: &str) -> Result<Value, ExternalCallError> {
        self.fetch_response(subject).await.map(|response| response.payload)
    }

    async fn fetch_response(&self, _subject: &str) -> Result<SourceResponse, ExternalCallError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.next_response()
    }
}
