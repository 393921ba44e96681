//! Investigation categories
//!
//! A category is one unit of an investigation run: either a single guarded
//! source or an aggregation round over several sources. Each reports how many
//! entities it found plus every source outcome it produced.

use crate::aggregation::aggregator::consult;
use crate::aggregation::{ConsolidatedValue, MultiSourceAggregator, SourceOutcome, SourceQuery};
use crate::resilience::{ResilienceContext, ResilientCallGuard};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

/// What a category produced
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryOutput {
    pub entity_count: u64,
    pub outcomes: Vec<SourceOutcome>,
    /// Set by aggregated categories
    pub consolidated: Option<ConsolidatedValue>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CategoryError {
    /// The category's sources were unavailable. The run continues without it.
    #[error("Category unavailable: {message}")]
    Source {
        message: String,
        outcomes: Vec<SourceOutcome>,
    },

    /// A bug or broken invariant. The run is failed.
    #[error("Category defect: {0}")]
    Defect(String),
}

impl CategoryError {
    pub fn source(message: impl Into<String>) -> Self {
        Self::Source {
            message: message.into(),
            outcomes: Vec::new(),
        }
    }

    pub fn defect(message: impl Into<String>) -> Self {
        Self::Defect(message.into())
    }

    pub fn is_defect(&self) -> bool {
        matches!(self, Self::Defect(_))
    }
}

/// One category of an investigation, run against the target document
#[async_trait]
pub trait CategoryQuery: Send + Sync {
    /// Key of the category's entity counter
    fn name(&self) -> &str;

    async fn run(&self, subject: &str) -> Result<CategoryOutput, CategoryError>;
}

/// Number of entities in a payload.
///
/// With `field` set, counts the elements of that array field (a missing
/// field counts as zero). Otherwise an array counts its elements, `null`
/// counts zero, and any other value counts one.
pub fn count_entities(payload: &Value, field: Option<&str>) -> u64 {
    let target = match field {
        Some(field) => match payload.get(field) {
            Some(value) => value,
            None => return 0,
        },
        None => payload,
    };

    match target {
        Value::Array(items) => items.len() as u64,
        Value::Null => 0,
        _ => 1,
    }
}

/// Category backed by a single source behind its resilient call guard
#[derive(Clone)]
pub struct GuardedSourceCategory {
    name: String,
    source: Arc<dyn SourceQuery>,
    guard: ResilientCallGuard,
    entity_field: Option<String>,
}

impl std::fmt::Debug for GuardedSourceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardedSourceCategory")
            .field("name", &self.name)
            .field("source", &self.source.name())
            .field("entity_field", &self.entity_field)
            .finish()
    }
}

impl GuardedSourceCategory {
    /// Category named after the source, sharing the registry's breaker for it
    pub fn new(source: Arc<dyn SourceQuery>, resilience: &ResilienceContext) -> Self {
        let guard = resilience.guard(source.name());
        Self {
            name: source.name().to_string(),
            source,
            guard,
            entity_field: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_entity_field(mut self, field: impl Into<String>) -> Self {
        self.entity_field = Some(field.into());
        self
    }
}

#[async_trait]
impl CategoryQuery for GuardedSourceCategory {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, subject: &str) -> Result<CategoryOutput, CategoryError> {
        let outcome = consult(Arc::clone(&self.source), self.guard.clone(), Arc::from(subject)).await;

        if let Some(payload) = outcome.payload() {
            let entity_count = count_entities(payload, self.entity_field.as_deref());
            return Ok(CategoryOutput {
                entity_count,
                outcomes: vec![outcome],
                consolidated: None,
            });
        }

        let message = outcome
            .error()
            .map(|e| e.message.clone())
            .unwrap_or_else(|| format!("{} returned no payload", self.source.name()));
        Err(CategoryError::Source {
            message,
            outcomes: vec![outcome],
        })
    }
}

/// Category backed by an aggregation round over several sources.
///
/// Entities are summed over the successful outcomes. The category is
/// unavailable only when every source failed.
#[derive(Debug, Clone)]
pub struct AggregatedCategory {
    name: String,
    aggregator: MultiSourceAggregator,
    entity_field: Option<String>,
}

impl AggregatedCategory {
    pub fn new(name: impl Into<String>, aggregator: MultiSourceAggregator) -> Self {
        Self {
            name: name.into(),
            aggregator,
            entity_field: None,
        }
    }

    pub fn with_entity_field(mut self, field: impl Into<String>) -> Self {
        self.entity_field = Some(field.into());
        self
    }

    pub fn aggregator(&self) -> &MultiSourceAggregator {
        &self.aggregator
    }
}

#[async_trait]
impl CategoryQuery for AggregatedCategory {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, subject: &str) -> Result<CategoryOutput, CategoryError> {
        let result = self.aggregator.aggregate(subject).await;

        if result.is_empty() {
            return Err(CategoryError::defect(format!(
                "aggregated category '{}' has no sources",
                self.name
            )));
        }

        if result.all_failed() {
            let failed = result.len();
            return Err(CategoryError::Source {
                message: format!("all {failed} sources of '{}' failed", self.name),
                outcomes: result.into_outcomes().into_values().collect(),
            });
        }

        let entity_count = result
            .successful()
            .iter()
            .filter_map(|outcome| outcome.payload())
            .map(|payload| count_entities(payload, self.entity_field.as_deref()))
            .sum::<u64>();
        let consolidated = result.consolidated().clone();

        Ok(CategoryOutput {
            entity_count,
            outcomes: result.into_outcomes().into_values().collect(),
            consolidated: Some(consolidated),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::AverageScoreConsolidator;
    use crate::resilience::{BackoffPolicy, CircuitBreakerRegistry, ExternalCallError, RetryPolicy};
    use serde_json::json;
    use std::time::Duration;

    struct FixedSource {
        name: &'static str,
        result: Result<Value, ExternalCallError>,
    }

    #[async_trait]
    impl SourceQuery for FixedSource {
        fn name(&self) -> &str {
            self.name
        }

        async fn fetch(&self, _subject: &str) -> Result<Value, ExternalCallError> {
            self.result.clone()
        }
    }

    fn context() -> ResilienceContext {
        ResilienceContext::new(
            CircuitBreakerRegistry::default(),
            RetryPolicy::new(
                0,
                BackoffPolicy::new(Duration::from_millis(1), Duration::from_millis(1), 2.0, false),
            ),
        )
    }

    fn source(name: &'static str, result: Result<Value, ExternalCallError>) -> Arc<dyn SourceQuery> {
        Arc::new(FixedSource { name, result })
    }

    #[test]
    fn test_count_entities() {
        assert_eq!(count_entities(&json!([1, 2, 3]), None), 3);
        assert_eq!(count_entities(&json!(null), None), 0);
        assert_eq!(count_entities(&json!({"owner": "x"}), None), 1);
        assert_eq!(count_entities(&json!({"lawsuits": [{}, {}]}), Some("lawsuits")), 2);
        assert_eq!(count_entities(&json!({"other": []}), Some("lawsuits")), 0);
    }

    #[tokio::test]
    async fn test_guarded_category_counts_entities() {
        let category = GuardedSourceCategory::new(
            source("tribunal", Ok(json!({"lawsuits": [{"id": 1}, {"id": 2}]}))),
            &context(),
        )
        .named("lawsuits")
        .with_entity_field("lawsuits");

        let output = category.run("12345678901").await.unwrap();
        assert_eq!(category.name(), "lawsuits");
        assert_eq!(output.entity_count, 2);
        assert_eq!(output.outcomes.len(), 1);
        assert!(output.consolidated.is_none());
    }

    #[tokio::test]
    async fn test_guarded_category_failure_is_a_source_error() {
        let category = GuardedSourceCategory::new(
            source("land_registry", Err(ExternalCallError::business("document not found"))),
            &context(),
        );

        let err = category.run("12345678901").await.unwrap_err();
        assert!(!err.is_defect());
        match err {
            CategoryError::Source { message, outcomes } => {
                assert!(message.contains("document not found"));
                assert_eq!(outcomes.len(), 1);
                assert!(!outcomes[0].is_success());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_aggregated_category_sums_successes() {
        let resilience = context();
        let aggregator = MultiSourceAggregator::new(
            vec![
                source("bureau_a", Ok(json!({"score": 500, "debts": [1, 2]}))),
                source("bureau_b", Ok(json!({"score": 700, "debts": [3]}))),
                source("bureau_c", Err(ExternalCallError::connection("refused"))),
            ],
            resilience,
            Arc::new(AverageScoreConsolidator::default()),
        )
        .unwrap();
        let category = AggregatedCategory::new("debts", aggregator).with_entity_field("debts");

        let output = category.run("12345678901").await.unwrap();
        assert_eq!(output.entity_count, 3);
        assert_eq!(output.outcomes.len(), 3);
        assert_eq!(output.consolidated.and_then(|c| c.score()), Some(600.0));
    }

    #[tokio::test]
    async fn test_aggregated_category_all_failed_is_unavailable() {
        let aggregator = MultiSourceAggregator::new(
            vec![
                source("bureau_a", Err(ExternalCallError::io("closed"))),
                source("bureau_b", Err(ExternalCallError::business("blocked"))),
            ],
            context(),
            Arc::new(AverageScoreConsolidator::default()),
        )
        .unwrap();

        let err = AggregatedCategory::new("debts", aggregator)
            .run("12345678901")
            .await
            .unwrap_err();
        match err {
            CategoryError::Source { outcomes, .. } => assert_eq!(outcomes.len(), 2),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
