use super::outcome::SourceOutcome;
use crate::constants::system::DEFAULT_SCORE_FIELD;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Value derived from the successful outcomes of an aggregation round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConsolidatedValue {
    /// No successful outcome produced a usable value
    Unknown,
    Score { value: f64, contributors: usize },
}

impl ConsolidatedValue {
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    pub fn score(&self) -> Option<f64> {
        match self {
            Self::Score { value, .. } => Some(*value),
            _ => None,
        }
    }
}

/// Folds successful outcomes into one value.
///
/// Only successful outcomes are ever passed in; an empty slice must yield
/// [`ConsolidatedValue::Unknown`].
pub trait Consolidator: Send + Sync {
    fn consolidate(&self, successful: &[&SourceOutcome]) -> ConsolidatedValue;

    fn name(&self) -> &'static str;
}

/// Averages a numeric payload field across the sources that report it
#[derive(Debug, Clone)]
pub struct AverageScoreConsolidator {
    field: String,
}

impl AverageScoreConsolidator {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }
}

impl Default for AverageScoreConsolidator {
    fn default() -> Self {
        Self::new(DEFAULT_SCORE_FIELD)
    }
}

impl Consolidator for AverageScoreConsolidator {
    fn consolidate(&self, successful: &[&SourceOutcome]) -> ConsolidatedValue {
        let scores: Vec<f64> = successful
            .iter()
            .filter_map(|outcome| outcome.payload())
            .filter_map(|payload| payload.get(&self.field))
            .filter_map(Value::as_f64)
            .filter(|score| score.is_finite())
            .collect();

        if scores.is_empty() {
            return ConsolidatedValue::Unknown;
        }

        ConsolidatedValue::Score {
            value: scores.iter().sum::<f64>() / scores.len() as f64,
            contributors: scores.len(),
        }
    }

    fn name(&self) -> &'static str {
        "average_score"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use std::time::Duration;

    fn outcome(source: &str, payload: Value) -> SourceOutcome {
        SourceOutcome::succeeded(source, None, payload, Utc::now(), Duration::ZERO)
    }

    #[test]
    fn test_average_of_reporting_sources() {
        let a = outcome("a", json!({"score": 600}));
        let b = outcome("b", json!({"score": 700.0}));
        let c = outcome("c", json!({"debts": []}));

        let value = AverageScoreConsolidator::default().consolidate(&[&a, &b, &c]);
        assert_eq!(
            value,
            ConsolidatedValue::Score {
                value: 650.0,
                contributors: 2
            }
        );
        assert_eq!(value.score(), Some(650.0));
    }

    #[test]
    fn test_empty_input_is_unknown() {
        let value = AverageScoreConsolidator::default().consolidate(&[]);
        assert!(value.is_unknown());
    }

    #[test]
    fn test_non_numeric_fields_are_ignored() {
        let a = outcome("a", json!({"risk": "high"}));
        let consolidator = AverageScoreConsolidator::new("risk");
        assert_eq!(consolidator.field(), "risk");
        assert!(consolidator.consolidate(&[&a]).is_unknown());
    }
}
