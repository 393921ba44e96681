use super::consolidator::{ConsolidatedValue, Consolidator};
use super::outcome::{SourceErrorSummary, SourceOutcome};
use super::source::{SourceQuery, SourceResponse};
use crate::resilience::{ResilienceContext, ResilientCallGuard};
use chrono::Utc;
use futures::future::join_all;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AggregationError {
    #[error("Source '{name}' registered more than once")]
    DuplicateSource { name: String },
}

/// Outcomes of one aggregation round keyed by source name, plus the value
/// consolidated from the successful ones
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedResult {
    outcomes: BTreeMap<String, SourceOutcome>,
    consolidated: ConsolidatedValue,
}

impl AggregatedResult {
    pub fn outcomes(&self) -> &BTreeMap<String, SourceOutcome> {
        &self.outcomes
    }

    pub fn outcome(&self, source: &str) -> Option<&SourceOutcome> {
        self.outcomes.get(source)
    }

    pub fn consolidated(&self) -> &ConsolidatedValue {
        &self.consolidated
    }

    pub fn successful(&self) -> Vec<&SourceOutcome> {
        self.outcomes.values().filter(|o| o.is_success()).collect()
    }

    pub fn failed(&self) -> Vec<&SourceOutcome> {
        self.outcomes.values().filter(|o| !o.is_success()).collect()
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// True when at least one source was consulted and none succeeded
    pub fn all_failed(&self) -> bool {
        !self.outcomes.is_empty() && self.outcomes.values().all(|o| !o.is_success())
    }

    pub fn into_outcomes(self) -> BTreeMap<String, SourceOutcome> {
        self.outcomes
    }
}

/// Consults a fixed set of sources concurrently, each behind its own
/// resilient call guard, and folds the outcomes.
///
/// A failing or panicking source never cancels its siblings and never fails
/// the round: it yields a failed [`SourceOutcome`] instead.
#[derive(Clone)]
pub struct MultiSourceAggregator {
    sources: Vec<Arc<dyn SourceQuery>>,
    resilience: ResilienceContext,
    consolidator: Arc<dyn Consolidator>,
}

impl std::fmt::Debug for MultiSourceAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiSourceAggregator")
            .field("sources", &self.source_names())
            .field("consolidator", &self.consolidator.name())
            .finish()
    }
}

impl MultiSourceAggregator {
    pub fn new(
        sources: Vec<Arc<dyn SourceQuery>>,
        resilience: ResilienceContext,
        consolidator: Arc<dyn Consolidator>,
    ) -> Result<Self, AggregationError> {
        let mut seen = HashSet::with_capacity(sources.len());
        for source in &sources {
            if !seen.insert(source.name().to_string()) {
                return Err(AggregationError::DuplicateSource {
                    name: source.name().to_string(),
                });
            }
        }

        Ok(Self {
            sources,
            resilience,
            consolidator,
        })
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Query every source for `subject` and wait for all of them
    #[instrument(skip(self), fields(sources = self.sources.len()))]
    pub async fn aggregate(&self, subject: &str) -> AggregatedResult {
        let subject: Arc<str> = Arc::from(subject);
        let started = Utc::now();
        let clock = Instant::now();

        let (names, handles): (Vec<String>, Vec<_>) = self
            .sources
            .iter()
            .map(|source| {
                let source = Arc::clone(source);
                let guard = self.resilience.guard(source.name());
                let subject = Arc::clone(&subject);
                let name = source.name().to_string();
                (name, tokio::spawn(consult(source, guard, subject)))
            })
            .unzip();

        let results = join_all(handles).await;

        let mut outcomes = BTreeMap::new();
        for (name, joined) in names.into_iter().zip(results) {
            let outcome = joined.unwrap_or_else(|join_error| {
                error!(
                    source = %name,
                    error = %join_error,
                    "Source query task panicked"
                );
                SourceOutcome::failed(
                    name.clone(),
                    SourceErrorSummary::aborted(format!("source query task failed: {join_error}")),
                    started,
                    clock.elapsed(),
                )
            });
            outcomes.insert(name, outcome);
        }

        let successful: Vec<&SourceOutcome> = outcomes.values().filter(|o| o.is_success()).collect();
        let consolidated = self.consolidator.consolidate(&successful);

        info!(
            subject = %subject,
            consulted = outcomes.len(),
            succeeded = successful.len(),
            unknown = consolidated.is_unknown(),
            elapsed_ms = clock.elapsed().as_millis() as u64,
            "Aggregation round finished"
        );

        AggregatedResult {
            outcomes,
            consolidated,
        }
    }
}

pub(crate) async fn consult(
    source: Arc<dyn SourceQuery>,
    guard: ResilientCallGuard,
    subject: Arc<str>,
) -> SourceOutcome {
    let consulted_at = Utc::now();
    let clock = Instant::now();

    let result = guard
        .execute_with_status(
            || source.fetch_response(&subject),
            |response: &SourceResponse| response.status,
        )
        .await;

    match result {
        Ok(response) => {
            debug!(source = %source.name(), status = ?response.status, "Source consulted");
            SourceOutcome::succeeded(
                source.name(),
                response.status,
                response.payload,
                consulted_at,
                clock.elapsed(),
            )
        }
        Err(err) => {
            warn!(source = %source.name(), error = %err, "Source unavailable");
            SourceOutcome::failed(
                source.name(),
                SourceErrorSummary::from(&err),
                consulted_at,
                clock.elapsed(),
            )
        }
    }
}
