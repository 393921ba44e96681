//! # Multi-Source Aggregation
//!
//! Fans one subject out to several independent sources concurrently. Each
//! source is consulted through its own [`ResilientCallGuard`], yields exactly
//! one [`SourceOutcome`], and the successful outcomes are folded by a
//! [`Consolidator`].
//!
//! [`ResilientCallGuard`]: crate::resilience::ResilientCallGuard

pub mod aggregator;
pub mod consolidator;
pub mod outcome;
pub mod source;

pub use aggregator::{AggregatedResult, AggregationError, MultiSourceAggregator};
pub use consolidator::{AverageScoreConsolidator, ConsolidatedValue, Consolidator};
pub use outcome::{SourceErrorSummary, SourceOutcome};
pub use source::{SourceQuery, SourceResponse};
