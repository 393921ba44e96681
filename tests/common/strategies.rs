//! Proptest strategies for resilience properties

#![allow(dead_code)]

use investigation_core::resilience::BackoffPolicy;
use proptest::prelude::*;
use std::time::Duration;

/// Backoff policies with base delay no larger than max delay
pub fn backoff_policy_strategy(jitter: bool) -> impl Strategy<Value = BackoffPolicy> {
    (1u64..=5_000, 0u64..=60_000, 1.0f64..=4.0).prop_map(move |(base_ms, extra_ms, exponent)| {
        BackoffPolicy::new(
            Duration::from_millis(base_ms),
            Duration::from_millis(base_ms + extra_ms),
            exponent,
            jitter,
        )
    })
}

/// One step against a breaker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerOp {
    Success,
    Failure,
}

pub fn breaker_ops_strategy(max_len: usize) -> impl Strategy<Value = Vec<BreakerOp>> {
    prop::collection::vec(
        prop_oneof![Just(BreakerOp::Success), Just(BreakerOp::Failure)],
        0..max_len,
    )
}
