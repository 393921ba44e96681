mod common;

use common::strategies::*;
use investigation_core::resilience::{
    BackoffPolicy, CircuitBreaker, CircuitBreakerConfig, CircuitState, ExternalCallError,
    FailureKind, RetryError, RetryExecutor, RetryPolicy,
};
use proptest::prelude::*;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

fn zero_delay_policy(max_retries: u32) -> RetryPolicy {
    RetryPolicy::new(
        max_retries,
        BackoffPolicy::new(Duration::ZERO, Duration::ZERO, 2.0, false),
    )
    .with_retryable_kinds([FailureKind::Connection, FailureKind::Timeout, FailureKind::Io])
}

proptest! {
    /// Property: without jitter delays never shrink and never exceed the cap
    #[test]
    fn deterministic_backoff_is_monotonic_and_capped(policy in backoff_policy_strategy(false)) {
        let mut previous = Duration::ZERO;
        for attempt in 0..32 {
            let delay = policy.delay_for_attempt(attempt);
            prop_assert!(delay >= previous, "attempt {} shrank: {:?} < {:?}", attempt, delay, previous);
            prop_assert!(delay <= policy.max_delay);
            previous = delay;
        }
    }

    /// Property: jittered delays stay within [0.5 x delay, delay)
    #[test]
    fn jittered_backoff_stays_in_band(policy in backoff_policy_strategy(true), attempt in 0u32..16) {
        let undithered = policy.undithered_delay(attempt);
        let delay = policy.delay_for_attempt(attempt);
        prop_assert!(delay >= undithered.mul_f64(0.5), "{:?} below half of {:?}", delay, undithered);
        prop_assert!(delay < undithered, "{:?} not below {:?}", delay, undithered);
    }

    /// Property: the breaker opens exactly when consecutive failures reach
    /// the threshold and never rejects while closed
    #[test]
    fn breaker_follows_consecutive_failure_model(
        threshold in 1u32..6,
        ops in breaker_ops_strategy(40),
    ) {
        let breaker = CircuitBreaker::new(
            "property",
            CircuitBreakerConfig::new(threshold, Duration::from_secs(3_600)),
        );
        let mut consecutive = 0u32;
        let mut open = false;

        for op in ops {
            if open {
                prop_assert!(breaker.try_acquire().is_err());
                continue;
            }

            prop_assert!(breaker.try_acquire().is_ok(), "closed breaker rejected a call");
            match op {
                BreakerOp::Success => {
                    breaker.record_success(Duration::from_millis(1));
                    consecutive = 0;
                }
                BreakerOp::Failure => {
                    breaker.record_failure(Duration::from_millis(1));
                    consecutive += 1;
                    open = consecutive >= threshold;
                }
            }

            let expected = if open { CircuitState::Open } else { CircuitState::Closed };
            prop_assert_eq!(breaker.state(), expected);
        }
    }

    /// Property: an always-retryable failure is invoked exactly n + 1 times
    #[test]
    fn retryable_failures_are_attempted_max_retries_plus_one(max_retries in 0u32..6) {
        let executor = RetryExecutor::new(zero_delay_policy(max_retries));
        let calls = AtomicU32::new(0);

        let result = tokio_test::block_on(executor.execute(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(ExternalCallError::connection("connection reset")) }
        }));

        prop_assert_eq!(calls.load(Ordering::SeqCst), max_retries + 1);
        let exhausted = matches!(result, Err(RetryError::Exhausted { attempts, .. }) if attempts == max_retries + 1);
        prop_assert!(exhausted);
    }

    /// Property: a non-retryable failure is invoked exactly once
    #[test]
    fn non_retryable_failures_are_attempted_once(max_retries in 0u32..6) {
        let executor = RetryExecutor::new(zero_delay_policy(max_retries));
        let calls = AtomicU32::new(0);

        let result = tokio_test::block_on(executor.execute(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(ExternalCallError::business("document unknown to source")) }
        }));

        prop_assert_eq!(calls.load(Ordering::SeqCst), 1);
        prop_assert!(matches!(result, Err(RetryError::NonRetryable(_))));
    }
}
