//! # Circuit Breaker Implementation
//!
//! Fault isolation for one external source. Follows the classic three state
//! pattern: Closed (normal operation), Open (failing fast) and Half-Open
//! (admitting a bounded number of probe calls).
//!
//! There is no background timer. The Open to Half-Open promotion happens
//! lazily whenever the state is observed. Admission and all counter changes
//! go through one short `parking_lot::Mutex` that is never held across an
//! await; an atomic mirror of the state serves the lock-free "is it closed"
//! fast path.

use crate::resilience::errors::{ClassifiedError, FailureKind};
use crate::resilience::{CircuitBreakerConfig, CircuitBreakerMetrics};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Lock-free lifetime counters, kept outside the state mutex
#[derive(Debug)]
struct AtomicCircuitBreakerMetrics {
    total_calls: AtomicU64,
    success_count: AtomicU64,
    failure_count: AtomicU64,
    rejected_count: AtomicU64,
    total_duration_nanos: AtomicU64,
}

impl AtomicCircuitBreakerMetrics {
    fn new() -> Self {
        Self {
            total_calls: AtomicU64::new(0),
            success_count: AtomicU64::new(0),
            failure_count: AtomicU64::new(0),
            rejected_count: AtomicU64::new(0),
            total_duration_nanos: AtomicU64::new(0),
        }
    }

    #[inline]
    fn record_success(&self, duration: Duration) {
        self.total_calls.fetch_add(1, Ordering::Relaxed);
        self.success_count.fetch_add(1, Ordering::Relaxed);
        self.add_duration(duration);
    }

    #[inline]
    fn record_failure(&self, duration: Duration) {
        self.total_calls.fetch_add(1, Ordering::Relaxed);
        self.failure_count.fetch_add(1, Ordering::Relaxed);
        self.add_duration(duration);
    }

    #[inline]
    fn record_rejection(&self) {
        self.rejected_count.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    fn add_duration(&self, duration: Duration) {
        let nanos = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
        self.total_duration_nanos.fetch_add(nanos, Ordering::Relaxed);
    }

    fn snapshot(&self, core: &BreakerCore) -> CircuitBreakerMetrics {
        let total_calls = self.total_calls.load(Ordering::Relaxed);
        let success_count = self.success_count.load(Ordering::Relaxed);
        let failure_count = self.failure_count.load(Ordering::Relaxed);
        let total_duration_nanos = self.total_duration_nanos.load(Ordering::Relaxed);

        let (failure_rate, success_rate, average_duration) = if total_calls > 0 {
            (
                failure_count as f64 / total_calls as f64,
                success_count as f64 / total_calls as f64,
                Duration::from_nanos(total_duration_nanos / total_calls),
            )
        } else {
            (0.0, 0.0, Duration::ZERO)
        };

        CircuitBreakerMetrics {
            total_calls,
            success_count,
            failure_count,
            rejected_count: self.rejected_count.load(Ordering::Relaxed),
            consecutive_failures: u64::from(core.consecutive_failures),
            half_open_calls: u64::from(core.half_open_probes),
            total_duration: Duration::from_nanos(total_duration_nanos),
            current_state: core.state,
            failure_rate,
            success_rate,
            average_duration,
        }
    }
}

/// Circuit breaker states representing the current operational mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Normal operation - all calls are allowed through
    Closed = 0,
    /// Failure mode - all calls fail fast without executing
    Open = 1,
    /// Testing recovery - limited probe calls are admitted
    HalfOpen = 2,
}

impl From<u8> for CircuitState {
    fn from(value: u8) -> Self {
        match value {
            0 => CircuitState::Closed,
            1 => CircuitState::Open,
            2 => CircuitState::HalfOpen,
            _ => CircuitState::Open, // Default to safest state
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => write!(f, "closed"),
            Self::Open => write!(f, "open"),
            Self::HalfOpen => write!(f, "half_open"),
        }
    }
}

/// Errors that can occur during circuit breaker operation
#[derive(Debug, thiserror::Error)]
pub enum CircuitBreakerError<E> {
    /// Circuit is open (or its probe budget is spent), the call was not executed
    #[error("Circuit breaker is open for {component}, retry after {retry_after:?}")]
    CircuitOpen {
        component: String,
        retry_after: Duration,
    },

    /// Operation executed, failed, and was recorded
    #[error("Operation failed: {0}")]
    OperationFailed(E),
}

impl<E: ClassifiedError> ClassifiedError for CircuitBreakerError<E> {
    fn failure_kind(&self) -> FailureKind {
        match self {
            Self::CircuitOpen { .. } => FailureKind::CircuitOpen,
            Self::OperationFailed(err) => err.failure_kind(),
        }
    }
}

/// Introspection record of one breaker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitBreakerStatus {
    pub name: String,
    pub state: CircuitState,
    /// Consecutive failures counted while closed
    pub failure_count: u32,
    pub failure_threshold: u32,
    pub recovery_timeout: Duration,
    /// Successful probes in the current half-open episode
    pub half_open_successes: u32,
    pub half_open_calls: u32,
    pub last_failure_at: Option<DateTime<Utc>>,
}

/// Mutable breaker state, only touched under the mutex
#[derive(Debug)]
struct BreakerCore {
    state: CircuitState,
    consecutive_failures: u32,
    half_open_successes: u32,
    half_open_probes: u32,
    /// Monotonic timestamp driving the recovery timeout
    last_failure: Option<Instant>,
    /// Wall clock copy of `last_failure` for reporting
    last_failure_at: Option<DateTime<Utc>>,
}

impl BreakerCore {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            half_open_successes: 0,
            half_open_probes: 0,
            last_failure: None,
            last_failure_at: None,
        }
    }

    fn reset_counters(&mut self) {
        self.consecutive_failures = 0;
        self.half_open_successes = 0;
        self.half_open_probes = 0;
    }

    fn mark_failure(&mut self) {
        self.last_failure = Some(Instant::now());
        self.last_failure_at = Some(Utc::now());
    }

    /// Time left in the open window, zero once it has elapsed
    fn remaining_open(&self, recovery_timeout: Duration) -> Duration {
        match self.last_failure {
            Some(at) => recovery_timeout.saturating_sub(at.elapsed()),
            None => Duration::ZERO,
        }
    }
}

/// Circuit breaker protecting one external source
pub struct CircuitBreaker {
    /// Service name for logging and metrics
    name: String,

    config: CircuitBreakerConfig,

    core: Mutex<BreakerCore>,

    /// Mirror of `core.state` for the lock-free fast path
    state_hint: AtomicU8,

    metrics: AtomicCircuitBreakerMetrics,
}

impl fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("state", &CircuitState::from(self.state_hint.load(Ordering::Acquire)))
            .finish()
    }
}

impl CircuitBreaker {
    /// Create a breaker. A configuration whose half-open episode could never
    /// close is normalized first (see [`CircuitBreakerConfig::normalized`]).
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        let name = name.into();
        let normalized = config.normalized();
        if normalized != config {
            warn!(
                component = %name,
                half_open_max_calls = config.half_open_max_calls,
                success_threshold = config.success_threshold,
                adjusted_success_threshold = normalized.success_threshold,
                "Circuit breaker thresholds adjusted"
            );
        }
        let config = normalized;
        info!(
            component = %name,
            failure_threshold = config.failure_threshold,
            recovery_timeout_ms = config.recovery_timeout.as_millis() as u64,
            half_open_max_calls = config.half_open_max_calls,
            success_threshold = config.success_threshold,
            "Circuit breaker initialized"
        );

        Self {
            name,
            config,
            core: Mutex::new(BreakerCore::new()),
            state_hint: AtomicU8::new(CircuitState::Closed as u8),
            metrics: AtomicCircuitBreakerMetrics::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Current state, promoting Open to HalfOpen when the recovery timeout has elapsed
    pub fn state(&self) -> CircuitState {
        if self.state_hint.load(Ordering::Acquire) == CircuitState::Closed as u8 {
            return CircuitState::Closed;
        }

        let mut core = self.core.lock();
        self.promote_if_due(&mut core);
        core.state
    }

    /// Execute an operation with circuit breaker protection.
    ///
    /// Any `Err` from the operation counts as a failure. A call that is
    /// cancelled or panics after admission is recorded as a failure too.
    pub async fn call<F, T, E, Fut>(&self, operation: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.try_acquire()
            .map_err(|retry_after| CircuitBreakerError::CircuitOpen {
                component: self.name.clone(),
                retry_after,
            })?;

        let mut in_flight = InFlightCall::new(self);
        let result = operation().await;
        let duration = in_flight.finish();

        match &result {
            Ok(_) => self.record_success(duration),
            Err(_) => self.record_failure(duration),
        }

        result.map_err(CircuitBreakerError::OperationFailed)
    }

    /// Ask for admission of one call.
    ///
    /// On rejection returns how long the caller should wait before trying
    /// again. An admitted caller must report the outcome through
    /// [`record_success`](Self::record_success) or
    /// [`record_failure`](Self::record_failure).
    pub fn try_acquire(&self) -> Result<(), Duration> {
        if self.state_hint.load(Ordering::Acquire) == CircuitState::Closed as u8 {
            return Ok(());
        }

        let mut core = self.core.lock();
        self.promote_if_due(&mut core);

        let rejection = match core.state {
            CircuitState::Closed => None,
            CircuitState::Open => Some(core.remaining_open(self.config.recovery_timeout)),
            CircuitState::HalfOpen => {
                if core.half_open_probes < self.config.half_open_max_calls {
                    core.half_open_probes += 1;
                    debug!(
                        component = %self.name,
                        probe = core.half_open_probes,
                        max_probes = self.config.half_open_max_calls,
                        "Admitting half-open probe"
                    );
                    None
                } else {
                    Some(self.config.recovery_timeout)
                }
            }
        };
        drop(core);

        match rejection {
            None => Ok(()),
            Some(retry_after) => {
                self.metrics.record_rejection();
                debug!(
                    component = %self.name,
                    retry_after_ms = retry_after.as_millis() as u64,
                    "Call rejected by circuit breaker"
                );
                Err(retry_after)
            }
        }
    }

    /// Record a successful operation
    pub fn record_success(&self, duration: Duration) {
        self.metrics.record_success(duration);

        debug!(
            component = %self.name,
            duration_ms = duration.as_millis() as u64,
            "Operation succeeded"
        );

        let mut core = self.core.lock();
        match core.state {
            CircuitState::Closed => core.consecutive_failures = 0,
            CircuitState::HalfOpen => {
                core.half_open_successes += 1;
                if core.half_open_successes >= self.config.success_threshold {
                    self.transition_to_closed(&mut core);
                }
            }
            CircuitState::Open => {
                // A probe that finished after a sibling probe reopened the circuit
                debug!(component = %self.name, "Success recorded while circuit is open");
            }
        }
    }

    /// Record a failed operation
    pub fn record_failure(&self, duration: Duration) {
        self.metrics.record_failure(duration);

        warn!(
            component = %self.name,
            duration_ms = duration.as_millis() as u64,
            "Operation failed"
        );

        let mut core = self.core.lock();
        match core.state {
            CircuitState::Closed => {
                core.consecutive_failures += 1;
                core.mark_failure();
                if core.consecutive_failures >= self.config.failure_threshold {
                    self.transition_to_open(&mut core);
                }
            }
            CircuitState::HalfOpen => {
                core.mark_failure();
                self.transition_to_open(&mut core);
            }
            CircuitState::Open => {
                // Already open; the window is not extended
            }
        }
    }

    /// Force the breaker back to Closed and clear every counter
    pub fn reset(&self) {
        let mut core = self.core.lock();
        let previous = core.state;
        core.reset_counters();
        core.last_failure = None;
        core.last_failure_at = None;
        self.set_state(&mut core, CircuitState::Closed);

        warn!(
            component = %self.name,
            previous_state = %previous,
            "Circuit breaker manually reset"
        );
    }

    pub fn status(&self) -> CircuitBreakerStatus {
        let mut core = self.core.lock();
        self.promote_if_due(&mut core);

        CircuitBreakerStatus {
            name: self.name.clone(),
            state: core.state,
            failure_count: core.consecutive_failures,
            failure_threshold: self.config.failure_threshold,
            recovery_timeout: self.config.recovery_timeout,
            half_open_successes: core.half_open_successes,
            half_open_calls: core.half_open_probes,
            last_failure_at: core.last_failure_at,
        }
    }

    /// Current metrics snapshot
    pub fn metrics(&self) -> CircuitBreakerMetrics {
        let mut core = self.core.lock();
        self.promote_if_due(&mut core);
        self.metrics.snapshot(&core)
    }

    /// Same rule as [`CircuitBreakerMetrics::is_healthy`], applied to a fresh snapshot
    pub fn is_healthy(&self) -> bool {
        self.metrics().is_healthy()
    }

    fn promote_if_due(&self, core: &mut BreakerCore) {
        if core.state == CircuitState::Open
            && core.remaining_open(self.config.recovery_timeout).is_zero()
        {
            core.half_open_successes = 0;
            core.half_open_probes = 0;
            self.set_state(core, CircuitState::HalfOpen);

            info!(
                component = %self.name,
                half_open_max_calls = self.config.half_open_max_calls,
                success_threshold = self.config.success_threshold,
                "Circuit breaker half-open (probing recovery)"
            );
        }
    }

    fn transition_to_open(&self, core: &mut BreakerCore) {
        let consecutive_failures = core.consecutive_failures;
        core.reset_counters();
        self.set_state(core, CircuitState::Open);

        error!(
            component = %self.name,
            consecutive_failures = consecutive_failures,
            failure_threshold = self.config.failure_threshold,
            recovery_timeout_ms = self.config.recovery_timeout.as_millis() as u64,
            "Circuit breaker opened (failing fast)"
        );
    }

    fn transition_to_closed(&self, core: &mut BreakerCore) {
        core.reset_counters();
        self.set_state(core, CircuitState::Closed);

        info!(
            component = %self.name,
            total_calls = self.metrics.total_calls.load(Ordering::Relaxed),
            "Circuit breaker closed (recovered)"
        );
    }

    fn set_state(&self, core: &mut BreakerCore, state: CircuitState) {
        core.state = state;
        self.state_hint.store(state as u8, Ordering::Release);
    }
}

/// Records a failure if an admitted call never reports back
struct InFlightCall<'a> {
    breaker: &'a CircuitBreaker,
    started: Instant,
    armed: bool,
}

impl<'a> InFlightCall<'a> {
    fn new(breaker: &'a CircuitBreaker) -> Self {
        Self {
            breaker,
            started: Instant::now(),
            armed: true,
        }
    }

    fn finish(&mut self) -> Duration {
        self.armed = false;
        self.started.elapsed()
    }
}

impl Drop for InFlightCall<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.breaker.record_failure(self.started.elapsed());
        }
    }
}
