//! # Resilience Module
//!
//! Fault tolerance for calls to unreliable third-party sources. One saturated
//! source must never cascade into a failed investigation.
//!
//! ## Architecture
//!
//! - **Backoff**: exponential delay sequence with optional jitter
//! - **Retry**: re-runs transient failures, classified by [`FailureKind`]
//! - **Circuit Breakers**: isolate a failing source and fail fast until it recovers
//! - **Guard**: retry over breaker composition used for every external call
//! - **Registry**: one shared breaker per service name, plus metrics and health
//!
//! ## Usage
//!
//! ```rust,no_run
//! use investigation_core::resilience::{
//!     CircuitBreakerRegistry, ExternalCallError, ResilienceContext, RetryPolicy,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let context = ResilienceContext::new(CircuitBreakerRegistry::default(), RetryPolicy::default());
//! let guard = context.guard("land_registry");
//!
//! let payload = guard
//!     .execute(|| async {
//!         // transport call here
//!         Ok::<_, ExternalCallError>(serde_json::json!({ "parcels": 2 }))
//!     })
//!     .await?;
//! # let _ = payload;
//! # Ok(())
//! # }
//! ```

pub mod backoff;
pub mod circuit_breaker;
pub mod config;
pub mod errors;
pub mod guard;
pub mod metrics;
pub mod registry;
pub mod retry;

pub use backoff::{calculate_backoff, BackoffPolicy};
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerError, CircuitBreakerStatus, CircuitState};
pub use config::CircuitBreakerConfig;
pub use errors::{ClassifiedError, ExternalCallError, FailureKind, ResilienceError};
pub use guard::{ResilienceContext, ResilientCallGuard};
pub use metrics::{CircuitBreakerMetrics, SystemCircuitBreakerMetrics};
pub use registry::CircuitBreakerRegistry;
pub use retry::{RetryAttempt, RetryError, RetryExecutor, RetryObserver, RetryPolicy, RetryTrigger};
