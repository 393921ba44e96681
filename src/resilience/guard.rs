//! # Resilient Call Guard
//!
//! Composes the retry executor over a shared circuit breaker:
//!
//! ```text
//! RetryExecutor( CircuitBreaker( operation ) )
//! ```
//!
//! The breaker sits innermost so every attempt, retries included, is admitted
//! or rejected by the shared breaker. A breaker rejection is never retryable,
//! so once a circuit is open a guarded call fails fast on its first attempt.

use crate::config::InvestigationCoreConfig;
use crate::resilience::errors::{ExternalCallError, ResilienceError};
use crate::resilience::retry::{RetryError, RetryExecutor, RetryObserver, RetryPolicy};
use crate::resilience::{CircuitBreaker, CircuitBreakerError, CircuitBreakerRegistry};
use std::future::Future;
use std::sync::Arc;

/// Retry-over-breaker protection for calls to one service
#[derive(Debug, Clone)]
pub struct ResilientCallGuard {
    service: String,
    breaker: Arc<CircuitBreaker>,
    executor: RetryExecutor,
}

impl ResilientCallGuard {
    pub fn new(service: impl Into<String>, breaker: Arc<CircuitBreaker>, policy: RetryPolicy) -> Self {
        Self {
            service: service.into(),
            breaker,
            executor: RetryExecutor::new(policy),
        }
    }

    pub fn with_observer(mut self, observer: RetryObserver) -> Self {
        self.executor = self.executor.with_observer(observer);
        self
    }

    pub fn service_name(&self) -> &str {
        &self.service
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        self.executor.policy()
    }

    /// Run `operation` under retry and breaker protection
    pub async fn execute<F, Fut, T>(&self, operation: F) -> Result<T, ResilienceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ExternalCallError>>,
    {
        self.execute_with_status(operation, |_: &T| None).await
    }

    /// Like [`execute`](Self::execute), also retrying when `status_of`
    /// reports a retryable status code on a successful value
    pub async fn execute_with_status<F, Fut, T, S>(
        &self,
        mut operation: F,
        status_of: S,
    ) -> Result<T, ResilienceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ExternalCallError>>,
        S: Fn(&T) -> Option<u16>,
    {
        let breaker: &CircuitBreaker = &self.breaker;
        let attempt = move || {
            let call = operation();
            breaker.call(move || call)
        };

        self.executor
            .execute_with_status(attempt, status_of)
            .await
            .map_err(|err| self.to_resilience_error(err))
    }

    fn to_resilience_error(
        &self,
        err: RetryError<CircuitBreakerError<ExternalCallError>>,
    ) -> ResilienceError {
        let service = self.service.clone();
        match err {
            RetryError::NonRetryable(CircuitBreakerError::CircuitOpen { retry_after, .. })
            | RetryError::Exhausted {
                last_cause: CircuitBreakerError::CircuitOpen { retry_after, .. },
                ..
            } => ResilienceError::CircuitOpen {
                service,
                retry_after,
            },
            RetryError::NonRetryable(CircuitBreakerError::OperationFailed(cause)) => {
                ResilienceError::Rejected { service, cause }
            }
            RetryError::Exhausted {
                attempts,
                last_cause: CircuitBreakerError::OperationFailed(last_cause),
            } => ResilienceError::RetriesExhausted {
                service,
                attempts,
                last_cause,
            },
        }
    }
}

/// Shared resilience wiring: one breaker registry plus the retry policy and
/// observer applied to every guard built from it
#[derive(Clone)]
pub struct ResilienceContext {
    registry: CircuitBreakerRegistry,
    retry_policy: RetryPolicy,
    observer: Option<RetryObserver>,
}

impl std::fmt::Debug for ResilienceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResilienceContext")
            .field("registry", &self.registry)
            .field("retry_policy", &self.retry_policy)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

impl ResilienceContext {
    pub fn new(registry: CircuitBreakerRegistry, retry_policy: RetryPolicy) -> Self {
        Self {
            registry,
            retry_policy,
            observer: None,
        }
    }

    pub fn from_config(config: &InvestigationCoreConfig) -> Self {
        Self::new(
            CircuitBreakerRegistry::from_config(config),
            config.retry.to_retry_policy(),
        )
    }

    pub fn with_observer(mut self, observer: RetryObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Guard for `service`, sharing the registry's breaker for that name
    pub fn guard(&self, service: &str) -> ResilientCallGuard {
        let breaker = self.registry.get_or_create(service);
        let guard = ResilientCallGuard::new(service, breaker, self.retry_policy.clone());
        match &self.observer {
            Some(observer) => guard.with_observer(Arc::clone(observer)),
            None => guard,
        }
    }

    pub fn registry(&self) -> &CircuitBreakerRegistry {
        &self.registry
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }
}
