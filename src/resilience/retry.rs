//! # Retry Executor
//!
//! Executes one asynchronous operation up to `1 + max_retries` times, sleeping
//! according to a [`BackoffPolicy`] between attempts.
//!
//! Only failures whose [`FailureKind`] is in the policy's retryable set are
//! retried. Everything else, including a circuit breaker rejection, is handed
//! back on the first attempt without sleeping. Operations whose success value
//! carries a status code may also be retried on configured status codes; once
//! attempts run out the last value is returned as a degraded success.

use crate::resilience::backoff::BackoffPolicy;
use crate::resilience::errors::{ClassifiedError, FailureKind};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Retry behavior for one guarded call
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,

    /// Delay sequence between attempts
    pub backoff: BackoffPolicy,

    /// Failure kinds considered transient
    pub retryable_kinds: HashSet<FailureKind>,

    /// Status codes on a successful response that warrant another attempt
    pub retryable_status_codes: HashSet<u16>,
}

impl RetryPolicy {
    /// Policy retrying connection, timeout and I/O failures
    pub fn new(max_retries: u32, backoff: BackoffPolicy) -> Self {
        Self {
            max_retries,
            backoff,
            retryable_kinds: FailureKind::default_retryable().into_iter().collect(),
            retryable_status_codes: HashSet::new(),
        }
    }

    pub fn with_retryable_kinds(mut self, kinds: impl IntoIterator<Item = FailureKind>) -> Self {
        self.retryable_kinds = kinds.into_iter().collect();
        self
    }

    pub fn with_retryable_status_codes(mut self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.retryable_status_codes = codes.into_iter().collect();
        self
    }

    /// Total invocations allowed, first attempt included
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Circuit breaker rejections are never retryable regardless of configuration
    pub fn is_retryable(&self, kind: FailureKind) -> bool {
        kind != FailureKind::CircuitOpen && self.retryable_kinds.contains(&kind)
    }

    pub fn is_retryable_status(&self, status: u16) -> bool {
        self.retryable_status_codes.contains(&status)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(
            crate::constants::system::DEFAULT_MAX_RETRIES,
            BackoffPolicy::default(),
        )
    }
}

/// What caused a retry to be scheduled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RetryTrigger {
    /// The operation failed with a retryable kind
    Failure { kind: FailureKind, message: String },
    /// The operation returned a retryable status code
    Status { code: u16 },
}

/// Ephemeral record of one scheduled retry, handed to the observer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryAttempt {
    /// 1-based number of the attempt that just ended
    pub attempt: u32,
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub exponential_base: f64,
    pub jitter: bool,
    pub trigger: RetryTrigger,
    /// Sleep about to happen before the next attempt
    pub delay: Duration,
}

impl RetryAttempt {
    /// Failure kind behind the retry, `None` for status-code retries
    pub fn cause(&self) -> Option<FailureKind> {
        match &self.trigger {
            RetryTrigger::Failure { kind, .. } => Some(*kind),
            RetryTrigger::Status { .. } => None,
        }
    }
}

/// Telemetry hook invoked before every backoff sleep. Must not block.
pub type RetryObserver = Arc<dyn Fn(&RetryAttempt) + Send + Sync>;

/// Terminal outcome of a retried operation
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// Every attempt failed with a retryable kind
    #[error("Retries exhausted after {attempts} attempts: {last_cause}")]
    Exhausted { attempts: u32, last_cause: E },

    /// The failure was not retryable and was returned on the spot
    #[error("Non-retryable failure: {0}")]
    NonRetryable(E),
}

/// Runs operations under a [`RetryPolicy`]
#[derive(Clone)]
pub struct RetryExecutor {
    policy: RetryPolicy,
    observer: Option<RetryObserver>,
}

impl fmt::Debug for RetryExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryExecutor")
            .field("policy", &self.policy)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: RetryObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Execute an operation whose success value carries no status code
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: ClassifiedError + fmt::Display,
    {
        self.execute_with_status(operation, |_: &T| None).await
    }

    /// Execute an operation, also retrying when `status_of` reports a
    /// retryable status code on a successful value
    pub async fn execute_with_status<F, Fut, T, E, S>(
        &self,
        mut operation: F,
        status_of: S,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: ClassifiedError + fmt::Display,
        S: Fn(&T) -> Option<u16>,
    {
        let max_attempts = self.policy.max_attempts();
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            match operation().await {
                Ok(value) => {
                    let retryable_status =
                        status_of(&value).filter(|code| self.policy.is_retryable_status(*code));

                    match retryable_status {
                        Some(code) if attempt < max_attempts => {
                            self.wait_before_retry(attempt, RetryTrigger::Status { code })
                                .await;
                        }
                        Some(code) => {
                            warn!(
                                status = code,
                                attempts = attempt,
                                "Retryable status persisted through all attempts, returning last response"
                            );
                            return Ok(value);
                        }
                        None => return Ok(value),
                    }
                }
                Err(err) => {
                    let kind = err.failure_kind();

                    if !self.policy.is_retryable(kind) {
                        debug!(
                            kind = %kind,
                            attempt = attempt,
                            error = %err,
                            "Non-retryable failure, not retrying"
                        );
                        return Err(RetryError::NonRetryable(err));
                    }

                    if attempt >= max_attempts {
                        warn!(
                            kind = %kind,
                            attempts = attempt,
                            error = %err,
                            "Retry attempts exhausted"
                        );
                        return Err(RetryError::Exhausted {
                            attempts: attempt,
                            last_cause: err,
                        });
                    }

                    let trigger = RetryTrigger::Failure {
                        kind,
                        message: err.to_string(),
                    };
                    self.wait_before_retry(attempt, trigger).await;
                }
            }
        }
    }

    async fn wait_before_retry(&self, attempt: u32, trigger: RetryTrigger) {
        let backoff = &self.policy.backoff;
        let delay = backoff.delay_for_attempt(attempt - 1);

        let record = RetryAttempt {
            attempt,
            max_attempts: self.policy.max_attempts(),
            base_delay: backoff.base_delay,
            max_delay: backoff.max_delay,
            exponential_base: backoff.exponential_base,
            jitter: backoff.jitter,
            trigger,
            delay,
        };

        if let Some(observer) = &self.observer {
            observer(&record);
        }

        warn!(
            attempt = record.attempt,
            max_attempts = record.max_attempts,
            delay_ms = delay.as_millis() as u64,
            trigger = ?record.trigger,
            "Retrying after backoff"
        );

        tokio::time::sleep(delay).await;
    }
}
