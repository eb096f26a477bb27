//! Retry executor.
//!
//! # Responsibilities
//! - Build a connection handle and run the operation against one endpoint
//! - Race every attempt against the policy timeout
//! - Sleep `base * 2^n` between attempts, never after the last one
//!
//! # Design Decisions
//! - Timeouts, transport errors, connect errors and panics are all retryable
//! - The executor never touches the pool cursor; the failover controller does

use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::connection::Connector;
use crate::error::AttemptError;
use crate::observability::events::{emit, ResilienceEvent, ResilienceObserver};
use crate::pool::{Endpoint, TargetKind};
use crate::resilience::backoff::calculate_backoff;
use crate::resilience::timeouts::{race_timeout, TimeoutMode};

/// How hard to try a single endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts per endpoint, at least 1.
    pub max_attempts_per_endpoint: u32,
    /// Backoff base; the n-th retry waits `base_delay * 2^n`.
    pub base_delay: Duration,
    /// Deadline for each attempt.
    pub timeout: Duration,
    pub timeout_mode: TimeoutMode,
}

impl RetryPolicy {
    pub fn new(max_attempts_per_endpoint: u32, base_delay: Duration, timeout: Duration) -> Self {
        Self {
            max_attempts_per_endpoint: max_attempts_per_endpoint.max(1),
            base_delay,
            timeout,
            timeout_mode: TimeoutMode::Detach,
        }
    }

    pub fn with_timeout_mode(mut self, mode: TimeoutMode) -> Self {
        self.timeout_mode = mode;
        self
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(1000), Duration::from_secs(10))
    }
}

/// Retry policies keyed by target kind, with a fallback.
#[derive(Debug, Clone, Default)]
pub struct RetryPolicies {
    default: RetryPolicy,
    per_kind: HashMap<TargetKind, RetryPolicy>,
}

impl RetryPolicies {
    pub fn new(default: RetryPolicy) -> Self {
        Self {
            default,
            per_kind: HashMap::new(),
        }
    }

    pub fn set(&mut self, kind: TargetKind, policy: RetryPolicy) {
        self.per_kind.insert(kind, policy);
    }

    pub fn set_default(&mut self, policy: RetryPolicy) {
        self.default = policy;
    }

    pub fn for_kind(&self, kind: TargetKind) -> &RetryPolicy {
        self.per_kind.get(&kind).unwrap_or(&self.default)
    }
}

/// Result of trying one endpoint.
#[derive(Debug)]
pub enum AttemptOutcome<T, E> {
    Succeeded { value: T, attempts: u32 },
    Exhausted { last_error: AttemptError<E>, attempts: u32 },
}

impl<T, E> AttemptOutcome<T, E> {
    pub fn attempts(&self) -> u32 {
        match self {
            AttemptOutcome::Succeeded { attempts, .. } => *attempts,
            AttemptOutcome::Exhausted { attempts, .. } => *attempts,
        }
    }
}

/// Runs an operation against one endpoint with bounded retries.
#[derive(Clone)]
pub struct RetryExecutor {
    observer: Arc<dyn ResilienceObserver>,
}

impl RetryExecutor {
    pub fn new(observer: Arc<dyn ResilienceObserver>) -> Self {
        Self { observer }
    }

    /// Try `endpoint` up to `policy.max_attempts_per_endpoint` times.
    pub async fn attempt<C, F, Fut, T, E>(
        &self,
        endpoint: &Endpoint,
        policy: &RetryPolicy,
        connector: &C,
        operation: &F,
    ) -> AttemptOutcome<T, E>
    where
        C: Connector,
        F: Fn(C::Handle) -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Display + Send + 'static,
    {
        let max_attempts = policy.max_attempts_per_endpoint.max(1);
        let mut retry_index = 0u32;

        loop {
            let attempt = retry_index + 1;
            let result = match connector.connect(endpoint) {
                Ok(handle) => race_timeout(operation(handle), policy.timeout, policy.timeout_mode).await,
                Err(reason) => Err(AttemptError::Connect(reason)),
            };

            let error = match result {
                Ok(value) => {
                    return AttemptOutcome::Succeeded {
                        value,
                        attempts: attempt,
                    }
                }
                Err(error) => error,
            };

            emit(
                self.observer.as_ref(),
                ResilienceEvent::AttemptFailed {
                    kind: endpoint.kind,
                    address: &endpoint.address,
                    attempt,
                    max_attempts,
                    reason: error.reason(),
                    error: error.to_string(),
                },
            );

            if attempt >= max_attempts {
                return AttemptOutcome::Exhausted {
                    last_error: error,
                    attempts: attempt,
                };
            }

            let delay = calculate_backoff(policy.base_delay, retry_index);
            emit(
                self.observer.as_ref(),
                ResilienceEvent::BackoffScheduled {
                    kind: endpoint.kind,
                    address: &endpoint.address,
                    retry_index,
                    delay,
                },
            );
            tokio::time::sleep(delay).await;
            retry_index += 1;
        }
    }
}

impl std::fmt::Debug for RetryExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryExecutor").finish_non_exhaustive()
    }
}
