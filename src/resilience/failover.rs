//! Failover controller.
//!
//! # Responsibilities
//! - Walk the pool for a target kind starting at the sticky cursor
//! - Hand each endpoint to the retry executor
//! - Move the cursor to whichever endpoint succeeded
//!
//! # Design Decisions
//! - The pool is visited at most once per call, wrapping around the end
//! - Exhausting an endpoint does not move the cursor; only success does
//! - Concurrent successes race on the cursor; the last writer wins

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use crate::connection::Connector;
use crate::error::{AttemptError, ConfigurationError, ExecuteError};
use crate::observability::events::{emit, ResilienceEvent, ResilienceObserver};
use crate::pool::{Endpoint, EndpointPool, PoolCursor, TargetKind};
use crate::resilience::retries::{AttemptOutcome, RetryExecutor, RetryPolicies, RetryPolicy};

/// Pooled execution with sticky failover.
pub struct FailoverController<C> {
    pool: EndpointPool,
    cursor: PoolCursor,
    policies: RetryPolicies,
    executor: RetryExecutor,
    connector: C,
    observer: Arc<dyn ResilienceObserver>,
}

impl<C: Connector> FailoverController<C> {
    pub fn new(
        pool: EndpointPool,
        policies: RetryPolicies,
        connector: C,
        observer: Arc<dyn ResilienceObserver>,
    ) -> Self {
        Self {
            pool,
            cursor: PoolCursor::new(),
            policies,
            executor: RetryExecutor::new(observer.clone()),
            connector,
            observer,
        }
    }

    /// Run `operation` against the pool for `kind` until it succeeds or every
    /// endpoint has used every attempt.
    pub async fn execute<F, Fut, T, E>(&self, kind: TargetKind, operation: F) -> Result<T, ExecuteError<E>>
    where
        F: Fn(C::Handle) -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Display + Send + 'static,
    {
        let endpoints = self.pool.require(kind)?;
        let policy = self.policies.for_kind(kind);
        let len = endpoints.len();
        let start = self.cursor.current(kind, len);

        let mut total_attempts = 0u32;
        let mut last_error: Option<AttemptError<E>> = None;
        let mut previous: Option<&Endpoint> = None;

        for offset in 0..len {
            let index = (start + offset) % len;
            let endpoint = &endpoints[index];

            if let Some(from) = previous {
                emit(
                    self.observer.as_ref(),
                    ResilienceEvent::Failover {
                        kind,
                        from: &from.address,
                        to: &endpoint.address,
                        index,
                    },
                );
            }

            match self
                .executor
                .attempt(endpoint, policy, &self.connector, &operation)
                .await
            {
                AttemptOutcome::Succeeded { value, attempts } => {
                    total_attempts += attempts;
                    self.cursor.set(kind, index);
                    emit(
                        self.observer.as_ref(),
                        ResilienceEvent::Succeeded {
                            kind,
                            address: &endpoint.address,
                            index,
                            total_attempts,
                        },
                    );
                    return Ok(value);
                }
                AttemptOutcome::Exhausted { last_error: error, attempts } => {
                    total_attempts += attempts;
                    emit(
                        self.observer.as_ref(),
                        ResilienceEvent::EndpointExhausted {
                            kind,
                            address: &endpoint.address,
                            attempts,
                        },
                    );
                    last_error = Some(error);
                }
            }
            previous = Some(endpoint);
        }

        emit(
            self.observer.as_ref(),
            ResilienceEvent::Exhausted {
                kind,
                total_attempts,
            },
        );

        match last_error {
            Some(last_error) => Err(ExecuteError::Exhausted {
                last_error,
                total_attempts,
            }),
            // `require` guarantees at least one endpoint was tried.
            None => Err(ConfigurationError::NoEndpoints(kind).into()),
        }
    }

    pub fn pool(&self) -> &EndpointPool {
        &self.pool
    }

    pub fn cursor(&self) -> &PoolCursor {
        &self.cursor
    }

    pub fn policy(&self, kind: TargetKind) -> &RetryPolicy {
        self.policies.for_kind(kind)
    }

    /// Current cursor index for `kind`, always inside the pool.
    pub fn current_index(&self, kind: TargetKind) -> usize {
        self.cursor.current(kind, self.pool.len(kind))
    }

    /// Endpoint the next call for `kind` will start with.
    pub fn current_endpoint(&self, kind: TargetKind) -> Option<&Endpoint> {
        self.pool.endpoints(kind).get(self.current_index(kind))
    }
}

impl<C> std::fmt::Debug for FailoverController<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FailoverController")
            .field("pool", &self.pool)
            .field("cursor", &self.cursor)
            .field("policies", &self.policies)
            .finish_non_exhaustive()
    }
}
