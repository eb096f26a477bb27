//! Observation hook for retries, failovers and breaker transitions.

use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use crate::observability::metrics;
use crate::pool::TargetKind;
use crate::resilience::CircuitState;

/// Something the resilience layer did.
#[derive(Debug, Clone, PartialEq)]
pub enum ResilienceEvent<'a> {
    /// One attempt against an endpoint failed.
    AttemptFailed {
        kind: TargetKind,
        address: &'a str,
        attempt: u32,
        max_attempts: u32,
        reason: &'static str,
        error: String,
    },
    /// The executor will sleep before the next attempt.
    BackoffScheduled {
        kind: TargetKind,
        address: &'a str,
        retry_index: u32,
        delay: Duration,
    },
    /// An endpoint used all of its attempts.
    EndpointExhausted {
        kind: TargetKind,
        address: &'a str,
        attempts: u32,
    },
    /// The controller moved on to the next endpoint in the pool.
    Failover {
        kind: TargetKind,
        from: &'a str,
        to: &'a str,
        index: usize,
    },
    /// A pooled call succeeded.
    Succeeded {
        kind: TargetKind,
        address: &'a str,
        index: usize,
        total_attempts: u32,
    },
    /// Every endpoint in the pool was exhausted.
    Exhausted {
        kind: TargetKind,
        total_attempts: u32,
    },
    /// A circuit breaker changed state.
    BreakerTransition {
        target_id: &'a str,
        from: CircuitState,
        to: CircuitState,
        failure_count: u32,
    },
    /// A circuit breaker refused a call.
    BreakerRejected {
        target_id: &'a str,
        failures: u32,
        retry_in: Duration,
    },
}

/// Receives resilience events. Must be cheap and must not block.
pub trait ResilienceObserver: Send + Sync {
    fn on_event(&self, event: &ResilienceEvent<'_>);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ResilienceObserver for NoopObserver {
    fn on_event(&self, _event: &ResilienceEvent<'_>) {}
}

/// Logs through `tracing` and records `metrics`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl ResilienceObserver for TracingObserver {
    fn on_event(&self, event: &ResilienceEvent<'_>) {
        match event {
            ResilienceEvent::AttemptFailed {
                kind,
                address,
                attempt,
                max_attempts,
                reason,
                error,
            } => {
                tracing::warn!(
                    kind = %kind,
                    address = %address,
                    attempt,
                    max_attempts,
                    reason,
                    error = %error,
                    "Attempt failed"
                );
                metrics::record_attempt_failure(*kind, reason);
            }
            ResilienceEvent::BackoffScheduled {
                kind,
                address,
                retry_index,
                delay,
            } => {
                tracing::debug!(
                    kind = %kind,
                    address = %address,
                    retry_index,
                    delay_ms = delay.as_millis() as u64,
                    "Backing off before retry"
                );
            }
            ResilienceEvent::EndpointExhausted {
                kind,
                address,
                attempts,
            } => {
                tracing::warn!(kind = %kind, address = %address, attempts, "Endpoint exhausted");
            }
            ResilienceEvent::Failover {
                kind,
                from,
                to,
                index,
            } => {
                tracing::warn!(kind = %kind, from = %from, to = %to, index, "Failing over");
                metrics::record_failover(*kind);
            }
            ResilienceEvent::Succeeded {
                kind,
                address,
                index,
                total_attempts,
            } => {
                if *total_attempts > 1 {
                    tracing::info!(
                        kind = %kind,
                        address = %address,
                        index,
                        total_attempts,
                        "Call succeeded after retries"
                    );
                } else {
                    tracing::trace!(kind = %kind, address = %address, "Call succeeded");
                }
            }
            ResilienceEvent::Exhausted {
                kind,
                total_attempts,
            } => {
                tracing::error!(kind = %kind, total_attempts, "All endpoints exhausted");
                metrics::record_exhausted(*kind);
            }
            ResilienceEvent::BreakerTransition {
                target_id,
                from,
                to,
                failure_count,
            } => {
                if *to == CircuitState::Closed {
                    tracing::info!(target_id = %target_id, from = ?from, to = ?to, "Circuit closed");
                } else {
                    tracing::warn!(
                        target_id = %target_id,
                        from = ?from,
                        to = ?to,
                        failure_count,
                        "Circuit state changed"
                    );
                }
                metrics::record_breaker_state(target_id, *to);
            }
            ResilienceEvent::BreakerRejected {
                target_id,
                failures,
                retry_in,
            } => {
                tracing::debug!(
                    target_id = %target_id,
                    failures,
                    retry_in_ms = retry_in.as_millis() as u64,
                    "Circuit open, call rejected"
                );
                metrics::record_breaker_rejection(target_id);
            }
        }
    }
}

/// Deliver an event, containing any panic raised by the observer.
pub(crate) fn emit(observer: &dyn ResilienceObserver, event: ResilienceEvent<'_>) {
    let delivered = panic::catch_unwind(AssertUnwindSafe(|| observer.on_event(&event)));
    if delivered.is_err() {
        tracing::warn!("Resilience observer panicked, event dropped");
    }
}
