//! Per-target circuit breakers and breaker-guarded calls.
//!
//! # Responsibilities
//! - Keep one lazily created breaker per target id
//! - Admit or refuse calls, record their outcome
//! - Report transitions and rejections to the observer
//!
//! # Design Decisions
//! - Breaker entries live in a `DashMap`; no shard lock is held across an
//!   `.await` or while the observer runs
//! - A half-open probe is an RAII permit: dropping it unsettled frees the
//!   probe slot and leaves the state untouched
//! - Permits remember the breaker epoch they were issued in; a permit that
//!   settles after a transition or reset is ignored

use dashmap::DashMap;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::Arc;
use tokio::time::Instant;

use crate::error::{CircuitOpen, GuardError};
use crate::observability::events::{emit, ResilienceEvent, ResilienceObserver};
use crate::resilience::circuit_breaker::{
    BreakerSettings, BreakerSnapshot, CircuitBreaker, CircuitState, Transition,
};

/// All circuit breakers owned by one facade.
pub struct CircuitBreakerRegistry {
    defaults: BreakerSettings,
    overrides: HashMap<String, BreakerSettings>,
    breakers: DashMap<String, CircuitBreaker>,
    observer: Arc<dyn ResilienceObserver>,
}

impl CircuitBreakerRegistry {
    pub fn new(
        defaults: BreakerSettings,
        overrides: HashMap<String, BreakerSettings>,
        observer: Arc<dyn ResilienceObserver>,
    ) -> Self {
        Self {
            defaults,
            overrides,
            breakers: DashMap::new(),
            observer,
        }
    }

    /// Settings that apply to `target_id`.
    pub fn settings_for(&self, target_id: &str) -> BreakerSettings {
        self.overrides.get(target_id).copied().unwrap_or(self.defaults)
    }

    /// Run `operation` through the breaker for `target_id`.
    ///
    /// Returns `CircuitOpen` without invoking the operation when the breaker
    /// refuses the call; otherwise the operation's own error, unmodified.
    pub async fn guard<F, Fut, T, E>(&self, target_id: &str, operation: F) -> Result<T, GuardError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let permit = self.acquire(target_id)?;
        match operation().await {
            Ok(value) => {
                permit.record_success();
                Ok(value)
            }
            Err(e) => {
                permit.record_failure();
                Err(GuardError::Operation(e))
            }
        }
    }

    /// Ask the breaker for permission to call `target_id`.
    pub fn acquire(&self, target_id: &str) -> Result<BreakerPermit<'_>, CircuitOpen> {
        let decision = {
            let mut breaker = self
                .breakers
                .entry(target_id.to_string())
                .or_insert_with(|| CircuitBreaker::new(self.settings_for(target_id)));
            breaker
                .try_acquire(Instant::now())
                .map(|admission| (admission, breaker.epoch()))
        };

        match decision {
            Ok((admission, epoch)) => {
                if let Some(transition) = admission.transition {
                    self.report(target_id, transition);
                }
                Ok(BreakerPermit {
                    registry: self,
                    target_id: target_id.to_string(),
                    probe: admission.probe,
                    epoch,
                    settled: false,
                })
            }
            Err(rejection) => {
                emit(
                    self.observer.as_ref(),
                    ResilienceEvent::BreakerRejected {
                        target_id,
                        failures: rejection.failures,
                        retry_in: rejection.retry_in,
                    },
                );
                Err(CircuitOpen {
                    target_id: target_id.to_string(),
                    failures: rejection.failures,
                    retry_in: rejection.retry_in,
                })
            }
        }
    }

    /// Snapshot for one target; untouched targets read as closed.
    pub fn state(&self, target_id: &str) -> BreakerSnapshot {
        self.breakers
            .get(target_id)
            .map(|breaker| breaker.snapshot())
            .unwrap_or_default()
    }

    /// Snapshots of every breaker created so far.
    pub fn snapshots(&self) -> BTreeMap<String, BreakerSnapshot> {
        self.breakers
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().snapshot()))
            .collect()
    }

    /// Force `{Closed, 0}` for one target.
    pub fn reset(&self, target_id: &str) {
        let transition = self
            .breakers
            .get_mut(target_id)
            .and_then(|mut breaker| breaker.reset());
        if let Some(transition) = transition {
            self.report(target_id, transition);
        }
        tracing::info!(target_id = %target_id, "Circuit breaker reset");
    }

    pub fn reset_all(&self) {
        let ids: Vec<String> = self.breakers.iter().map(|e| e.key().clone()).collect();
        for id in ids {
            self.reset(&id);
        }
    }

    fn settle(&self, target_id: &str, probe: bool, epoch: u64, success: bool) {
        let transition = self.breakers.get_mut(target_id).and_then(|mut breaker| {
            if breaker.epoch() != epoch {
                tracing::debug!(target_id = %target_id, success, "Ignoring outcome from an earlier breaker epoch");
                return None;
            }
            if success {
                breaker.on_success(probe)
            } else {
                breaker.on_failure(Instant::now(), probe)
            }
        });
        if let Some(transition) = transition {
            self.report(target_id, transition);
        }
    }

    fn release_probe(&self, target_id: &str, epoch: u64) {
        if let Some(mut breaker) = self.breakers.get_mut(target_id) {
            if breaker.epoch() == epoch && breaker.state() == CircuitState::HalfOpen {
                breaker.release_probe();
            }
        }
    }

    fn report(&self, target_id: &str, transition: Transition) {
        emit(
            self.observer.as_ref(),
            ResilienceEvent::BreakerTransition {
                target_id,
                from: transition.from,
                to: transition.to,
                failure_count: transition.failure_count,
            },
        );
    }
}

impl std::fmt::Debug for CircuitBreakerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreakerRegistry")
            .field("defaults", &self.defaults)
            .field("overrides", &self.overrides)
            .field("breakers", &self.breakers.len())
            .finish()
    }
}

/// Permission to make one call through a breaker.
///
/// Settle it with [`record_success`](Self::record_success) or
/// [`record_failure`](Self::record_failure).
#[must_use]
#[derive(Debug)]
pub struct BreakerPermit<'a> {
    registry: &'a CircuitBreakerRegistry,
    target_id: String,
    probe: bool,
    epoch: u64,
    settled: bool,
}

impl BreakerPermit<'_> {
    /// This call is the half-open probe.
    pub fn is_probe(&self) -> bool {
        self.probe
    }

    pub fn record_success(mut self) {
        self.settled = true;
        self.registry.settle(&self.target_id, self.probe, self.epoch, true);
    }

    pub fn record_failure(mut self) {
        self.settled = true;
        self.registry.settle(&self.target_id, self.probe, self.epoch, false);
    }
}

impl Drop for BreakerPermit<'_> {
    fn drop(&mut self) {
        if !self.settled && self.probe {
            self.registry.release_probe(&self.target_id, self.epoch);
        }
    }
}
