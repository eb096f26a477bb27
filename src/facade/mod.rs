//! Resilience facade.
//!
//! # Data Flow
//! ```text
//! Caller
//!     → execute(kind, op)  → FailoverController → RetryExecutor → op(handle)
//!     → guard(id, op)      → CircuitBreakerRegistry → op()
//!     → status()           → pools + cursors + breaker snapshots
//!     → reset(id)          → breaker forced to Closed
//! ```
//!
//! # Design Decisions
//! - All mutable state (cursor, breakers) is owned by the instance
//! - Pooled failover and circuit breaking stay independent entry points
//! - Rebuilding the facade (see reload.rs) starts from fresh state

pub mod reload;
pub mod status;

pub use reload::ReloadableResilience;
pub use status::{PoolStatus, ResilienceStatus};

use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use crate::config::{validate_config, ConfigError, ResilienceConfig};
use crate::connection::Connector;
use crate::error::{ExecuteError, GuardError};
use crate::observability::{ResilienceObserver, TracingObserver};
use crate::pool::{Endpoint, EndpointPool, TargetKind};
use crate::resilience::{
    BreakerSettings, BreakerSnapshot, CircuitBreakerRegistry, FailoverController, RetryPolicies,
    RetryPolicy,
};

/// Single entry point for resilient outbound calls.
#[derive(Debug)]
pub struct Resilience<C> {
    failover: FailoverController<C>,
    breakers: CircuitBreakerRegistry,
}

impl<C: Connector> Resilience<C> {
    pub fn builder(connector: C) -> ResilienceBuilder<C> {
        ResilienceBuilder::new(connector)
    }

    /// Build a facade from a configuration, validating it first.
    pub fn from_config(config: &ResilienceConfig, connector: C) -> Result<Self, ConfigError> {
        Ok(ResilienceBuilder::from_config(config, connector)?.build())
    }

    /// Run `operation` against the pool for `kind`, retrying and failing
    /// over until it succeeds or every endpoint is exhausted.
    pub async fn execute<F, Fut, T, E>(&self, kind: TargetKind, operation: F) -> Result<T, ExecuteError<E>>
    where
        F: Fn(C::Handle) -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Display + Send + 'static,
    {
        self.failover.execute(kind, operation).await
    }

    /// Run `operation` once, protected by the circuit breaker for `target_id`.
    pub async fn guard<F, Fut, T, E>(&self, target_id: &str, operation: F) -> Result<T, GuardError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.breakers.guard(target_id, operation).await
    }

    /// Snapshot of every pool and every breaker.
    pub fn status(&self) -> ResilienceStatus {
        let pool = self.failover.pool();
        let pools = pool
            .kinds()
            .into_iter()
            .map(|kind| {
                let current_index = self.failover.current_index(kind);
                let status = PoolStatus {
                    endpoints: pool.endpoints(kind).to_vec(),
                    current_index,
                    current_address: self
                        .failover
                        .current_endpoint(kind)
                        .map(|e| e.address.clone()),
                };
                (kind, status)
            })
            .collect();

        ResilienceStatus {
            pools,
            breakers: self.breakers.snapshots(),
        }
    }

    /// Read-only breaker snapshot for one target.
    pub fn breaker_state(&self, target_id: &str) -> BreakerSnapshot {
        self.breakers.state(target_id)
    }

    /// Force the breaker for `target_id` to `{Closed, 0}`.
    pub fn reset(&self, target_id: &str) {
        self.breakers.reset(target_id);
    }

    /// Forget the sticky endpoint for `kind`.
    pub fn reset_cursor(&self, kind: TargetKind) {
        self.failover.cursor().reset(kind);
    }

    /// Reset every cursor and every breaker.
    pub fn reset_all(&self) {
        self.failover.cursor().reset_all();
        self.breakers.reset_all();
    }

    pub fn pool(&self) -> &EndpointPool {
        self.failover.pool()
    }

    pub fn retry_policy(&self, kind: TargetKind) -> &RetryPolicy {
        self.failover.policy(kind)
    }
}

/// Builder for [`Resilience`].
pub struct ResilienceBuilder<C> {
    connector: C,
    endpoints: Vec<Endpoint>,
    policies: RetryPolicies,
    breaker_defaults: BreakerSettings,
    breaker_overrides: HashMap<String, BreakerSettings>,
    observer: Arc<dyn ResilienceObserver>,
}

impl<C: Connector> ResilienceBuilder<C> {
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            endpoints: Vec::new(),
            policies: RetryPolicies::default(),
            breaker_defaults: BreakerSettings::default(),
            breaker_overrides: HashMap::new(),
            observer: Arc::new(TracingObserver),
        }
    }

    /// Start from a configuration, validating it first.
    pub fn from_config(config: &ResilienceConfig, connector: C) -> Result<Self, ConfigError> {
        validate_config(config).map_err(ConfigError::Validation)?;

        let mut builder = Self::new(connector);
        builder.endpoints = config.endpoint_list();
        builder.policies = config.retry_policies();
        builder.breaker_defaults = config.circuit_breaker.to_settings();
        builder.breaker_overrides = config.breaker_overrides();
        Ok(builder)
    }

    pub fn endpoint(mut self, kind: TargetKind, address: impl Into<String>, priority: i64) -> Self {
        self.endpoints.push(Endpoint::new(kind, address, priority));
        self
    }

    pub fn default_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policies.set_default(policy);
        self
    }

    pub fn retry_policy(mut self, kind: TargetKind, policy: RetryPolicy) -> Self {
        self.policies.set(kind, policy);
        self
    }

    pub fn circuit_breaker(mut self, settings: BreakerSettings) -> Self {
        self.breaker_defaults = settings;
        self
    }

    pub fn circuit_breaker_for(mut self, target_id: impl Into<String>, settings: BreakerSettings) -> Self {
        self.breaker_overrides.insert(target_id.into(), settings);
        self
    }

    /// Replace the default tracing observer.
    pub fn observer(mut self, observer: Arc<dyn ResilienceObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn build(self) -> Resilience<C> {
        let pool = EndpointPool::new(self.endpoints);
        let failover = FailoverController::new(
            pool,
            self.policies,
            self.connector,
            self.observer.clone(),
        );
        let breakers =
            CircuitBreakerRegistry::new(self.breaker_defaults, self.breaker_overrides, self.observer);

        Resilience { failover, breakers }
    }
}
