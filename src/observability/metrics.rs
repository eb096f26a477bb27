//! Metrics recorded through the `metrics` facade.
//!
//! # Metrics
//! - `rpc_failover_attempt_failures_total` (counter): by kind, reason
//! - `rpc_failover_failovers_total` (counter): by kind
//! - `rpc_failover_exhausted_total` (counter): by kind
//! - `rpc_failover_breaker_state` (gauge): 0=closed, 1=half-open, 2=open
//! - `rpc_failover_breaker_rejections_total` (counter): by target

use crate::pool::TargetKind;
use crate::resilience::CircuitState;

pub fn record_attempt_failure(kind: TargetKind, reason: &'static str) {
    metrics::counter!(
        "rpc_failover_attempt_failures_total",
        "kind" => kind.as_str(),
        "reason" => reason
    )
    .increment(1);
}

pub fn record_failover(kind: TargetKind) {
    metrics::counter!("rpc_failover_failovers_total", "kind" => kind.as_str()).increment(1);
}

pub fn record_exhausted(kind: TargetKind) {
    metrics::counter!("rpc_failover_exhausted_total", "kind" => kind.as_str()).increment(1);
}

pub fn record_breaker_state(target_id: &str, state: CircuitState) {
    let value = match state {
        CircuitState::Closed => 0.0,
        CircuitState::HalfOpen => 1.0,
        CircuitState::Open => 2.0,
    };
    metrics::gauge!("rpc_failover_breaker_state", "target" => target_id.to_string()).set(value);
}

pub fn record_breaker_rejection(target_id: &str) {
    metrics::counter!(
        "rpc_failover_breaker_rejections_total",
        "target" => target_id.to_string()
    )
    .increment(1);
}
