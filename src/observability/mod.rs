//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Retry executor / failover controller / circuit breakers produce:
//!     → events.rs (ResilienceEvent handed to the injected observer)
//!
//! Default observer (TracingObserver):
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters and gauges via the `metrics` facade)
//! ```
//!
//! # Design Decisions
//! - Observers are synchronous and must not block
//! - A panicking observer is contained; control flow never depends on it
//! - No metrics recorder is installed here; the host application owns that

pub mod events;
pub mod logging;
pub mod metrics;

pub use events::{NoopObserver, ResilienceEvent, ResilienceObserver, TracingObserver};
