//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Pooled call (Execute):
//!     → failover.rs (pick endpoint from the sticky cursor, wrap once)
//!     → retries.rs (bounded attempts on that endpoint)
//!     → timeouts.rs (race each attempt against its deadline)
//!     → backoff.rs (base * 2^n between attempts)
//!
//! Single-target call (Guard):
//!     → guard.rs (breaker per target id)
//!     → circuit_breaker.rs (Closed / Open / Half-Open)
//! ```
//!
//! # Design Decisions
//! - Every attempt has a deadline
//! - Pool failover and circuit breaking are separate mechanisms
//! - Backoff is deterministic (no jitter)

pub mod backoff;
pub mod circuit_breaker;
pub mod failover;
pub mod guard;
pub mod retries;
pub mod timeouts;

pub use circuit_breaker::{BreakerSettings, BreakerSnapshot, CircuitBreaker, CircuitState};
pub use failover::FailoverController;
pub use guard::{BreakerPermit, CircuitBreakerRegistry};
pub use retries::{AttemptOutcome, RetryExecutor, RetryPolicies, RetryPolicy};
pub use timeouts::TimeoutMode;
