//! Resilient outbound calls: pooled failover with retries, and per-target
//! circuit breakers.
//!
//! ```no_run
//! use rpc_failover::{Endpoint, EndpointConnector, Resilience, TargetKind};
//!
//! # async fn run() {
//! let resilience = Resilience::builder(EndpointConnector)
//!     .endpoint(TargetKind::Rpc, "https://rpc-a.example.org", 0)
//!     .endpoint(TargetKind::Rpc, "https://rpc-b.example.org", 1)
//!     .build();
//!
//! let ledger = resilience
//!     .execute(TargetKind::Rpc, |endpoint: Endpoint| async move {
//!         // talk to `endpoint.address` here
//!         Ok::<u64, String>(42)
//!     })
//!     .await;
//!
//! let sent = resilience
//!     .guard("mailer", || async { Ok::<(), String>(()) })
//!     .await;
//! # let _ = (ledger, sent);
//! # }
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod facade;
pub mod observability;
pub mod pool;
pub mod resilience;

pub use config::ResilienceConfig;
pub use connection::{Connector, EndpointConnector, HttpConnector, HttpHandle};
pub use error::{AttemptError, CircuitOpen, ConfigurationError, ExecuteError, GuardError};
pub use facade::{ReloadableResilience, Resilience, ResilienceBuilder, ResilienceStatus};
pub use pool::{Endpoint, TargetKind};
pub use resilience::{BreakerSettings, CircuitState, RetryPolicy, TimeoutMode};
