//! Endpoint pool subsystem.
//!
//! # Data Flow
//! ```text
//! ResilienceConfig.endpoints
//!     → endpoint.rs (Endpoint + TargetKind descriptors)
//!     → endpoint_pool.rs (group by kind, sort by priority once)
//!     → cursor.rs (sticky index per kind, updated on success)
//!     → failover controller walks the pool starting at the cursor
//! ```
//!
//! # Design Decisions
//! - Pool is immutable after construction; only the cursor mutates
//! - Lower priority number is tried first; ties keep configuration order
//! - Empty kinds are only an error when a call is made for them

pub mod cursor;
pub mod endpoint;
pub mod endpoint_pool;

pub use cursor::PoolCursor;
pub use endpoint::{Endpoint, TargetKind};
pub use endpoint_pool::EndpointPool;
