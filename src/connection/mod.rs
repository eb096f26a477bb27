//! Connection handles for endpoints.
//!
//! # Data Flow
//! ```text
//! Retry executor picks an endpoint
//!     → Connector::connect(endpoint) builds a handle (kind-specific)
//!     → caller's operation receives the handle and performs the call
//! ```
//!
//! # Design Decisions
//! - Handles are opaque to the resilience layer
//! - Building a handle is synchronous and cheap; I/O happens in the operation
//! - A failed build counts as a failed attempt

pub mod http;

pub use http::{HttpConnector, HttpHandle};

use crate::pool::Endpoint;

/// Builds the connection handle an operation runs against.
pub trait Connector: Send + Sync {
    type Handle: Send + 'static;

    fn connect(&self, endpoint: &Endpoint) -> Result<Self::Handle, String>;
}

/// Hands the endpoint descriptor itself to the operation.
///
/// Useful when the caller owns its own clients and only needs to know
/// which address to talk to.
#[derive(Debug, Default, Clone, Copy)]
pub struct EndpointConnector;

impl Connector for EndpointConnector {
    type Handle = Endpoint;

    fn connect(&self, endpoint: &Endpoint) -> Result<Endpoint, String> {
        Ok(endpoint.clone())
    }
}

impl<C: Connector> Connector for std::sync::Arc<C> {
    type Handle = C::Handle;

    fn connect(&self, endpoint: &Endpoint) -> Result<Self::Handle, String> {
        (**self).connect(endpoint)
    }
}
