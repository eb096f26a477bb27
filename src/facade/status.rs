//! Status snapshot for monitoring collaborators.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::pool::{Endpoint, TargetKind};
use crate::resilience::BreakerSnapshot;

/// State of one endpoint pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolStatus {
    /// Endpoints in the order they are tried.
    pub endpoints: Vec<Endpoint>,
    /// Sticky cursor.
    pub current_index: usize,
    /// Address at the cursor.
    pub current_address: Option<String>,
}

/// Everything the facade knows about its pools and breakers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResilienceStatus {
    pub pools: BTreeMap<TargetKind, PoolStatus>,
    pub breakers: BTreeMap<String, BreakerSnapshot>,
}

impl ResilienceStatus {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
