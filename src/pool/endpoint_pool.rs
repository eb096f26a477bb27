//! Priority-ordered endpoint pools.
//!
//! # Responsibilities
//! - Group endpoints by target kind
//! - Sort each group ascending by priority, once
//! - Report missing groups as a configuration error at call time

use std::collections::HashMap;

use crate::error::ConfigurationError;
use crate::pool::endpoint::{Endpoint, TargetKind};

/// Immutable set of endpoint pools, one per target kind.
#[derive(Debug, Clone, Default)]
pub struct EndpointPool {
    groups: HashMap<TargetKind, Vec<Endpoint>>,
}

impl EndpointPool {
    /// Build the pools from a flat endpoint list.
    pub fn new(endpoints: impl IntoIterator<Item = Endpoint>) -> Self {
        let mut groups: HashMap<TargetKind, Vec<Endpoint>> = HashMap::new();
        for endpoint in endpoints {
            groups.entry(endpoint.kind).or_default().push(endpoint);
        }

        // Stable sort: equal priorities keep their configured order.
        for (kind, endpoints) in groups.iter_mut() {
            endpoints.sort_by_key(|e| e.priority);
            tracing::debug!(
                kind = %kind,
                order = ?endpoints.iter().map(|e| e.address.as_str()).collect::<Vec<_>>(),
                "Endpoint pool ordered"
            );
        }

        Self { groups }
    }

    /// Ordered endpoints for a kind; empty when nothing is configured.
    pub fn endpoints(&self, kind: TargetKind) -> &[Endpoint] {
        self.groups.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of endpoints configured for a kind.
    pub fn len(&self, kind: TargetKind) -> usize {
        self.endpoints(kind).len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.values().all(Vec::is_empty)
    }

    /// Ordered endpoints, or an error if the kind has none.
    pub fn require(&self, kind: TargetKind) -> Result<&[Endpoint], ConfigurationError> {
        let endpoints = self.endpoints(kind);
        if endpoints.is_empty() {
            return Err(ConfigurationError::NoEndpoints(kind));
        }
        Ok(endpoints)
    }

    /// Kinds that have at least one endpoint, in stable order.
    pub fn kinds(&self) -> Vec<TargetKind> {
        let mut kinds: Vec<_> = self
            .groups
            .iter()
            .filter(|(_, endpoints)| !endpoints.is_empty())
            .map(|(kind, _)| *kind)
            .collect();
        kinds.sort();
        kinds
    }
}
