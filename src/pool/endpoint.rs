//! Endpoint descriptors.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Logical group of interchangeable endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    /// JSON-RPC style node.
    Rpc,
    /// Horizon-style REST gateway.
    Horizon,
}

impl TargetKind {
    /// All known kinds, in display order.
    pub const ALL: [TargetKind; 2] = [TargetKind::Rpc, TargetKind::Horizon];

    /// Stable lowercase name, used in config keys and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::Rpc => "rpc",
            TargetKind::Horizon => "horizon",
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rpc" => Ok(TargetKind::Rpc),
            "horizon" => Ok(TargetKind::Horizon),
            other => Err(format!("unknown target kind '{}'", other)),
        }
    }
}

/// One addressable instance of a remote service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Address handed to the connector (usually a base URL).
    pub address: String,
    /// Rank inside the pool; lower is tried first.
    pub priority: i64,
    /// Pool this endpoint belongs to.
    pub kind: TargetKind,
}

impl Endpoint {
    pub fn new(kind: TargetKind, address: impl Into<String>, priority: i64) -> Self {
        Self {
            address: address.into(),
            priority,
            kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parsing() {
        assert_eq!("rpc".parse::<TargetKind>().unwrap(), TargetKind::Rpc);
        assert_eq!(" Horizon ".parse::<TargetKind>().unwrap(), TargetKind::Horizon);
        assert!("soroban".parse::<TargetKind>().is_err());
    }

    #[test]
    fn test_kind_serde_names() {
        let json = serde_json::to_string(&TargetKind::Horizon).unwrap();
        assert_eq!(json, "\"horizon\"");
        let kind: TargetKind = serde_json::from_str("\"rpc\"").unwrap();
        assert_eq!(kind, TargetKind::Rpc);
    }
}
