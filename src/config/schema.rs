//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.
//!
//! ```toml
//! [[endpoints]]
//! kind = "rpc"
//! address = "https://rpc-a.example.org"
//! priority = 0
//!
//! [retry]
//! max_attempts_per_endpoint = 3
//! base_delay_ms = 1000
//! timeout_ms = 10000
//!
//! [retry_overrides.horizon]
//! timeout_ms = 5000
//!
//! [circuit_breaker]
//! threshold = 5
//! cool_down_secs = 60
//!
//! [circuit_breaker_overrides.price-oracle]
//! threshold = 2
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::pool::{Endpoint, TargetKind};
use crate::resilience::{BreakerSettings, RetryPolicies, RetryPolicy, TimeoutMode};

/// Root configuration for the resilience layer.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ResilienceConfig {
    /// Endpoints of every target kind.
    pub endpoints: Vec<EndpointConfig>,

    /// Retry policy used when a kind has no override.
    pub retry: RetryConfig,

    /// Retry policy per target kind name ("rpc", "horizon").
    /// Fields left out are taken from `[retry]`.
    pub retry_overrides: BTreeMap<String, RetryOverride>,

    /// Breaker settings used when a target id has no override.
    pub circuit_breaker: CircuitBreakerConfig,

    /// Breaker settings per target id.
    /// Fields left out are taken from `[circuit_breaker]`.
    pub circuit_breaker_overrides: BTreeMap<String, CircuitBreakerOverride>,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// One endpoint entry.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct EndpointConfig {
    /// Pool this endpoint joins.
    pub kind: TargetKind,

    /// Base URL of the endpoint.
    pub address: String,

    /// Lower is tried first (default: 0).
    #[serde(default)]
    pub priority: i64,
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    /// Attempts per endpoint before failing over.
    pub max_attempts_per_endpoint: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Per-attempt timeout in milliseconds.
    pub timeout_ms: u64,

    /// Drop the operation when its attempt times out instead of letting it
    /// run to completion in the background.
    pub cancel_on_timeout: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts_per_endpoint: 3,
            base_delay_ms: 1000,
            timeout_ms: 10_000,
            cancel_on_timeout: false,
        }
    }
}

impl RetryConfig {
    pub fn to_policy(&self) -> RetryPolicy {
        let mode = if self.cancel_on_timeout {
            TimeoutMode::Cancel
        } else {
            TimeoutMode::Detach
        };
        RetryPolicy::new(
            self.max_attempts_per_endpoint,
            Duration::from_millis(self.base_delay_ms),
            Duration::from_millis(self.timeout_ms),
        )
        .with_timeout_mode(mode)
    }
}

/// Partial retry configuration for one target kind.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct RetryOverride {
    pub max_attempts_per_endpoint: Option<u32>,
    pub base_delay_ms: Option<u64>,
    pub timeout_ms: Option<u64>,
    pub cancel_on_timeout: Option<bool>,
}

impl RetryOverride {
    /// Fill the unset fields from `base`.
    pub fn merged_over(&self, base: &RetryConfig) -> RetryConfig {
        RetryConfig {
            max_attempts_per_endpoint: self
                .max_attempts_per_endpoint
                .unwrap_or(base.max_attempts_per_endpoint),
            base_delay_ms: self.base_delay_ms.unwrap_or(base.base_delay_ms),
            timeout_ms: self.timeout_ms.unwrap_or(base.timeout_ms),
            cancel_on_timeout: self.cancel_on_timeout.unwrap_or(base.cancel_on_timeout),
        }
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open the circuit.
    pub threshold: u32,

    /// Seconds after the last failure before a probe is let through.
    pub cool_down_secs: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            threshold: 5,
            cool_down_secs: 60,
        }
    }
}

impl CircuitBreakerConfig {
    pub fn to_settings(&self) -> BreakerSettings {
        BreakerSettings::new(self.threshold, Duration::from_secs(self.cool_down_secs))
    }
}

/// Partial breaker configuration for one target id.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct CircuitBreakerOverride {
    pub threshold: Option<u32>,
    pub cool_down_secs: Option<u64>,
}

impl CircuitBreakerOverride {
    pub fn merged_over(&self, base: &CircuitBreakerConfig) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            threshold: self.threshold.unwrap_or(base.threshold),
            cool_down_secs: self.cool_down_secs.unwrap_or(base.cool_down_secs),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

impl ResilienceConfig {
    /// Endpoint descriptors in configuration order.
    pub fn endpoint_list(&self) -> Vec<Endpoint> {
        self.endpoints
            .iter()
            .map(|e| Endpoint::new(e.kind, e.address.clone(), e.priority))
            .collect()
    }

    /// Retry policies with per-kind overrides applied.
    ///
    /// Unknown kind names are skipped; validation reports them.
    pub fn retry_policies(&self) -> RetryPolicies {
        let mut policies = RetryPolicies::new(self.retry.to_policy());
        for (name, retry) in &self.retry_overrides {
            match name.parse::<TargetKind>() {
                Ok(kind) => policies.set(kind, retry.merged_over(&self.retry).to_policy()),
                Err(e) => tracing::warn!(kind = %name, error = %e, "Ignoring retry override"),
            }
        }
        policies
    }

    /// Breaker settings per target id.
    pub fn breaker_overrides(&self) -> std::collections::HashMap<String, BreakerSettings> {
        self.circuit_breaker_overrides
            .iter()
            .map(|(id, cb)| (id.clone(), cb.merged_over(&self.circuit_breaker).to_settings()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: ResilienceConfig = toml::from_str("").unwrap();
        assert!(config.endpoints.is_empty());
        assert_eq!(config.retry, RetryConfig::default());
        assert_eq!(config.circuit_breaker.threshold, 5);
        assert_eq!(config.circuit_breaker.cool_down_secs, 60);
        assert_eq!(config.observability.log_level, "info");
    }

    #[test]
    fn test_full_config() {
        let config: ResilienceConfig = toml::from_str(
            r#"
            [[endpoints]]
            kind = "rpc"
            address = "https://rpc-b.example.org"
            priority = 2

            [[endpoints]]
            kind = "horizon"
            address = "https://horizon.example.org"

            [retry]
            max_attempts_per_endpoint = 2
            base_delay_ms = 250

            [retry_overrides.horizon]
            timeout_ms = 5000
            cancel_on_timeout = true

            [circuit_breaker_overrides.price-oracle]
            threshold = 2
            cool_down_secs = 30
            "#,
        )
        .unwrap();

        assert_eq!(config.endpoints.len(), 2);
        assert_eq!(config.endpoints[1].priority, 0);

        let policies = config.retry_policies();
        let rpc = policies.for_kind(TargetKind::Rpc);
        assert_eq!(rpc.max_attempts_per_endpoint, 2);
        assert_eq!(rpc.base_delay, Duration::from_millis(250));

        let horizon = policies.for_kind(TargetKind::Horizon);
        assert_eq!(horizon.timeout, Duration::from_millis(5000));
        assert_eq!(horizon.timeout_mode, TimeoutMode::Cancel);
        assert_eq!(horizon.max_attempts_per_endpoint, 2);
        assert_eq!(horizon.base_delay, Duration::from_millis(250));

        let overrides = config.breaker_overrides();
        assert_eq!(
            overrides["price-oracle"],
            BreakerSettings::new(2, Duration::from_secs(30))
        );
    }

    #[test]
    fn test_breaker_override_inherits_global_section() {
        let config: ResilienceConfig = toml::from_str(
            r#"
            [circuit_breaker]
            threshold = 3
            cool_down_secs = 10

            [circuit_breaker_overrides.mailer]
            cool_down_secs = 90
            "#,
        )
        .unwrap();

        assert_eq!(
            config.breaker_overrides()["mailer"],
            BreakerSettings::new(3, Duration::from_secs(90))
        );
    }

    #[test]
    fn test_unknown_kind_rejected_by_serde() {
        let result: Result<ResilienceConfig, _> = toml::from_str(
            r#"
            [[endpoints]]
            kind = "graphql"
            address = "https://x.example.org"
            "#,
        );
        assert!(result.is_err());
    }
}
