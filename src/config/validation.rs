//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (attempts >= 1, timeouts > 0, thresholds >= 1)
//! - Check endpoint addresses parse as URLs and are unique per kind
//! - Reject overrides that name unknown kinds or empty target ids
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - A kind with no endpoints is valid; calls for it fail at call time

use std::collections::HashSet;
use thiserror::Error;
use url::Url;

use crate::config::schema::{
    CircuitBreakerConfig, CircuitBreakerOverride, ResilienceConfig, RetryConfig, RetryOverride,
};
use crate::pool::TargetKind;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("endpoint '{address}' is not a valid URL: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("endpoint '{address}' is listed twice for kind '{kind}'")]
    DuplicateAddress { kind: TargetKind, address: String },

    #[error("{scope}: max_attempts_per_endpoint must be at least 1")]
    ZeroAttempts { scope: String },

    #[error("{scope}: timeout_ms must be greater than 0")]
    ZeroTimeout { scope: String },

    #[error("{scope}: threshold must be at least 1")]
    ZeroThreshold { scope: String },

    #[error("retry override names unknown target kind '{0}'")]
    UnknownTargetKind(String),

    #[error("circuit breaker override has an empty target id")]
    EmptyTargetId,

    #[error("unknown log level '{0}'")]
    InvalidLogLevel(String),
}

/// Validate a configuration, collecting every error.
pub fn validate_config(config: &ResilienceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let mut seen = HashSet::new();
    for endpoint in &config.endpoints {
        if let Err(e) = Url::parse(&endpoint.address) {
            errors.push(ValidationError::InvalidAddress {
                address: endpoint.address.clone(),
                reason: e.to_string(),
            });
        }
        if !seen.insert((endpoint.kind, endpoint.address.as_str())) {
            errors.push(ValidationError::DuplicateAddress {
                kind: endpoint.kind,
                address: endpoint.address.clone(),
            });
        }
    }

    check_retry("retry", &config.retry, &mut errors);
    for (name, retry) in &config.retry_overrides {
        if name.parse::<TargetKind>().is_err() {
            errors.push(ValidationError::UnknownTargetKind(name.clone()));
        }
        check_retry_override(&format!("retry_overrides.{}", name), retry, &mut errors);
    }

    check_breaker("circuit_breaker", &config.circuit_breaker, &mut errors);
    for (id, breaker) in &config.circuit_breaker_overrides {
        if id.trim().is_empty() {
            errors.push(ValidationError::EmptyTargetId);
        }
        check_breaker_override(&format!("circuit_breaker_overrides.{}", id), breaker, &mut errors);
    }

    let level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::InvalidLogLevel(
            config.observability.log_level.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_retry(scope: &str, retry: &RetryConfig, errors: &mut Vec<ValidationError>) {
    if retry.max_attempts_per_endpoint == 0 {
        errors.push(ValidationError::ZeroAttempts {
            scope: scope.to_string(),
        });
    }
    if retry.timeout_ms == 0 {
        errors.push(ValidationError::ZeroTimeout {
            scope: scope.to_string(),
        });
    }
}

fn check_breaker(scope: &str, breaker: &CircuitBreakerConfig, errors: &mut Vec<ValidationError>) {
    if breaker.threshold == 0 {
        errors.push(ValidationError::ZeroThreshold {
            scope: scope.to_string(),
        });
    }
}

// Inherited fields are already checked in their own section.
fn check_retry_override(scope: &str, retry: &RetryOverride, errors: &mut Vec<ValidationError>) {
    if retry.max_attempts_per_endpoint == Some(0) {
        errors.push(ValidationError::ZeroAttempts {
            scope: scope.to_string(),
        });
    }
    if retry.timeout_ms == Some(0) {
        errors.push(ValidationError::ZeroTimeout {
            scope: scope.to_string(),
        });
    }
}

fn check_breaker_override(
    scope: &str,
    breaker: &CircuitBreakerOverride,
    errors: &mut Vec<ValidationError>,
) {
    if breaker.threshold == Some(0) {
        errors.push(ValidationError::ZeroThreshold {
            scope: scope.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::EndpointConfig;

    fn endpoint(kind: TargetKind, address: &str) -> EndpointConfig {
        EndpointConfig {
            kind,
            address: address.to_string(),
            priority: 0,
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&ResilienceConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = ResilienceConfig::default();
        config.endpoints.push(endpoint(TargetKind::Rpc, "not a url"));
        config.endpoints.push(endpoint(TargetKind::Rpc, "https://a.example.org"));
        config.endpoints.push(endpoint(TargetKind::Rpc, "https://a.example.org"));
        config.retry.max_attempts_per_endpoint = 0;
        config.retry.timeout_ms = 0;
        config.circuit_breaker.threshold = 0;
        config
            .retry_overrides
            .insert("graphql".to_string(), RetryOverride::default());
        config.observability.log_level = "loud".to_string();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 7, "{:?}", errors);
        assert!(errors.contains(&ValidationError::UnknownTargetKind("graphql".into())));
        assert!(errors.contains(&ValidationError::DuplicateAddress {
            kind: TargetKind::Rpc,
            address: "https://a.example.org".into(),
        }));
    }

    #[test]
    fn test_same_address_in_different_kinds_is_fine() {
        let mut config = ResilienceConfig::default();
        config.endpoints.push(endpoint(TargetKind::Rpc, "https://a.example.org"));
        config.endpoints.push(endpoint(TargetKind::Horizon, "https://a.example.org"));
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_empty_breaker_target_id() {
        let mut config = ResilienceConfig::default();
        config
            .circuit_breaker_overrides
            .insert(" ".to_string(), CircuitBreakerOverride::default());
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::EmptyTargetId]);
    }

    #[test]
    fn test_explicit_zero_in_override() {
        let mut config = ResilienceConfig::default();
        config.retry_overrides.insert(
            "horizon".to_string(),
            RetryOverride {
                timeout_ms: Some(0),
                ..RetryOverride::default()
            },
        );
        config.circuit_breaker_overrides.insert(
            "mailer".to_string(),
            CircuitBreakerOverride {
                threshold: Some(0),
                ..CircuitBreakerOverride::default()
            },
        );

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::ZeroTimeout {
                    scope: "retry_overrides.horizon".into()
                },
                ValidationError::ZeroThreshold {
                    scope: "circuit_breaker_overrides.mailer".into()
                },
            ]
        );
    }
}
