//! Error types for pooled execution and guarded calls.
//!
//! # Taxonomy
//! - `ConfigurationError`: nothing to call for a target kind (fatal)
//! - `AttemptError::Timeout` / `Transport`: one attempt failed (retried)
//! - `CircuitOpen`: breaker refused the call (never retried)
//! - `ExecuteError::Exhausted`: every endpoint used every attempt
//!
//! `Guard` hands the operation's own error back unmodified so callers can
//! tell "the breaker blocked me" apart from "the call itself failed".

use std::time::Duration;
use thiserror::Error;

use crate::pool::TargetKind;

/// Configuration is missing something needed to make a call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// No endpoints registered for the target kind.
    #[error("no endpoints configured for target kind '{0}'")]
    NoEndpoints(TargetKind),
}

/// Failure of a single attempt against one endpoint.
#[derive(Debug, Error)]
pub enum AttemptError<E> {
    /// The timer fired before the operation completed.
    #[error("attempt timed out after {0:?}")]
    Timeout(Duration),

    /// The operation reported failure.
    #[error("transport error: {0}")]
    Transport(E),

    /// No connection handle could be built for the endpoint.
    #[error("connect error: {0}")]
    Connect(String),

    /// The operation task panicked or was aborted.
    #[error("operation aborted: {0}")]
    Aborted(String),
}

impl<E> AttemptError<E> {
    pub fn is_timeout(&self) -> bool {
        matches!(self, AttemptError::Timeout(_))
    }

    /// Short label for logs and metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            AttemptError::Timeout(_) => "timeout",
            AttemptError::Transport(_) => "transport",
            AttemptError::Connect(_) => "connect",
            AttemptError::Aborted(_) => "aborted",
        }
    }

    /// The operation's own error, if that is what failed.
    pub fn into_transport(self) -> Option<E> {
        match self {
            AttemptError::Transport(e) => Some(e),
            _ => None,
        }
    }
}

/// Error returned by pooled execution.
#[derive(Debug, Error)]
pub enum ExecuteError<E> {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// Every endpoint exhausted every attempt.
    #[error("all endpoints exhausted after {total_attempts} attempts, last error: {last_error}")]
    Exhausted {
        last_error: AttemptError<E>,
        total_attempts: u32,
    },
}

impl<E> ExecuteError<E> {
    /// Attempts made before giving up (zero for configuration errors).
    pub fn total_attempts(&self) -> u32 {
        match self {
            ExecuteError::Configuration(_) => 0,
            ExecuteError::Exhausted { total_attempts, .. } => *total_attempts,
        }
    }

    pub fn last_error(&self) -> Option<&AttemptError<E>> {
        match self {
            ExecuteError::Configuration(_) => None,
            ExecuteError::Exhausted { last_error, .. } => Some(last_error),
        }
    }
}

/// The circuit breaker refused a call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("circuit open for '{target_id}' ({failures} failures), retry in {retry_in:?}")]
pub struct CircuitOpen {
    pub target_id: String,
    pub failures: u32,
    /// Remaining cool-down; zero when a half-open probe is already running.
    pub retry_in: Duration,
}

/// Error returned by a breaker-guarded call.
#[derive(Debug, Error)]
pub enum GuardError<E> {
    #[error(transparent)]
    CircuitOpen(#[from] CircuitOpen),

    /// The operation's own error, unmodified.
    #[error("{0}")]
    Operation(E),
}

impl<E> GuardError<E> {
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, GuardError::CircuitOpen(_))
    }

    pub fn into_operation(self) -> Option<E> {
        match self {
            GuardError::Operation(e) => Some(e),
            GuardError::CircuitOpen(_) => None,
        }
    }
}
