//! Racing an attempt against its deadline.
//!
//! # Design Decisions
//! - `Detach` spawns the operation and races the task against a timer; the
//!   loser is simply no longer awaited, so a timed-out operation keeps
//!   running in the background until it finishes on its own
//! - `Cancel` drops the operation future when the timer wins
//! - Cleanup (closing connections) belongs inside the operation itself

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

use crate::error::AttemptError;

/// What happens to an operation whose attempt timed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeoutMode {
    /// Stop waiting; the operation keeps running.
    #[default]
    Detach,
    /// Drop the operation future.
    Cancel,
}

/// Run `operation` with a deadline of `limit`.
pub async fn race_timeout<Fut, T, E>(
    operation: Fut,
    limit: Duration,
    mode: TimeoutMode,
) -> Result<T, AttemptError<E>>
where
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    match mode {
        TimeoutMode::Detach => {
            let mut task = tokio::spawn(operation);
            tokio::select! {
                biased;
                joined = &mut task => match joined {
                    Ok(Ok(value)) => Ok(value),
                    Ok(Err(e)) => Err(AttemptError::Transport(e)),
                    Err(join_error) => Err(AttemptError::Aborted(join_error.to_string())),
                },
                _ = tokio::time::sleep(limit) => Err(AttemptError::Timeout(limit)),
            }
        }
        TimeoutMode::Cancel => match tokio::time::timeout(limit, operation).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(AttemptError::Transport(e)),
            Err(_) => Err(AttemptError::Timeout(limit)),
        },
    }
}
