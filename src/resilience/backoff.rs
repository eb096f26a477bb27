//! Exponential backoff without jitter.

use std::time::Duration;

/// Delay to sleep after the failed attempt with zero-based `retry_index`.
///
/// `base * 2^retry_index`, saturating instead of overflowing. Deterministic:
/// no jitter is applied.
pub fn calculate_backoff(base: Duration, retry_index: u32) -> Duration {
    const NANOS_PER_SEC: u128 = 1_000_000_000;

    let nanos = base.as_nanos();
    if nanos == 0 {
        return Duration::ZERO;
    }
    let scaled = 1u128
        .checked_shl(retry_index)
        .and_then(|factor| nanos.checked_mul(factor));

    match scaled {
        Some(total) => match u64::try_from(total / NANOS_PER_SEC) {
            Ok(secs) => Duration::new(secs, (total % NANOS_PER_SEC) as u32),
            Err(_) => Duration::MAX,
        },
        None => Duration::MAX,
    }
}

/// The full inter-attempt schedule for `max_attempts` attempts.
///
/// Has `max_attempts - 1` entries: nothing is slept after the last attempt.
pub fn backoff_schedule(base: Duration, max_attempts: u32) -> Vec<Duration> {
    (0..max_attempts.saturating_sub(1))
        .map(|retry_index| calculate_backoff(base, retry_index))
        .collect()
}
