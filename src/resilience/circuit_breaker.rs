//! Circuit breaker state machine for a single target.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: target assumed down, calls fail fast
//! - Half-Open: one probe call tests whether the target recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: failure_count >= threshold (consecutive failures)
//! Open → Half-Open: first call after cool-down since the last failure
//! Half-Open → Closed: probe succeeds
//! Half-Open → Open: probe fails, regardless of threshold
//! ```
//!
//! # Design Decisions
//! - Open → Half-Open is evaluated lazily when a call arrives; no timers
//! - Single probe in Half-Open; concurrent callers are refused until it settles
//! - Every state change starts a new epoch; outcomes of calls admitted in an
//!   earlier epoch are stale and must not be recorded
//! - Time is passed in, so the machine is deterministic under test

use serde::Serialize;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::time::Instant;

/// Circuit breaker states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

/// Threshold and cool-down for one breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerSettings {
    /// Consecutive failures that open the circuit.
    pub threshold: u32,
    /// Time since the last failure before a probe is allowed.
    pub cool_down: Duration,
}

impl BreakerSettings {
    pub fn new(threshold: u32, cool_down: Duration) -> Self {
        Self {
            threshold: threshold.max(1),
            cool_down,
        }
    }
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self::new(5, Duration::from_secs(60))
    }
}

/// A state change, reported so it can be observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: CircuitState,
    pub to: CircuitState,
    pub failure_count: u32,
}

/// A call was let through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    /// This call is the half-open probe.
    pub probe: bool,
    pub transition: Option<Transition>,
}

/// A call was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rejection {
    pub failures: u32,
    pub retry_in: Duration,
}

/// Read-only view of a breaker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BreakerSnapshot {
    pub state: CircuitState,
    pub failure_count: u32,
    /// Wall-clock time of the last failure, in Unix milliseconds.
    pub last_failure_at_ms: Option<u64>,
}

impl Default for BreakerSnapshot {
    fn default() -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            last_failure_at_ms: None,
        }
    }
}

/// Breaker for one target identifier.
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    settings: BreakerSettings,
    state: CircuitState,
    failure_count: u32,
    last_failure_at: Option<Instant>,
    last_failure_wall: Option<SystemTime>,
    probe_in_flight: bool,
    epoch: u64,
}

impl CircuitBreaker {
    pub fn new(settings: BreakerSettings) -> Self {
        Self {
            settings,
            state: CircuitState::Closed,
            failure_count: 0,
            last_failure_at: None,
            last_failure_wall: None,
            probe_in_flight: false,
            epoch: 0,
        }
    }

    pub fn state(&self) -> CircuitState {
        self.state
    }

    pub fn failure_count(&self) -> u32 {
        self.failure_count
    }

    pub fn settings(&self) -> BreakerSettings {
        self.settings
    }

    /// Changes on every state transition and on reset.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    fn enter(&mut self, state: CircuitState) {
        self.state = state;
        self.epoch = self.epoch.wrapping_add(1);
    }

    /// Decide whether a call may proceed at `now`.
    pub fn try_acquire(&mut self, now: Instant) -> Result<Admission, Rejection> {
        match self.state {
            CircuitState::Closed => Ok(Admission {
                probe: false,
                transition: None,
            }),
            CircuitState::Open => {
                let elapsed = self
                    .last_failure_at
                    .map(|at| now.saturating_duration_since(at))
                    .unwrap_or(self.settings.cool_down);

                if elapsed < self.settings.cool_down {
                    return Err(Rejection {
                        failures: self.failure_count,
                        retry_in: self.settings.cool_down - elapsed,
                    });
                }

                self.enter(CircuitState::HalfOpen);
                self.failure_count = 0;
                self.probe_in_flight = true;
                Ok(Admission {
                    probe: true,
                    transition: Some(Transition {
                        from: CircuitState::Open,
                        to: CircuitState::HalfOpen,
                        failure_count: 0,
                    }),
                })
            }
            CircuitState::HalfOpen => {
                if self.probe_in_flight {
                    return Err(Rejection {
                        failures: self.failure_count,
                        retry_in: Duration::ZERO,
                    });
                }
                self.probe_in_flight = true;
                Ok(Admission {
                    probe: true,
                    transition: None,
                })
            }
        }
    }

    /// Record a successful call.
    pub fn on_success(&mut self, probe: bool) -> Option<Transition> {
        if probe {
            self.probe_in_flight = false;
        }
        self.failure_count = 0;

        if self.state == CircuitState::HalfOpen {
            self.enter(CircuitState::Closed);
            return Some(Transition {
                from: CircuitState::HalfOpen,
                to: CircuitState::Closed,
                failure_count: 0,
            });
        }
        None
    }

    /// Record a failed call at `now`.
    pub fn on_failure(&mut self, now: Instant, probe: bool) -> Option<Transition> {
        if probe {
            self.probe_in_flight = false;
        }
        self.failure_count = self.failure_count.saturating_add(1);
        self.last_failure_at = Some(now);
        self.last_failure_wall = Some(SystemTime::now());

        let from = self.state;
        let opens = match from {
            CircuitState::HalfOpen => true,
            CircuitState::Closed => self.failure_count >= self.settings.threshold,
            CircuitState::Open => false,
        };

        if !opens {
            return None;
        }
        self.enter(CircuitState::Open);
        Some(Transition {
            from,
            to: CircuitState::Open,
            failure_count: self.failure_count,
        })
    }

    /// Free the probe slot without recording an outcome.
    pub fn release_probe(&mut self) {
        self.probe_in_flight = false;
    }

    /// Force `{Closed, 0}`.
    pub fn reset(&mut self) -> Option<Transition> {
        let from = self.state;
        self.enter(CircuitState::Closed);
        self.failure_count = 0;
        self.last_failure_at = None;
        self.last_failure_wall = None;
        self.probe_in_flight = false;

        (from != CircuitState::Closed).then_some(Transition {
            from,
            to: CircuitState::Closed,
            failure_count: 0,
        })
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        BreakerSnapshot {
            state: self.state,
            failure_count: self.failure_count,
            last_failure_at_ms: self.last_failure_wall.and_then(|at| {
                at.duration_since(UNIX_EPOCH)
                    .ok()
                    .map(|d| d.as_millis() as u64)
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(threshold: u32, cool_down_secs: u64) -> CircuitBreaker {
        CircuitBreaker::new(BreakerSettings::new(
            threshold,
            Duration::from_secs(cool_down_secs),
        ))
    }

    #[test]
    fn test_circuit_breaker_initial_state() {
        let cb = CircuitBreaker::new(BreakerSettings::default());
        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.snapshot(), BreakerSnapshot::default());
    }

    #[test]
    fn test_opens_on_exactly_threshold() {
        let mut cb = breaker(5, 60);
        let now = Instant::now();

        for _ in 0..4 {
            assert!(cb.on_failure(now, false).is_none());
            assert_eq!(cb.state(), CircuitState::Closed);
        }

        let transition = cb.on_failure(now, false).unwrap();
        assert_eq!(transition.from, CircuitState::Closed);
        assert_eq!(transition.to, CircuitState::Open);
        assert_eq!(cb.failure_count(), 5);

        // A 6th failure keeps it open without a new transition.
        assert!(cb.on_failure(now, false).is_none());
        assert_eq!(cb.state(), CircuitState::Open);
    }

    #[test]
    fn test_success_resets_consecutive_count() {
        let mut cb = breaker(3, 60);
        let now = Instant::now();
        cb.on_failure(now, false);
        cb.on_failure(now, false);
        cb.on_success(false);
        assert_eq!(cb.failure_count(), 0);

        cb.on_failure(now, false);
        cb.on_failure(now, false);
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[test]
    fn test_open_rejects_until_cool_down() {
        let mut cb = breaker(2, 60);
        let opened_at = Instant::now();
        cb.on_failure(opened_at, false);
        cb.on_failure(opened_at, false);

        let rejection = cb.try_acquire(opened_at + Duration::from_secs(59)).unwrap_err();
        assert_eq!(rejection.failures, 2);
        assert_eq!(rejection.retry_in, Duration::from_secs(1));
        assert_eq!(cb.state(), CircuitState::Open);
    }

    #[test]
    fn test_half_open_after_cool_down() {
        let mut cb = breaker(2, 60);
        let opened_at = Instant::now();
        cb.on_failure(opened_at, false);
        cb.on_failure(opened_at, false);

        let admission = cb.try_acquire(opened_at + Duration::from_secs(60)).unwrap();
        assert!(admission.probe);
        assert_eq!(
            admission.transition.map(|t| t.to),
            Some(CircuitState::HalfOpen)
        );
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        assert_eq!(cb.failure_count(), 0);
    }

    #[test]
    fn test_single_probe_in_half_open() {
        let mut cb = breaker(1, 10);
        let t0 = Instant::now();
        cb.on_failure(t0, false);

        let later = t0 + Duration::from_secs(10);
        assert!(cb.try_acquire(later).is_ok());
        let second = cb.try_acquire(later).unwrap_err();
        assert_eq!(second.retry_in, Duration::ZERO);

        cb.release_probe();
        assert!(cb.try_acquire(later).unwrap().probe);
    }

    #[test]
    fn test_probe_success_closes() {
        let mut cb = breaker(1, 10);
        let t0 = Instant::now();
        cb.on_failure(t0, false);
        cb.try_acquire(t0 + Duration::from_secs(10)).unwrap();

        let transition = cb.on_success(true).unwrap();
        assert_eq!(transition.to, CircuitState::Closed);
        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.failure_count(), 0);
    }

    #[test]
    fn test_probe_failure_reopens_below_threshold() {
        let mut cb = breaker(5, 10);
        let t0 = Instant::now();
        for _ in 0..5 {
            cb.on_failure(t0, false);
        }
        let probe_at = t0 + Duration::from_secs(10);
        cb.try_acquire(probe_at).unwrap();

        let transition = cb.on_failure(probe_at, true).unwrap();
        assert_eq!(transition.from, CircuitState::HalfOpen);
        assert_eq!(transition.to, CircuitState::Open);
        assert_eq!(cb.failure_count(), 1);

        // Cool-down restarts from the probe failure.
        assert!(cb.try_acquire(probe_at + Duration::from_secs(5)).is_err());
    }

    #[test]
    fn test_reset_from_open() {
        let mut cb = breaker(1, 60);
        cb.on_failure(Instant::now(), false);
        assert_eq!(cb.state(), CircuitState::Open);

        let transition = cb.reset().unwrap();
        assert_eq!(transition.from, CircuitState::Open);
        assert_eq!(cb.snapshot(), BreakerSnapshot::default());
        assert!(cb.reset().is_none());
    }

    #[test]
    fn test_reset_from_half_open_and_closed() {
        let mut cb = breaker(1, 10);
        let t0 = Instant::now();
        cb.on_failure(t0, false);
        cb.try_acquire(t0 + Duration::from_secs(10)).unwrap();
        assert_eq!(cb.state(), CircuitState::HalfOpen);

        assert_eq!(cb.reset().map(|t| t.from), Some(CircuitState::HalfOpen));
        assert_eq!(cb.snapshot(), BreakerSnapshot::default());
        assert!(!cb.try_acquire(t0 + Duration::from_secs(10)).unwrap().probe);

        let mut cb = breaker(5, 10);
        cb.on_failure(t0, false);
        cb.on_failure(t0, false);
        assert!(cb.reset().is_none());
        assert_eq!(cb.snapshot(), BreakerSnapshot::default());
    }

    #[test]
    fn test_epoch_moves_on_transitions() {
        let mut cb = breaker(2, 10);
        let t0 = Instant::now();
        let start = cb.epoch();

        cb.on_failure(t0, false);
        assert_eq!(cb.epoch(), start);
        cb.on_failure(t0, false);
        let opened = cb.epoch();
        assert_ne!(opened, start);

        cb.try_acquire(t0 + Duration::from_secs(10)).unwrap();
        assert_ne!(cb.epoch(), opened);
    }

    #[test]
    fn test_snapshot_records_last_failure() {
        let mut cb = breaker(3, 60);
        cb.on_failure(Instant::now(), false);
        let snapshot = cb.snapshot();
        assert_eq!(snapshot.failure_count, 1);
        assert!(snapshot.last_failure_at_ms.is_some());
    }
}
