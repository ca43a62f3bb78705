//! `SimulationClock`: maps real elapsed time onto simulated time.
//!
//! The mapping is anchored at the last resume:
//!
//!   sim(now) = sim_at_anchor + (real_now - real_anchor) × acceleration
//!
//! Pausing folds the elapsed span into `sim_at_anchor` and drops the real
//! anchor, so no simulated time passes while paused.  Resuming sets a new
//! real anchor and nothing is skipped or counted twice.
//!
//! Readings saturate.  A clock given a [`limit`](SimulationClock::with_limit)
//! never reads past it, however large the acceleration.
//!
//! All methods take the real instant explicitly.  Tests drive the clock with
//! synthetic `Instant`s; the session thread passes `Instant::now()`.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use fleet_core::time::secs_f64;
use fleet_core::Timestamp;

use crate::{SimError, SimResult};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ClockState {
    Running { anchor: Instant },
    Paused,
    Stopped,
}

#[derive(Clone, Debug)]
pub struct SimulationClock {
    sim_at_anchor: Timestamp,
    acceleration:  f64,
    limit:         Timestamp,
    state:         ClockState,
}

impl SimulationClock {
    /// A running clock reading `start` at real instant `real`.
    pub fn new(start: Timestamp, acceleration: f64, real: Instant) -> Self {
        Self {
            sim_at_anchor: start,
            acceleration,
            limit: DateTime::<Utc>::MAX_UTC,
            state: ClockState::Running { anchor: real },
        }
    }

    /// Readings stop at `limit`.
    pub fn with_limit(mut self, limit: Timestamp) -> Self {
        self.limit = limit;
        self.sim_at_anchor = self.sim_at_anchor.min(limit);
        self
    }

    pub fn limit(&self) -> Timestamp {
        self.limit
    }

    fn advanced(&self, anchor: Instant, real: Instant) -> Timestamp {
        let real_secs = real.saturating_duration_since(anchor).as_secs_f64();
        self.sim_at_anchor
            .checked_add_signed(secs_f64(real_secs * self.acceleration))
            .map_or(self.limit, |t| t.min(self.limit))
    }

    /// Simulated time at real instant `real`.  Never earlier than the last
    /// reading taken at an earlier or equal instant.
    pub fn now_at(&self, real: Instant) -> Timestamp {
        match self.state {
            ClockState::Running { anchor } => self.advanced(anchor, real),
            ClockState::Paused | ClockState::Stopped => self.sim_at_anchor,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, ClockState::Running { .. })
    }

    pub fn is_paused(&self) -> bool {
        self.state == ClockState::Paused
    }

    pub fn is_stopped(&self) -> bool {
        self.state == ClockState::Stopped
    }

    pub fn acceleration(&self) -> f64 {
        self.acceleration
    }

    /// Freeze simulated time.
    pub fn pause(&mut self, real: Instant) -> SimResult<()> {
        match self.state {
            ClockState::Running { anchor } => {
                self.sim_at_anchor = self.advanced(anchor, real);
                self.state = ClockState::Paused;
                Ok(())
            }
            ClockState::Paused => Err(SimError::Conflict("clock is already paused".into())),
            ClockState::Stopped => Err(SimError::ClockStopped),
        }
    }

    /// Re-anchor at `real` and continue from the paused reading.
    pub fn resume(&mut self, real: Instant) -> SimResult<()> {
        match self.state {
            ClockState::Paused => {
                self.state = ClockState::Running { anchor: real };
                Ok(())
            }
            ClockState::Running { .. } => Err(SimError::Conflict("clock is not paused".into())),
            ClockState::Stopped => Err(SimError::ClockStopped),
        }
    }

    /// Terminal.  The reading at `real` is kept.
    pub fn stop(&mut self, real: Instant) {
        if let ClockState::Running { anchor } = self.state {
            self.sim_at_anchor = self.advanced(anchor, real);
        }
        self.state = ClockState::Stopped;
    }

    /// Real time the clock needs to advance by `sim_delta`.  Saturates at
    /// `Duration::MAX`.
    pub fn real_wait_for(&self, sim_delta: chrono::Duration) -> Duration {
        let secs = sim_delta.num_milliseconds().max(0) as f64 / 1_000.0;
        Duration::try_from_secs_f64(secs / self.acceleration).unwrap_or(Duration::MAX)
    }
}
