//! Time model shared by production dispatch and simulation.
//!
//! # Design
//!
//! Every dispatcher operation that depends on "now" takes an explicit
//! [`Timestamp`] argument instead of reading a global clock.  The caller
//! decides which clock that value comes from:
//!
//!   production  →  [`SystemClock`]  (wall-clock UTC)
//!   simulation  →  the simulation's virtual clock
//!   tests       →  [`ManualClock`]  (set / advance by hand)
//!
//! This keeps timeouts evaluated against exactly one clock per caller and
//! makes one dispatch cycle observe a single consistent "now".

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Datelike, Duration, TimeZone, Timelike, Utc};

use crate::{CoreError, CoreResult};

/// An absolute instant, simulated or real depending on the caller.
pub type Timestamp = DateTime<Utc>;

/// Source of the current time.
///
/// Implementations must be cheap to call and `Send + Sync` so a clock can be
/// shared with the background dispatch loop.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

// ── SystemClock ───────────────────────────────────────────────────────────────

/// Wall-clock UTC time.
#[derive(Copy, Clone, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[inline]
    fn now(&self) -> Timestamp {
        Utc::now()
    }
}

// ── ManualClock ───────────────────────────────────────────────────────────────

/// A clock that only moves when told to.
///
/// Clones share the same underlying instant, so a test can hand one copy to a
/// background loop and advance another.  Resolution is one millisecond.
#[derive(Clone, Debug)]
pub struct ManualClock {
    millis: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            millis: Arc::new(AtomicI64::new(start.timestamp_millis())),
        }
    }

    /// Jump to `t`.  Moving backwards is allowed; callers that need a
    /// monotonic clock must not do it.
    pub fn set(&self, t: Timestamp) {
        self.millis.store(t.timestamp_millis(), Ordering::Release);
    }

    /// Move forward by `delta`.
    pub fn advance(&self, delta: Duration) {
        self.millis.fetch_add(delta.num_milliseconds(), Ordering::AcqRel);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        from_millis(self.millis.load(Ordering::Acquire))
    }
}

// ── Calendar helpers ──────────────────────────────────────────────────────────

/// Convert Unix milliseconds to a [`Timestamp`], saturating to the epoch for
/// values chrono cannot represent.
pub fn from_millis(ms: i64) -> Timestamp {
    Utc.timestamp_millis_opt(ms).single().unwrap_or_default()
}

/// Parse an RFC 3339 instant (`2024-03-04T00:00:00Z`) into UTC.
pub fn parse_timestamp(s: &str) -> CoreResult<Timestamp> {
    DateTime::parse_from_rfc3339(s.trim())
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| CoreError::Parse(format!("invalid timestamp {s:?}: {e}")))
}

/// Hour of day in `0..24`.
#[inline]
pub fn hour_of_day(t: Timestamp) -> usize {
    t.hour() as usize
}

/// Day of week in `0..7`, Monday = 0.
#[inline]
pub fn weekday_index(t: Timestamp) -> usize {
    t.weekday().num_days_from_monday() as usize
}

/// Truncate `t` to the start of its hour.
pub fn floor_to_hour(t: Timestamp) -> Timestamp {
    let secs = t.timestamp();
    from_millis(secs.div_euclid(3_600) * 3_600_000)
}

/// Whole simulated days elapsed from `start` to `t` (0 for the first day).
#[inline]
pub fn day_index(start: Timestamp, t: Timestamp) -> u32 {
    ((t - start).num_seconds().max(0) / 86_400) as u32
}

/// Break the span from `start` to `now` into (day, hour, minute) components.
/// Used for human-readable progress logging.
pub fn elapsed_dhm(start: Timestamp, now: Timestamp) -> (u64, u32, u32) {
    let total_secs = (now - start).num_seconds().max(0) as u64;
    let days = total_secs / 86_400;
    let hours = ((total_secs % 86_400) / 3_600) as u32;
    let minutes = ((total_secs % 3_600) / 60) as u32;
    (days, hours, minutes)
}

/// Seconds as a chrono duration; fractional seconds are kept to the
/// millisecond.  Out-of-range values saturate and NaN reads as zero.
#[inline]
pub fn secs_f64(secs: f64) -> Duration {
    // `as` saturates; i64::MIN itself is out of range for a TimeDelta.
    let ms = ((secs * 1_000.0).round() as i64).max(-i64::MAX);
    Duration::milliseconds(ms)
}
