//! Simulation configuration: horizon, fleet size, traffic patterns and the
//! robot behaviour model.

use chrono::{Datelike, Duration};
use fleet_core::time::from_millis;
use fleet_core::Timestamp;
use fleet_dispatch::{DispatchConfig, FailoverConfig, MAX_DURATION_SECS};
use serde::{Deserialize, Serialize};

use crate::{SimError, SimResult};

/// Latest accepted end year.  Follow-up events and robot actions land at
/// most [`MAX_DURATION_SECS`] after the end, well inside chrono's range.
pub const MAX_END_YEAR: i32 = 9_999;

const MAX_DURATION_MINUTES: f64 = (MAX_DURATION_SECS / 60) as f64;

// ── EventPatterns ─────────────────────────────────────────────────────────────

/// Guest traffic shape.  Rates are mean parties per hour before the
/// weekday multiplier is applied.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventPatterns {
    /// Indexed by hour of day, `0..24`.
    pub hourly_arrival_rates:          [f64; 24],
    /// Indexed Monday = 0 .. Sunday = 6.
    pub day_of_week_multipliers:       [f64; 7],
    pub average_meal_duration_minutes: f64,
    pub guest_needs_help_probability:  f64,
    pub average_party_size:            f64,
}

impl Default for EventPatterns {
    fn default() -> Self {
        let mut rates = [0.0; 24];
        let busy = [
            (11, 8.0),
            (12, 15.0),
            (13, 12.0),
            (14, 5.0),
            (15, 2.0),
            (16, 3.0),
            (17, 8.0),
            (18, 14.0),
            (19, 16.0),
            (20, 10.0),
            (21, 5.0),
            (22, 1.0),
        ];
        for (hour, rate) in busy {
            rates[hour] = rate;
        }
        Self {
            hourly_arrival_rates:          rates,
            day_of_week_multipliers:       [0.8, 0.8, 0.9, 1.0, 1.3, 1.5, 1.2],
            average_meal_duration_minutes: 60.0,
            guest_needs_help_probability:  0.15,
            average_party_size:            2.5,
        }
    }
}

impl EventPatterns {
    pub fn validate(&self) -> SimResult<()> {
        let bad = |v: f64| !v.is_finite() || v < 0.0;
        if self.hourly_arrival_rates.iter().copied().any(bad) {
            return Err(SimError::InvalidConfig(
                "hourly_arrival_rates must be finite and non-negative".into(),
            ));
        }
        if self.day_of_week_multipliers.iter().copied().any(bad) {
            return Err(SimError::InvalidConfig(
                "day_of_week_multipliers must be finite and non-negative".into(),
            ));
        }
        if !(self.average_meal_duration_minutes > 0.0
            && self.average_meal_duration_minutes <= MAX_DURATION_MINUTES)
        {
            return Err(SimError::InvalidConfig(format!(
                "average_meal_duration_minutes must be within (0, {MAX_DURATION_MINUTES}], got {}",
                self.average_meal_duration_minutes
            )));
        }
        if !(0.0..=1.0).contains(&self.guest_needs_help_probability) {
            return Err(SimError::InvalidConfig(format!(
                "guest_needs_help_probability must be within [0, 1], got {}",
                self.guest_needs_help_probability
            )));
        }
        if !self.average_party_size.is_finite() || self.average_party_size < 1.0 {
            return Err(SimError::InvalidConfig(format!(
                "average_party_size must be at least 1, got {}",
                self.average_party_size
            )));
        }
        Ok(())
    }
}

// ── Sampling and horizon ──────────────────────────────────────────────────────

/// How many parties arrive in one simulated hour.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArrivalSampling {
    /// A Poisson draw with the hour's expected count as its mean.
    #[default]
    Poisson,
    /// The expected count itself; the fractional part carries into the
    /// next hour so long-run totals match the configured rates.
    Expected,
}

/// How far ahead the scheduler is filled.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleHorizon {
    /// Every event of the run is generated before the first is processed.
    Eager,
    /// Events are generated one simulated day ahead of processing.
    #[default]
    Daily,
}

// ── RobotBehavior ─────────────────────────────────────────────────────────────

/// How simulated robots carry out their tasks.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RobotBehavior {
    pub robot_speed_mps:         f64,
    /// Mean time spent at the table once there.
    pub service_time_secs:       f64,
    /// Chance that a started task stalls and never reports progress.
    pub blockage_probability:    f64,
    /// Battery percent consumed per completed task.
    pub battery_drain_per_task:  f64,
    /// Robots below this battery percent go charging after a task.
    pub charge_threshold:        f64,
    pub charge_duration_minutes: f64,
}

impl Default for RobotBehavior {
    fn default() -> Self {
        Self {
            robot_speed_mps:         0.8,
            service_time_secs:       30.0,
            blockage_probability:    0.02,
            battery_drain_per_task:  1.5,
            charge_threshold:        25.0,
            charge_duration_minutes: 45.0,
        }
    }
}

impl RobotBehavior {
    pub fn validate(&self) -> SimResult<()> {
        if !self.robot_speed_mps.is_finite() || self.robot_speed_mps <= 0.0 {
            return Err(SimError::InvalidConfig("robot_speed_mps must be positive".into()));
        }
        if !(0.0..=MAX_DURATION_SECS as f64).contains(&self.service_time_secs) {
            return Err(SimError::InvalidConfig(format!(
                "service_time_secs must be within [0, {MAX_DURATION_SECS}], got {}",
                self.service_time_secs
            )));
        }
        if !(0.0..=1.0).contains(&self.blockage_probability) {
            return Err(SimError::InvalidConfig(format!(
                "blockage_probability must be within [0, 1], got {}",
                self.blockage_probability
            )));
        }
        if !(0.0..=100.0).contains(&self.battery_drain_per_task)
            || !(0.0..=100.0).contains(&self.charge_threshold)
        {
            return Err(SimError::InvalidConfig(
                "battery_drain_per_task and charge_threshold must be within [0, 100]".into(),
            ));
        }
        if !(0.0..=MAX_DURATION_MINUTES).contains(&self.charge_duration_minutes) {
            return Err(SimError::InvalidConfig(format!(
                "charge_duration_minutes must be within [0, {MAX_DURATION_MINUTES}], got {}",
                self.charge_duration_minutes
            )));
        }
        Ok(())
    }
}

// ── SimulationConfig ──────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub simulated_start_time: Timestamp,
    pub simulated_end_time:   Timestamp,
    /// Simulated seconds per real second.
    pub acceleration_factor:  f64,
    pub robot_count:          u32,
    pub table_count:          u32,
    pub random_seed:          u64,
    pub event_patterns:       EventPatterns,
    pub arrival_sampling:     ArrivalSampling,
    pub schedule_horizon:     ScheduleHorizon,
    pub robots:               RobotBehavior,
    /// Dispatch policy of the run's private engine.  The run's dispatch
    /// cycle period is `assignment_interval_seconds` of simulated time.
    pub dispatch:             DispatchConfig,
    pub failover:             FailoverConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        // 2024-01-01T00:00:00Z, a Monday.
        let start = from_millis(1_704_067_200_000);
        Self {
            simulated_start_time: start,
            simulated_end_time:   start + Duration::days(7),
            acceleration_factor:  3_600.0,
            robot_count:          5,
            table_count:          20,
            random_seed:          42,
            event_patterns:       EventPatterns::default(),
            arrival_sampling:     ArrivalSampling::default(),
            schedule_horizon:     ScheduleHorizon::default(),
            robots:               RobotBehavior::default(),
            dispatch:             DispatchConfig::default(),
            failover:             FailoverConfig::default(),
        }
    }
}

impl SimulationConfig {
    /// Reject a configuration before any run state is created.
    pub fn validate(&self) -> SimResult<()> {
        if self.simulated_end_time <= self.simulated_start_time {
            return Err(SimError::InvalidConfig(format!(
                "simulated_end_time ({}) must be after simulated_start_time ({})",
                self.simulated_end_time, self.simulated_start_time
            )));
        }
        if self.simulated_end_time.year() > MAX_END_YEAR {
            return Err(SimError::InvalidConfig(format!(
                "simulated_end_time must not be later than year {MAX_END_YEAR}"
            )));
        }
        if !self.acceleration_factor.is_finite() || self.acceleration_factor <= 0.0 {
            return Err(SimError::InvalidConfig(format!(
                "acceleration_factor must be positive, got {}",
                self.acceleration_factor
            )));
        }
        if self.robot_count == 0 {
            return Err(SimError::InvalidConfig("robot_count must be at least 1".into()));
        }
        if self.table_count == 0 {
            return Err(SimError::InvalidConfig("table_count must be at least 1".into()));
        }
        self.event_patterns.validate()?;
        self.robots.validate()?;
        self.dispatch.validate().map_err(|e| SimError::InvalidConfig(e.to_string()))?;
        self.failover.validate().map_err(|e| SimError::InvalidConfig(e.to_string()))?;
        Ok(())
    }

    pub fn duration(&self) -> Duration {
        self.simulated_end_time - self.simulated_start_time
    }

    pub fn cycle_interval(&self) -> Duration {
        self.dispatch.assignment_interval()
    }
}
