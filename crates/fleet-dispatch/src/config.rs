//! Dispatcher configuration: assignment policy and failover thresholds.
//!
//! Both structs are plain serde data with `Default` values and an explicit
//! [`validate`](DispatchConfig::validate).  The engine only accepts
//! validated values, so a rejected update never leaves partial state behind.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::{DispatchError, DispatchResult};

/// Upper bound on every interval, timeout, and window: one year.
pub const MAX_DURATION_SECS: u64 = 365 * 86_400;

/// `secs` as a chrono duration, saturating at [`MAX_DURATION_SECS`].
fn bounded_secs(secs: u64) -> Duration {
    Duration::try_seconds(secs.min(MAX_DURATION_SECS) as i64).unwrap_or_else(Duration::zero)
}

fn check_duration(name: &str, secs: u64) -> DispatchResult<()> {
    if secs > MAX_DURATION_SECS {
        return Err(DispatchError::InvalidConfig(format!(
            "{name} must be at most {MAX_DURATION_SECS} seconds, got {secs}"
        )));
    }
    Ok(())
}

// ── Algorithm ─────────────────────────────────────────────────────────────────

/// Robot selection algorithm.  See [`crate::strategy`] for the rules.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    #[default]
    Nearest,
    RoundRobin,
    LoadBalanced,
    Priority,
}

impl Algorithm {
    pub const ALL: [Algorithm; 4] = [
        Algorithm::Nearest,
        Algorithm::RoundRobin,
        Algorithm::LoadBalanced,
        Algorithm::Priority,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Algorithm::Nearest => "nearest",
            Algorithm::RoundRobin => "round_robin",
            Algorithm::LoadBalanced => "load_balanced",
            Algorithm::Priority => "priority",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Algorithm::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| DispatchError::UnknownAlgorithm(s.to_owned()))
    }
}

// ── DispatchConfig ────────────────────────────────────────────────────────────

const KEY_ALGORITHM: &str = "dispatch.algorithm";
const KEY_MAX_TASKS: &str = "dispatch.max_tasks_per_robot";
const KEY_MIN_BATTERY: &str = "dispatch.min_battery_for_assignment";
const KEY_AUTO_ASSIGN: &str = "dispatch.auto_assign_enabled";
const KEY_INTERVAL: &str = "dispatch.assignment_interval_seconds";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub algorithm:                   Algorithm,
    /// Allowed range `1..=10`.
    pub max_tasks_per_robot:         u32,
    /// Percent, allowed range `0..=100`.
    pub min_battery_for_assignment:  u32,
    pub auto_assign_enabled:         bool,
    /// Period of the background dispatch cycle.  Must be at least 1.
    pub assignment_interval_seconds: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            algorithm:                   Algorithm::Nearest,
            max_tasks_per_robot:         1,
            min_battery_for_assignment:  20,
            auto_assign_enabled:         true,
            assignment_interval_seconds: 5,
        }
    }
}

impl DispatchConfig {
    pub fn validate(&self) -> DispatchResult<()> {
        if !(1..=10).contains(&self.max_tasks_per_robot) {
            return Err(DispatchError::InvalidConfig(format!(
                "max_tasks_per_robot must be within [1, 10], got {}",
                self.max_tasks_per_robot
            )));
        }
        if self.min_battery_for_assignment > 100 {
            return Err(DispatchError::InvalidConfig(format!(
                "min_battery_for_assignment must be within [0, 100], got {}",
                self.min_battery_for_assignment
            )));
        }
        if self.assignment_interval_seconds == 0 {
            return Err(DispatchError::InvalidConfig(
                "assignment_interval_seconds must be at least 1".into(),
            ));
        }
        check_duration("assignment_interval_seconds", self.assignment_interval_seconds)?;
        Ok(())
    }

    pub fn assignment_interval(&self) -> Duration {
        bounded_secs(self.assignment_interval_seconds)
    }

    /// Flatten into the key/value form persisted by a
    /// [`ConfigStore`](crate::ConfigStore).
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        vec![
            (KEY_ALGORITHM.into(), self.algorithm.to_string()),
            (KEY_MAX_TASKS.into(), self.max_tasks_per_robot.to_string()),
            (KEY_MIN_BATTERY.into(), self.min_battery_for_assignment.to_string()),
            (KEY_AUTO_ASSIGN.into(), self.auto_assign_enabled.to_string()),
            (KEY_INTERVAL.into(), self.assignment_interval_seconds.to_string()),
        ]
    }

    /// Rebuild from persisted pairs.  Missing keys keep their defaults;
    /// malformed values and unknown algorithms are rejected.
    pub fn from_pairs(pairs: &BTreeMap<String, String>) -> DispatchResult<Self> {
        let mut config = DispatchConfig::default();
        if let Some(v) = pairs.get(KEY_ALGORITHM) {
            config.algorithm = v.parse()?;
        }
        if let Some(v) = pairs.get(KEY_MAX_TASKS) {
            config.max_tasks_per_robot = parse_value(KEY_MAX_TASKS, v)?;
        }
        if let Some(v) = pairs.get(KEY_MIN_BATTERY) {
            config.min_battery_for_assignment = parse_value(KEY_MIN_BATTERY, v)?;
        }
        if let Some(v) = pairs.get(KEY_AUTO_ASSIGN) {
            config.auto_assign_enabled = parse_value(KEY_AUTO_ASSIGN, v)?;
        }
        if let Some(v) = pairs.get(KEY_INTERVAL) {
            config.assignment_interval_seconds = parse_value(KEY_INTERVAL, v)?;
        }
        config.validate()?;
        Ok(config)
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> DispatchResult<T> {
    value
        .parse()
        .map_err(|_| DispatchError::InvalidConfig(format!("{key}: cannot parse {value:?}")))
}

// ── FailoverConfig ────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FailoverConfig {
    /// An `InProgress` task with no progress for longer than this is
    /// considered blocked.
    pub blocked_timeout_secs:        u64,
    /// A robot silent for longer than this goes to `Error`.
    pub heartbeat_timeout_secs:      u64,
    /// A robot silent for longer than this goes `Offline`.
    pub offline_grace_secs:          u64,
    /// Reaching this many retries fails the task.
    pub max_retry_count:             u32,
    pub priority_escalation_minutes: u64,
    /// How long a robot that failed a task is kept from receiving it again.
    /// 0 disables the cooldown.
    pub reassign_cooldown_secs:      u64,
}

impl Default for FailoverConfig {
    fn default() -> Self {
        Self {
            blocked_timeout_secs:        120,
            heartbeat_timeout_secs:      30,
            offline_grace_secs:          300,
            max_retry_count:             3,
            priority_escalation_minutes: 3,
            reassign_cooldown_secs:      60,
        }
    }
}

impl FailoverConfig {
    pub fn validate(&self) -> DispatchResult<()> {
        if self.max_retry_count == 0 {
            return Err(DispatchError::InvalidConfig(
                "max_retry_count must be at least 1".into(),
            ));
        }
        if self.priority_escalation_minutes == 0 {
            return Err(DispatchError::InvalidConfig(
                "priority_escalation_minutes must be at least 1".into(),
            ));
        }
        if self.blocked_timeout_secs == 0 || self.heartbeat_timeout_secs == 0 {
            return Err(DispatchError::InvalidConfig(
                "blocked and heartbeat timeouts must be at least 1 second".into(),
            ));
        }
        if self.offline_grace_secs < self.heartbeat_timeout_secs {
            return Err(DispatchError::InvalidConfig(format!(
                "offline_grace_secs ({}) must not be shorter than heartbeat_timeout_secs ({})",
                self.offline_grace_secs, self.heartbeat_timeout_secs
            )));
        }
        check_duration("blocked_timeout_secs", self.blocked_timeout_secs)?;
        check_duration("heartbeat_timeout_secs", self.heartbeat_timeout_secs)?;
        check_duration("offline_grace_secs", self.offline_grace_secs)?;
        check_duration("reassign_cooldown_secs", self.reassign_cooldown_secs)?;
        check_duration(
            "priority_escalation_minutes",
            self.priority_escalation_minutes.saturating_mul(60),
        )?;
        Ok(())
    }

    pub fn blocked_timeout(&self) -> Duration {
        bounded_secs(self.blocked_timeout_secs)
    }

    pub fn heartbeat_timeout(&self) -> Duration {
        bounded_secs(self.heartbeat_timeout_secs)
    }

    pub fn offline_grace(&self) -> Duration {
        bounded_secs(self.offline_grace_secs)
    }

    pub fn escalation_window(&self) -> Duration {
        bounded_secs(self.priority_escalation_minutes.saturating_mul(60))
    }

    pub fn reassign_cooldown(&self) -> Duration {
        bounded_secs(self.reassign_cooldown_secs)
    }
}
