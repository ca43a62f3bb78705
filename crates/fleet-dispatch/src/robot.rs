//! Robot model and its status state machine.

use std::fmt;

use fleet_core::{Position, RobotId, TaskId, Timestamp};
use serde::{Deserialize, Serialize};

/// ```text
/// Idle ↔ {Navigating, Delivering, Returning, Charging}
/// any  → Error      on fault
/// Error → Idle      only via explicit recovery
/// any  → Offline    on heartbeat loss past the grace period
/// Offline → Idle    on reconnect
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RobotStatus {
    Idle,
    Navigating,
    Delivering,
    Returning,
    Charging,
    Error,
    Offline,
}

impl fmt::Display for RobotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RobotStatus::Idle => "idle",
            RobotStatus::Navigating => "navigating",
            RobotStatus::Delivering => "delivering",
            RobotStatus::Returning => "returning",
            RobotStatus::Charging => "charging",
            RobotStatus::Error => "error",
            RobotStatus::Offline => "offline",
        };
        f.write_str(s)
    }
}

/// One service robot as the dispatcher sees it.
///
/// `current_task_id` mirrors `Task::robot_id`; the engine keeps the two in
/// step and neither side owns the other.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Robot {
    pub id:              RobotId,
    pub name:            String,
    pub status:          RobotStatus,
    /// Percent, `0.0..=100.0`.
    pub battery_level:   f32,
    pub position:        Position,
    pub current_task_id: Option<TaskId>,
    pub enabled:         bool,
    pub last_heartbeat:  Timestamp,
}

impl Robot {
    /// A fully charged, enabled, idle robot that has just checked in.
    pub fn new(id: RobotId, name: impl Into<String>, position: Position, now: Timestamp) -> Self {
        Self {
            id,
            name: name.into(),
            status: RobotStatus::Idle,
            battery_level: 100.0,
            position,
            current_task_id: None,
            enabled: true,
            last_heartbeat: now,
        }
    }

    pub fn with_battery(mut self, level: f32) -> Self {
        self.battery_level = level.clamp(0.0, 100.0);
        self
    }
}
