//! Alerts raised when a task fails terminally.

use fleet_core::{AlertId, RobotId, TaskId, Timestamp};
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertCategory {
    /// The robot made no progress within the blocked timeout.
    NavigationBlocked,
    /// The robot reported a fault or stopped sending heartbeats.
    RobotError,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Warning,
    Critical,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id:         AlertId,
    pub category:   AlertCategory,
    pub severity:   AlertSeverity,
    pub task_id:    Option<TaskId>,
    pub robot_id:   Option<RobotId>,
    pub message:    String,
    pub created_at: Timestamp,
}
