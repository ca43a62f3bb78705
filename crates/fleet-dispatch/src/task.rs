//! Task model and its lifecycle state machine.

use std::fmt;

use fleet_core::{Position, RobotId, TableId, TaskId, Timestamp};
use serde::{Deserialize, Serialize};

use crate::RobotStatus;

// ── TaskType ──────────────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Deliver,
    Return,
    Charge,
    Patrol,
    Escort,
    Greeting,
    Service,
    Cleaning,
    Custom,
}

impl TaskType {
    /// The status a robot takes on when it is assigned a task of this type.
    pub fn robot_status(self) -> RobotStatus {
        match self {
            TaskType::Deliver => RobotStatus::Delivering,
            TaskType::Return => RobotStatus::Returning,
            TaskType::Charge => RobotStatus::Charging,
            TaskType::Patrol
            | TaskType::Escort
            | TaskType::Greeting
            | TaskType::Service
            | TaskType::Cleaning
            | TaskType::Custom => RobotStatus::Navigating,
        }
    }
}

// ── TaskPriority ──────────────────────────────────────────────────────────────

/// Totally ordered: `Low < Normal < High < Urgent`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

impl TaskPriority {
    /// One tier up; `Urgent` is the ceiling.
    pub fn escalated(self) -> TaskPriority {
        match self {
            TaskPriority::Low => TaskPriority::Normal,
            TaskPriority::Normal => TaskPriority::High,
            TaskPriority::High | TaskPriority::Urgent => TaskPriority::Urgent,
        }
    }
}

// ── TaskStatus ────────────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Assigned,
    InProgress,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    /// `Assigned` or `InProgress`: the task holds a robot.
    #[inline]
    pub fn is_active(self) -> bool {
        matches!(self, TaskStatus::Assigned | TaskStatus::InProgress)
    }

    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }

    /// The edges of the task state machine:
    ///
    /// ```text
    /// Pending → Assigned → InProgress → {Completed | Failed | Cancelled}
    /// Assigned | InProgress → Pending        (failover requeue)
    /// Assigned → Failed                       (failover, retries exhausted)
    /// Pending → Cancelled                     (external cancellation)
    /// ```
    pub fn can_transition_to(self, to: TaskStatus) -> bool {
        use TaskStatus::*;
        matches!(
            (self, to),
            (Pending, Assigned)
                | (Pending, Cancelled)
                | (Assigned, InProgress)
                | (Assigned, Pending)
                | (Assigned, Failed)
                | (InProgress, Pending)
                | (InProgress, Completed)
                | (InProgress, Failed)
                | (InProgress, Cancelled)
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Assigned => "assigned",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

// ── TaskRequest ───────────────────────────────────────────────────────────────

/// What an external trigger asks for; the engine turns it into a [`Task`].
#[derive(Clone, Debug, PartialEq)]
pub struct TaskRequest {
    pub task_type:       TaskType,
    pub priority:        TaskPriority,
    pub target_table_id: Option<TableId>,
    /// Floor-plan position of the target, resolved by the caller's map.
    pub target:          Option<Position>,
}

impl TaskRequest {
    pub fn new(task_type: TaskType) -> Self {
        Self {
            task_type,
            priority: TaskPriority::Normal,
            target_table_id: None,
            target: None,
        }
    }

    pub fn priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn table(mut self, table: TableId, at: Position) -> Self {
        self.target_table_id = Some(table);
        self.target = Some(at);
        self
    }

    pub fn target(mut self, at: Position) -> Self {
        self.target = Some(at);
        self
    }
}

// ── Task ──────────────────────────────────────────────────────────────────────

/// A unit of robot work.
///
/// Tasks are owned by the [`TaskQueue`](crate::TaskQueue) and mutated only by
/// the [`DispatchEngine`](crate::DispatchEngine); callers receive shared
/// references or clones.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id:              TaskId,
    pub task_type:       TaskType,
    pub priority:        TaskPriority,
    pub status:          TaskStatus,
    /// Robot currently holding the task.  `Some` exactly while the task is
    /// `Assigned` or `InProgress`.
    pub robot_id:        Option<RobotId>,
    pub target_table_id: Option<TableId>,
    pub target:          Option<Position>,
    pub created_at:      Timestamp,
    pub assigned_at:     Option<Timestamp>,
    pub started_at:      Option<Timestamp>,
    pub completed_at:    Option<Timestamp>,
    pub retry_count:     u32,
    pub error_message:   Option<String>,

    /// Reference point for the escalation window: creation, the last
    /// escalation, or the last failover requeue.
    pub last_escalated_at: Timestamp,
    /// Last progress signal (start, position update, explicit progress).
    pub last_progress_at:  Option<Timestamp>,
    /// Robot that last failed this task and the instant until which it may
    /// not be offered the task again.
    pub cooldown:          Option<(RobotId, Timestamp)>,
}

impl Task {
    pub(crate) fn new(id: TaskId, request: TaskRequest, now: Timestamp) -> Self {
        Self {
            id,
            task_type: request.task_type,
            priority: request.priority,
            status: TaskStatus::Pending,
            robot_id: None,
            target_table_id: request.target_table_id,
            target: request.target,
            created_at: now,
            assigned_at: None,
            started_at: None,
            completed_at: None,
            retry_count: 0,
            error_message: None,
            last_escalated_at: now,
            last_progress_at: None,
            cooldown: None,
        }
    }

    /// `true` if `robot` is still cooling down after failing this task.
    pub fn excludes(&self, robot: RobotId, now: Timestamp) -> bool {
        matches!(self.cooldown, Some((r, until)) if r == robot && now < until)
    }

    /// Time spent between assignment and completion, if both are known.
    pub fn service_duration(&self) -> Option<chrono::Duration> {
        Some(self.completed_at? - self.assigned_at?)
    }
}
