//! Simulated events and the robot actions the run schedules for itself.

use fleet_core::{EventId, RobotId, TableId, TaskId, Timestamp};
use serde::Serialize;

/// One synthetic guest event.  Owned by the scheduler until popped.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SimulatedEvent {
    pub id:           EventId,
    pub scheduled_at: Timestamp,
    pub kind:         EventKind,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventKind {
    GuestArrived { table: TableId, party_size: u32, needs_help: bool },
    GuestNeedsHelp { table: TableId },
    FoodReady { table: TableId },
    GuestLeft { table: TableId, party_size: u32 },
}

impl EventKind {
    pub fn table(&self) -> TableId {
        match *self {
            EventKind::GuestArrived { table, .. }
            | EventKind::GuestNeedsHelp { table }
            | EventKind::FoodReady { table }
            | EventKind::GuestLeft { table, .. } => table,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            EventKind::GuestArrived { .. } => "guest_arrived",
            EventKind::GuestNeedsHelp { .. } => "guest_needs_help",
            EventKind::FoodReady { .. } => "food_ready",
            EventKind::GuestLeft { .. } => "guest_left",
        }
    }
}

/// Outcome of a simulated robot's work, due at a later simulated time.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum RobotAction {
    FinishTask { task: TaskId, robot: RobotId },
    FinishCharging { robot: RobotId },
}
