//! `RobotRegistry`: the dispatcher's view of the fleet.
//!
//! Robots are keyed by id in a `BTreeMap`, so iteration is always in
//! ascending id order.  Selection strategies rely on that for their
//! lowest-id tie-breaks.

use std::collections::BTreeMap;

use fleet_core::RobotId;

use crate::{DispatchConfig, DispatchError, DispatchResult, Robot, RobotStatus};

#[derive(Default)]
pub struct RobotRegistry {
    robots: BTreeMap<RobotId, Robot>,
}

impl RobotRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, robot: Robot) -> DispatchResult<()> {
        if self.robots.contains_key(&robot.id) {
            return Err(DispatchError::DuplicateRobot(robot.id));
        }
        self.robots.insert(robot.id, robot);
        Ok(())
    }

    pub fn get(&self, id: RobotId) -> Option<&Robot> {
        self.robots.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: RobotId) -> DispatchResult<&mut Robot> {
        self.robots.get_mut(&id).ok_or(DispatchError::RobotNotFound(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Robot> {
        self.robots.values()
    }

    pub fn len(&self) -> usize {
        self.robots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.robots.is_empty()
    }

    /// The eligibility conjunction: enabled, idle, enough battery, and below
    /// the per-robot task cap.  `active_tasks` is the robot's current count of
    /// assigned or in-progress tasks.
    pub fn is_eligible(robot: &Robot, config: &DispatchConfig, active_tasks: u32) -> bool {
        robot.enabled
            && robot.status == RobotStatus::Idle
            && robot.battery_level >= config.min_battery_for_assignment as f32
            && active_tasks < config.max_tasks_per_robot
    }

    /// Every eligible robot, ascending by id, paired with its active task
    /// count.
    pub fn eligible<F>(&self, config: &DispatchConfig, active_tasks: F) -> Vec<(&Robot, u32)>
    where
        F: Fn(RobotId) -> u32,
    {
        self.robots
            .values()
            .filter_map(|r| {
                let n = active_tasks(r.id);
                Self::is_eligible(r, config, n).then_some((r, n))
            })
            .collect()
    }
}
