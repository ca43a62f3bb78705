//! Robot selection strategies.
//!
//! Each [`Algorithm`] variant maps to one zero-sized [`RobotSelector`]
//! through [`Algorithm::selector`], a closed dispatch table; nothing in the
//! engine compares algorithm names.
//!
//! | Algorithm      | Rule                                                          |
//! |----------------|---------------------------------------------------------------|
//! | `Nearest`      | min Euclidean distance to the task target, then lowest id     |
//! | `RoundRobin`   | least recently assigned (never assigned first), then lowest id |
//! | `LoadBalanced` | min active tasks, then highest battery, then lowest id        |
//! | `Priority`     | `High`/`Urgent`: highest battery, then lowest id; else Nearest |
//!
//! A task without a target position counts as distance 0 for every robot,
//! so `Nearest` degenerates to lowest id.

use std::cmp::Ordering;

use fleet_core::RobotId;

use crate::{Algorithm, Robot, Task, TaskPriority};

/// One eligible robot as seen by a selector.
#[derive(Clone, Debug)]
pub struct Candidate<'a> {
    pub robot:         &'a Robot,
    /// Assigned + in-progress tasks currently held.
    pub active_tasks:  u32,
    /// Engine-wide assignment sequence number of the robot's most recent
    /// assignment, `None` if it was never assigned.
    pub last_assigned: Option<u64>,
}

/// Pick one robot for `task` from `candidates`, or `None` if the slice is
/// empty.  Implementations must be pure and deterministic.
pub trait RobotSelector: Send + Sync {
    fn select(&self, candidates: &[Candidate<'_>], task: &Task) -> Option<RobotId>;
}

impl Algorithm {
    /// The selector implementing this algorithm.
    pub fn selector(self) -> &'static dyn RobotSelector {
        match self {
            Algorithm::Nearest => &NearestSelector,
            Algorithm::RoundRobin => &RoundRobinSelector,
            Algorithm::LoadBalanced => &LoadBalancedSelector,
            Algorithm::Priority => &PrioritySelector,
        }
    }
}

fn distance(c: &Candidate<'_>, task: &Task) -> f32 {
    task.target.map_or(0.0, |t| c.robot.position.distance_to(t))
}

// ── Nearest ───────────────────────────────────────────────────────────────────

pub struct NearestSelector;

impl RobotSelector for NearestSelector {
    fn select(&self, candidates: &[Candidate<'_>], task: &Task) -> Option<RobotId> {
        candidates
            .iter()
            .min_by(|a, b| {
                distance(a, task)
                    .total_cmp(&distance(b, task))
                    .then(a.robot.id.cmp(&b.robot.id))
            })
            .map(|c| c.robot.id)
    }
}

// ── RoundRobin ────────────────────────────────────────────────────────────────

pub struct RoundRobinSelector;

impl RobotSelector for RoundRobinSelector {
    fn select(&self, candidates: &[Candidate<'_>], _task: &Task) -> Option<RobotId> {
        // `None < Some(_)`, so never-assigned robots go first.
        candidates
            .iter()
            .min_by_key(|c| (c.last_assigned, c.robot.id))
            .map(|c| c.robot.id)
    }
}

// ── LoadBalanced ──────────────────────────────────────────────────────────────

pub struct LoadBalancedSelector;

impl RobotSelector for LoadBalancedSelector {
    fn select(&self, candidates: &[Candidate<'_>], _task: &Task) -> Option<RobotId> {
        candidates
            .iter()
            .min_by(|a, b| {
                a.active_tasks
                    .cmp(&b.active_tasks)
                    .then(b.robot.battery_level.total_cmp(&a.robot.battery_level))
                    .then(a.robot.id.cmp(&b.robot.id))
            })
            .map(|c| c.robot.id)
    }
}

// ── Priority ──────────────────────────────────────────────────────────────────

pub struct PrioritySelector;

impl RobotSelector for PrioritySelector {
    fn select(&self, candidates: &[Candidate<'_>], task: &Task) -> Option<RobotId> {
        if task.priority < TaskPriority::High {
            return NearestSelector.select(candidates, task);
        }
        candidates
            .iter()
            .min_by(|a, b| {
                match b.robot.battery_level.total_cmp(&a.robot.battery_level) {
                    Ordering::Equal => a.robot.id.cmp(&b.robot.id),
                    other => other,
                }
            })
            .map(|c| c.robot.id)
    }
}
