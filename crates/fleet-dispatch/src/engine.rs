//! `DispatchEngine`: the single owner of task and robot state.
//!
//! Every mutation of a [`Task`] or [`Robot`] goes through this type: the
//! production dispatch loop and the simulation both call the same methods,
//! so assignment, failover and escalation follow one code path whatever the
//! caller.  No method reads a clock; each takes the caller's `now`.
//!
//! # Dispatch cycle
//!
//! [`DispatchEngine::run_cycle`] applies, against one `now`:
//!
//! 1. priority escalation of waiting tasks,
//! 2. blocked-task detection,
//! 3. heartbeat detection,
//! 4. auto-assignment (when `auto_assign_enabled`).
//!
//! # Failover
//!
//! A released task gets `retry_count += 1`.  Below `max_retry_count` it goes
//! back to `Pending` with its escalation window restarted and a cooldown
//! keeping the failing robot away for `reassign_cooldown_secs`.  At the
//! limit it becomes `Failed` and exactly one [`Alert`] is recorded.

use std::collections::BTreeSet;

use fleet_core::{AlertId, Position, RobotId, TaskId, Timestamp};
use rustc_hash::FxHashMap;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::sink::StatusChange;
use crate::strategy::Candidate;
use crate::{
    Alert, AlertCategory, AlertSeverity, AlertSink, ConfigStore, DispatchConfig, DispatchError,
    DispatchResult, FailoverConfig, Robot, RobotRegistry, RobotStatus, StatusBroadcaster, Task,
    TaskPriority, TaskQueue, TaskRequest, TaskStatus,
};

// ── Result types ──────────────────────────────────────────────────────────────

/// One committed task → robot assignment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Assignment {
    pub task:     TaskId,
    pub robot:    RobotId,
    pub priority: TaskPriority,
}

/// Outcome of [`DispatchEngine::auto_assign_pending_tasks`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AssignmentSummary {
    pub assigned:    usize,
    /// Pending tasks left waiting because no eligible robot was found.
    pub skipped:     usize,
    pub assignments: Vec<Assignment>,
}

/// A pending task with the robot the current algorithm would pick for it.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QueueEntry {
    pub task:           Task,
    pub proposed_robot: Option<RobotId>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseReason {
    /// No progress within the blocked timeout.
    Blocked,
    /// The robot stopped sending heartbeats.
    HeartbeatLost,
    /// The robot reported a fault on the task.
    RobotFault,
}

impl ReleaseReason {
    fn alert_category(self) -> AlertCategory {
        match self {
            ReleaseReason::Blocked => AlertCategory::NavigationBlocked,
            ReleaseReason::HeartbeatLost | ReleaseReason::RobotFault => AlertCategory::RobotError,
        }
    }
}

/// A task taken away from its robot by failover.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Release {
    pub task:        TaskId,
    pub robot:       RobotId,
    pub reason:      ReleaseReason,
    pub retry_count: u32,
    /// `Some` when the retry limit was reached and the task failed.
    pub alert:       Option<AlertId>,
}

impl Release {
    #[inline]
    pub fn failed(&self) -> bool {
        self.alert.is_some()
    }
}

/// Robots whose status changed during a heartbeat check, and the tasks
/// released from them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct HeartbeatReport {
    pub errored:  Vec<RobotId>,
    pub offline:  Vec<RobotId>,
    pub released: Vec<Release>,
}

/// Everything one [`DispatchEngine::run_cycle`] call did.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CycleReport {
    pub now:        Timestamp,
    pub escalated:  Vec<(TaskId, TaskPriority)>,
    pub blocked:    Vec<Release>,
    pub heartbeats: HeartbeatReport,
    /// `None` when auto-assignment is disabled.
    pub assignment: Option<AssignmentSummary>,
}

impl CycleReport {
    /// Every release in this cycle, blocked detection first.
    pub fn releases(&self) -> impl Iterator<Item = &Release> {
        self.blocked.iter().chain(self.heartbeats.released.iter())
    }
}

// ── DispatchEngine ────────────────────────────────────────────────────────────

pub struct DispatchEngine {
    pub(crate) config:        DispatchConfig,
    pub(crate) failover:      FailoverConfig,
    pub(crate) queue:         TaskQueue,
    pub(crate) robots:        RobotRegistry,
    pub(crate) alerts:        Box<dyn AlertSink>,
    pub(crate) broadcaster:   Box<dyn StatusBroadcaster>,
    pub(crate) config_store:  Box<dyn ConfigStore>,
    /// Robot → sequence number of its latest assignment (for RoundRobin).
    pub(crate) last_assigned: FxHashMap<RobotId, u64>,
    pub(crate) assign_seq:    u64,
    pub(crate) next_task:     TaskId,
    pub(crate) next_alert:    AlertId,
    pub(crate) alerts_raised: u64,
}

impl DispatchEngine {
    // ── Configuration ─────────────────────────────────────────────────────

    pub fn get_config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Validate, persist, then apply.  A rejected config changes nothing.
    pub fn update_config(&mut self, config: DispatchConfig) -> DispatchResult<()> {
        config.validate()?;
        self.config_store.save(&config.to_pairs())?;
        info!(
            algorithm = %config.algorithm,
            max_tasks = config.max_tasks_per_robot,
            min_battery = config.min_battery_for_assignment,
            auto_assign = config.auto_assign_enabled,
            "dispatch config updated"
        );
        self.config = config;
        Ok(())
    }

    pub fn failover_config(&self) -> &FailoverConfig {
        &self.failover
    }

    pub fn update_failover_config(&mut self, failover: FailoverConfig) -> DispatchResult<()> {
        failover.validate()?;
        self.failover = failover;
        Ok(())
    }

    // ── Tasks ─────────────────────────────────────────────────────────────

    pub fn create_task(&mut self, request: TaskRequest, now: Timestamp) -> TaskId {
        let id = self.next_task;
        self.next_task = id.next();
        let task = Task::new(id, request, now);
        debug!(task = %id, kind = ?task.task_type, priority = ?task.priority, "task created");
        self.queue.enqueue(task);
        self.broadcast_task(id);
        id
    }

    /// Cancel a `Pending` or `InProgress` task.  An in-progress task frees
    /// its robot.
    pub fn cancel_task(&mut self, id: TaskId, now: Timestamp) -> DispatchResult<()> {
        let task = self.queue.transition(id, TaskStatus::Cancelled)?;
        task.completed_at = Some(now);
        let robot = task.robot_id.take();
        if let Some(robot) = robot {
            self.free_robot(robot, id, RobotStatus::Idle);
        }
        debug!(task = %id, "task cancelled");
        self.broadcast_task(id);
        Ok(())
    }

    pub fn get_task(&self, id: TaskId) -> Option<&Task> {
        self.queue.get(id)
    }

    pub fn list_tasks(&self, status: Option<TaskStatus>) -> Vec<&Task> {
        self.queue.list(status)
    }

    /// Pending tasks in dispatch order.
    pub fn pending_tasks(&self) -> Vec<&Task> {
        self.queue.pending_sorted()
    }

    pub fn queue(&self) -> &TaskQueue {
        &self.queue
    }

    /// Forget terminal tasks finished before `cutoff`.
    pub fn prune_finished(&mut self, cutoff: Timestamp) -> usize {
        self.queue.remove_finished(cutoff)
    }

    // ── Selection ─────────────────────────────────────────────────────────

    fn select_for(&self, task: &Task, now: Timestamp, claimed: &BTreeSet<RobotId>) -> Option<RobotId> {
        let candidates: Vec<Candidate<'_>> = self
            .robots
            .eligible(&self.config, |r| self.queue.active_count_for(r))
            .into_iter()
            .filter(|(r, _)| !claimed.contains(&r.id) && !task.excludes(r.id, now))
            .map(|(robot, active_tasks)| Candidate {
                robot,
                active_tasks,
                last_assigned: self.last_assigned.get(&robot.id).copied(),
            })
            .collect();
        self.config.algorithm.selector().select(&candidates, task)
    }

    /// The robot the configured algorithm would pick for `task` right now.
    /// Does not mutate anything.
    pub fn find_best_robot_for_task(&self, task: &Task, now: Timestamp) -> Option<RobotId> {
        self.select_for(task, now, &BTreeSet::new())
    }

    /// Pending tasks in dispatch order, each with the robot the next
    /// assignment pass would give it.  A robot is proposed at most once.
    pub fn dispatch_queue(&self, now: Timestamp) -> Vec<QueueEntry> {
        let mut claimed = BTreeSet::new();
        self.queue
            .pending_sorted()
            .into_iter()
            .map(|task| {
                let proposed_robot = self.select_for(task, now, &claimed);
                if let Some(r) = proposed_robot {
                    claimed.insert(r);
                }
                QueueEntry { task: task.clone(), proposed_robot }
            })
            .collect()
    }

    // ── Assignment ────────────────────────────────────────────────────────

    /// Escalate, then walk the pending list in dispatch order and assign
    /// each task to the selected robot.  Tasks with no eligible robot stay
    /// `Pending` and are counted as skipped.
    pub fn auto_assign_pending_tasks(&mut self, now: Timestamp) -> AssignmentSummary {
        self.escalate(now);

        let order: Vec<TaskId> = self.queue.pending_sorted().iter().map(|t| t.id).collect();
        let mut summary = AssignmentSummary::default();
        for id in order {
            let Some(task) = self.queue.get(id) else { continue };
            if task.status != TaskStatus::Pending {
                continue;
            }
            let Some(robot) = self.select_for(task, now, &BTreeSet::new()) else {
                summary.skipped += 1;
                continue;
            };
            match self.try_assign(id, robot, now) {
                Ok(assignment) => {
                    summary.assigned += 1;
                    summary.assignments.push(assignment);
                }
                Err(e) => {
                    debug!(task = %id, robot = %robot, error = %e, "assignment lost, task stays pending");
                    summary.skipped += 1;
                }
            }
        }

        if summary.assigned > 0 {
            info!(assigned = summary.assigned, skipped = summary.skipped, "auto-assignment pass");
        }
        summary
    }

    /// Assign `task` to `robot` by hand.  The robot must be eligible; the
    /// failover cooldown does not apply.
    pub fn assign_task(&mut self, task: TaskId, robot: RobotId, now: Timestamp) -> DispatchResult<Assignment> {
        self.try_assign(task, robot, now)
    }

    /// The compound assignment transition.  Re-checks both sides and applies
    /// nothing unless the task is still `Pending` and the robot still
    /// eligible.
    fn try_assign(&mut self, id: TaskId, robot_id: RobotId, now: Timestamp) -> DispatchResult<Assignment> {
        let task = self.queue.get(id).ok_or(DispatchError::TaskNotFound(id))?;
        if task.status != TaskStatus::Pending {
            return Err(DispatchError::InvalidTaskTransition {
                task: id,
                from: task.status,
                to:   TaskStatus::Assigned,
            });
        }
        let robot_status = task.task_type.robot_status();
        let robot = self.robots.get(robot_id).ok_or(DispatchError::RobotNotFound(robot_id))?;
        let active = self.queue.active_count_for(robot_id);
        if !RobotRegistry::is_eligible(robot, &self.config, active) {
            return Err(DispatchError::RobotUnavailable(robot_id));
        }

        let task = self.queue.transition(id, TaskStatus::Assigned)?;
        task.robot_id = Some(robot_id);
        task.assigned_at = Some(now);
        let priority = task.priority;

        let robot = self.robots.get_mut(robot_id)?;
        robot.status = robot_status;
        robot.current_task_id = Some(id);

        self.assign_seq += 1;
        self.last_assigned.insert(robot_id, self.assign_seq);

        debug!(task = %id, robot = %robot_id, ?priority, "task assigned");
        self.broadcast_task(id);
        self.broadcast_robot(robot_id);
        Ok(Assignment { task: id, robot: robot_id, priority })
    }

    // ── Task lifecycle ────────────────────────────────────────────────────

    /// `Assigned → InProgress`.  Starts the blocked timer.
    pub fn start_task(&mut self, id: TaskId, now: Timestamp) -> DispatchResult<()> {
        let task = self.queue.transition(id, TaskStatus::InProgress)?;
        task.started_at = Some(now);
        task.last_progress_at = Some(now);
        self.broadcast_task(id);
        Ok(())
    }

    /// Record forward progress on an in-progress task.
    pub fn report_progress(&mut self, id: TaskId, now: Timestamp) -> DispatchResult<()> {
        let task = self.queue.get_mut(id).ok_or(DispatchError::TaskNotFound(id))?;
        if task.status != TaskStatus::InProgress {
            return Err(DispatchError::InvalidTaskTransition {
                task: id,
                from: task.status,
                to:   TaskStatus::InProgress,
            });
        }
        task.last_progress_at = Some(now);
        Ok(())
    }

    /// `InProgress → Completed`; the robot goes back to `Idle`.
    pub fn complete_task(&mut self, id: TaskId, now: Timestamp) -> DispatchResult<&Task> {
        let task = self.queue.transition(id, TaskStatus::Completed)?;
        task.completed_at = Some(now);
        task.last_progress_at = Some(now);
        let robot = task.robot_id.take();
        if let Some(robot) = robot {
            self.free_robot(robot, id, RobotStatus::Idle);
        }
        debug!(task = %id, "task completed");
        self.broadcast_task(id);
        self.queue.get(id).ok_or(DispatchError::TaskNotFound(id))
    }

    /// The robot reported a fault on an active task.  The robot goes to
    /// `Error` and the task is requeued or failed.
    pub fn fail_task(&mut self, id: TaskId, message: &str, now: Timestamp) -> DispatchResult<Release> {
        let task = self.queue.get_mut(id).ok_or(DispatchError::TaskNotFound(id))?;
        if !task.status.is_active() {
            return Err(DispatchError::InvalidTaskTransition {
                task: id,
                from: task.status,
                to:   TaskStatus::Failed,
            });
        }
        task.error_message = Some(message.to_owned());
        self.release(id, ReleaseReason::RobotFault, RobotStatus::Error, now)
    }

    // ── Failover ──────────────────────────────────────────────────────────

    /// Raise every pending task that has waited at least a full escalation
    /// window since its last escalation by one tier.  A task reaching the
    /// window exactly escalates.
    pub fn escalate(&mut self, now: Timestamp) -> Vec<(TaskId, TaskPriority)> {
        let raised = self.queue.escalate(now, self.failover.escalation_window());
        for (id, priority) in &raised {
            debug!(task = %id, ?priority, "task priority escalated");
        }
        raised
    }

    /// Release every in-progress task with no progress for longer than the
    /// blocked timeout.  Robots go back to `Idle`.
    pub fn check_blocked_tasks(&mut self, now: Timestamp) -> Vec<Release> {
        let timeout = self.failover.blocked_timeout();
        let blocked: Vec<TaskId> = self
            .queue
            .active_ids()
            .into_iter()
            .filter(|id| {
                self.queue.get(*id).is_some_and(|t| {
                    t.status == TaskStatus::InProgress
                        && t.last_progress_at.or(t.started_at).is_some_and(|at| now - at > timeout)
                })
            })
            .collect();

        let mut released = Vec::with_capacity(blocked.len());
        for id in blocked {
            match self.release(id, ReleaseReason::Blocked, RobotStatus::Idle, now) {
                Ok(r) => released.push(r),
                Err(e) => warn!(task = %id, error = %e, "could not release blocked task"),
            }
        }
        released
    }

    /// Move silent robots to `Error` (past the heartbeat timeout) or
    /// `Offline` (past the offline grace), releasing their active tasks.
    pub fn check_heartbeats(&mut self, now: Timestamp) -> HeartbeatReport {
        let timeout = self.failover.heartbeat_timeout();
        let grace = self.failover.offline_grace();

        let mut changes = Vec::new();
        for robot in self.robots.iter() {
            let silence = now - robot.last_heartbeat;
            let to = if silence > grace && robot.status != RobotStatus::Offline {
                RobotStatus::Offline
            } else if silence > timeout
                && !matches!(robot.status, RobotStatus::Error | RobotStatus::Offline)
            {
                RobotStatus::Error
            } else {
                continue;
            };
            changes.push((robot.id, to));
        }

        let mut report = HeartbeatReport::default();
        for (robot_id, to) in changes {
            warn!(robot = %robot_id, status = %to, "robot heartbeat lost");
            for task in self.queue.active_for(robot_id) {
                match self.release(task, ReleaseReason::HeartbeatLost, to, now) {
                    Ok(r) => report.released.push(r),
                    Err(e) => warn!(task = %task, error = %e, "could not release task"),
                }
            }
            if let Ok(robot) = self.robots.get_mut(robot_id) {
                robot.status = to;
            }
            self.broadcast_robot(robot_id);
            match to {
                RobotStatus::Offline => report.offline.push(robot_id),
                _ => report.errored.push(robot_id),
            }
        }
        report
    }

    /// Take an active task away from its robot: requeue it, or fail it once
    /// the retry limit is reached.  The robot is put into `robot_status`.
    fn release(
        &mut self,
        id:           TaskId,
        reason:       ReleaseReason,
        robot_status: RobotStatus,
        now:          Timestamp,
    ) -> DispatchResult<Release> {
        let max_retry = self.failover.max_retry_count;
        let cooldown = self.failover.reassign_cooldown();

        let task = self.queue.get(id).ok_or(DispatchError::TaskNotFound(id))?;
        let robot_id = task.robot_id.ok_or(DispatchError::InvalidTaskTransition {
            task: id,
            from: task.status,
            to:   TaskStatus::Pending,
        })?;
        let retry_count = task.retry_count + 1;

        let alert = if retry_count >= max_retry {
            let task = self.queue.transition(id, TaskStatus::Failed)?;
            task.retry_count = retry_count;
            task.robot_id = None;
            task.completed_at = Some(now);
            let message = format!(
                "task {id} failed after {retry_count} attempts ({reason:?}) on robot {robot_id}"
            );
            task.error_message.get_or_insert_with(|| message.clone());
            warn!(task = %id, robot = %robot_id, ?reason, retry_count, "task failed, retries exhausted");
            Some(self.raise_alert(reason, id, robot_id, message, now))
        } else {
            let task = self.queue.transition(id, TaskStatus::Pending)?;
            task.retry_count = retry_count;
            task.robot_id = None;
            task.assigned_at = None;
            task.started_at = None;
            task.last_progress_at = None;
            task.last_escalated_at = now;
            task.cooldown = (cooldown > chrono::Duration::zero()).then(|| (robot_id, now + cooldown));
            warn!(task = %id, robot = %robot_id, ?reason, retry_count, "task requeued");
            None
        };

        self.free_robot(robot_id, id, robot_status);
        self.broadcast_task(id);
        Ok(Release { task: id, robot: robot_id, reason, retry_count, alert })
    }

    fn raise_alert(
        &mut self,
        reason:  ReleaseReason,
        task:    TaskId,
        robot:   RobotId,
        message: String,
        now:     Timestamp,
    ) -> AlertId {
        let id = self.next_alert;
        self.next_alert = id.next();
        self.alerts_raised += 1;
        let category = reason.alert_category();
        let severity = match category {
            AlertCategory::NavigationBlocked => AlertSeverity::Warning,
            AlertCategory::RobotError => AlertSeverity::Critical,
        };
        self.alerts.record(Alert {
            id,
            category,
            severity,
            task_id: Some(task),
            robot_id: Some(robot),
            message,
            created_at: now,
        });
        id
    }

    /// Total alerts recorded since the engine was built.
    pub fn alerts_raised(&self) -> u64 {
        self.alerts_raised
    }

    /// Clear the robot's back-reference to `task` and set its status.
    fn free_robot(&mut self, robot_id: RobotId, task: TaskId, status: RobotStatus) {
        let Ok(robot) = self.robots.get_mut(robot_id) else { return };
        if robot.current_task_id == Some(task) {
            robot.current_task_id = None;
        }
        // A robot already marked offline stays offline until it reconnects.
        if robot.status != RobotStatus::Offline {
            robot.status = status;
        }
        self.broadcast_robot(robot_id);
    }

    // ── Robots ────────────────────────────────────────────────────────────

    pub fn register_robot(&mut self, robot: Robot) -> DispatchResult<()> {
        let id = robot.id;
        self.robots.register(robot)?;
        debug!(robot = %id, "robot registered");
        Ok(())
    }

    pub fn get_robot(&self, id: RobotId) -> Option<&Robot> {
        self.robots.get(id)
    }

    pub fn list_robots(&self) -> Vec<&Robot> {
        self.robots.iter().collect()
    }

    pub fn robots(&self) -> &RobotRegistry {
        &self.robots
    }

    /// Record a heartbeat.  An `Offline` robot reconnects as `Idle`; an
    /// `Error` robot stays in `Error` until [`recover_robot`](Self::recover_robot).
    pub fn record_heartbeat(&mut self, id: RobotId, now: Timestamp) -> DispatchResult<()> {
        let robot = self.robots.get_mut(id)?;
        robot.last_heartbeat = now;
        if robot.status == RobotStatus::Offline {
            robot.status = RobotStatus::Idle;
            info!(robot = %id, "robot reconnected");
            self.broadcast_robot(id);
        }
        Ok(())
    }

    pub fn update_battery(&mut self, id: RobotId, level: f32) -> DispatchResult<()> {
        let robot = self.robots.get_mut(id)?;
        robot.battery_level = level.clamp(0.0, 100.0);
        Ok(())
    }

    /// Move the robot.  A position update on an in-progress task counts as
    /// progress for blocked detection.
    pub fn update_position(&mut self, id: RobotId, position: Position, now: Timestamp) -> DispatchResult<()> {
        let robot = self.robots.get_mut(id)?;
        robot.position = position;
        let current = robot.current_task_id;
        if let Some(task) = current.and_then(|t| self.queue.get_mut(t)) {
            if task.status == TaskStatus::InProgress {
                task.last_progress_at = Some(now);
            }
        }
        Ok(())
    }

    pub fn set_robot_enabled(&mut self, id: RobotId, enabled: bool) -> DispatchResult<()> {
        self.robots.get_mut(id)?.enabled = enabled;
        Ok(())
    }

    /// Explicit recovery: `Error → Idle`.  Also counts as a heartbeat.
    pub fn recover_robot(&mut self, id: RobotId, now: Timestamp) -> DispatchResult<()> {
        let robot = self.robots.get_mut(id)?;
        if robot.status != RobotStatus::Error {
            return Err(DispatchError::InvalidRobotTransition {
                robot: id,
                from:  robot.status,
                to:    RobotStatus::Idle,
            });
        }
        robot.status = RobotStatus::Idle;
        robot.last_heartbeat = now;
        info!(robot = %id, "robot recovered");
        self.broadcast_robot(id);
        Ok(())
    }

    /// Send an idle robot to its charger (`Idle → Charging`).
    pub fn begin_charging(&mut self, id: RobotId) -> DispatchResult<()> {
        let robot = self.robots.get_mut(id)?;
        if robot.status != RobotStatus::Idle || robot.current_task_id.is_some() {
            return Err(DispatchError::InvalidRobotTransition {
                robot: id,
                from:  robot.status,
                to:    RobotStatus::Charging,
            });
        }
        robot.status = RobotStatus::Charging;
        self.broadcast_robot(id);
        Ok(())
    }

    /// `Charging → Idle` with the battery set to `level`.
    pub fn finish_charging(&mut self, id: RobotId, level: f32) -> DispatchResult<()> {
        let robot = self.robots.get_mut(id)?;
        if robot.status != RobotStatus::Charging || robot.current_task_id.is_some() {
            return Err(DispatchError::InvalidRobotTransition {
                robot: id,
                from:  robot.status,
                to:    RobotStatus::Idle,
            });
        }
        robot.status = RobotStatus::Idle;
        robot.battery_level = level.clamp(0.0, 100.0);
        self.broadcast_robot(id);
        Ok(())
    }

    // ── Cycle ─────────────────────────────────────────────────────────────

    /// One full dispatch cycle against a single `now`.
    pub fn run_cycle(&mut self, now: Timestamp) -> CycleReport {
        let escalated = self.escalate(now);
        let blocked = self.check_blocked_tasks(now);
        let heartbeats = self.check_heartbeats(now);
        let assignment = self
            .config
            .auto_assign_enabled
            .then(|| self.auto_assign_pending_tasks(now));
        CycleReport { now, escalated, blocked, heartbeats, assignment }
    }

    // ── Broadcasting ──────────────────────────────────────────────────────

    fn broadcast_task(&self, id: TaskId) {
        if let Some(t) = self.queue.get(id) {
            self.broadcaster.broadcast(StatusChange::Task {
                task:   id,
                status: t.status,
                robot:  t.robot_id,
            });
        }
    }

    fn broadcast_robot(&self, id: RobotId) {
        if let Some(r) = self.robots.get(id) {
            self.broadcaster.broadcast(StatusChange::Robot { robot: id, status: r.status });
        }
    }
}
