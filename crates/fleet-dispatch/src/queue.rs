//! `TaskQueue`: owner of every task the dispatcher knows about.
//!
//! Tasks live in one `BTreeMap` keyed by id, with two secondary index sets:
//! `pending` (status `Pending`) and `active` (status `Assigned` or
//! `InProgress`).  Every status change goes through [`TaskQueue::transition`],
//! which checks the state machine edge and keeps both indices in step, so
//! "which tasks are waiting" and "what is robot R doing" never scan
//! finished history.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Duration;
use fleet_core::{RobotId, TaskId, Timestamp};

use crate::{DispatchError, DispatchResult, Task, TaskPriority, TaskStatus};

#[derive(Default)]
pub struct TaskQueue {
    tasks:   BTreeMap<TaskId, Task>,
    pending: BTreeSet<TaskId>,
    active:  BTreeSet<TaskId>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a freshly created task.  The task keeps whatever status it was
    /// created with (normally `Pending`).
    pub fn enqueue(&mut self, task: Task) {
        let id = task.id;
        match task.status {
            TaskStatus::Pending => {
                self.pending.insert(id);
            }
            s if s.is_active() => {
                self.active.insert(id);
            }
            _ => {}
        }
        self.tasks.insert(id, task);
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: TaskId) -> Option<&mut Task> {
        self.tasks.get_mut(&id)
    }

    /// Move task `id` to status `to`, enforcing the task state machine and
    /// updating the pending/active indices.  Timestamps and robot links are
    /// the caller's responsibility.
    pub(crate) fn transition(&mut self, id: TaskId, to: TaskStatus) -> DispatchResult<&mut Task> {
        let task = self.tasks.get_mut(&id).ok_or(DispatchError::TaskNotFound(id))?;
        let from = task.status;
        if !from.can_transition_to(to) {
            return Err(DispatchError::InvalidTaskTransition { task: id, from, to });
        }

        match from {
            TaskStatus::Pending => {
                self.pending.remove(&id);
            }
            s if s.is_active() => {
                self.active.remove(&id);
            }
            _ => {}
        }
        match to {
            TaskStatus::Pending => {
                self.pending.insert(id);
            }
            s if s.is_active() => {
                self.active.insert(id);
            }
            _ => {}
        }

        task.status = to;
        Ok(task)
    }

    /// Pending tasks in dispatch order: priority descending, then
    /// `created_at` ascending, then id ascending.
    pub fn pending_sorted(&self) -> Vec<&Task> {
        let mut out: Vec<&Task> = self
            .pending
            .iter()
            .filter_map(|id| self.tasks.get(id))
            .collect();
        out.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then(a.created_at.cmp(&b.created_at))
                .then(a.id.cmp(&b.id))
        });
        out
    }

    /// Raise every pending task that has waited at least a full `window`
    /// (`>=`) since its last escalation by exactly one tier.  `Urgent` tasks
    /// are left alone.
    ///
    /// Returns the ids that changed together with their new priority.
    pub fn escalate(&mut self, now: Timestamp, window: Duration) -> Vec<(TaskId, TaskPriority)> {
        let mut raised = Vec::new();
        for id in &self.pending {
            let Some(task) = self.tasks.get_mut(id) else { continue };
            if task.priority == TaskPriority::Urgent {
                continue;
            }
            if now - task.last_escalated_at >= window {
                task.priority = task.priority.escalated();
                task.last_escalated_at = now;
                raised.push((task.id, task.priority));
            }
        }
        raised
    }

    /// Ids of `Assigned` / `InProgress` tasks, ascending.
    pub fn active_ids(&self) -> Vec<TaskId> {
        self.active.iter().copied().collect()
    }

    /// Number of `Assigned` / `InProgress` tasks held by `robot`.
    pub fn active_count_for(&self, robot: RobotId) -> u32 {
        self.active
            .iter()
            .filter_map(|id| self.tasks.get(id))
            .filter(|t| t.robot_id == Some(robot))
            .count() as u32
    }

    /// Active tasks held by `robot`, ascending by id.
    pub fn active_for(&self, robot: RobotId) -> Vec<TaskId> {
        self.active
            .iter()
            .filter(|id| self.tasks.get(id).is_some_and(|t| t.robot_id == Some(robot)))
            .copied()
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    /// Tasks with the given status, or every task for `None`.
    pub fn list(&self, status: Option<TaskStatus>) -> Vec<&Task> {
        self.tasks
            .values()
            .filter(|t| status.is_none_or(|s| t.status == s))
            .collect()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Drop terminal tasks that finished before `cutoff`.  Returns how many
    /// were removed.  Long simulation runs call this to bound memory.
    pub fn remove_finished(&mut self, cutoff: Timestamp) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|_, t| {
            !(t.status.is_terminal() && t.completed_at.is_some_and(|at| at < cutoff))
        });
        before - self.tasks.len()
    }
}
