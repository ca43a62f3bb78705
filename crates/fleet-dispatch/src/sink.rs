//! External collaborators of the dispatch engine.
//!
//! The engine owns task and robot state but hands three concerns to
//! pluggable traits:
//!
//! | Trait               | Purpose                                             | Shipped impls                              |
//! |---------------------|-----------------------------------------------------|--------------------------------------------|
//! | [`AlertSink`]       | record alerts for terminal task failures           | `MemoryAlertSink`, `TracingAlertSink`      |
//! | [`StatusBroadcaster`] | fire-and-forget task/robot status notifications  | `NoopBroadcaster`, `ChannelBroadcaster`    |
//! | [`ConfigStore`]     | persist `DispatchConfig` as key/value pairs         | `MemoryConfigStore`                        |
//!
//! Broadcast failures are never surfaced to the engine.

use std::collections::BTreeMap;
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, TrySendError};
use fleet_core::{RobotId, TaskId};
use parking_lot::Mutex;
use serde::Serialize;

use crate::{Alert, AlertSeverity, DispatchResult, RobotStatus, TaskStatus};

// ── Alerts ────────────────────────────────────────────────────────────────────

pub trait AlertSink: Send {
    fn record(&mut self, alert: Alert);
}

/// Keeps alerts in memory.  Clones share the same list, so a caller can keep
/// one handle and give the other to the engine.
#[derive(Clone, Default)]
pub struct MemoryAlertSink {
    alerts: Arc<Mutex<Vec<Alert>>>,
}

impl MemoryAlertSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.alerts.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.lock().is_empty()
    }
}

impl AlertSink for MemoryAlertSink {
    fn record(&mut self, alert: Alert) {
        self.alerts.lock().push(alert);
    }
}

/// Writes each alert as a `tracing` event.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingAlertSink;

impl AlertSink for TracingAlertSink {
    fn record(&mut self, alert: Alert) {
        let task = alert.task_id.map(|t| t.to_string()).unwrap_or_default();
        let robot = alert.robot_id.map(|r| r.to_string()).unwrap_or_default();
        match alert.severity {
            AlertSeverity::Critical => tracing::error!(
                alert = %alert.id, category = ?alert.category, %task, %robot,
                "{}", alert.message
            ),
            AlertSeverity::Warning => tracing::warn!(
                alert = %alert.id, category = ?alert.category, %task, %robot,
                "{}", alert.message
            ),
        }
    }
}

// ── Status broadcasting ───────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StatusChange {
    Task {
        task:   TaskId,
        status: TaskStatus,
        robot:  Option<RobotId>,
    },
    Robot {
        robot:  RobotId,
        status: RobotStatus,
    },
}

pub trait StatusBroadcaster: Send {
    fn broadcast(&self, change: StatusChange);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopBroadcaster;

impl StatusBroadcaster for NoopBroadcaster {
    fn broadcast(&self, _change: StatusChange) {}
}

/// Pushes changes into a bounded channel.  A full or disconnected channel
/// drops the change.
pub struct ChannelBroadcaster {
    tx: Sender<StatusChange>,
}

impl ChannelBroadcaster {
    /// A broadcaster and the receiving end, with room for `capacity` changes.
    pub fn bounded(capacity: usize) -> (Self, Receiver<StatusChange>) {
        let (tx, rx) = crossbeam_channel::bounded(capacity);
        (Self { tx }, rx)
    }
}

impl StatusBroadcaster for ChannelBroadcaster {
    fn broadcast(&self, change: StatusChange) {
        if let Err(TrySendError::Full(change)) = self.tx.try_send(change) {
            tracing::trace!(?change, "status channel full, dropping change");
        }
    }
}

// ── Config persistence ────────────────────────────────────────────────────────

pub trait ConfigStore: Send {
    fn load(&self) -> DispatchResult<BTreeMap<String, String>>;
    fn save(&mut self, pairs: &[(String, String)]) -> DispatchResult<()>;
}

/// In-memory key/value store.  Clones share the same map.
#[derive(Clone, Default)]
pub struct MemoryConfigStore {
    pairs: Arc<Mutex<BTreeMap<String, String>>>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.pairs.lock().get(key).cloned()
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.lock().insert(key.into(), value.into());
    }
}

impl ConfigStore for MemoryConfigStore {
    fn load(&self) -> DispatchResult<BTreeMap<String, String>> {
        Ok(self.pairs.lock().clone())
    }

    fn save(&mut self, pairs: &[(String, String)]) -> DispatchResult<()> {
        let mut map = self.pairs.lock();
        for (k, v) in pairs {
            map.insert(k.clone(), v.clone());
        }
        Ok(())
    }
}
