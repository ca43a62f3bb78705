//! `fleet-dispatch`: task queue, robot registry, and the dispatch engine.
//!
//! # Crate layout
//!
//! | Module        | Contents                                                       |
//! |---------------|----------------------------------------------------------------|
//! | [`task`]      | `Task`, `TaskType`, `TaskPriority`, `TaskStatus`, `TaskRequest` |
//! | [`robot`]     | `Robot`, `RobotStatus`                                         |
//! | [`alert`]     | `Alert`, `AlertCategory`, `AlertSeverity`                      |
//! | [`config`]    | `DispatchConfig`, `FailoverConfig`, `Algorithm`                |
//! | [`queue`]     | `TaskQueue` (ordering, escalation)                             |
//! | [`registry`]  | `RobotRegistry` (eligibility)                                  |
//! | [`strategy`]  | `RobotSelector` and the four selection algorithms              |
//! | [`sink`]      | alert sinks, status broadcasters, config stores                |
//! | [`engine`]    | `DispatchEngine`: assignment, lifecycle, failover, cycles      |
//! | [`builder`]   | `DispatchEngineBuilder`                                        |
//! | [`cycle`]     | `DispatchLoop` background thread, `SharedDispatchEngine`       |
//!
//! # Quick-start
//!
//! ```rust,ignore
//! let mut engine = DispatchEngineBuilder::new().robots(fleet).build()?;
//! let task = engine.create_task(
//!     TaskRequest::new(TaskType::Deliver).table(TableId(4), table_pos),
//!     clock.now(),
//! );
//! let report = engine.run_cycle(clock.now());
//! ```

pub mod alert;
pub mod builder;
pub mod config;
pub mod cycle;
pub mod engine;
pub mod error;
pub mod queue;
pub mod registry;
pub mod robot;
pub mod sink;
pub mod strategy;
pub mod task;

#[cfg(test)]
mod tests;

pub use alert::{Alert, AlertCategory, AlertSeverity};
pub use builder::DispatchEngineBuilder;
pub use config::{Algorithm, DispatchConfig, FailoverConfig, MAX_DURATION_SECS};
pub use cycle::{DispatchLoop, SharedDispatchEngine};
pub use engine::{
    Assignment, AssignmentSummary, CycleReport, DispatchEngine, HeartbeatReport, QueueEntry,
    Release, ReleaseReason,
};
pub use error::{DispatchError, DispatchResult, ErrorBody};
pub use queue::TaskQueue;
pub use registry::RobotRegistry;
pub use robot::{Robot, RobotStatus};
pub use sink::{
    AlertSink, ChannelBroadcaster, ConfigStore, MemoryAlertSink, MemoryConfigStore,
    NoopBroadcaster, StatusBroadcaster, StatusChange, TracingAlertSink,
};
pub use strategy::{Candidate, RobotSelector};
pub use task::{Task, TaskPriority, TaskRequest, TaskStatus, TaskType};
