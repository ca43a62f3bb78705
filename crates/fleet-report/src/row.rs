//! The frozen report: one summary plus per-day and per-robot rows.

use chrono::NaiveDate;
use fleet_core::{RobotId, Timestamp};
use serde::{Deserialize, Serialize};

/// Success rate in percent.  Zero attempts count as 100 %: no failure has
/// been observed.
#[inline]
pub fn success_rate(completed: u64, failed: u64) -> f64 {
    let attempted = completed + failed;
    if attempted == 0 {
        100.0
    } else {
        completed as f64 * 100.0 / attempted as f64
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub simulated_start:            Timestamp,
    pub simulated_end:              Timestamp,
    pub simulated_days:             u32,
    pub events_processed:           u64,
    /// Events whose processing raised an error and were skipped.
    pub event_errors:               u64,
    pub total_parties:              u64,
    pub total_guests:               u64,
    pub tasks_created:              u64,
    pub tasks_completed:            u64,
    pub tasks_failed:               u64,
    pub deliveries:                 u64,
    /// Failover requeues (a task may be requeued several times).
    pub requeues:                   u64,
    pub success_rate:               f64,
    pub average_task_duration_secs: f64,
    /// Mean share of robots busy across all samples, percent.
    pub average_robot_utilization:  f64,
    pub peak_concurrent_guests:     u64,
    pub peak_guests_at:             Option<Timestamp>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DailyRow {
    /// 0-based day of the run.
    pub day:                       u32,
    pub date:                      NaiveDate,
    pub parties:                   u64,
    pub guests:                    u64,
    pub tasks_created:             u64,
    pub tasks_completed:           u64,
    pub tasks_failed:              u64,
    pub deliveries:                u64,
    pub success_rate:              f64,
    /// Hour of day (0–23) with the most arriving guests.
    pub peak_hour:                 u32,
    pub peak_hour_guests:          u64,
    pub average_robot_utilization: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RobotRow {
    pub robot_id:                   RobotId,
    pub tasks_completed:            u64,
    pub tasks_failed:               u64,
    pub success_rate:               f64,
    pub average_task_duration_secs: f64,
    /// Share of samples in which the robot was busy, percent.
    pub utilization:                f64,
    pub average_battery:            f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub summary:         ReportSummary,
    pub daily_breakdown: Vec<DailyRow>,
    pub robot_metrics:   Vec<RobotRow>,
}
