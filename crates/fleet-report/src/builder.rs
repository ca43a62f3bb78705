//! `ReportBuilder`: incremental aggregation of simulation outcomes.
//!
//! Every `record_*` / `task_*` call updates a running day bucket and, where
//! a robot is involved, a robot bucket.  Nothing is re-scanned at report
//! time: [`ReportBuilder::finish`] only divides sums by counts and fills in
//! days that saw no activity.

use std::collections::BTreeMap;

use chrono::Duration;
use fleet_core::time::{day_index, hour_of_day};
use fleet_core::{RobotId, Timestamp};
use fleet_dispatch::{Robot, TaskType};

use crate::row::success_rate;
use crate::{DailyRow, ReportSummary, RobotRow, SimulationReport};

#[derive(Clone, Default)]
struct DayBucket {
    parties:         u64,
    guests:          u64,
    hourly_guests:   [u64; 24],
    tasks_created:   u64,
    tasks_completed: u64,
    tasks_failed:    u64,
    deliveries:      u64,
    util_sum:        f64,
    util_samples:    u64,
}

#[derive(Clone, Default)]
struct RobotBucket {
    completed:    u64,
    failed:       u64,
    duration_sum: f64,
    busy_samples: u64,
    samples:      u64,
    battery_sum:  f64,
}

pub struct ReportBuilder {
    start: Timestamp,
    end:   Timestamp,

    days:   BTreeMap<u32, DayBucket>,
    robots: BTreeMap<RobotId, RobotBucket>,

    events_processed: u64,
    event_errors:     u64,
    parties:          u64,
    guests:           u64,
    tasks_created:    u64,
    tasks_completed:  u64,
    tasks_failed:     u64,
    deliveries:       u64,
    requeues:         u64,
    duration_sum:     f64,
    util_sum:         f64,
    util_samples:     u64,

    current_guests: u64,
    peak_guests:    u64,
    peak_at:        Option<Timestamp>,
}

impl ReportBuilder {
    pub fn new(start: Timestamp, end: Timestamp) -> Self {
        Self {
            start,
            end,
            days: BTreeMap::new(),
            robots: BTreeMap::new(),
            events_processed: 0,
            event_errors: 0,
            parties: 0,
            guests: 0,
            tasks_created: 0,
            tasks_completed: 0,
            tasks_failed: 0,
            deliveries: 0,
            requeues: 0,
            duration_sum: 0.0,
            util_sum: 0.0,
            util_samples: 0,
            current_guests: 0,
            peak_guests: 0,
            peak_at: None,
        }
    }

    /// Make sure `robot` gets a row even if it never receives a task.
    pub fn register_robot(&mut self, robot: RobotId) {
        self.robots.entry(robot).or_default();
    }

    fn day(&mut self, at: Timestamp) -> &mut DayBucket {
        self.days.entry(day_index(self.start, at)).or_default()
    }

    // ── Events and guests ─────────────────────────────────────────────────

    pub fn record_event(&mut self) {
        self.events_processed += 1;
    }

    pub fn record_event_error(&mut self) {
        self.events_processed += 1;
        self.event_errors += 1;
    }

    pub fn guest_arrived(&mut self, at: Timestamp, party_size: u32) {
        let size = party_size as u64;
        let hour = hour_of_day(at);
        let day = self.day(at);
        day.parties += 1;
        day.guests += size;
        day.hourly_guests[hour] += size;

        self.parties += 1;
        self.guests += size;
        self.current_guests += size;
        if self.current_guests > self.peak_guests {
            self.peak_guests = self.current_guests;
            self.peak_at = Some(at);
        }
    }

    pub fn guest_left(&mut self, party_size: u32) {
        self.current_guests = self.current_guests.saturating_sub(party_size as u64);
    }

    // ── Tasks ─────────────────────────────────────────────────────────────

    pub fn task_created(&mut self, at: Timestamp) {
        self.day(at).tasks_created += 1;
        self.tasks_created += 1;
    }

    /// A task finished on `robot`, `duration` after it was assigned.
    pub fn task_completed(&mut self, at: Timestamp, robot: RobotId, kind: TaskType, duration: Duration) {
        let delivery = kind == TaskType::Deliver;
        let secs = duration.num_milliseconds().max(0) as f64 / 1_000.0;

        let day = self.day(at);
        day.tasks_completed += 1;
        day.deliveries += delivery as u64;

        let bucket = self.robots.entry(robot).or_default();
        bucket.completed += 1;
        bucket.duration_sum += secs;

        self.tasks_completed += 1;
        self.deliveries += delivery as u64;
        self.duration_sum += secs;
    }

    /// A task failed terminally; `robot` is the last robot that held it.
    pub fn task_failed(&mut self, at: Timestamp, robot: Option<RobotId>) {
        self.day(at).tasks_failed += 1;
        if let Some(r) = robot {
            self.robots.entry(r).or_default().failed += 1;
        }
        self.tasks_failed += 1;
    }

    pub fn task_requeued(&mut self) {
        self.requeues += 1;
    }

    // ── Robot sampling ────────────────────────────────────────────────────

    /// Take one utilization and battery sample of the fleet.  A robot is
    /// busy while it holds a task.
    pub fn sample_robots<'a>(&mut self, at: Timestamp, robots: impl IntoIterator<Item = &'a Robot>) {
        let mut total = 0u32;
        let mut busy = 0u32;
        for robot in robots {
            let is_busy = robot.current_task_id.is_some();
            let bucket = self.robots.entry(robot.id).or_default();
            bucket.samples += 1;
            bucket.busy_samples += is_busy as u64;
            bucket.battery_sum += robot.battery_level as f64;
            total += 1;
            busy += is_busy as u32;
        }
        if total == 0 {
            return;
        }
        let share = busy as f64 * 100.0 / total as f64;
        let day = self.day(at);
        day.util_sum += share;
        day.util_samples += 1;
        self.util_sum += share;
        self.util_samples += 1;
    }

    // ── Running figures ───────────────────────────────────────────────────

    pub fn events_processed(&self) -> u64 {
        self.events_processed
    }

    pub fn guests(&self) -> u64 {
        self.guests
    }

    pub fn tasks_created(&self) -> u64 {
        self.tasks_created
    }

    pub fn tasks_completed(&self) -> u64 {
        self.tasks_completed
    }

    pub fn tasks_failed(&self) -> u64 {
        self.tasks_failed
    }

    pub fn success_rate(&self) -> f64 {
        success_rate(self.tasks_completed, self.tasks_failed)
    }

    // ── Finalization ──────────────────────────────────────────────────────

    /// Number of calendar days covered by the run, at least 1.
    pub fn simulated_days(&self) -> u32 {
        let secs = (self.end - self.start).num_seconds().max(0);
        (secs.div_euclid(86_400) + (secs % 86_400 != 0) as i64).max(1) as u32
    }

    /// Freeze the running aggregates into a report.
    pub fn finish(&self) -> SimulationReport {
        let days = self.simulated_days();
        let empty = DayBucket::default();

        let daily_breakdown = (0..days)
            .map(|d| {
                let b = self.days.get(&d).unwrap_or(&empty);
                let (peak_hour, peak_hour_guests) = b
                    .hourly_guests
                    .iter()
                    .enumerate()
                    .fold((0usize, 0u64), |best, (h, &g)| if g > best.1 { (h, g) } else { best });
                DailyRow {
                    day: d,
                    date: (self.start + Duration::days(d as i64)).date_naive(),
                    parties: b.parties,
                    guests: b.guests,
                    tasks_created: b.tasks_created,
                    tasks_completed: b.tasks_completed,
                    tasks_failed: b.tasks_failed,
                    deliveries: b.deliveries,
                    success_rate: success_rate(b.tasks_completed, b.tasks_failed),
                    peak_hour: peak_hour as u32,
                    peak_hour_guests,
                    average_robot_utilization: mean(b.util_sum, b.util_samples),
                }
            })
            .collect();

        let robot_metrics = self
            .robots
            .iter()
            .map(|(&id, b)| RobotRow {
                robot_id: id,
                tasks_completed: b.completed,
                tasks_failed: b.failed,
                success_rate: success_rate(b.completed, b.failed),
                average_task_duration_secs: mean(b.duration_sum, b.completed),
                utilization: mean(b.busy_samples as f64 * 100.0, b.samples),
                average_battery: mean(b.battery_sum, b.samples),
            })
            .collect();

        let summary = ReportSummary {
            simulated_start: self.start,
            simulated_end: self.end,
            simulated_days: days,
            events_processed: self.events_processed,
            event_errors: self.event_errors,
            total_parties: self.parties,
            total_guests: self.guests,
            tasks_created: self.tasks_created,
            tasks_completed: self.tasks_completed,
            tasks_failed: self.tasks_failed,
            deliveries: self.deliveries,
            requeues: self.requeues,
            success_rate: self.success_rate(),
            average_task_duration_secs: mean(self.duration_sum, self.tasks_completed),
            average_robot_utilization: mean(self.util_sum, self.util_samples),
            peak_concurrent_guests: self.peak_guests,
            peak_guests_at: self.peak_at,
        };

        SimulationReport { summary, daily_breakdown, robot_metrics }
    }
}

#[inline]
fn mean(sum: f64, n: u64) -> f64 {
    if n == 0 { 0.0 } else { sum / n as f64 }
}
