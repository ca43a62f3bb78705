//! CSV report backend.
//!
//! Creates three files in the configured output directory:
//! - `summary.csv` (header + one row)
//! - `daily.csv`
//! - `robots.csv`

use std::fs::File;
use std::path::Path;

use csv::Writer;
use fleet_core::Timestamp;
use tracing::debug;

use crate::writer::ReportWriter;
use crate::{ReportResult, SimulationReport};

/// Writes a simulation report to three CSV files.
pub struct CsvReportWriter {
    summary:  Writer<File>,
    daily:    Writer<File>,
    robots:   Writer<File>,
    finished: bool,
}

impl CsvReportWriter {
    /// Create the three CSV files in `dir` and write the header rows.
    pub fn new(dir: &Path) -> ReportResult<Self> {
        let mut summary = Writer::from_path(dir.join("summary.csv"))?;
        summary.write_record([
            "simulated_start",
            "simulated_end",
            "simulated_days",
            "events_processed",
            "event_errors",
            "total_parties",
            "total_guests",
            "tasks_created",
            "tasks_completed",
            "tasks_failed",
            "deliveries",
            "requeues",
            "success_rate",
            "average_task_duration_secs",
            "average_robot_utilization",
            "peak_concurrent_guests",
            "peak_guests_at",
        ])?;

        let mut daily = Writer::from_path(dir.join("daily.csv"))?;
        daily.write_record([
            "day",
            "date",
            "parties",
            "guests",
            "tasks_created",
            "tasks_completed",
            "tasks_failed",
            "deliveries",
            "success_rate",
            "peak_hour",
            "peak_hour_guests",
            "average_robot_utilization",
        ])?;

        let mut robots = Writer::from_path(dir.join("robots.csv"))?;
        robots.write_record([
            "robot_id",
            "tasks_completed",
            "tasks_failed",
            "success_rate",
            "average_task_duration_secs",
            "utilization",
            "average_battery",
        ])?;

        Ok(Self { summary, daily, robots, finished: false })
    }
}

fn rfc3339(t: Timestamp) -> String {
    t.to_rfc3339()
}

fn pct(v: f64) -> String {
    format!("{v:.2}")
}

impl ReportWriter for CsvReportWriter {
    fn write_report(&mut self, report: &SimulationReport) -> ReportResult<()> {
        let s = &report.summary;
        self.summary.write_record(&[
            rfc3339(s.simulated_start),
            rfc3339(s.simulated_end),
            s.simulated_days.to_string(),
            s.events_processed.to_string(),
            s.event_errors.to_string(),
            s.total_parties.to_string(),
            s.total_guests.to_string(),
            s.tasks_created.to_string(),
            s.tasks_completed.to_string(),
            s.tasks_failed.to_string(),
            s.deliveries.to_string(),
            s.requeues.to_string(),
            pct(s.success_rate),
            pct(s.average_task_duration_secs),
            pct(s.average_robot_utilization),
            s.peak_concurrent_guests.to_string(),
            s.peak_guests_at.map(rfc3339).unwrap_or_default(),
        ])?;

        for d in &report.daily_breakdown {
            self.daily.write_record(&[
                d.day.to_string(),
                d.date.to_string(),
                d.parties.to_string(),
                d.guests.to_string(),
                d.tasks_created.to_string(),
                d.tasks_completed.to_string(),
                d.tasks_failed.to_string(),
                d.deliveries.to_string(),
                pct(d.success_rate),
                d.peak_hour.to_string(),
                d.peak_hour_guests.to_string(),
                pct(d.average_robot_utilization),
            ])?;
        }

        for r in &report.robot_metrics {
            self.robots.write_record(&[
                r.robot_id.0.to_string(),
                r.tasks_completed.to_string(),
                r.tasks_failed.to_string(),
                pct(r.success_rate),
                pct(r.average_task_duration_secs),
                pct(r.utilization),
                pct(r.average_battery),
            ])?;
        }
        debug!(
            days = report.daily_breakdown.len(),
            robots = report.robot_metrics.len(),
            "csv report written"
        );
        Ok(())
    }

    fn finish(&mut self) -> ReportResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.summary.flush()?;
        self.daily.flush()?;
        self.robots.flush()?;
        Ok(())
    }
}
