//! Unit tests for fleet-report.

use chrono::Duration;
use fleet_core::time::parse_timestamp;
use fleet_core::{Position, RobotId, Timestamp};
use fleet_dispatch::{Robot, TaskType};

use crate::ReportBuilder;

// ── Helpers ───────────────────────────────────────────────────────────────────

fn t0() -> Timestamp {
    parse_timestamp("2024-03-04T00:00:00Z").unwrap()
}

fn at(hours: i64, minutes: i64) -> Timestamp {
    t0() + Duration::hours(hours) + Duration::minutes(minutes)
}

fn two_day_builder() -> ReportBuilder {
    let mut b = ReportBuilder::new(t0(), t0() + Duration::days(2));
    b.register_robot(RobotId(1));
    b.register_robot(RobotId(2));
    b
}

/// A small but complete run: guests on both days, one failure.
fn sample_report() -> crate::SimulationReport {
    let mut b = two_day_builder();
    b.guest_arrived(at(12, 0), 4);
    b.guest_arrived(at(12, 30), 2);
    b.task_created(at(12, 0));
    b.task_created(at(12, 30));
    b.task_completed(at(12, 10), RobotId(1), TaskType::Deliver, Duration::seconds(120));
    b.task_failed(at(12, 40), Some(RobotId(2)));
    b.guest_left(4);
    b.guest_arrived(at(30, 0), 3);
    b.task_created(at(30, 0));
    b.task_completed(at(30, 5), RobotId(2), TaskType::Escort, Duration::seconds(60));
    b.finish()
}

// ── ReportBuilder ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod builder {
    use super::*;

    #[test]
    fn empty_run_reports_full_success_and_no_nan() {
        let b = ReportBuilder::new(t0(), t0() + Duration::days(1));
        let report = b.finish();
        let s = &report.summary;
        assert_eq!(s.total_guests, 0);
        assert_eq!(s.success_rate, 100.0);
        assert_eq!(s.average_task_duration_secs, 0.0);
        assert!(s.peak_guests_at.is_none());
        assert_eq!(report.daily_breakdown.len(), 1);
        assert_eq!(report.daily_breakdown[0].success_rate, 100.0);
    }

    #[test]
    fn totals_and_success_rate() {
        let s = sample_report().summary;
        assert_eq!(s.total_parties, 3);
        assert_eq!(s.total_guests, 9);
        assert_eq!(s.tasks_created, 3);
        assert_eq!(s.tasks_completed, 2);
        assert_eq!(s.tasks_failed, 1);
        assert_eq!(s.deliveries, 1);
        assert!((s.success_rate - 200.0 / 3.0).abs() < 1e-9);
        assert!((s.average_task_duration_secs - 90.0).abs() < 1e-9);
    }

    #[test]
    fn peak_guests_keeps_first_maximum() {
        let s = sample_report().summary;
        // 4 + 2 = 6 at 12:30; after 4 leave, 2 + 3 = 5 on day two.
        assert_eq!(s.peak_concurrent_guests, 6);
        assert_eq!(s.peak_guests_at, Some(at(12, 30)));
    }

    #[test]
    fn daily_buckets_split_by_day() {
        let report = sample_report();
        let days = &report.daily_breakdown;
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].guests, 6);
        assert_eq!(days[0].peak_hour, 12);
        assert_eq!(days[0].peak_hour_guests, 6);
        assert_eq!(days[0].tasks_failed, 1);
        assert_eq!(days[1].guests, 3);
        assert_eq!(days[1].peak_hour, 6);
        assert_eq!(days[1].success_rate, 100.0);
        assert_eq!(days[1].date.to_string(), "2024-03-05");
    }

    #[test]
    fn partial_day_counts_as_a_day() {
        let b = ReportBuilder::new(t0(), t0() + Duration::hours(30));
        assert_eq!(b.simulated_days(), 2);
        assert_eq!(b.finish().daily_breakdown.len(), 2);
    }

    #[test]
    fn robot_rows_cover_registered_robots() {
        let report = sample_report();
        let robots = &report.robot_metrics;
        assert_eq!(robots.len(), 2);
        assert_eq!(robots[0].robot_id, RobotId(1));
        assert_eq!(robots[0].tasks_completed, 1);
        assert_eq!(robots[0].success_rate, 100.0);
        assert_eq!(robots[1].tasks_failed, 1);
        assert_eq!(robots[1].success_rate, 50.0);
    }

    #[test]
    fn sampling_drives_utilization_and_battery() {
        let mut b = two_day_builder();
        let mut busy = Robot::new(RobotId(1), "a", Position::ORIGIN, t0()).with_battery(80.0);
        busy.current_task_id = Some(fleet_core::TaskId(1));
        let idle = Robot::new(RobotId(2), "b", Position::ORIGIN, t0()).with_battery(40.0);

        b.sample_robots(at(1, 0), [&busy, &idle]);
        b.sample_robots(at(2, 0), [&idle]);

        let report = b.finish();
        // Samples: 50 % then 0 %.
        assert!((report.summary.average_robot_utilization - 25.0).abs() < 1e-9);
        assert_eq!(report.robot_metrics[0].utilization, 100.0);
        assert_eq!(report.robot_metrics[0].average_battery, 80.0);
        assert_eq!(report.robot_metrics[1].utilization, 0.0);
        assert_eq!(report.robot_metrics[1].average_battery, 40.0);
    }

    #[test]
    fn event_errors_count_as_processed() {
        let mut b = two_day_builder();
        b.record_event();
        b.record_event_error();
        let s = b.finish().summary;
        assert_eq!(s.events_processed, 2);
        assert_eq!(s.event_errors, 1);
    }
}

// ── Writers ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod writers {
    use super::*;
    use crate::{CsvReportWriter, JsonReportWriter, ReportWriter, SimulationReport};

    #[test]
    fn csv_writes_three_files() {
        let dir = tempfile::tempdir().unwrap();
        let report = sample_report();
        let mut w = CsvReportWriter::new(dir.path()).unwrap();
        w.write_report(&report).unwrap();
        w.finish().unwrap();
        w.finish().unwrap();

        let summary = std::fs::read_to_string(dir.path().join("summary.csv")).unwrap();
        let mut lines = summary.lines();
        assert!(lines.next().unwrap().starts_with("simulated_start,simulated_end"));
        assert!(lines.next().unwrap().contains(",9,3,2,1,1,"));

        let daily = std::fs::read_to_string(dir.path().join("daily.csv")).unwrap();
        assert_eq!(daily.lines().count(), 3);
        assert!(daily.lines().nth(1).unwrap().starts_with("0,2024-03-04,2,6,"));

        let robots = std::fs::read_to_string(dir.path().join("robots.csv")).unwrap();
        assert_eq!(robots.lines().count(), 3);
        assert!(robots.lines().nth(2).unwrap().starts_with("2,1,1,50.00,"));
    }

    #[test]
    fn json_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let report = sample_report();
        let mut w = JsonReportWriter::new(dir.path()).unwrap();
        w.write_report(&report).unwrap();
        w.finish().unwrap();

        let text = std::fs::read_to_string(dir.path().join("report.json")).unwrap();
        let back: SimulationReport = serde_json::from_str(&text).unwrap();
        assert_eq!(back.summary.total_guests, report.summary.total_guests);
        assert_eq!(back.summary.peak_guests_at, report.summary.peak_guests_at);
        assert_eq!(back.daily_breakdown.len(), 2);
        assert_eq!(back.robot_metrics[1].robot_id, RobotId(2));
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn sqlite_writes_all_tables() {
        use crate::SqliteReportWriter;

        let dir = tempfile::tempdir().unwrap();
        let mut w = SqliteReportWriter::new(dir.path()).unwrap();
        w.write_report(&sample_report()).unwrap();
        w.finish().unwrap();

        let conn = rusqlite::Connection::open(dir.path().join("report.db")).unwrap();
        let guests: i64 = conn
            .query_row("SELECT total_guests FROM summary", [], |r| r.get(0))
            .unwrap();
        assert_eq!(guests, 9);
        let days: i64 = conn.query_row("SELECT COUNT(*) FROM daily", [], |r| r.get(0)).unwrap();
        assert_eq!(days, 2);
        let robots: i64 = conn.query_row("SELECT COUNT(*) FROM robots", [], |r| r.get(0)).unwrap();
        assert_eq!(robots, 2);
    }
}
