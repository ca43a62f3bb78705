//! SQLite report backend (feature `sqlite`).
//!
//! Creates a single `report.db` file in the configured output directory with
//! three tables: `summary`, `daily`, and `robots`.

use std::path::Path;

use rusqlite::Connection;
use tracing::debug;

use crate::writer::ReportWriter;
use crate::{ReportResult, SimulationReport};

/// Writes a simulation report to an SQLite database.
pub struct SqliteReportWriter {
    conn:     Connection,
    finished: bool,
}

impl SqliteReportWriter {
    /// Open (or create) `report.db` in `dir` and initialise the schema.
    pub fn new(dir: &Path) -> ReportResult<Self> {
        let conn = Connection::open(dir.join("report.db"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous  = NORMAL;
             CREATE TABLE IF NOT EXISTS summary (
                 simulated_start            TEXT    NOT NULL,
                 simulated_end              TEXT    NOT NULL,
                 simulated_days             INTEGER NOT NULL,
                 events_processed           INTEGER NOT NULL,
                 event_errors               INTEGER NOT NULL,
                 total_parties              INTEGER NOT NULL,
                 total_guests               INTEGER NOT NULL,
                 tasks_created              INTEGER NOT NULL,
                 tasks_completed            INTEGER NOT NULL,
                 tasks_failed               INTEGER NOT NULL,
                 deliveries                 INTEGER NOT NULL,
                 requeues                   INTEGER NOT NULL,
                 success_rate               REAL    NOT NULL,
                 average_task_duration_secs REAL    NOT NULL,
                 average_robot_utilization  REAL    NOT NULL,
                 peak_concurrent_guests     INTEGER NOT NULL,
                 peak_guests_at             TEXT
             );
             CREATE TABLE IF NOT EXISTS daily (
                 day                       INTEGER PRIMARY KEY,
                 date                      TEXT    NOT NULL,
                 parties                   INTEGER NOT NULL,
                 guests                    INTEGER NOT NULL,
                 tasks_created             INTEGER NOT NULL,
                 tasks_completed           INTEGER NOT NULL,
                 tasks_failed              INTEGER NOT NULL,
                 deliveries                INTEGER NOT NULL,
                 success_rate              REAL    NOT NULL,
                 peak_hour                 INTEGER NOT NULL,
                 peak_hour_guests          INTEGER NOT NULL,
                 average_robot_utilization REAL    NOT NULL
             );
             CREATE TABLE IF NOT EXISTS robots (
                 robot_id                   INTEGER PRIMARY KEY,
                 tasks_completed            INTEGER NOT NULL,
                 tasks_failed               INTEGER NOT NULL,
                 success_rate               REAL    NOT NULL,
                 average_task_duration_secs REAL    NOT NULL,
                 utilization                REAL    NOT NULL,
                 average_battery            REAL    NOT NULL
             );",
        )?;

        Ok(Self { conn, finished: false })
    }
}

impl ReportWriter for SqliteReportWriter {
    fn write_report(&mut self, report: &SimulationReport) -> ReportResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        let s = &report.summary;
        tx.execute(
            "INSERT INTO summary VALUES \
             (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
            rusqlite::params![
                s.simulated_start.to_rfc3339(),
                s.simulated_end.to_rfc3339(),
                s.simulated_days,
                s.events_processed as i64,
                s.event_errors as i64,
                s.total_parties as i64,
                s.total_guests as i64,
                s.tasks_created as i64,
                s.tasks_completed as i64,
                s.tasks_failed as i64,
                s.deliveries as i64,
                s.requeues as i64,
                s.success_rate,
                s.average_task_duration_secs,
                s.average_robot_utilization,
                s.peak_concurrent_guests as i64,
                s.peak_guests_at.map(|t| t.to_rfc3339()),
            ],
        )?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO daily VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            )?;
            for d in &report.daily_breakdown {
                stmt.execute(rusqlite::params![
                    d.day,
                    d.date.to_string(),
                    d.parties as i64,
                    d.guests as i64,
                    d.tasks_created as i64,
                    d.tasks_completed as i64,
                    d.tasks_failed as i64,
                    d.deliveries as i64,
                    d.success_rate,
                    d.peak_hour,
                    d.peak_hour_guests as i64,
                    d.average_robot_utilization,
                ])?;
            }
        }
        {
            let mut stmt =
                tx.prepare_cached("INSERT INTO robots VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)")?;
            for r in &report.robot_metrics {
                stmt.execute(rusqlite::params![
                    r.robot_id.0,
                    r.tasks_completed as i64,
                    r.tasks_failed as i64,
                    r.success_rate,
                    r.average_task_duration_secs,
                    r.utilization,
                    r.average_battery,
                ])?;
            }
        }
        tx.commit()?;
        debug!(days = report.daily_breakdown.len(), "sqlite report written");
        Ok(())
    }

    fn finish(&mut self) -> ReportResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
        Ok(())
    }
}
