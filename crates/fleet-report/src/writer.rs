//! The `ReportWriter` trait implemented by all report backends.

use crate::{ReportResult, SimulationReport};

/// Trait implemented by the CSV, JSON, and SQLite writers.
pub trait ReportWriter {
    /// Write the whole report.  May be called once per run.
    fn write_report(&mut self, report: &SimulationReport) -> ReportResult<()>;

    /// Flush and close all underlying handles.
    ///
    /// Idempotent: safe to call more than once.
    fn finish(&mut self) -> ReportResult<()>;
}
