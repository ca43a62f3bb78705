//! `fleet-report`: simulation statistics and report output.
//!
//! [`ReportBuilder`] is fed outcomes while a simulation runs and freezes
//! them into a [`SimulationReport`].  Reports are written through the
//! [`ReportWriter`] trait:
//!
//! | Feature   | Backend | Files created                              |
//! |-----------|---------|--------------------------------------------|
//! | *(none)*  | CSV     | `summary.csv`, `daily.csv`, `robots.csv`   |
//! | *(none)*  | JSON    | `report.json`                              |
//! | `sqlite`  | SQLite  | `report.db`                                |
//!
//! # Usage
//!
//! ```rust,ignore
//! let mut writer = CsvReportWriter::new(Path::new("./out"))?;
//! writer.write_report(&report)?;
//! writer.finish()?;
//! ```

pub mod builder;
pub mod csv;
pub mod error;
pub mod json;
pub mod row;
pub mod writer;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(test)]
mod tests;

pub use builder::ReportBuilder;
pub use csv::CsvReportWriter;
pub use error::{ReportError, ReportResult};
pub use json::JsonReportWriter;
pub use row::{DailyRow, ReportSummary, RobotRow, SimulationReport, success_rate};
pub use writer::ReportWriter;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteReportWriter;
