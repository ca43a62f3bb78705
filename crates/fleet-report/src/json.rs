//! JSON report backend: one pretty-printed `report.json`.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::debug;

use crate::writer::ReportWriter;
use crate::{ReportResult, SimulationReport};

pub struct JsonReportWriter {
    out:      BufWriter<File>,
    finished: bool,
}

impl JsonReportWriter {
    pub fn new(dir: &Path) -> ReportResult<Self> {
        let out = BufWriter::new(File::create(dir.join("report.json"))?);
        Ok(Self { out, finished: false })
    }
}

impl ReportWriter for JsonReportWriter {
    fn write_report(&mut self, report: &SimulationReport) -> ReportResult<()> {
        serde_json::to_writer_pretty(&mut self.out, report)?;
        self.out.write_all(b"\n")?;
        debug!(guests = report.summary.total_guests, "json report written");
        Ok(())
    }

    fn finish(&mut self) -> ReportResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.out.flush()?;
        Ok(())
    }
}
