//! CSV output backend.
//!
//! Creates two files in the configured output directory:
//! - `task_runs.csv`
//! - `occupancy.csv`

use std::fs::File;
use std::path::Path;

use csv::Writer;

use crate::writer::OutputWriter;
use crate::{OccupancyRow, OutputResult, TaskRunRow};

/// Writes simulation output to two CSV files.
pub struct CsvWriter {
    runs: Writer<File>,
    occupancy: Writer<File>,
    finished: bool,
}

impl CsvWriter {
    /// Open (or create) the two CSV files in `dir` and write the header rows.
    pub fn new(dir: &Path) -> OutputResult<Self> {
        let mut runs = Writer::from_path(dir.join("task_runs.csv"))?;
        runs.write_record([
            "task", "unit", "iteration", "start_min", "end_min", "workers", "machine", "reason",
        ])?;

        let mut occupancy = Writer::from_path(dir.join("occupancy.csv"))?;
        occupancy.write_record(["kind", "resource", "task", "start_min", "end_min"])?;

        Ok(Self { runs, occupancy, finished: false })
    }
}

impl OutputWriter for CsvWriter {
    fn write_runs(&mut self, rows: &[TaskRunRow]) -> OutputResult<()> {
        for row in rows {
            self.runs.write_record(&[
                row.task.clone(),
                row.unit.to_string(),
                row.iteration.to_string(),
                row.start_min.to_string(),
                row.end_min.to_string(),
                row.workers.clone(),
                row.machine.clone(),
                row.reason.clone(),
            ])?;
        }
        Ok(())
    }

    fn write_occupancy(&mut self, rows: &[OccupancyRow]) -> OutputResult<()> {
        for row in rows {
            self.occupancy.write_record(&[
                row.kind.to_string(),
                row.resource.clone(),
                row.task.clone(),
                row.start_min.to_string(),
                row.end_min.to_string(),
            ])?;
        }
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.runs.flush()?;
        self.occupancy.flush()?;
        Ok(())
    }
}
