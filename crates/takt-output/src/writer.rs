//! The `OutputWriter` trait implemented by all backend writers.

use crate::{OccupancyRow, OutputResult, TaskRunRow};

/// Trait implemented by export backends.
pub trait OutputWriter {
    /// Write a batch of task-run rows.
    fn write_runs(&mut self, rows: &[TaskRunRow]) -> OutputResult<()>;

    /// Write a batch of occupancy rows.
    fn write_occupancy(&mut self, rows: &[OccupancyRow]) -> OutputResult<()>;

    /// Flush and close all underlying file handles.
    ///
    /// Idempotent — safe to call more than once.
    fn finish(&mut self) -> OutputResult<()>;
}
