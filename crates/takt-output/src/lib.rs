//! `takt-output` — export of simulation traces for spreadsheets and Gantt
//! rendering.
//!
//! # Crate layout
//!
//! | Module     | Contents                                      |
//! |------------|-----------------------------------------------|
//! | [`row`]    | `TaskRunRow`, `OccupancyRow`, `rows_from_result` |
//! | [`writer`] | `OutputWriter` trait                          |
//! | [`csv`]    | `CsvWriter` (two-file CSV backend)            |
//! | [`error`]  | `OutputError`, `OutputResult<T>`              |

pub mod csv;
pub mod error;
pub mod row;
pub mod writer;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use crate::csv::CsvWriter;
pub use error::{OutputError, OutputResult};
pub use row::{rows_from_result, OccupancyRow, TaskRunRow};
pub use writer::OutputWriter;
