//! Base error type shared by the scheduling crates.
//!
//! Sub-crates define their own error enums and either convert `CoreError`
//! into them via `From` impls or wrap it as one variant.  Both patterns are
//! acceptable; prefer whichever keeps error sites clean.

use thiserror::Error;

use crate::Stamp;

/// Errors produced by the core time and calendar primitives.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Shift, break, or weekday configuration is self-contradictory.
    #[error("calendar misconfigured: {0}")]
    CalendarMisconfigured(String),

    /// No working minute exists within the configured search horizon.
    #[error("no working minute within {horizon_days} days after {from}")]
    HorizonExceeded { from: Stamp, horizon_days: i64 },

    /// A `HH:MM` string (or similar) failed to parse.
    #[error("invalid time of day '{0}'")]
    InvalidTimeOfDay(String),
}

/// Shorthand result type for `takt-core`.
pub type CoreResult<T> = Result<T, CoreError>;
