//! `takt-core` — foundational types for the `takt` production scheduler.
//!
//! This crate is a dependency of every other `takt-*` crate.  It intentionally
//! has no `takt-*` dependencies and minimal external ones (only `serde` and
//! `thiserror`).
//!
//! # What lives here
//!
//! | Module       | Contents                                             |
//! |--------------|------------------------------------------------------|
//! | [`ids`]      | `TaskId`, `WorkerId`, `MachineId`, `UnitIndex`       |
//! | [`time`]     | `Stamp`, `Minutes` (minute-grained, Monday-anchored) |
//! | [`calendar`] | `Calendar`, `ShiftWindow`, `CalendarSpec`            |
//! | [`error`]    | `CoreError`, `CoreResult`                            |

pub mod calendar;
pub mod error;
pub mod ids;
pub mod time;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use calendar::{Calendar, CalendarSpec, ShiftWindow};
pub use error::{CoreError, CoreResult};
pub use ids::{MachineId, TaskId, UnitIndex, WorkerId};
pub use time::{Minutes, Stamp, MINUTES_PER_DAY};
