//! `takt-opt` — worker-count optimisation against a deadline.
//!
//! # Crate layout
//!
//! | Module       | Contents                                                  |
//! |--------------|-----------------------------------------------------------|
//! | [`search`]   | `Optimiser`, `OptimiserRequest`, `OptimiserOutcome`       |
//! | [`observer`] | `OptObserver`, `Progress`, `NoopObserver`                 |
//! | [`error`]    | `OptError`, `OptResult<T>`                                |
//!
//! Wraps the simulator in a monotone search over pooled worker counts: more
//! workers never lengthen the makespan, so a feasibility frontier exists and
//! binary search / coordinate descent finds the cheapest vector meeting the
//! deadline.  Each candidate runs in a fresh simulator instance with no
//! shared mutable state.

pub mod error;
pub mod observer;
pub mod search;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use error::{OptError, OptResult};
pub use observer::{NoopObserver, OptObserver, Progress};
pub use search::{Optimiser, OptimiserOutcome, OptimiserRequest, RoleRange};
