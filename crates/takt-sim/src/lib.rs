//! `takt-sim` — the discrete-event production simulator.
//!
//! # Crate layout
//!
//! | Module          | Contents                                               |
//! |-----------------|--------------------------------------------------------|
//! | [`event_queue`] | `Event`, `EventKind`, `EventQueue`                     |
//! | [`ledger`]      | `ResourceLedger`, `Occupation`, `SpliceRecord`         |
//! | [`cycle`]       | `CycleController`, iteration state machine             |
//! | [`reassign`]    | `ReassignController`, rule firing state                |
//! | [`sim`]         | `Simulator` and its event loop                         |
//! | [`builder`]     | `SimBuilder`                                           |
//! | [`trace`]       | `TaskRun`, `Reason`, `SimulationResult`                |
//! | [`error`]       | `SimError`, `SimResult<T>`                             |
//!
//! # Model (summary)
//!
//! The simulator is single-threaded and event-driven over a virtual minute
//! clock.  Popping the next `(time, tie-break)` event and advancing the
//! clock are the only waits; given identical inputs, two runs produce
//! identical traces down to event order.  Resources (workers, machines) are
//! booked in an append-only ledger; feedback loops run through the cycle
//! controller's per-(unit, group) iteration counters; reassignment rules
//! move workers between tasks at splice points without preemption.

pub mod builder;
pub mod cycle;
pub mod error;
pub mod event_queue;
pub mod ledger;
pub mod reassign;
pub mod sim;
pub mod trace;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use builder::SimBuilder;
pub use cycle::{CycleAdvance, CycleController, CycleStatus};
pub use error::{BlockedInstance, SimError, SimResult};
pub use event_queue::{Event, EventKind, EventQueue};
pub use ledger::{Occupation, Resource, ResourceLedger, SpliceRecord};
pub use sim::Simulator;
pub use trace::{
    BottleneckReport, OccupancySpan, Reason, ReasonEntry, SimulationResult, TaskRun,
};
