//! `takt-flow` — production-flow definitions, validation, and demand
//! expansion.
//!
//! # Crate layout
//!
//! | Module        | Contents                                                    |
//! |---------------|-------------------------------------------------------------|
//! | [`model`]     | `FlowDefinition`, `TaskDef`, `DepEdge`, `CycleGroup`, rules |
//! | [`validator`] | `validate` → `ClassifiedFlow` or `Vec<FlowIssue>`           |
//! | [`demand`]    | `Demand`, `Lot`, `UnitSlot`, `expand`                       |
//! | [`error`]     | `FlowError`, `FlowResult<T>`                                |
//!
//! A flow is a task arena plus dependency edges; feedback loops are declared
//! as cycle groups whose single back-edge (tail → head) carries the `cyclic`
//! flag.  With back-edges filtered out, the edges form a DAG — the validator
//! enforces this and annotates each task with its cycle membership,
//! auto-trigger classification, and a deterministic topological rank.

pub mod demand;
pub mod error;
pub mod model;
pub mod validator;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use demand::{expand, Demand, Lot, UnitSlot};
pub use error::{FlowError, FlowResult};
pub use model::{
    CycleBound, CycleGroup, DepEdge, FlowDefinition, PrepStep, ReassignTrigger, ReassignmentRule,
    SequentialGroup, StartCondition, TaskDef, TaskKind,
};
pub use validator::{validate, ClassifiedFlow, FlowIssue, IssueKind, IssueSeverity};
