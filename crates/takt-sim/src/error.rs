use takt_core::{CoreError, Stamp, TaskId, UnitIndex};
use takt_flow::FlowIssue;
use thiserror::Error;

/// A task instance left pending at termination, with the dependencies it was
/// waiting on.
#[derive(Clone, Debug)]
pub struct BlockedInstance {
    pub task: TaskId,
    pub unit: UnitIndex,
    pub waiting_on: Vec<TaskId>,
}

/// Errors surfaced by the simulator.
#[derive(Debug, Error)]
pub enum SimError {
    /// The flow failed validation; no event was processed.
    #[error("flow invalid: {} fatal issue(s)", .0.iter().filter(|i| i.is_fatal()).count())]
    FlowInvalid(Vec<FlowIssue>),

    /// Shift/break/holiday configuration is self-contradictory.
    #[error("calendar misconfigured: {0}")]
    CalendarMisconfigured(String),

    /// The calendar ran out of working time before the run completed.
    #[error("calendar exhausted after {last_event}")]
    HorizonExceeded { last_event: Stamp },

    /// Pending instances at termination with no path to readiness.
    #[error("deadlock: {} instance(s) can never become ready", blocked.len())]
    DeadlockDetected { blocked: Vec<BlockedInstance> },

    /// A reservation would double-book a resource.  Indicates a scheduling
    /// bug, not bad input.
    #[error("{resource} double-booked: requested {}..{} over {}..{}",
        requested.0, requested.1, booked.0, booked.1)]
    OverlapDetected {
        resource: String,
        requested: (Stamp, Stamp),
        booked: (Stamp, Stamp),
    },

    /// Builder inputs disagree (unknown role, zero pool, missing demand).
    #[error("simulation configuration error: {0}")]
    Config(String),
}

impl SimError {
    /// Map a calendar error, attaching the clock position for horizon
    /// exhaustion.
    pub(crate) fn from_core(err: CoreError, last_event: Stamp) -> Self {
        match err {
            CoreError::HorizonExceeded { .. } => SimError::HorizonExceeded { last_event },
            CoreError::CalendarMisconfigured(msg) | CoreError::InvalidTimeOfDay(msg) => {
                SimError::CalendarMisconfigured(msg)
            }
        }
    }
}

pub type SimResult<T> = Result<T, SimError>;
