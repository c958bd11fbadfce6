//! Cycle controller: per-(unit, cycle-group) iteration state.
//!
//! The controller owns the iteration counters and open/closing/closed
//! status; the simulator asks it for decisions and applies their effects
//! (emitting ready-checks) itself.

use takt_core::UnitIndex;
use takt_flow::{CycleBound, CycleGroup};

/// Lifecycle of one cycle group for one unit.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum CycleStatus {
    /// The current iteration may run.
    Open,
    /// The bound is reached; external successors are being released.
    Closing,
    /// Fully drained.
    Closed,
}

/// Iteration state of one (unit, cycle-group) pair.
#[derive(Copy, Clone, Debug)]
pub struct CycleState {
    /// The iteration currently allowed to run (1-based).  After closing,
    /// this is the final iteration count.
    pub iteration: u32,
    pub status: CycleStatus,
}

/// Decision returned by [`CycleController::on_tail_complete`].
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum CycleAdvance {
    /// Open the next iteration at the head.
    Reopen { next_iteration: u32 },
    /// Bound reached: release the group's external successors.
    Close,
}

/// Owns all per-(unit, group) cycle state for a run.
pub struct CycleController {
    bounds: Vec<CycleBound>,
    /// `states[unit][cycle]`.
    states: Vec<Vec<CycleState>>,
}

impl CycleController {
    pub fn new(units: usize, cycles: &[CycleGroup]) -> Self {
        let initial = CycleState { iteration: 1, status: CycleStatus::Open };
        Self {
            bounds: cycles.iter().map(|c| c.bound).collect(),
            states: vec![vec![initial; cycles.len()]; units],
        }
    }

    #[inline]
    pub fn state(&self, unit: UnitIndex, cycle: usize) -> CycleState {
        self.states[unit.index()][cycle]
    }

    /// Whether iteration `k` of `cycle` may run for `unit`.
    pub fn is_open_for(&self, unit: UnitIndex, cycle: usize, iteration: u32) -> bool {
        let s = self.state(unit, cycle);
        s.status == CycleStatus::Open && s.iteration == iteration
    }

    /// Tail completion of iteration `completed`: decide whether the group
    /// reopens at `completed + 1` or closes.  `feeder_done` is the
    /// completion status of the feeder task for feeder-bounded groups
    /// (ignored for fixed bounds).
    ///
    /// A feeder finishing mid-iteration does not cut that iteration short;
    /// the group closes at the next tail completion.
    pub fn on_tail_complete(
        &mut self,
        unit: UnitIndex,
        cycle: usize,
        completed: u32,
        feeder_done: bool,
    ) -> CycleAdvance {
        let reopen = match self.bounds[cycle] {
            CycleBound::Fixed(n) => completed < n,
            CycleBound::UntilFeeder(_) => !feeder_done,
        };
        let state = &mut self.states[unit.index()][cycle];
        debug_assert_eq!(state.iteration, completed, "tail completed a non-open iteration");
        if reopen {
            state.iteration = completed + 1;
            CycleAdvance::Reopen { next_iteration: completed + 1 }
        } else {
            state.status = CycleStatus::Closing;
            CycleAdvance::Close
        }
    }

    /// Mark a closing group fully drained.
    pub fn mark_closed(&mut self, unit: UnitIndex, cycle: usize) {
        let state = &mut self.states[unit.index()][cycle];
        debug_assert_eq!(state.status, CycleStatus::Closing);
        state.status = CycleStatus::Closed;
    }

    /// Final iteration count for a closed group, or the open iteration
    /// otherwise.
    pub fn iterations(&self, unit: UnitIndex, cycle: usize) -> u32 {
        self.state(unit, cycle).iteration
    }
}
