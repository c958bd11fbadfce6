//! Trace and metrics: the ordered record of task-instance runs and the
//! simulation result assembled from it.
//!
//! The trace is the sole output consumed by Gantt rendering and spreadsheet
//! export; everything in it is plain serialisable data.

use std::collections::HashMap;

use takt_core::{MachineId, Stamp, TaskId, UnitIndex, WorkerId};

use crate::ledger::{Occupation, Resource, SpliceRecord};

// ── Reasons ──────────────────────────────────────────────────────────────────

/// Why a task instance started when it did (or why an action was skipped).
/// Fixed enumeration; the trace never carries free-form reasons.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub enum Reason {
    /// Ran as soon as its predecessors allowed (the default tag).
    WaitedOnPredecessor,
    WaitedOnWorker,
    WaitedOnMachine,
    /// The calendar delayed the start or stretched the span over
    /// non-working time.
    WaitedOnCalendar,
    /// Ran because its cycle iteration opened.
    CycleIterationOpen,
    /// A reassignment was postponed (worker busy) or suppressed (target
    /// already staffed).
    ReassignmentDeferred,
    /// A daily preparation step was skipped: its workers already ran it
    /// that day.
    DailyPrepSkipped,
}

/// One entry of the ordered reason log.
#[derive(Clone, PartialEq, Eq, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct ReasonEntry {
    pub at: Stamp,
    pub task: TaskId,
    pub unit: UnitIndex,
    pub reason: Reason,
}

// ── Task runs ────────────────────────────────────────────────────────────────

/// A completed task instance.  Append-only; fields are final on completion.
#[derive(Clone, PartialEq, Eq, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct TaskRun {
    pub task: TaskId,
    pub unit: UnitIndex,
    /// 1-based; always 1 outside cycle groups.
    pub iteration: u32,
    pub start: Stamp,
    pub end: Stamp,
    pub workers: Vec<WorkerId>,
    pub machine: Option<MachineId>,
    /// Owning cycle-group index, if any.
    pub cycle: Option<u16>,
    pub reason: Reason,
}

/// One interval of a resource's occupancy timeline.
#[derive(Clone, PartialEq, Eq, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct OccupancySpan {
    pub start: Stamp,
    pub end: Stamp,
    pub task: TaskId,
}

impl From<Occupation> for OccupancySpan {
    fn from(o: Occupation) -> Self {
        Self { start: o.start, end: o.end, task: o.task }
    }
}

/// The resource most often found to be the binding constraint.
#[derive(Clone, PartialEq, Eq, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct BottleneckReport {
    pub resource: String,
    /// How many instance starts it was the binding constraint for.
    pub occurrences: u32,
}

// ── SimulationResult ─────────────────────────────────────────────────────────

/// Everything a run produces.  Lossless under serde round-trip.
#[derive(Clone, PartialEq, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct SimulationResult {
    /// First instance start, if anything ran.
    pub started: Option<Stamp>,
    /// Last instance end, if anything ran.
    pub finished: Option<Stamp>,
    /// Wall-clock makespan in minutes, calendar gaps included.  Zero for an
    /// empty run.
    pub makespan: i64,
    /// Completed instances in completion order.
    pub runs: Vec<TaskRun>,
    /// Interned name tables, index-aligned with the id types.
    pub worker_names: Vec<String>,
    pub machine_names: Vec<String>,
    /// Occupancy timeline per worker, index-aligned with `worker_names`.
    pub worker_occupancy: Vec<Vec<OccupancySpan>>,
    /// Occupancy timeline per machine, index-aligned with `machine_names`.
    pub machine_occupancy: Vec<Vec<OccupancySpan>>,
    pub splices: Vec<SpliceRecord>,
    pub bottleneck: Option<BottleneckReport>,
    /// Ordered reason log (event order).
    pub reasons: Vec<ReasonEntry>,
}

// ── TraceCollector ───────────────────────────────────────────────────────────

/// Mutable trace state while a run is in flight.
#[derive(Default)]
pub struct TraceCollector {
    runs: Vec<TaskRun>,
    reasons: Vec<ReasonEntry>,
    binding_counts: HashMap<Resource, u32>,
}

impl TraceCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_run(&mut self, run: TaskRun) {
        self.reasons.push(ReasonEntry {
            at: run.end,
            task: run.task,
            unit: run.unit,
            reason: run.reason,
        });
        self.runs.push(run);
    }

    /// Log a reason entry that is not tied to a completed run (deferrals,
    /// suppressions, daily-prep skips).
    pub fn record_reason(&mut self, at: Stamp, task: TaskId, unit: UnitIndex, reason: Reason) {
        self.reasons.push(ReasonEntry { at, task, unit, reason });
    }

    /// Count `resource` as the binding constraint of one instance start.
    pub fn record_binding(&mut self, resource: Resource) {
        *self.binding_counts.entry(resource).or_insert(0) += 1;
    }

    pub fn runs(&self) -> &[TaskRun] {
        &self.runs
    }

    /// Assemble the final result.  Resource names and occupancy come from
    /// the caller because the ledger owns them.
    pub fn finish(
        self,
        worker_names: Vec<String>,
        machine_names: Vec<String>,
        worker_occupancy: Vec<Vec<OccupancySpan>>,
        machine_occupancy: Vec<Vec<OccupancySpan>>,
        splices: Vec<SpliceRecord>,
    ) -> SimulationResult {
        let started = self.runs.iter().map(|r| r.start).min();
        let finished = self.runs.iter().map(|r| r.end).max();
        let makespan = match (started, finished) {
            (Some(s), Some(f)) => f - s,
            _ => 0,
        };

        // Highest count wins; ties resolve to the lower id for determinism.
        let bottleneck = self
            .binding_counts
            .iter()
            .map(|(&resource, &count)| (resource, count))
            .max_by_key(|&(resource, count)| (count, std::cmp::Reverse(sort_key(resource))))
            .map(|(resource, count)| BottleneckReport {
                resource: match resource {
                    Resource::Worker(w) => worker_names[w.index()].clone(),
                    Resource::Machine(m) => machine_names[m.index()].clone(),
                },
                occurrences: count,
            });

        SimulationResult {
            started,
            finished,
            makespan,
            runs: self.runs,
            worker_names,
            machine_names,
            worker_occupancy,
            machine_occupancy,
            splices,
            bottleneck,
            reasons: self.reasons,
        }
    }
}

fn sort_key(resource: Resource) -> (u8, u32) {
    match resource {
        Resource::Worker(w) => (0, w.0 as u32),
        Resource::Machine(m) => (1, m.0 as u32),
    }
}
