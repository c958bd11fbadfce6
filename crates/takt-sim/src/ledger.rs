//! Resource ledger: per-worker and per-machine occupancy books.
//!
//! Occupations are appended as instances start and never retroactively
//! edited; the single exception is [`ResourceLedger::splice`], which closes
//! an open occupation at a reassignment instant.  Machines can never be
//! double-booked; workers only ever change task at a splice point, which is a
//! single instant, so their occupations stay pairwise disjoint too.

use takt_core::{MachineId, Stamp, TaskId, WorkerId};

use crate::error::{SimError, SimResult};

// ── Resources ────────────────────────────────────────────────────────────────

/// Either side of the two ledgers.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum Resource {
    Worker(WorkerId),
    Machine(MachineId),
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Resource::Worker(w) => write!(f, "{w}"),
            Resource::Machine(m) => write!(f, "{m}"),
        }
    }
}

/// One booked interval on a resource.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct Occupation {
    pub start: Stamp,
    pub end: Stamp,
    pub task: TaskId,
}

impl Occupation {
    #[inline]
    fn covers(&self, t: Stamp) -> bool {
        self.start <= t && t < self.end
    }

    #[inline]
    fn overlaps(&self, start: Stamp, end: Stamp) -> bool {
        self.start < end && start < self.end
    }
}

/// A recorded mid-run reassignment point.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct SpliceRecord {
    pub worker: WorkerId,
    pub at: Stamp,
    pub from_task: TaskId,
    pub to_task: TaskId,
}

// ── Books ────────────────────────────────────────────────────────────────────

/// The occupancy book of one resource.
#[derive(Clone, Debug, Default)]
struct Book {
    /// Sorted by start stamp (reservations arrive in simulation order).
    occupations: Vec<Occupation>,
    /// End of the latest occupation — the pending next-free instant.
    next_free: Stamp,
}

impl Book {
    fn reserve(&mut self, start: Stamp, end: Stamp, task: TaskId) -> Result<(), Occupation> {
        if let Some(&hit) = self.occupations.iter().find(|o| o.overlaps(start, end)) {
            return Err(hit);
        }
        let occ = Occupation { start, end, task };
        // Reservations normally arrive in start order; sort to keep the
        // invariant when they don't.
        let pos = self.occupations.partition_point(|o| o.start <= start);
        self.occupations.insert(pos, occ);
        if end > self.next_free {
            self.next_free = end;
        }
        Ok(())
    }

    fn earliest_available(&self, not_before: Stamp) -> Stamp {
        // Conflict-scan: a proposed instant inside a booked interval moves to
        // that interval's end, then re-checks.
        let mut proposed = not_before;
        loop {
            match self.occupations.iter().find(|o| o.covers(proposed)) {
                Some(occ) => proposed = occ.end,
                None => return proposed,
            }
        }
    }
}

// ── ResourceLedger ───────────────────────────────────────────────────────────

/// Occupancy books for every worker and machine in the run, plus the splice
/// log.
pub struct ResourceLedger {
    workers: Vec<Book>,
    machines: Vec<Book>,
    splices: Vec<SpliceRecord>,
}

impl ResourceLedger {
    pub fn new(worker_count: usize, machine_count: usize) -> Self {
        Self {
            workers: vec![Book::default(); worker_count],
            machines: vec![Book::default(); machine_count],
            splices: Vec::new(),
        }
    }

    /// Book `[start, end)` on `resource` for `task`.
    ///
    /// A zero-length interval never conflicts and is recorded as-is (the
    /// trace of a zero-duration task still names its resources).
    pub fn reserve(
        &mut self,
        resource: Resource,
        start: Stamp,
        end: Stamp,
        task: TaskId,
    ) -> SimResult<()> {
        self.book_mut(resource).reserve(start, end, task).map_err(|hit| {
            SimError::OverlapDetected {
                resource: resource.to_string(),
                requested: (start, end),
                booked: (hit.start, hit.end),
            }
        })
    }

    /// Smallest `t ≥ not_before` at which a new occupation can begin.
    pub fn earliest_available(&self, resource: Resource, not_before: Stamp) -> Stamp {
        self.book(resource).earliest_available(not_before)
    }

    /// Close `worker`'s open occupation at `at` (if any) and log the move
    /// from `from_task` to `to_task`.  Reserved to the reassignment
    /// controller.
    pub fn splice(&mut self, worker: WorkerId, at: Stamp, from_task: TaskId, to_task: TaskId) {
        let book = &mut self.workers[worker.index()];
        if let Some(occ) = book.occupations.iter_mut().find(|o| o.covers(at)) {
            occ.end = at;
        }
        book.next_free = book.occupations.iter().map(|o| o.end).max().unwrap_or(at);
        self.splices.push(SpliceRecord { worker, at, from_task, to_task });
    }

    pub fn worker_occupations(&self, w: WorkerId) -> &[Occupation] {
        &self.workers[w.index()].occupations
    }

    pub fn machine_occupations(&self, m: MachineId) -> &[Occupation] {
        &self.machines[m.index()].occupations
    }

    pub fn splices(&self) -> &[SpliceRecord] {
        &self.splices
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    pub fn machine_count(&self) -> usize {
        self.machines.len()
    }

    fn book(&self, resource: Resource) -> &Book {
        match resource {
            Resource::Worker(w) => &self.workers[w.index()],
            Resource::Machine(m) => &self.machines[m.index()],
        }
    }

    fn book_mut(&mut self, resource: Resource) -> &mut Book {
        match resource {
            Resource::Worker(w) => &mut self.workers[w.index()],
            Resource::Machine(m) => &mut self.machines[m.index()],
        }
    }
}
