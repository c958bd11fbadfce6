//! The `Simulator` and its event loop.

use std::collections::{HashMap, HashSet};

use takt_core::{Calendar, MachineId, Minutes, Stamp, TaskId, UnitIndex, WorkerId};
use takt_flow::{ClassifiedFlow, CycleBound, TaskKind, UnitSlot};
use tracing::{debug, trace};

use crate::cycle::{CycleAdvance, CycleController, CycleStatus};
use crate::error::{BlockedInstance, SimError, SimResult};
use crate::event_queue::{Event, EventKind, EventQueue};
use crate::ledger::{Resource, ResourceLedger};
use crate::reassign::ReassignController;
use crate::trace::{OccupancySpan, Reason, SimulationResult, TaskRun, TraceCollector};

// ── Assignment slots ──────────────────────────────────────────────────────────

/// One entry of a task's worker assignment: a named individual or a pooled
/// role resolved to a concrete member at instance start.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum WorkerSlot {
    Single(WorkerId),
    /// Index into the simulator's role table.
    Pool(usize),
}

/// A task instance currently occupying its resources.
#[derive(Clone, Debug)]
struct Running {
    start: Stamp,
    end: Stamp,
    iteration: u32,
    workers: Vec<WorkerId>,
    machine: Option<MachineId>,
    reason: Reason,
}

// ── Simulator ─────────────────────────────────────────────────────────────────

/// A single simulation run: virtual clock, event queue, resource ledger,
/// cycle and reassignment controllers, and the trace under construction.
///
/// Create via [`SimBuilder`][crate::SimBuilder]; a `Simulator` is consumed by
/// [`run`][Simulator::run] and never reused — every run gets a fresh
/// instance, so no state leaks between runs.
///
/// # Event loop
///
/// 1. Pop the earliest event (ties resolve by class, then unit, iteration,
///    topological rank — see [`EventQueue`]).  If none, terminate.
/// 2. Advance the clock to its fire time.
/// 3. Dispatch by kind:
///    - `ReadyCheck` — start the instance if its predecessors, cycle
///      iteration, resources, and the calendar allow; park it on the binding
///      resource otherwise.
///    - `TaskComplete` — finalise the instance, free resources, fire
///      completion triggers, wake successors.
///    - `WorkerFree` / `MachineFree` — re-emit ready-checks for parked
///      instances.
///    - `ReassignTrigger` — apply or defer a worker move.
///    - `IterationAdvance` — reopen a cycle at the head or close it and
///      release its external successors.
pub struct Simulator {
    pub(crate) flow: ClassifiedFlow,
    pub(crate) calendar: Calendar,
    pub(crate) start: Stamp,
    pub(crate) clock: Stamp,
    pub(crate) slots: Vec<UnitSlot>,
    pub(crate) queue: EventQueue,
    pub(crate) ledger: ResourceLedger,
    pub(crate) cycles: CycleController,
    pub(crate) reassign: ReassignController,
    /// Pool members per role index.
    pub(crate) roles: Vec<Vec<WorkerId>>,
    pub(crate) worker_names: Vec<String>,
    pub(crate) machine_names: Vec<String>,
    /// Current worker assignment per task (mutated only by reassignment).
    pub(crate) assignments: Vec<Vec<WorkerSlot>>,
    /// Machine requirement per task.
    pub(crate) machines: Vec<Option<MachineId>>,
    /// Completed iterations per `[unit][task]`.
    pub(crate) done: Vec<Vec<u32>>,
    pub(crate) trace: TraceCollector,

    running: Vec<Vec<Option<Running>>>,
    /// Instances parked on the resource that blocked them.
    parked: HashMap<Resource, Vec<(TaskId, UnitIndex, u32)>>,
    parked_set: HashSet<(TaskId, UnitIndex, u32)>,
    /// Wait tag observed before an instance finally ran.
    pending_reason: HashMap<(TaskId, UnitIndex, u32), Reason>,
    /// `(worker, task, day)` triples of performed daily preparation steps.
    prep_log: HashSet<(WorkerId, TaskId, i64)>,
    /// Tasks whose first instance has started (on-start trigger latch).
    started: HashSet<TaskId>,
}

impl Simulator {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        flow: ClassifiedFlow,
        calendar: Calendar,
        start: Stamp,
        slots: Vec<UnitSlot>,
        queue: EventQueue,
        ledger: ResourceLedger,
        cycles: CycleController,
        reassign: ReassignController,
        roles: Vec<Vec<WorkerId>>,
        worker_names: Vec<String>,
        machine_names: Vec<String>,
        assignments: Vec<Vec<WorkerSlot>>,
        machines: Vec<Option<MachineId>>,
        done: Vec<Vec<u32>>,
        trace: TraceCollector,
    ) -> Self {
        let units = slots.len();
        let tasks = assignments.len();
        Self {
            flow,
            calendar,
            start,
            clock: start,
            slots,
            queue,
            ledger,
            cycles,
            reassign,
            roles,
            worker_names,
            machine_names,
            assignments,
            machines,
            done,
            trace,
            running: vec![vec![None; tasks]; units],
            parked: HashMap::new(),
            parked_set: HashSet::new(),
            pending_reason: HashMap::new(),
            prep_log: HashSet::new(),
            started: HashSet::new(),
        }
    }

    // ── Public API ────────────────────────────────────────────────────────

    /// Drive the run to completion and assemble the result.
    pub fn run(mut self) -> SimResult<SimulationResult> {
        debug!(
            units = self.slots.len(),
            tasks = self.flow.task_count(),
            "simulation starting"
        );

        while let Some(event) = self.queue.pop() {
            debug_assert!(event.at >= self.clock, "event queue went backwards");
            self.clock = event.at;
            self.dispatch(event)?;
        }

        self.check_deadlock()?;
        debug!(runs = self.trace.runs().len(), at = %self.clock, "simulation complete");
        Ok(self.finish())
    }

    // ── Dispatch ──────────────────────────────────────────────────────────

    fn dispatch(&mut self, event: Event) -> SimResult<()> {
        trace!(at = %event.at, kind = ?event.kind, "event");
        match event.kind {
            EventKind::ReadyCheck { task, unit, iteration } => {
                self.on_ready_check(task, unit, iteration)
            }
            EventKind::TaskComplete { task, unit, iteration } => {
                self.on_task_complete(task, unit, iteration)
            }
            EventKind::WorkerFree(w) => {
                self.wake_parked(Resource::Worker(w));
                Ok(())
            }
            EventKind::MachineFree(m) => {
                self.wake_parked(Resource::Machine(m));
                Ok(())
            }
            EventKind::ReassignTrigger { rule } => self.on_reassign_trigger(rule),
            EventKind::IterationAdvance { unit, cycle, completed } => {
                self.on_iteration_advance(unit, cycle, completed)
            }
        }
    }

    // ── Ready checks ──────────────────────────────────────────────────────

    fn on_ready_check(&mut self, task: TaskId, unit: UnitIndex, iteration: u32) -> SimResult<()> {
        let key = (task, unit, iteration);
        if self.done[unit.index()][task.index()] >= iteration
            || self.running[unit.index()][task.index()].is_some()
            || self.parked_set.contains(&key)
        {
            return Ok(());
        }

        // Cycle gating: the instance's iteration must be the open one.
        if let Some(ci) = self.flow.cycle_of[task.index()] {
            if !self.cycles.is_open_for(unit, ci, iteration) {
                return Ok(());
            }
        } else if iteration > 1 {
            return Ok(());
        }

        if !self.preds_satisfied(task, unit, iteration) {
            self.pending_reason.insert(key, Reason::WaitedOnPredecessor);
            return Ok(());
        }

        // ── Resolve resources ─────────────────────────────────────────────
        let needs_workers = self.flow.task(task).kind != TaskKind::MechanicalProcess;
        if needs_workers && self.assignments[task.index()].is_empty() {
            // No worker currently assigned (none declared, or all were
            // reassigned away).  A future reassignment re-emits this check;
            // otherwise the instance surfaces in the deadlock report.
            self.pending_reason.insert(key, Reason::WaitedOnWorker);
            return Ok(());
        }

        let mut chosen: Vec<(WorkerId, Stamp)> = Vec::new();
        if needs_workers {
            for slot in &self.assignments[task.index()] {
                let pick = match *slot {
                    WorkerSlot::Single(w) => {
                        (w, self.ledger.earliest_available(Resource::Worker(w), self.clock))
                    }
                    WorkerSlot::Pool(role) => self.roles[role]
                        .iter()
                        .map(|&w| {
                            (w, self.ledger.earliest_available(Resource::Worker(w), self.clock))
                        })
                        .min_by_key(|&(w, at)| (at, w))
                        .expect("validated pools are non-empty"),
                };
                chosen.push(pick);
            }
        }
        let machine = self.machines[task.index()];
        let machine_avail = machine
            .map(|m| self.ledger.earliest_available(Resource::Machine(m), self.clock));

        // The binding constraint is whichever resource frees last.
        let mut blocking: Option<(Resource, Stamp)> = None;
        for &(w, at) in &chosen {
            if at > self.clock && blocking.map_or(true, |(_, b)| at > b) {
                blocking = Some((Resource::Worker(w), at));
            }
        }
        if let (Some(m), Some(at)) = (machine, machine_avail) {
            if at > self.clock && blocking.map_or(true, |(_, b)| at > b) {
                blocking = Some((Resource::Machine(m), at));
            }
        }
        if let Some((resource, _)) = blocking {
            let reason = match resource {
                Resource::Worker(_) => Reason::WaitedOnWorker,
                Resource::Machine(_) => Reason::WaitedOnMachine,
            };
            self.pending_reason.insert(key, reason);
            self.trace.record_binding(resource);
            self.parked.entry(resource).or_default().push(key);
            self.parked_set.insert(key);
            return Ok(());
        }

        // ── Start the instance ────────────────────────────────────────────
        self.start_instance(task, unit, iteration, chosen, machine)
    }

    fn start_instance(
        &mut self,
        task: TaskId,
        unit: UnitIndex,
        iteration: u32,
        chosen: Vec<(WorkerId, Stamp)>,
        machine: Option<MachineId>,
    ) -> SimResult<()> {
        let key = (task, unit, iteration);
        let workers: Vec<WorkerId> = chosen.iter().map(|&(w, _)| w).collect();

        let start = self.cal(self.calendar.next_working_instant(self.clock))?;
        let (duration, prep_skipped) = self.effective_duration(task, &workers, start.day());
        let (_, end) = self.cal(self.calendar.advance(start, duration))?;

        // Reason precedence: calendar > recorded wait > cycle-opened > default.
        let in_cycle = self.flow.cycle_of[task.index()].is_some();
        let mut reason = self.pending_reason.remove(&key).unwrap_or(if in_cycle {
            Reason::CycleIterationOpen
        } else {
            Reason::WaitedOnPredecessor
        });
        if start > self.clock || (end - start) > duration.0 as i64 {
            reason = Reason::WaitedOnCalendar;
        }
        if prep_skipped {
            self.trace.record_reason(start, task, unit, Reason::DailyPrepSkipped);
        }

        for &w in &workers {
            self.ledger.reserve(Resource::Worker(w), start, end, task)?;
        }
        if let Some(m) = machine {
            self.ledger.reserve(Resource::Machine(m), start, end, task)?;
        }
        if !prep_skipped {
            if let Some(prep) = &self.flow.task(task).prep {
                if prep.daily {
                    for &w in &workers {
                        self.prep_log.insert((w, task, start.day()));
                    }
                }
            }
        }

        debug!(task = %task, unit = %unit, iteration, %start, %end, "instance running");
        self.running[unit.index()][task.index()] = Some(Running {
            start,
            end,
            iteration,
            workers,
            machine,
            reason,
        });

        if self.started.insert(task) {
            for rule in self.reassign.on_source_started(task) {
                self.queue.push(start, EventKind::ReassignTrigger { rule }, 0);
            }
        }

        self.queue.push(end, EventKind::TaskComplete { task, unit, iteration }, 0);
        Ok(())
    }

    // ── Completions ───────────────────────────────────────────────────────

    fn on_task_complete(&mut self, task: TaskId, unit: UnitIndex, iteration: u32) -> SimResult<()> {
        let Some(run) = self.running[unit.index()][task.index()].take() else {
            return Ok(());
        };
        debug_assert_eq!(run.iteration, iteration);
        self.done[unit.index()][task.index()] += 1;

        let cycle = self.flow.cycle_of[task.index()];
        self.trace.record_run(TaskRun {
            task,
            unit,
            iteration,
            start: run.start,
            end: run.end,
            workers: run.workers.clone(),
            machine: run.machine,
            cycle: cycle.map(|c| c as u16),
            reason: run.reason,
        });

        for &w in &run.workers {
            self.queue.push(self.clock, EventKind::WorkerFree(w), 0);
        }
        if let Some(m) = run.machine {
            self.queue.push(self.clock, EventKind::MachineFree(m), 0);
        }

        // Completion-triggered reassignments fire once the task is complete
        // for every demanded unit.
        if self.task_fully_complete(task) {
            for rule in self.reassign.on_source_completed(task) {
                self.queue.push(self.clock, EventKind::ReassignTrigger { rule }, 0);
            }
        }

        // Tail completion drives the iteration machinery.
        if let Some(ci) = cycle {
            if self.flow.flow.cycles[ci].tail == task {
                self.queue.push(
                    self.clock,
                    EventKind::IterationAdvance { unit, cycle: ci, completed: iteration },
                    0,
                );
            }
        }

        // Wake downstream successors (cycle-internal ones at this iteration).
        for i in 0..self.flow.succs[task.index()].len() {
            let succ = self.flow.succs[task.index()][i];
            let succ_iter = match (cycle, self.flow.cycle_of[succ.index()]) {
                (Some(a), Some(b)) if a == b => iteration,
                (_, Some(b)) => self.cycles.state(unit, b).iteration,
                _ => 1,
            };
            self.emit_ready(self.clock, succ, unit, succ_iter);
        }
        Ok(())
    }

    // ── Cycle iteration machinery ─────────────────────────────────────────

    fn on_iteration_advance(&mut self, unit: UnitIndex, cycle: usize, completed: u32) -> SimResult<()> {
        for rule in self
            .reassign
            .on_iteration(&self.flow.flow.cycles[cycle].members, completed)
        {
            self.queue.push(self.clock, EventKind::ReassignTrigger { rule }, 0);
        }

        let feeder_done = match self.flow.flow.cycles[cycle].bound {
            CycleBound::UntilFeeder(feeder) => self.task_complete_for_unit(feeder, unit),
            CycleBound::Fixed(_) => false,
        };

        match self.cycles.on_tail_complete(unit, cycle, completed, feeder_done) {
            CycleAdvance::Reopen { next_iteration } => {
                debug!(cycle, unit = %unit, next_iteration, "cycle reopens");
                let head = self.flow.flow.cycles[cycle].head;
                self.emit_ready(self.clock, head, unit, next_iteration);
            }
            CycleAdvance::Close => {
                debug!(cycle, unit = %unit, iterations = completed, "cycle closes");
                // Release every successor outside the group.
                for i in 0..self.flow.flow.cycles[cycle].members.len() {
                    let member = self.flow.flow.cycles[cycle].members[i];
                    for j in 0..self.flow.succs[member.index()].len() {
                        let succ = self.flow.succs[member.index()][j];
                        if self.flow.cycle_of[succ.index()] == Some(cycle) {
                            continue;
                        }
                        let succ_iter = match self.flow.cycle_of[succ.index()] {
                            Some(other) => self.cycles.state(unit, other).iteration,
                            None => 1,
                        };
                        self.emit_ready(self.clock, succ, unit, succ_iter);
                    }
                }
                self.cycles.mark_closed(unit, cycle);

                // Member completion only becomes observable once the group
                // closes; completion-triggered rules re-check here.
                for i in 0..self.flow.flow.cycles[cycle].members.len() {
                    let member = self.flow.flow.cycles[cycle].members[i];
                    if self.task_fully_complete(member) {
                        for rule in self.reassign.on_source_completed(member) {
                            self.queue.push(self.clock, EventKind::ReassignTrigger { rule }, 0);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    // ── Reassignment ──────────────────────────────────────────────────────

    fn on_reassign_trigger(&mut self, rule_id: usize) -> SimResult<()> {
        let state = self.reassign.rule(rule_id);
        if state.fired {
            return Ok(());
        }
        let source = state.source;
        let target = state.rule.target;
        let only_if_unstaffed = state.rule.only_if_unstaffed;
        let worker = self
            .worker_names
            .iter()
            .position(|n| n == &state.rule.worker)
            .map(|i| WorkerId(i as u16))
            .ok_or_else(|| {
                SimError::Config(format!("reassignment worker '{}' not interned", state.rule.worker))
            })?;

        // No preemption: a worker mid-instance moves when it ends.
        if let Some(busy_until) = self.worker_busy_until(worker) {
            if busy_until > self.clock {
                debug!(%worker, %busy_until, "reassignment deferred");
                self.trace
                    .record_reason(self.clock, source, UnitIndex::INVALID, Reason::ReassignmentDeferred);
                self.queue
                    .push(busy_until, EventKind::ReassignTrigger { rule: rule_id }, 0);
                return Ok(());
            }
        }

        if only_if_unstaffed && self.target_staffed(target) {
            debug!(%target, "reassignment suppressed: target already staffed");
            self.reassign.mark_fired(rule_id);
            self.trace
                .record_reason(self.clock, target, UnitIndex::INVALID, Reason::ReassignmentDeferred);
            return Ok(());
        }

        self.reassign.mark_fired(rule_id);
        self.assignments[source.index()].retain(|s| *s != WorkerSlot::Single(worker));
        self.assignments[target.index()].push(WorkerSlot::Single(worker));
        self.ledger.splice(worker, self.clock, source, target);
        debug!(%worker, %source, %target, at = %self.clock, "worker reassigned");

        // The move may unblock instances waiting on this worker or on the
        // newly staffed target.
        self.wake_parked(Resource::Worker(worker));
        for u in 0..self.slots.len() {
            let unit = UnitIndex(u as u32);
            if !self.task_complete_for_unit(target, unit) {
                let iter = match self.flow.cycle_of[target.index()] {
                    Some(ci) => self.cycles.state(unit, ci).iteration,
                    None => 1,
                };
                self.emit_ready(self.clock, target, unit, iter);
            }
        }
        Ok(())
    }

    // ── Shared helpers ────────────────────────────────────────────────────

    fn emit_ready(&mut self, at: Stamp, task: TaskId, unit: UnitIndex, iteration: u32) {
        let rank = self.flow.topo_rank[task.index()];
        self.queue
            .push(at, EventKind::ReadyCheck { task, unit, iteration }, rank);
    }

    fn wake_parked(&mut self, resource: Resource) {
        let Some(keys) = self.parked.remove(&resource) else {
            return;
        };
        for key in keys {
            self.parked_set.remove(&key);
            self.emit_ready(self.clock, key.0, key.1, key.2);
        }
    }

    fn preds_satisfied(&self, task: TaskId, unit: UnitIndex, iteration: u32) -> bool {
        let own_cycle = self.flow.cycle_of[task.index()];
        self.flow.preds[task.index()].iter().all(|&p| {
            match (own_cycle, self.flow.cycle_of[p.index()]) {
                // Same group: the predecessor must have reached this iteration.
                (Some(a), Some(b)) if a == b => self.done[unit.index()][p.index()] >= iteration,
                // Predecessor inside a different group: wait for that group
                // to drain.
                (_, Some(b)) => {
                    let s = self.cycles.state(unit, b);
                    s.status != CycleStatus::Open
                        && self.done[unit.index()][p.index()] >= s.iteration
                }
                _ => self.done[unit.index()][p.index()] >= 1,
            }
        })
    }

    /// Effective duration of an instance, with the daily-prep gate applied.
    fn effective_duration(&self, task: TaskId, workers: &[WorkerId], day: i64) -> (Minutes, bool) {
        let def = self.flow.task(task);
        match &def.prep {
            Some(prep) => {
                let skipped = prep.daily
                    && !workers.is_empty()
                    && workers.iter().all(|&w| self.prep_log.contains(&(w, task, day)));
                if skipped {
                    (def.duration, true)
                } else {
                    (def.duration + prep.duration, false)
                }
            }
            None => (def.duration, false),
        }
    }

    fn worker_busy_until(&self, worker: WorkerId) -> Option<Stamp> {
        self.running
            .iter()
            .flatten()
            .flatten()
            .filter(|r| r.workers.contains(&worker))
            .map(|r| r.end)
            .max()
    }

    fn target_staffed(&self, target: TaskId) -> bool {
        self.running
            .iter()
            .any(|unit| unit[target.index()].as_ref().is_some_and(|r| !r.workers.is_empty()))
    }

    fn task_complete_for_unit(&self, task: TaskId, unit: UnitIndex) -> bool {
        match self.flow.cycle_of[task.index()] {
            None => self.done[unit.index()][task.index()] >= 1,
            Some(ci) => {
                let s = self.cycles.state(unit, ci);
                s.status != CycleStatus::Open
                    && self.done[unit.index()][task.index()] >= s.iteration
            }
        }
    }

    fn task_fully_complete(&self, task: TaskId) -> bool {
        (0..self.slots.len()).all(|u| self.task_complete_for_unit(task, UnitIndex(u as u32)))
    }

    fn cal<T>(&self, result: takt_core::CoreResult<T>) -> SimResult<T> {
        result.map_err(|e| SimError::from_core(e, self.clock))
    }

    // ── Termination ───────────────────────────────────────────────────────

    fn check_deadlock(&self) -> SimResult<()> {
        let mut blocked = Vec::new();
        for u in 0..self.slots.len() {
            let unit = UnitIndex(u as u32);
            for task in self.flow.flow.task_ids() {
                if self.task_complete_for_unit(task, unit) {
                    continue;
                }
                let waiting_on: Vec<TaskId> = self.flow.preds[task.index()]
                    .iter()
                    .copied()
                    .filter(|&p| !self.task_complete_for_unit(p, unit))
                    .collect();
                blocked.push(BlockedInstance { task, unit, waiting_on });
            }
        }
        if blocked.is_empty() {
            Ok(())
        } else {
            Err(SimError::DeadlockDetected { blocked })
        }
    }

    fn finish(self) -> SimulationResult {
        let worker_occupancy: Vec<Vec<OccupancySpan>> = (0..self.ledger.worker_count())
            .map(|w| {
                self.ledger
                    .worker_occupations(WorkerId(w as u16))
                    .iter()
                    .map(|&o| o.into())
                    .collect()
            })
            .collect();
        let machine_occupancy: Vec<Vec<OccupancySpan>> = (0..self.ledger.machine_count())
            .map(|m| {
                self.ledger
                    .machine_occupations(MachineId(m as u16))
                    .iter()
                    .map(|&o| o.into())
                    .collect()
            })
            .collect();

        let splices = self.ledger.splices().to_vec();
        self.trace.finish(
            self.worker_names,
            self.machine_names,
            worker_occupancy,
            machine_occupancy,
            splices,
        )
    }
}
