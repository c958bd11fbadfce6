//! Fluent builder for constructing a [`Simulator`].

use std::collections::HashMap;

use takt_core::{Calendar, MachineId, Stamp, WorkerId};
use takt_flow::{demand, ClassifiedFlow, Demand, TaskKind, UnitSlot};

use crate::cycle::CycleController;
use crate::error::{SimError, SimResult};
use crate::event_queue::{EventKind, EventQueue};
use crate::ledger::ResourceLedger;
use crate::reassign::ReassignController;
use crate::sim::{Simulator, WorkerSlot};
use crate::trace::TraceCollector;

/// Fluent builder for [`Simulator`].
///
/// # Required inputs
///
/// - A [`ClassifiedFlow`] (from [`takt_flow::validate`])
/// - A [`Calendar`]
///
/// # Optional inputs (have defaults)
///
/// | Method           | Default                                |
/// |------------------|----------------------------------------|
/// | `.demand(d)`     | `Demand::Units(flow.default_units)`    |
/// | `.start(at)`     | `Stamp::EPOCH`                         |
/// | `.role_count(..)`| No pooled roles                        |
///
/// # Worker pools
///
/// `role_count("fitter", 3)` turns every task assignment naming `"fitter"`
/// into a pool of three interchangeable workers (`fitter#1..fitter#3`); an
/// instance takes whichever pool member frees first.  Worker names without a
/// role count stay individual workers.  This is the knob the optimiser
/// searches over.
#[derive(Debug)]
pub struct SimBuilder {
    flow: ClassifiedFlow,
    calendar: Calendar,
    slots: Option<Vec<UnitSlot>>,
    start: Stamp,
    role_counts: Vec<(String, u32)>,
}

impl SimBuilder {
    pub fn new(flow: ClassifiedFlow, calendar: Calendar) -> Self {
        Self {
            flow,
            calendar,
            slots: None,
            start: Stamp::EPOCH,
            role_counts: Vec::new(),
        }
    }

    /// Validate `flow` and build from the result.
    ///
    /// Refuses a flow with fatal issues; warnings pass through.
    pub fn from_definition(flow: &takt_flow::FlowDefinition, calendar: Calendar) -> SimResult<Self> {
        let classified = takt_flow::validate(flow).map_err(SimError::FlowInvalid)?;
        Ok(Self::new(classified, calendar))
    }

    /// Supply the demand to expand into unit slots.
    pub fn demand(mut self, demand: &Demand) -> Self {
        self.slots = Some(demand::expand(demand));
        self
    }

    /// Supply pre-expanded unit slots directly.
    pub fn slots(mut self, slots: Vec<UnitSlot>) -> Self {
        self.slots = Some(slots);
        self
    }

    /// Simulation start instant (clamped forward to working time per task).
    pub fn start(mut self, at: Stamp) -> Self {
        self.start = at;
        self
    }

    /// Declare `role` as a pool of `count` interchangeable workers.
    pub fn role_count(mut self, role: impl Into<String>, count: u32) -> Self {
        self.role_counts.push((role.into(), count));
        self
    }

    /// Validate inputs, intern resources, seed root ready-checks, and return
    /// a ready-to-run [`Simulator`].
    pub fn build(self) -> SimResult<Simulator> {
        self.calendar
            .validate()
            .map_err(|e| SimError::from_core(e, self.start))?;

        let role_counts: HashMap<String, u32> = self.role_counts.into_iter().collect();
        for (role, count) in &role_counts {
            if *count == 0 {
                return Err(SimError::Config(format!("role '{role}' has a pool of 0 workers")));
            }
        }

        // ── Intern workers (pools expand to members) and machines ─────────
        let mut worker_names: Vec<String> = Vec::new();
        let mut worker_ids: HashMap<String, WorkerId> = HashMap::new();
        let mut intern_worker = |name: &str, names: &mut Vec<String>| {
            *worker_ids.entry(name.to_string()).or_insert_with(|| {
                names.push(name.to_string());
                WorkerId((names.len() - 1) as u16)
            })
        };

        let mut machine_names: Vec<String> = Vec::new();
        let mut machine_ids: HashMap<String, MachineId> = HashMap::new();

        let mut assignments: Vec<Vec<WorkerSlot>> = Vec::with_capacity(self.flow.task_count());
        let mut machines: Vec<Option<MachineId>> = Vec::with_capacity(self.flow.task_count());
        let mut roles: Vec<(String, Vec<WorkerId>)> = Vec::new();
        let mut role_index: HashMap<String, usize> = HashMap::new();
        let mut referenced_roles = 0usize;

        for t in self.flow.flow.task_ids() {
            let task = self.flow.task(t);
            let mut slots = Vec::new();
            if task.kind != TaskKind::MechanicalProcess {
                for name in &task.workers {
                    if let Some(&count) = role_counts.get(name.as_str()) {
                        let ri = *role_index.entry(name.clone()).or_insert_with(|| {
                            referenced_roles += 1;
                            let members = (1..=count)
                                .map(|i| intern_worker(&format!("{name}#{i}"), &mut worker_names))
                                .collect();
                            roles.push((name.clone(), members));
                            roles.len() - 1
                        });
                        slots.push(WorkerSlot::Pool(ri));
                    } else {
                        slots.push(WorkerSlot::Single(intern_worker(name, &mut worker_names)));
                    }
                }
            }
            assignments.push(slots);

            machines.push(task.machine.as_ref().map(|name| {
                *machine_ids.entry(name.clone()).or_insert_with(|| {
                    machine_names.push(name.clone());
                    MachineId((machine_names.len() - 1) as u16)
                })
            }));
        }

        if referenced_roles != role_counts.len() {
            let mut unused: Vec<&str> = role_counts
                .keys()
                .filter(|r| !role_index.contains_key(r.as_str()))
                .map(|r| r.as_str())
                .collect();
            unused.sort_unstable();
            return Err(SimError::Config(format!(
                "role(s) {unused:?} are not assigned to any task"
            )));
        }

        // Reassignment rules must name individual workers, not pooled roles.
        for t in self.flow.flow.task_ids() {
            if let Some(rule) = &self.flow.task(t).reassignment {
                if role_index.contains_key(rule.worker.as_str()) {
                    return Err(SimError::Config(format!(
                        "reassignment on task '{}' names pooled role '{}'",
                        self.flow.task(t).id, rule.worker
                    )));
                }
                if !worker_ids.contains_key(rule.worker.as_str()) {
                    return Err(SimError::Config(format!(
                        "reassignment on task '{}' names unknown worker '{}'",
                        self.flow.task(t).id, rule.worker
                    )));
                }
            }
        }

        // ── Expand demand and size per-unit state ─────────────────────────
        let slots = self
            .slots
            .unwrap_or_else(|| demand::expand(&Demand::Units(self.flow.flow.default_units)));
        let units = slots.len();
        let tasks = self.flow.task_count();

        // ── Seed root ready-checks ────────────────────────────────────────
        let mut queue = EventQueue::new();
        for slot in &slots {
            for &root in &self.flow.roots {
                let mut at = self.start;
                if let Some(pin) = slot.earliest_start {
                    at = at.max(pin);
                }
                if let Some(pin) = self.flow.task(root).earliest_start {
                    at = at.max(pin);
                }
                queue.push(
                    at,
                    EventKind::ReadyCheck { task: root, unit: slot.unit, iteration: 1 },
                    self.flow.topo_rank[root.index()],
                );
            }
        }

        let cycles = CycleController::new(units, &self.flow.flow.cycles);
        let reassign = ReassignController::new(&self.flow);
        let ledger = ResourceLedger::new(worker_names.len(), machine_names.len());

        Ok(Simulator::from_parts(
            self.flow,
            self.calendar,
            self.start,
            slots,
            queue,
            ledger,
            cycles,
            reassign,
            roles.into_iter().map(|(_, members)| members).collect(),
            worker_names,
            machine_names,
            assignments,
            machines,
            vec![vec![0u32; tasks]; units],
            TraceCollector::new(),
        ))
    }
}
