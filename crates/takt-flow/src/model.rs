//! Canonical production-flow model: tasks, dependencies, cycle groups,
//! reassignment rules.
//!
//! # Arena model
//!
//! Tasks live in a contiguous arena (`FlowDefinition::tasks`) indexed by
//! [`TaskId`].  Dependencies are index pairs with a boolean `cyclic` flag;
//! filtering out cyclic edges yields the DAG view used by the validator and
//! the simulator's readiness checks.  Feedback loops therefore need no
//! pointer cycles.
//!
//! A `FlowDefinition` is plain serialisable data.  It is validated once per
//! run (see [`crate::validator`]) and frozen afterwards.

use takt_core::{Minutes, Stamp, TaskId};

// ── Task attributes ──────────────────────────────────────────────────────────

/// What a task fundamentally is.  Closed set — the simulator dispatches on
/// this once per event.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
#[derive(serde::Serialize, serde::Deserialize)]
pub enum TaskKind {
    #[default]
    Ordinary,
    /// Setup work; may carry a `daily` gate (see [`PrepStep`]).
    Preparation,
    /// Machine-only processing; occupies no worker.
    MechanicalProcess,
    /// Unique entry task of a cycle group.
    CycleHead,
    /// Unique exit task of a cycle group.
    CycleTail,
    /// Started by an event (cycle iteration, reassignment), not by
    /// predecessor completion.
    AutoTriggered,
}

/// When a task may begin.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
#[derive(serde::Serialize, serde::Deserialize)]
pub enum StartCondition {
    /// Eligible once every non-cyclic predecessor has completed.
    #[default]
    AfterPredecessors,
    /// Explicitly released by the planner; acts as a flow root even when
    /// only cyclic edges point at it.
    ManualTrigger,
    /// Released by a simulation event.
    AutoOnEvent,
}

/// A preparation step attached to a task.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct PrepStep {
    pub duration: Minutes,
    /// Daily-flagged steps execute at most once per worker per calendar day.
    pub daily: bool,
}

/// What fires a reassignment rule.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub enum ReassignTrigger {
    /// When the source task's first instance starts.
    OnStart,
    /// When the source task completes its last unit.
    OnComplete,
    /// When the source task's cycle group finishes iteration `k`.
    OnIteration(u32),
}

/// Moves one worker from the carrying task's assignment to `target` when the
/// trigger fires.  Never creates workers.
#[derive(Clone, PartialEq, Eq, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct ReassignmentRule {
    /// Name of the worker to move (must be assigned to the source task).
    pub worker: String,
    pub trigger: ReassignTrigger,
    pub target: TaskId,
    /// Suppress the move if the target already has an active worker for its
    /// current iteration.
    #[serde(default)]
    pub only_if_unstaffed: bool,
}

/// Membership in a sequential group: a linear chain of tasks sharing one
/// worker, traversed in `position` order without releasing.
#[derive(Clone, PartialEq, Eq, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct SequentialGroup {
    pub key: String,
    pub position: u32,
}

// ── TaskDef ──────────────────────────────────────────────────────────────────

/// One task definition in the flow arena.
#[derive(Clone, PartialEq, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct TaskDef {
    /// Stable editor-assigned identifier, unique inside the flow.
    pub id: String,
    /// Human-readable name; defaults to `id`.
    pub name: String,
    pub kind: TaskKind,
    /// Nominal duration per unit, in working minutes.
    pub duration: Minutes,
    /// Assigned worker names (zero or more).
    pub workers: Vec<String>,
    /// Optional machine requirement.
    #[serde(default)]
    pub machine: Option<String>,
    #[serde(default)]
    pub prep: Option<PrepStep>,
    pub start: StartCondition,
    #[serde(default)]
    pub reassignment: Option<ReassignmentRule>,
    #[serde(default)]
    pub group: Option<SequentialGroup>,
    /// Pin for root tasks: never start before this instant.  Ignored when
    /// the task is unlocked by a dependency instead.
    #[serde(default)]
    pub earliest_start: Option<Stamp>,
}

impl TaskDef {
    pub fn new(id: impl Into<String>, duration: Minutes) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            kind: TaskKind::default(),
            duration,
            workers: Vec::new(),
            machine: None,
            prep: None,
            start: StartCondition::default(),
            reassignment: None,
            group: None,
            earliest_start: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_kind(mut self, kind: TaskKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_worker(mut self, worker: impl Into<String>) -> Self {
        self.workers.push(worker.into());
        self
    }

    pub fn with_machine(mut self, machine: impl Into<String>) -> Self {
        self.machine = Some(machine.into());
        self
    }

    pub fn with_prep(mut self, duration: Minutes, daily: bool) -> Self {
        self.prep = Some(PrepStep { duration, daily });
        self
    }

    pub fn with_start(mut self, start: StartCondition) -> Self {
        self.start = start;
        self
    }

    pub fn with_reassignment(mut self, rule: ReassignmentRule) -> Self {
        self.reassignment = Some(rule);
        self
    }

    pub fn with_group(mut self, key: impl Into<String>, position: u32) -> Self {
        self.group = Some(SequentialGroup { key: key.into(), position });
        self
    }

    pub fn with_earliest_start(mut self, at: Stamp) -> Self {
        self.earliest_start = Some(at);
        self
    }
}

// ── Dependencies and cycles ──────────────────────────────────────────────────

/// A directed dependency edge from predecessor to successor.
///
/// Edges carry no duration.  `cyclic` marks the single feedback edge of a
/// cycle group (tail → head); all other edges form a DAG.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct DepEdge {
    pub from: TaskId,
    pub to: TaskId,
    #[serde(default)]
    pub cyclic: bool,
}

/// How many times a cycle group iterates.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub enum CycleBound {
    /// Exactly `n` iterations, `n ≥ 1`.
    Fixed(u32),
    /// Iterate until the named upstream feeder task has completed.
    UntilFeeder(TaskId),
}

/// A named feedback loop: one head, one tail, intermediate members, and a
/// bound.  Every path from the head back to itself crosses the tail exactly
/// once.
#[derive(Clone, PartialEq, Eq, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct CycleGroup {
    pub name: String,
    pub head: TaskId,
    pub tail: TaskId,
    /// All member task ids, head and tail included.
    pub members: Vec<TaskId>,
    pub bound: CycleBound,
}

// ── FlowDefinition ───────────────────────────────────────────────────────────

/// A complete production flow: the task arena, its dependency edges, and its
/// cycle groups.  Immutable during a simulation run.
#[derive(Clone, PartialEq, Debug, Default)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct FlowDefinition {
    /// Flow identifier (product code or editor document id).
    pub id: String,
    pub tasks: Vec<TaskDef>,
    pub edges: Vec<DepEdge>,
    pub cycles: Vec<CycleGroup>,
    /// Demand unit count used when the caller passes no explicit demand.
    pub default_units: u32,
}

impl FlowDefinition {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            default_units: 1,
            ..Default::default()
        }
    }

    /// Append a task and return its arena id.
    pub fn add_task(&mut self, task: TaskDef) -> TaskId {
        let id = TaskId(self.tasks.len() as u16);
        self.tasks.push(task);
        id
    }

    /// Append an ordinary (non-cyclic) dependency edge.
    pub fn add_edge(&mut self, from: TaskId, to: TaskId) {
        self.edges.push(DepEdge { from, to, cyclic: false });
    }

    /// Append the feedback edge of a cycle group (tail → head).
    pub fn add_cyclic_edge(&mut self, from: TaskId, to: TaskId) {
        self.edges.push(DepEdge { from, to, cyclic: true });
    }

    pub fn add_cycle(&mut self, cycle: CycleGroup) {
        self.cycles.push(cycle);
    }

    #[inline]
    pub fn task(&self, id: TaskId) -> &TaskDef {
        &self.tasks[id.index()]
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Iterate all task ids in declared (editor) order.
    pub fn task_ids(&self) -> impl Iterator<Item = TaskId> + '_ {
        (0..self.tasks.len()).map(|i| TaskId(i as u16))
    }
}
