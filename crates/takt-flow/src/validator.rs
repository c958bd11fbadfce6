//! Structural validation and classification of a [`FlowDefinition`].
//!
//! One call per flow before a run.  Returns either a [`ClassifiedFlow`]
//! (the frozen, annotated form the simulator consumes) or the full list of
//! detected [`FlowIssue`]s.  Fatal issues stop the simulator from starting;
//! warnings do not.
//!
//! Cycle detection is a three-colour DFS over the edge set with cyclic
//! (feedback) edges filtered out — those are the declared back-edges, and
//! the remainder must form a DAG.

use std::collections::{HashMap, HashSet};

use takt_core::TaskId;

use crate::model::{CycleBound, FlowDefinition, StartCondition, TaskDef, TaskKind};

// ── Issues ───────────────────────────────────────────────────────────────────

/// How serious a validation finding is.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub enum IssueSeverity {
    /// Structural defect; the flow must not be simulated.
    Fatal,
    /// Classification oddity; simulation may proceed.
    Warning,
}

/// Categories of validation findings.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub enum IssueKind {
    DuplicateId,
    UnknownReference,
    /// A non-auto task unreachable from any root.
    OrphanTask,
    /// No task qualifies as a starting point.
    NoRoots,
    MalformedCycle,
    MalformedGroup,
    /// The ordinary (non-cyclic) edges contain a cycle.
    CyclicDependency,
}

/// A single validation finding.
#[derive(Clone, PartialEq, Eq, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct FlowIssue {
    pub severity: IssueSeverity,
    pub kind: IssueKind,
    pub message: String,
}

impl FlowIssue {
    fn fatal(kind: IssueKind, message: impl Into<String>) -> Self {
        Self { severity: IssueSeverity::Fatal, kind, message: message.into() }
    }

    fn warning(kind: IssueKind, message: impl Into<String>) -> Self {
        Self { severity: IssueSeverity::Warning, kind, message: message.into() }
    }

    pub fn is_fatal(&self) -> bool {
        self.severity == IssueSeverity::Fatal
    }
}

// ── ClassifiedFlow ───────────────────────────────────────────────────────────

/// A validated flow plus the derived structure the simulator needs.
///
/// All vectors are indexed by `TaskId::index()`.
#[derive(Clone, Debug)]
pub struct ClassifiedFlow {
    pub flow: FlowDefinition,
    /// Non-cyclic predecessors per task.
    pub preds: Vec<Vec<TaskId>>,
    /// Non-cyclic successors per task.
    pub succs: Vec<Vec<TaskId>>,
    /// Owning cycle-group index per task, if any.
    pub cycle_of: Vec<Option<usize>>,
    /// Tasks started by events rather than predecessor completion.
    pub auto_triggered: Vec<bool>,
    /// Starting tasks, in declared order.
    pub roots: Vec<TaskId>,
    /// Deterministic topological rank over the back-edge-free DAG; used as
    /// the final simulator tie-break.
    pub topo_rank: Vec<u32>,
}

impl ClassifiedFlow {
    #[inline]
    pub fn task(&self, id: TaskId) -> &TaskDef {
        self.flow.task(id)
    }

    pub fn task_count(&self) -> usize {
        self.flow.task_count()
    }
}

// ── Validation ───────────────────────────────────────────────────────────────

/// Validate `flow` and derive its classification.
///
/// Idempotent: a valid flow always yields the same [`ClassifiedFlow`].
pub fn validate(flow: &FlowDefinition) -> Result<ClassifiedFlow, Vec<FlowIssue>> {
    let mut issues = Vec::new();
    let n = flow.task_count();

    // ── Stable-id uniqueness ──────────────────────────────────────────────
    let mut seen = HashSet::new();
    for task in &flow.tasks {
        if !seen.insert(task.id.as_str()) {
            issues.push(FlowIssue::fatal(
                IssueKind::DuplicateId,
                format!("duplicate task id '{}'", task.id),
            ));
        }
    }

    // ── Reference ranges ──────────────────────────────────────────────────
    let in_range = |id: TaskId| id.index() < n;
    for edge in &flow.edges {
        if !in_range(edge.from) || !in_range(edge.to) {
            issues.push(FlowIssue::fatal(
                IssueKind::UnknownReference,
                format!("edge {} -> {} references a task outside the arena", edge.from, edge.to),
            ));
        }
    }
    for (ci, cycle) in flow.cycles.iter().enumerate() {
        for id in cycle.members.iter().chain([&cycle.head, &cycle.tail]) {
            if !in_range(*id) {
                issues.push(FlowIssue::fatal(
                    IssueKind::UnknownReference,
                    format!("cycle '{}' (#{ci}) references task {id} outside the arena", cycle.name),
                ));
            }
        }
        if let CycleBound::UntilFeeder(feeder) = cycle.bound {
            if !in_range(feeder) {
                issues.push(FlowIssue::fatal(
                    IssueKind::UnknownReference,
                    format!("cycle '{}' names feeder {feeder} outside the arena", cycle.name),
                ));
            }
        }
    }
    for (i, task) in flow.tasks.iter().enumerate() {
        if let Some(rule) = &task.reassignment {
            if !in_range(rule.target) {
                issues.push(FlowIssue::fatal(
                    IssueKind::UnknownReference,
                    format!("task '{}' (#{i}) reassignment targets {} outside the arena", task.id, rule.target),
                ));
            }
            if !task.workers.iter().any(|w| w == &rule.worker) {
                issues.push(FlowIssue::warning(
                    IssueKind::UnknownReference,
                    format!("task '{}' reassignment names worker '{}' not assigned to it", task.id, rule.worker),
                ));
            }
        }
    }
    // Out-of-range indices poison every later pass; stop here.
    if issues.iter().any(|i| i.is_fatal()) {
        return Err(issues);
    }

    // ── Adjacency over ordinary edges ─────────────────────────────────────
    let mut preds: Vec<Vec<TaskId>> = vec![Vec::new(); n];
    let mut succs: Vec<Vec<TaskId>> = vec![Vec::new(); n];
    for edge in &flow.edges {
        if !edge.cyclic {
            succs[edge.from.index()].push(edge.to);
            preds[edge.to.index()].push(edge.from);
        }
    }

    // ── Cycle-group structure ─────────────────────────────────────────────
    let mut cycle_of: Vec<Option<usize>> = vec![None; n];
    for (ci, cycle) in flow.cycles.iter().enumerate() {
        for &m in &cycle.members {
            if let Some(other) = cycle_of[m.index()] {
                issues.push(FlowIssue::fatal(
                    IssueKind::MalformedCycle,
                    format!("task {m} belongs to cycle groups #{other} and #{ci}"),
                ));
            }
            cycle_of[m.index()] = Some(ci);
        }
        check_cycle_group(flow, ci, &succs, &mut issues);
    }
    // Every declared back-edge must be the tail→head edge of some group.
    for edge in flow.edges.iter().filter(|e| e.cyclic) {
        let owned = flow
            .cycles
            .iter()
            .any(|c| c.tail == edge.from && c.head == edge.to);
        if !owned {
            issues.push(FlowIssue::fatal(
                IssueKind::MalformedCycle,
                format!("cyclic edge {} -> {} belongs to no cycle group", edge.from, edge.to),
            ));
        }
    }

    // ── DAG check (back-edges removed) ────────────────────────────────────
    if let Some(task) = find_ordinary_cycle(n, &succs) {
        issues.push(FlowIssue::fatal(
            IssueKind::CyclicDependency,
            format!("ordinary dependencies form a cycle through task {task}"),
        ));
    }

    // ── Auto-trigger classification ───────────────────────────────────────
    let auto_triggered: Vec<bool> = flow
        .task_ids()
        .map(|t| {
            let task = flow.task(t);
            if task.start == StartCondition::AutoOnEvent || task.kind == TaskKind::AutoTriggered {
                return true;
            }
            // Fed entirely from inside its own cycle group: released by the
            // iteration machinery, not by a plain ready-check.
            match cycle_of[t.index()] {
                Some(ci) => {
                    !preds[t.index()].is_empty()
                        && preds[t.index()].iter().all(|p| cycle_of[p.index()] == Some(ci))
                }
                None => false,
            }
        })
        .collect();

    // ── Roots and orphans ─────────────────────────────────────────────────
    let roots: Vec<TaskId> = flow
        .task_ids()
        .filter(|t| preds[t.index()].is_empty() && !auto_triggered[t.index()])
        .collect();
    if roots.is_empty() && n > 0 {
        issues.push(FlowIssue::fatal(
            IssueKind::NoRoots,
            "flow has no root task: every task is auto-triggered or has predecessors",
        ));
    }
    let reachable = reachable_from(&roots, &succs, n);
    for t in flow.task_ids() {
        if !reachable[t.index()] && !auto_triggered[t.index()] && cycle_of[t.index()].is_none() {
            issues.push(FlowIssue::fatal(
                IssueKind::OrphanTask,
                format!("task '{}' ({t}) is unreachable from every root", flow.task(t).id),
            ));
        }
    }

    // ── Sequential-group linearity ────────────────────────────────────────
    check_sequential_groups(flow, &succs, &mut issues);

    if issues.iter().any(|i| i.is_fatal()) {
        return Err(issues);
    }

    // ── Deterministic topological rank ────────────────────────────────────
    let topo_rank = topo_ranks(n, &preds, &succs);

    Ok(ClassifiedFlow {
        flow: flow.clone(),
        preds,
        succs,
        cycle_of,
        auto_triggered,
        roots,
        topo_rank,
    })
}

// ── Cycle-group checks ───────────────────────────────────────────────────────

fn check_cycle_group(
    flow: &FlowDefinition,
    ci: usize,
    succs: &[Vec<TaskId>],
    issues: &mut Vec<FlowIssue>,
) {
    let cycle = &flow.cycles[ci];
    let members: HashSet<TaskId> = cycle.members.iter().copied().collect();

    if !members.contains(&cycle.head) || !members.contains(&cycle.tail) {
        issues.push(FlowIssue::fatal(
            IssueKind::MalformedCycle,
            format!("cycle '{}' head or tail is not a member", cycle.name),
        ));
        return;
    }
    if cycle.head == cycle.tail && cycle.members.len() > 1 {
        issues.push(FlowIssue::fatal(
            IssueKind::MalformedCycle,
            format!("cycle '{}' merges head and tail but has intermediate members", cycle.name),
        ));
    }
    if let CycleBound::Fixed(n) = cycle.bound {
        if n < 1 {
            issues.push(FlowIssue::fatal(
                IssueKind::MalformedCycle,
                format!("cycle '{}' has a fixed bound of 0", cycle.name),
            ));
        }
    }
    if let CycleBound::UntilFeeder(feeder) = cycle.bound {
        if members.contains(&feeder) {
            issues.push(FlowIssue::fatal(
                IssueKind::MalformedCycle,
                format!("cycle '{}' feeder {feeder} must lie outside the cycle", cycle.name),
            ));
        }
    }

    // The feedback edge tail → head must be declared and marked cyclic.
    let has_back_edge = flow
        .edges
        .iter()
        .any(|e| e.cyclic && e.from == cycle.tail && e.to == cycle.head);
    if !has_back_edge {
        issues.push(FlowIssue::fatal(
            IssueKind::MalformedCycle,
            format!("cycle '{}' lacks a cyclic edge {} -> {}", cycle.name, cycle.tail, cycle.head),
        ));
    }

    // Kind annotations are advisory; flag mismatches without blocking.
    if flow.task(cycle.head).kind != TaskKind::CycleHead {
        issues.push(FlowIssue::warning(
            IssueKind::MalformedCycle,
            format!("cycle '{}' head {} is not declared kind CycleHead", cycle.name, cycle.head),
        ));
    }
    if flow.task(cycle.tail).kind != TaskKind::CycleTail && cycle.head != cycle.tail {
        issues.push(FlowIssue::warning(
            IssueKind::MalformedCycle,
            format!("cycle '{}' tail {} is not declared kind CycleTail", cycle.name, cycle.tail),
        ));
    }

    // Inside the group, every member must sit on a head → … → tail path of
    // ordinary edges: reachable from the head, and reaching the tail.
    let member_succs = |t: TaskId| {
        succs[t.index()]
            .iter()
            .copied()
            .filter(|s| members.contains(s))
            .collect::<Vec<_>>()
    };
    let from_head = flood(cycle.head, &member_succs);
    for &m in &cycle.members {
        if !from_head.contains(&m) {
            issues.push(FlowIssue::fatal(
                IssueKind::MalformedCycle,
                format!("cycle '{}' member {m} is unreachable from the head", cycle.name),
            ));
        }
    }
    let reaches_tail = {
        // Flood backwards from the tail over member-internal edges.
        let member_preds = |t: TaskId| {
            cycle
                .members
                .iter()
                .copied()
                .filter(|&m| member_succs(m).contains(&t))
                .collect::<Vec<_>>()
        };
        flood(cycle.tail, &member_preds)
    };
    for &m in &cycle.members {
        if !reaches_tail.contains(&m) {
            issues.push(FlowIssue::fatal(
                IssueKind::MalformedCycle,
                format!("cycle '{}' member {m} never reaches the tail", cycle.name),
            ));
        }
    }
}

/// Generic flood fill from `start` over a neighbour function.
fn flood(start: TaskId, neighbours: &dyn Fn(TaskId) -> Vec<TaskId>) -> HashSet<TaskId> {
    let mut seen = HashSet::from([start]);
    let mut stack = vec![start];
    while let Some(t) = stack.pop() {
        for nb in neighbours(t) {
            if seen.insert(nb) {
                stack.push(nb);
            }
        }
    }
    seen
}

// ── DAG and reachability ─────────────────────────────────────────────────────

/// Three-colour DFS cycle detection over the ordinary edges.  Returns a task
/// on a cycle, if one exists.
fn find_ordinary_cycle(n: usize, succs: &[Vec<TaskId>]) -> Option<TaskId> {
    #[derive(Copy, Clone, PartialEq)]
    enum Colour {
        White,
        Grey,
        Black,
    }
    let mut colour = vec![Colour::White; n];

    fn visit(t: TaskId, succs: &[Vec<TaskId>], colour: &mut [Colour]) -> Option<TaskId> {
        colour[t.index()] = Colour::Grey;
        for &next in &succs[t.index()] {
            match colour[next.index()] {
                Colour::Grey => return Some(next),
                Colour::White => {
                    if let Some(hit) = visit(next, succs, colour) {
                        return Some(hit);
                    }
                }
                Colour::Black => {}
            }
        }
        colour[t.index()] = Colour::Black;
        None
    }

    for i in 0..n {
        if colour[i] == Colour::White {
            if let Some(hit) = visit(TaskId(i as u16), succs, &mut colour) {
                return Some(hit);
            }
        }
    }
    None
}

fn reachable_from(roots: &[TaskId], succs: &[Vec<TaskId>], n: usize) -> Vec<bool> {
    let mut reachable = vec![false; n];
    let mut stack: Vec<TaskId> = roots.to_vec();
    for &r in roots {
        reachable[r.index()] = true;
    }
    while let Some(t) = stack.pop() {
        for &next in &succs[t.index()] {
            if !reachable[next.index()] {
                reachable[next.index()] = true;
                stack.push(next);
            }
        }
    }
    reachable
}

// ── Sequential groups ────────────────────────────────────────────────────────

fn check_sequential_groups(flow: &FlowDefinition, succs: &[Vec<TaskId>], issues: &mut Vec<FlowIssue>) {
    let mut groups: HashMap<&str, Vec<(u32, TaskId)>> = HashMap::new();
    for t in flow.task_ids() {
        if let Some(g) = &flow.task(t).group {
            groups.entry(g.key.as_str()).or_default().push((g.position, t));
        }
    }

    for (key, mut members) in groups {
        members.sort_unstable();
        for pair in members.windows(2) {
            let ((pos_a, a), (pos_b, b)) = (pair[0], pair[1]);
            if pos_a == pos_b {
                issues.push(FlowIssue::fatal(
                    IssueKind::MalformedGroup,
                    format!("group '{key}' has two tasks at position {pos_a}"),
                ));
                continue;
            }
            // Consecutive members must be chained by an ordinary edge so the
            // shared worker moves through them in order.
            if !succs[a.index()].contains(&b) {
                issues.push(FlowIssue::fatal(
                    IssueKind::MalformedGroup,
                    format!("group '{key}' is not a chain: no edge {a} -> {b}"),
                ));
            }
        }
        // A single entry: only the first member may receive edges from
        // outside the group.
        let member_set: HashSet<TaskId> = members.iter().map(|&(_, t)| t).collect();
        for &(_, t) in members.iter().skip(1) {
            let external_in = flow
                .edges
                .iter()
                .filter(|e| !e.cyclic && e.to == t)
                .any(|e| !member_set.contains(&e.from));
            if external_in {
                issues.push(FlowIssue::warning(
                    IssueKind::MalformedGroup,
                    format!("group '{key}' member {t} has an entry edge bypassing the chain head"),
                ));
            }
        }
    }
}

// ── Topological ranks ────────────────────────────────────────────────────────

/// Kahn's algorithm with smallest-declared-index selection, so the rank is a
/// pure function of the flow.
fn topo_ranks(n: usize, preds: &[Vec<TaskId>], succs: &[Vec<TaskId>]) -> Vec<u32> {
    let mut indegree: Vec<usize> = preds.iter().map(|p| p.len()).collect();
    let mut ready: std::collections::BTreeSet<TaskId> = (0..n)
        .map(|i| TaskId(i as u16))
        .filter(|t| indegree[t.index()] == 0)
        .collect();

    let mut rank = vec![0u32; n];
    let mut next_rank = 0u32;
    while let Some(&t) = ready.iter().next() {
        ready.remove(&t);
        rank[t.index()] = next_rank;
        next_rank += 1;
        for &s in &succs[t.index()] {
            indegree[s.index()] -= 1;
            if indegree[s.index()] == 0 {
                ready.insert(s);
            }
        }
    }
    rank
}
