//! Reassignment controller: rule store and firing state.
//!
//! Rules are collected from the flow at build time.  The controller decides
//! *which* rules fire on a given trigger; the simulator applies the move
//! (splice, assignment sets, ready-checks) because that touches ledger and
//! instance state.

use takt_core::TaskId;
use takt_flow::{ClassifiedFlow, ReassignTrigger, ReassignmentRule};

/// One rule plus its firing state.
#[derive(Clone, Debug)]
pub struct RuleState {
    /// Task the rule is attached to.
    pub source: TaskId,
    pub rule: ReassignmentRule,
    /// Rules fire at most once per run.
    pub fired: bool,
}

/// All reassignment rules of one run.
pub struct ReassignController {
    rules: Vec<RuleState>,
}

impl ReassignController {
    pub fn new(flow: &ClassifiedFlow) -> Self {
        let rules = flow
            .flow
            .task_ids()
            .filter_map(|t| {
                flow.task(t).reassignment.clone().map(|rule| RuleState {
                    source: t,
                    rule,
                    fired: false,
                })
            })
            .collect();
        Self { rules }
    }

    #[inline]
    pub fn rule(&self, id: usize) -> &RuleState {
        &self.rules[id]
    }

    pub fn mark_fired(&mut self, id: usize) {
        self.rules[id].fired = true;
    }

    /// Unfired rules triggered by `source` starting its first instance.
    pub fn on_source_started(&self, source: TaskId) -> Vec<usize> {
        self.matching(|r| r.source == source && r.rule.trigger == ReassignTrigger::OnStart)
    }

    /// Unfired rules triggered by `source` completing all its units.
    pub fn on_source_completed(&self, source: TaskId) -> Vec<usize> {
        self.matching(|r| r.source == source && r.rule.trigger == ReassignTrigger::OnComplete)
    }

    /// Unfired rules triggered by a cycle finishing iteration `k`,
    /// restricted to rules whose source lies in `cycle_members`.
    pub fn on_iteration(&self, cycle_members: &[TaskId], k: u32) -> Vec<usize> {
        self.matching(|r| {
            r.rule.trigger == ReassignTrigger::OnIteration(k) && cycle_members.contains(&r.source)
        })
    }

    fn matching(&self, pred: impl Fn(&RuleState) -> bool) -> Vec<usize> {
        self.rules
            .iter()
            .enumerate()
            .filter(|(_, r)| !r.fired && pred(r))
            .map(|(i, _)| i)
            .collect()
    }
}
