//! Unit tests for takt-flow.

use takt_core::{Minutes, TaskId};

use crate::{
    demand, validate, CycleBound, CycleGroup, Demand, FlowDefinition, IssueKind, Lot,
    StartCondition, TaskDef, TaskKind,
};

// ── Helpers ───────────────────────────────────────────────────────────────────

fn task(id: &str, minutes: u32) -> TaskDef {
    TaskDef::new(id, Minutes(minutes)).with_worker("W1")
}

/// A → B → C, one worker.
fn linear_flow() -> FlowDefinition {
    let mut flow = FlowDefinition::new("linear");
    let a = flow.add_task(task("A", 30));
    let b = flow.add_task(task("B", 45));
    let c = flow.add_task(task("C", 15));
    flow.add_edge(a, b);
    flow.add_edge(b, c);
    flow
}

/// H → B → T with a back-edge T → H, bound 3.
fn cycle_flow() -> FlowDefinition {
    let mut flow = FlowDefinition::new("cycle");
    let h = flow.add_task(task("H", 10).with_kind(TaskKind::CycleHead));
    let b = flow.add_task(task("B", 20));
    let t = flow.add_task(task("T", 10).with_kind(TaskKind::CycleTail));
    flow.add_edge(h, b);
    flow.add_edge(b, t);
    flow.add_cyclic_edge(t, h);
    flow.add_cycle(CycleGroup {
        name: "loop".into(),
        head: h,
        tail: t,
        members: vec![h, b, t],
        bound: CycleBound::Fixed(3),
    });
    flow
}

// ── Validator ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod validator {
    use super::*;

    #[test]
    fn linear_flow_is_valid() {
        let classified = validate(&linear_flow()).unwrap();
        assert_eq!(classified.roots, vec![TaskId(0)]);
        assert_eq!(classified.preds[2], vec![TaskId(1)]);
        assert_eq!(classified.succs[0], vec![TaskId(1)]);
        assert!(classified.cycle_of.iter().all(|c| c.is_none()));
    }

    #[test]
    fn cycle_flow_is_valid_and_annotated() {
        let classified = validate(&cycle_flow()).unwrap();
        assert_eq!(classified.cycle_of, vec![Some(0), Some(0), Some(0)]);
        // Head is the root; body and tail are fed from inside the cycle.
        assert_eq!(classified.roots, vec![TaskId(0)]);
        assert!(!classified.auto_triggered[0]);
        assert!(classified.auto_triggered[1]);
        assert!(classified.auto_triggered[2]);
    }

    #[test]
    fn validation_is_idempotent() {
        let flow = cycle_flow();
        let first = validate(&flow).unwrap();
        let second = validate(&first.flow).unwrap();
        assert_eq!(second.flow, flow);
        assert_eq!(second.roots, first.roots);
        assert_eq!(second.topo_rank, first.topo_rank);
    }

    #[test]
    fn duplicate_id_is_fatal() {
        let mut flow = FlowDefinition::new("dup");
        flow.add_task(task("X", 10));
        flow.add_task(task("X", 20));
        let issues = validate(&flow).unwrap_err();
        assert!(issues.iter().any(|i| i.kind == IssueKind::DuplicateId && i.is_fatal()));
    }

    #[test]
    fn out_of_range_edge_is_fatal() {
        let mut flow = FlowDefinition::new("bad-edge");
        let a = flow.add_task(task("A", 10));
        flow.add_edge(a, TaskId(9));
        let issues = validate(&flow).unwrap_err();
        assert!(issues.iter().any(|i| i.kind == IssueKind::UnknownReference));
    }

    #[test]
    fn all_auto_flow_has_no_roots() {
        let mut flow = FlowDefinition::new("auto-only");
        flow.add_task(task("A", 10).with_start(StartCondition::AutoOnEvent));
        flow.add_task(task("B", 10).with_start(StartCondition::AutoOnEvent));
        let issues = validate(&flow).unwrap_err();
        assert!(issues.iter().any(|i| i.kind == IssueKind::NoRoots && i.is_fatal()));
    }

    #[test]
    fn unreachable_task_is_orphan() {
        let mut flow = linear_flow();
        // D depends on a task that nothing starts: unreachable island D ← E.
        let d = flow.add_task(task("D", 10));
        let e = flow.add_task(task("E", 10).with_start(StartCondition::AutoOnEvent));
        flow.add_edge(e, d);
        let issues = validate(&flow).unwrap_err();
        assert!(issues.iter().any(|i| i.kind == IssueKind::OrphanTask));
    }

    #[test]
    fn ordinary_cycle_is_fatal() {
        let mut flow = FlowDefinition::new("loopy");
        let a = flow.add_task(task("A", 10));
        let b = flow.add_task(task("B", 10));
        flow.add_edge(a, b);
        flow.add_edge(b, a); // not marked cyclic
        let issues = validate(&flow).unwrap_err();
        assert!(issues.iter().any(|i| i.kind == IssueKind::CyclicDependency));
    }

    #[test]
    fn cycle_without_back_edge_is_fatal() {
        let mut flow = cycle_flow();
        flow.edges.retain(|e| !e.cyclic);
        let issues = validate(&flow).unwrap_err();
        assert!(issues.iter().any(|i| i.kind == IssueKind::MalformedCycle && i.is_fatal()));
    }

    #[test]
    fn stray_cyclic_edge_is_fatal() {
        let mut flow = linear_flow();
        flow.add_cyclic_edge(TaskId(2), TaskId(0)); // no owning cycle group
        let issues = validate(&flow).unwrap_err();
        assert!(issues.iter().any(|i| i.kind == IssueKind::MalformedCycle));
    }

    #[test]
    fn cycle_member_off_the_path_is_fatal() {
        let mut flow = cycle_flow();
        // A member that neither follows the head nor reaches the tail.
        let stray = flow.add_task(task("S", 5));
        flow.cycles[0].members.push(stray);
        let issues = validate(&flow).unwrap_err();
        assert!(issues.iter().any(|i| i.kind == IssueKind::MalformedCycle && i.is_fatal()));
    }

    #[test]
    fn feeder_inside_cycle_is_fatal() {
        let mut flow = cycle_flow();
        flow.cycles[0].bound = CycleBound::UntilFeeder(TaskId(1));
        let issues = validate(&flow).unwrap_err();
        assert!(issues.iter().any(|i| i.kind == IssueKind::MalformedCycle));
    }

    #[test]
    fn broken_sequential_group_is_fatal() {
        let mut flow = FlowDefinition::new("groups");
        let a = flow.add_task(task("A", 10).with_group("g", 0));
        flow.add_task(task("B", 10).with_group("g", 1));
        let c = flow.add_task(task("C", 10));
        flow.add_edge(a, c); // chain edge A → B missing
        let issues = validate(&flow).unwrap_err();
        assert!(issues.iter().any(|i| i.kind == IssueKind::MalformedGroup && i.is_fatal()));
    }

    #[test]
    fn intact_sequential_group_passes() {
        let mut flow = FlowDefinition::new("groups-ok");
        let a = flow.add_task(task("A", 10).with_group("g", 0));
        let b = flow.add_task(task("B", 10).with_group("g", 1));
        flow.add_edge(a, b);
        assert!(validate(&flow).is_ok());
    }

    #[test]
    fn topo_rank_follows_declared_order_on_ties() {
        let mut flow = FlowDefinition::new("fanout");
        let r = flow.add_task(task("R", 10));
        let p = flow.add_task(task("P", 60));
        let q = flow.add_task(task("Q", 60));
        flow.add_edge(r, p);
        flow.add_edge(r, q);
        let classified = validate(&flow).unwrap();
        assert!(classified.topo_rank[r.index()] < classified.topo_rank[p.index()]);
        assert!(classified.topo_rank[p.index()] < classified.topo_rank[q.index()]);
    }
}

// ── Demand expander ───────────────────────────────────────────────────────────

#[cfg(test)]
mod demand_expansion {
    use super::*;

    #[test]
    fn flat_units() {
        let slots = demand::expand(&Demand::Units(3));
        assert_eq!(slots.len(), 3);
        assert_eq!(slots[0].unit.0, 0);
        assert_eq!(slots[2].unit.0, 2);
        assert!(slots.iter().all(|s| s.lot.is_none()));
    }

    #[test]
    fn zero_units_expand_to_nothing() {
        assert!(demand::expand(&Demand::Units(0)).is_empty());
    }

    #[test]
    fn lots_ordered_by_priority_then_index() {
        let lots = vec![
            Lot::new("P-100", 2),
            Lot::new("P-200", 1).with_priority(5),
            Lot::new("P-300", 1),
        ];
        let slots = demand::expand(&Demand::Lots(lots));
        // P-200 (priority 5) first, then P-100 and P-300 in declaration order.
        let lot_order: Vec<u16> = slots.iter().map(|s| s.lot.unwrap()).collect();
        assert_eq!(lot_order, vec![1, 0, 0, 2]);
        // Unit indices are sequential over the final order.
        let units: Vec<u32> = slots.iter().map(|s| s.unit.0).collect();
        assert_eq!(units, vec![0, 1, 2, 3]);
    }

    #[test]
    fn lot_release_pin_propagates() {
        use takt_core::Stamp;
        let lots = vec![Lot::new("P-1", 2).with_earliest_start(Stamp::at(1, 8, 0))];
        let slots = demand::expand(&Demand::Lots(lots));
        assert!(slots.iter().all(|s| s.earliest_start == Some(Stamp::at(1, 8, 0))));
    }
}

// ── Serialisation round-trip ──────────────────────────────────────────────────

#[cfg(test)]
mod roundtrip {
    use super::*;

    #[test]
    fn flow_definition_roundtrips_losslessly() {
        let flow = cycle_flow();
        let json = serde_json::to_string(&flow).unwrap();
        let back: FlowDefinition = serde_json::from_str(&json).unwrap();
        assert_eq!(back, flow);
    }

    #[test]
    fn demand_roundtrips_losslessly() {
        let demand = Demand::Lots(vec![Lot::new("P-1", 4).with_priority(2)]);
        let json = serde_json::to_string(&demand).unwrap();
        let back: Demand = serde_json::from_str(&json).unwrap();
        assert_eq!(back, demand);
    }
}
