//! Unit tests for takt-opt.

use takt_core::{Calendar, Minutes, Stamp};
use takt_flow::{validate, ClassifiedFlow, Demand, FlowDefinition, TaskDef};

use crate::{
    NoopObserver, OptError, OptObserver, Optimiser, OptimiserOutcome, OptimiserRequest, Progress,
    RoleRange,
};

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Mon–Fri 08:00–16:00.
fn standard_calendar() -> Calendar {
    Calendar::new().with_shift(8 * 60, 16 * 60)
}

fn monday_morning() -> Stamp {
    Stamp::at(0, 8, 0)
}

/// Three independent 60-minute tasks sharing one pooled role.
fn three_parallel_tasks(role: &str) -> ClassifiedFlow {
    let mut flow = FlowDefinition::new("parallel3");
    for id in ["T1", "T2", "T3"] {
        flow.add_task(TaskDef::new(id, Minutes(60)).with_worker(role));
    }
    validate(&flow).unwrap()
}

fn request(deadline_minutes: u32, min: u32, max: u32) -> OptimiserRequest {
    OptimiserRequest {
        deadline: monday_morning() + Minutes(deadline_minutes),
        space: vec![RoleRange { role: "crew".into(), min, max }],
        initial: None,
    }
}

fn optimiser(flow: ClassifiedFlow) -> Optimiser {
    Optimiser::new(flow, standard_calendar(), Demand::Units(1)).start(monday_morning())
}

// ── Search behaviour ──────────────────────────────────────────────────────────

#[test]
fn finds_the_minimum_crew_for_a_tight_deadline() {
    // Deadline 90 min: 2 workers give 120 min (fails), 3 give 60 (passes).
    // The ceiling [3] and the probe [2] are the only simulations; [1] is
    // pruned by monotonicity.
    let opt = optimiser(three_parallel_tasks("crew"));
    let outcome = opt.run(&request(90, 1, 3), &mut NoopObserver).unwrap();
    assert_eq!(
        outcome,
        OptimiserOutcome::Solved { workers: vec![3], makespan: 60, evaluated: 2 }
    );
}

#[test]
fn relaxed_deadline_descends_to_one_worker() {
    // 180 working minutes fit a single worker.
    let opt = optimiser(three_parallel_tasks("crew"));
    let outcome = opt.run(&request(180, 1, 3), &mut NoopObserver).unwrap();
    match outcome {
        OptimiserOutcome::Solved { workers, makespan, .. } => {
            assert_eq!(workers, vec![1]);
            assert_eq!(makespan, 180);
        }
        other => panic!("expected solved, got {other:?}"),
    }
}

#[test]
fn impossible_deadline_is_infeasible() {
    let opt = optimiser(three_parallel_tasks("crew"));
    let outcome = opt.run(&request(30, 1, 3), &mut NoopObserver).unwrap();
    assert!(matches!(outcome, OptimiserOutcome::Infeasible { evaluated: 1 }));
}

#[test]
fn makespan_is_monotone_in_worker_count() {
    let flow = three_parallel_tasks("crew");
    let mut previous = i64::MAX;
    for count in 1..=3 {
        let result = takt_sim::SimBuilder::new(flow.clone(), standard_calendar())
            .demand(&Demand::Units(1))
            .start(monday_morning())
            .role_count("crew", count)
            .build()
            .unwrap()
            .run()
            .unwrap();
        assert!(result.makespan <= previous, "makespan grew at {count} workers");
        previous = result.makespan;
    }
}

#[test]
fn coordinate_descent_trims_both_roles() {
    // Two independent pairs of 60-minute tasks, one pooled role each.  With
    // a 120-minute deadline one worker per role suffices.
    let mut flow = FlowDefinition::new("two-roles");
    for id in ["C1", "C2"] {
        flow.add_task(TaskDef::new(id, Minutes(60)).with_worker("cut"));
    }
    for id in ["F1", "F2"] {
        flow.add_task(TaskDef::new(id, Minutes(60)).with_worker("fit"));
    }
    let opt = optimiser(validate(&flow).unwrap());
    let req = OptimiserRequest {
        deadline: monday_morning() + Minutes(120),
        space: vec![
            RoleRange { role: "cut".into(), min: 1, max: 2 },
            RoleRange { role: "fit".into(), min: 1, max: 2 },
        ],
        initial: None,
    };
    let outcome = opt.run(&req, &mut NoopObserver).unwrap();
    match outcome {
        OptimiserOutcome::Solved { workers, makespan, .. } => {
            assert_eq!(workers, vec![1, 1]);
            assert_eq!(makespan, 120);
        }
        other => panic!("expected solved, got {other:?}"),
    }
}

#[test]
fn feasible_initial_guess_seeds_the_descent() {
    let opt = optimiser(three_parallel_tasks("crew"));
    let req = OptimiserRequest {
        initial: Some(vec![2]),
        ..request(150, 1, 3)
    };
    // [2] gives 120 min ≤ 150: the descent starts there instead of at [3].
    let outcome = opt.run(&req, &mut NoopObserver).unwrap();
    match outcome {
        OptimiserOutcome::Solved { workers, makespan, .. } => {
            assert_eq!(workers, vec![2]);
            assert_eq!(makespan, 120);
        }
        other => panic!("expected solved, got {other:?}"),
    }
}

// ── Abort and progress ────────────────────────────────────────────────────────

struct AbortAfter {
    limit: u32,
    seen: u32,
    log: Vec<Progress>,
}

impl OptObserver for AbortAfter {
    fn on_candidate(&mut self, progress: &Progress) {
        self.seen += 1;
        self.log.push(progress.clone());
    }

    fn should_abort(&self) -> bool {
        self.seen >= self.limit
    }
}

#[test]
fn abort_returns_best_feasible_so_far() {
    let opt = optimiser(three_parallel_tasks("crew"));
    let mut observer = AbortAfter { limit: 1, seen: 0, log: Vec::new() };
    let outcome = opt.run(&request(90, 1, 3), &mut observer).unwrap();
    match outcome {
        OptimiserOutcome::Cancelled { workers, makespan, evaluated } => {
            // The ceiling [3] was evaluated before the abort took effect.
            assert_eq!(workers, Some(vec![3]));
            assert_eq!(makespan, Some(60));
            assert_eq!(evaluated, 1);
        }
        other => panic!("expected cancelled, got {other:?}"),
    }
}

#[test]
fn observer_sees_every_candidate() {
    let opt = optimiser(three_parallel_tasks("crew"));
    let mut observer = AbortAfter { limit: u32::MAX, seen: 0, log: Vec::new() };
    let outcome = opt.run(&request(90, 1, 3), &mut observer).unwrap();
    assert!(matches!(outcome, OptimiserOutcome::Solved { .. }));
    assert_eq!(observer.log.len(), 2);
    assert_eq!(observer.log[0].candidate, vec![3]);
    assert_eq!(observer.log[1].candidate, vec![2]);
    assert!(observer.log[0].feasible);
    assert!(!observer.log[1].feasible);
}

// ── Request validation ────────────────────────────────────────────────────────

#[test]
fn empty_space_is_rejected() {
    let opt = optimiser(three_parallel_tasks("crew"));
    let req = OptimiserRequest {
        deadline: monday_morning() + Minutes(60),
        space: vec![],
        initial: None,
    };
    assert!(matches!(opt.run(&req, &mut NoopObserver), Err(OptError::Request(_))));
}

#[test]
fn inverted_bounds_are_rejected() {
    let opt = optimiser(three_parallel_tasks("crew"));
    let outcome = opt.run(&request(60, 3, 1), &mut NoopObserver);
    assert!(matches!(outcome, Err(OptError::Request(_))));
}

#[test]
fn out_of_space_initial_guess_is_rejected() {
    let opt = optimiser(three_parallel_tasks("crew"));
    let req = OptimiserRequest {
        initial: Some(vec![7]),
        ..request(90, 1, 3)
    };
    assert!(matches!(opt.run(&req, &mut NoopObserver), Err(OptError::Request(_))));
}

#[test]
fn request_roundtrips_losslessly() {
    let req = request(90, 1, 3);
    let json = serde_json::to_string(&req).unwrap();
    let back: OptimiserRequest = serde_json::from_str(&json).unwrap();
    assert_eq!(back, req);
}
