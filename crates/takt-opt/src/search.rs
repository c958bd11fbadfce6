//! Worker-count search against a deadline.
//!
//! # Strategy
//!
//! Adding workers to a pool never lengthens the makespan (identical rules,
//! more capacity), so feasibility is monotone in every coordinate and a
//! frontier exists.  The search exploits this:
//!
//! 1. Evaluate the all-max vector.  Infeasible there means infeasible
//!    everywhere.
//! 2. Per role, binary-search the smallest feasible count with the other
//!    coordinates fixed (coordinate descent); repeat passes until a full
//!    pass changes nothing.  With a single tunable role this is one plain
//!    binary search.
//!
//! Every simulated vector is cached, so repeated passes re-read verdicts
//! instead of re-simulating.  The abort flag is polled between candidates.

use std::collections::HashMap;

use takt_core::{Calendar, Stamp};
use takt_flow::{ClassifiedFlow, Demand};
use takt_sim::SimBuilder;
use tracing::debug;

use crate::error::{OptError, OptResult};
use crate::observer::{OptObserver, Progress};

// ── Request and outcome ──────────────────────────────────────────────────────

/// Inclusive worker-count bounds for one pooled role.
#[derive(Clone, PartialEq, Eq, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct RoleRange {
    pub role: String,
    pub min: u32,
    pub max: u32,
}

/// What to optimise: meet `deadline` with the cheapest worker-count vector
/// inside `space`.
#[derive(Clone, PartialEq, Eq, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct OptimiserRequest {
    /// Latest acceptable completion instant.
    pub deadline: Stamp,
    pub space: Vec<RoleRange>,
    /// Optional starting vector for the descent (must lie inside the
    /// space).
    #[serde(default)]
    pub initial: Option<Vec<u32>>,
}

/// Result of a finished search.
#[derive(Clone, PartialEq, Eq, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub enum OptimiserOutcome {
    /// The cheapest feasible vector found.
    Solved {
        workers: Vec<u32>,
        /// Makespan of the winning vector, in minutes.
        makespan: i64,
        /// Candidates simulated.
        evaluated: u32,
    },
    /// No vector in the space meets the deadline.
    Infeasible { evaluated: u32 },
    /// The observer aborted the search.
    Cancelled {
        /// Best feasible vector seen before the abort, if any.
        workers: Option<Vec<u32>>,
        makespan: Option<i64>,
        evaluated: u32,
    },
}

// ── Optimiser ────────────────────────────────────────────────────────────────

/// Searches worker-count configurations by running fresh simulations.
///
/// Candidate evaluations are independent (each builds its own
/// [`Simulator`][takt_sim::Simulator]), so callers may parallelise them
/// without changing the result; this implementation evaluates sequentially.
pub struct Optimiser {
    flow: ClassifiedFlow,
    calendar: Calendar,
    demand: Demand,
    start: Stamp,
}

/// Cached verdict of one candidate.
#[derive(Copy, Clone)]
struct Verdict {
    feasible: bool,
    makespan: i64,
}

/// Search interrupted by the observer.
struct Aborted;

impl Optimiser {
    pub fn new(flow: ClassifiedFlow, calendar: Calendar, demand: Demand) -> Self {
        Self { flow, calendar, demand, start: Stamp::EPOCH }
    }

    /// Simulation start instant for every candidate.
    pub fn start(mut self, at: Stamp) -> Self {
        self.start = at;
        self
    }

    /// Run the search.  See the module docs for the strategy.
    pub fn run(
        &self,
        request: &OptimiserRequest,
        observer: &mut dyn OptObserver,
    ) -> OptResult<OptimiserOutcome> {
        if request.space.is_empty() {
            return Err(OptError::Request("search space is empty".into()));
        }
        for range in &request.space {
            if range.min < 1 || range.min > range.max {
                return Err(OptError::Request(format!(
                    "role '{}' has bounds {}..={}",
                    range.role, range.min, range.max
                )));
            }
        }
        if let Some(init) = &request.initial {
            if init.len() != request.space.len() {
                return Err(OptError::Request(format!(
                    "initial guess has {} entries for {} roles",
                    init.len(),
                    request.space.len()
                )));
            }
            let inside = init
                .iter()
                .zip(&request.space)
                .all(|(&v, r)| v >= r.min && v <= r.max);
            if !inside {
                return Err(OptError::Request("initial guess escapes the space".into()));
            }
        }

        let mut search = Search {
            optimiser: self,
            request,
            observer,
            cache: HashMap::new(),
            evaluated: 0,
            total_estimate: estimate_evaluations(&request.space),
            best: None,
        };
        search.run()
    }
}

// ── Search state ─────────────────────────────────────────────────────────────

struct Search<'a> {
    optimiser: &'a Optimiser,
    request: &'a OptimiserRequest,
    observer: &'a mut dyn OptObserver,
    cache: HashMap<Vec<u32>, Verdict>,
    evaluated: u32,
    total_estimate: u32,
    /// Cheapest feasible vector seen so far.
    best: Option<(Vec<u32>, i64)>,
}

impl Search<'_> {
    fn run(&mut self) -> OptResult<OptimiserOutcome> {
        let space = &self.request.space;

        // ── Feasibility ceiling ───────────────────────────────────────────
        let all_max: Vec<u32> = space.iter().map(|r| r.max).collect();
        let ceiling = match self.eval(&all_max)? {
            Err(Aborted) => return Ok(self.cancelled()),
            Ok(v) => v,
        };
        if !ceiling.feasible {
            debug!(candidate = ?all_max, "all-max vector misses the deadline");
            return Ok(OptimiserOutcome::Infeasible { evaluated: self.evaluated });
        }

        // ── Starting point for the descent ────────────────────────────────
        let mut current = all_max.clone();
        if let Some(init) = &self.request.initial {
            match self.eval(init)? {
                Err(Aborted) => return Ok(self.cancelled()),
                Ok(v) if v.feasible => current = init.clone(),
                Ok(_) => {}
            }
        }

        // ── Coordinate descent ────────────────────────────────────────────
        // Invariant: `current` is feasible at the top of every pass.
        loop {
            let mut changed = false;
            for role in 0..space.len() {
                let mut lo = space[role].min;
                let mut hi = current[role];
                while lo < hi {
                    let mid = lo + (hi - lo) / 2;
                    let mut candidate = current.clone();
                    candidate[role] = mid;
                    match self.eval(&candidate)? {
                        Err(Aborted) => return Ok(self.cancelled()),
                        Ok(v) if v.feasible => hi = mid,
                        Ok(_) => lo = mid + 1,
                    }
                }
                if lo != current[role] {
                    current[role] = lo;
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }

        let makespan = self.cache[&current].makespan;
        debug!(workers = ?current, makespan, evaluated = self.evaluated, "search converged");
        Ok(OptimiserOutcome::Solved {
            workers: current,
            makespan,
            evaluated: self.evaluated,
        })
    }

    /// Simulate `candidate` (or read the cached verdict).
    fn eval(&mut self, candidate: &[u32]) -> OptResult<Result<Verdict, Aborted>> {
        if let Some(&verdict) = self.cache.get(candidate) {
            return Ok(Ok(verdict));
        }
        if self.observer.should_abort() {
            return Ok(Err(Aborted));
        }

        let mut builder = SimBuilder::new(
            self.optimiser.flow.clone(),
            self.optimiser.calendar.clone(),
        )
        .demand(&self.optimiser.demand)
        .start(self.optimiser.start);
        for (range, &count) in self.request.space.iter().zip(candidate) {
            builder = builder.role_count(range.role.clone(), count);
        }
        let result = builder.build()?.run()?;

        let feasible = result.finished.map_or(true, |f| f <= self.request.deadline);
        let verdict = Verdict { feasible, makespan: result.makespan };
        self.evaluated += 1;
        debug!(candidate = ?candidate, feasible, makespan = verdict.makespan, "candidate evaluated");

        if feasible {
            let cost: u32 = candidate.iter().sum();
            let better = self
                .best
                .as_ref()
                .map_or(true, |(best, _)| cost < best.iter().sum::<u32>());
            if better {
                self.best = Some((candidate.to_vec(), verdict.makespan));
            }
        }

        self.cache.insert(candidate.to_vec(), verdict);
        self.observer.on_candidate(&Progress {
            evaluated: self.evaluated,
            total_estimate: self.total_estimate,
            candidate: candidate.to_vec(),
            feasible,
        });
        Ok(Ok(verdict))
    }

    fn cancelled(&self) -> OptimiserOutcome {
        OptimiserOutcome::Cancelled {
            workers: self.best.as_ref().map(|(w, _)| w.clone()),
            makespan: self.best.as_ref().map(|(_, m)| *m),
            evaluated: self.evaluated,
        }
    }
}

/// Upper-bound guess: one ceiling evaluation plus a binary-search depth per
/// role per descent pass.
fn estimate_evaluations(space: &[RoleRange]) -> u32 {
    1 + space
        .iter()
        .map(|r| 32 - (r.max - r.min + 1).leading_zeros())
        .sum::<u32>()
}
