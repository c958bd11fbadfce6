//! Plain data row types written by output backends.

use takt_flow::FlowDefinition;
use takt_sim::SimulationResult;

/// One completed task instance, flattened for export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRunRow {
    /// Stable editor id of the task.
    pub task: String,
    pub unit: u32,
    pub iteration: u32,
    /// Minutes since the scheduling epoch.
    pub start_min: i64,
    pub end_min: i64,
    /// Worker names joined with `+`; empty for machine-only tasks.
    pub workers: String,
    pub machine: String,
    pub reason: String,
}

/// One occupancy interval of a worker or machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OccupancyRow {
    /// `"worker"` or `"machine"`.
    pub kind: &'static str,
    pub resource: String,
    pub task: String,
    pub start_min: i64,
    pub end_min: i64,
}

/// Flatten a simulation result into export rows.
///
/// `flow` supplies the stable task ids the result's arena indices refer to.
pub fn rows_from_result(
    result: &SimulationResult,
    flow: &FlowDefinition,
) -> (Vec<TaskRunRow>, Vec<OccupancyRow>) {
    let task_id = |t: takt_core::TaskId| flow.task(t).id.clone();

    let runs = result
        .runs
        .iter()
        .map(|run| TaskRunRow {
            task: task_id(run.task),
            unit: run.unit.0,
            iteration: run.iteration,
            start_min: run.start.0,
            end_min: run.end.0,
            workers: run
                .workers
                .iter()
                .map(|w| result.worker_names[w.index()].as_str())
                .collect::<Vec<_>>()
                .join("+"),
            machine: run
                .machine
                .map(|m| result.machine_names[m.index()].clone())
                .unwrap_or_default(),
            reason: format!("{:?}", run.reason),
        })
        .collect();

    let mut occupancy = Vec::new();
    for (i, spans) in result.worker_occupancy.iter().enumerate() {
        for span in spans {
            occupancy.push(OccupancyRow {
                kind: "worker",
                resource: result.worker_names[i].clone(),
                task: task_id(span.task),
                start_min: span.start.0,
                end_min: span.end.0,
            });
        }
    }
    for (i, spans) in result.machine_occupancy.iter().enumerate() {
        for span in spans {
            occupancy.push(OccupancyRow {
                kind: "machine",
                resource: result.machine_names[i].clone(),
                task: task_id(span.task),
                start_min: span.start.0,
                end_min: span.end.0,
            });
        }
    }
    (runs, occupancy)
}
