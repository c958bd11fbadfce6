//! Unit tests for takt-output.

use std::fs;
use std::path::PathBuf;

use takt_core::{Calendar, Minutes, Stamp};
use takt_flow::{validate, Demand, FlowDefinition, TaskDef};
use takt_sim::{SimBuilder, SimulationResult};

use crate::{rows_from_result, CsvWriter, OutputWriter};

// ── Helpers ───────────────────────────────────────────────────────────────────

fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("takt-output-{}-{name}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    dir
}

/// A(30, W1, M1) → B(15, W1), one unit.
fn sample_flow() -> FlowDefinition {
    let mut flow = FlowDefinition::new("sample");
    let a = flow.add_task(TaskDef::new("A", Minutes(30)).with_worker("W1").with_machine("M1"));
    let b = flow.add_task(TaskDef::new("B", Minutes(15)).with_worker("W1"));
    flow.add_edge(a, b);
    flow
}

fn sample_result(flow: &FlowDefinition) -> SimulationResult {
    let calendar = Calendar::new().with_shift(8 * 60, 16 * 60);
    SimBuilder::new(validate(flow).unwrap(), calendar)
        .demand(&Demand::Units(1))
        .start(Stamp::at(0, 8, 0))
        .build()
        .unwrap()
        .run()
        .unwrap()
}

// ── Row conversion ────────────────────────────────────────────────────────────

#[test]
fn rows_carry_stable_ids_and_names() {
    let flow = sample_flow();
    let result = sample_result(&flow);
    let (runs, occupancy) = rows_from_result(&result, &flow);

    assert_eq!(runs.len(), 2);
    assert_eq!(runs[0].task, "A");
    assert_eq!(runs[0].workers, "W1");
    assert_eq!(runs[0].machine, "M1");
    assert_eq!(runs[0].start_min, Stamp::at(0, 8, 0).0);
    assert_eq!(runs[1].task, "B");
    assert_eq!(runs[1].machine, "");

    // One worker span per run plus one machine span.
    assert_eq!(occupancy.len(), 3);
    assert!(occupancy.iter().any(|r| r.kind == "machine" && r.resource == "M1"));
}

// ── CSV backend ───────────────────────────────────────────────────────────────

#[test]
fn csv_writer_produces_both_files() {
    let flow = sample_flow();
    let result = sample_result(&flow);
    let (runs, occupancy) = rows_from_result(&result, &flow);

    let dir = temp_dir("both-files");
    let mut writer = CsvWriter::new(&dir).unwrap();
    writer.write_runs(&runs).unwrap();
    writer.write_occupancy(&occupancy).unwrap();
    writer.finish().unwrap();

    let runs_csv = fs::read_to_string(dir.join("task_runs.csv")).unwrap();
    let mut lines = runs_csv.lines();
    assert_eq!(
        lines.next().unwrap(),
        "task,unit,iteration,start_min,end_min,workers,machine,reason"
    );
    assert_eq!(lines.count(), 2);

    let occ_csv = fs::read_to_string(dir.join("occupancy.csv")).unwrap();
    assert_eq!(occ_csv.lines().count(), 1 + occupancy.len());

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn finish_is_idempotent() {
    let dir = temp_dir("idempotent");
    let mut writer = CsvWriter::new(&dir).unwrap();
    writer.finish().unwrap();
    writer.finish().unwrap();
    fs::remove_dir_all(&dir).ok();
}
