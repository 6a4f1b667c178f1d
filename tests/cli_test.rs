//! CLI integration tests

use assert_cmd::Command;
use std::fs;
use tempfile::TempDir;

fn write_graph(dir: &TempDir, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn export_round_trips_a_graph() {
    let dir = TempDir::new().unwrap();
    let path = write_graph(&dir, "orders.dcr", ":\"A\"%\"B\"\n\"A\" -->+ \"B\"\n");

    let first = Command::cargo_bin("dcrcheck")
        .unwrap()
        .arg("export")
        .arg(&path)
        .assert()
        .success();
    let exported = String::from_utf8(first.get_output().stdout.clone()).unwrap();

    let reexport_path = write_graph(&dir, "reexport.dcr", &exported);
    let second = Command::cargo_bin("dcrcheck")
        .unwrap()
        .arg("export")
        .arg(&reexport_path)
        .assert()
        .success();
    let reexported = String::from_utf8(second.get_output().stdout.clone()).unwrap();

    assert_eq!(exported, reexported);
}

#[test]
fn analyze_emits_json_with_cycles_and_freedom() {
    let dir = TempDir::new().unwrap();
    let path = write_graph(&dir, "loop.dcr", "\"X\" -->* \"X\"\n");

    let assert = Command::cargo_bin("dcrcheck")
        .unwrap()
        .args(["analyze", "--format", "json"])
        .arg(&path)
        .assert()
        .success();

    let report: serde_json::Value =
        serde_json::from_slice(&assert.get_output().stdout).unwrap();
    assert_eq!(report["graphs"][0]["name"], "loop");
    assert_eq!(
        report["graphs"][0]["condition_milestone_cycles"][0][0],
        "X"
    );
    assert!(report["freedom"].is_object());
}

#[test]
fn execute_runs_a_sequence_and_reports_state() {
    let dir = TempDir::new().unwrap();
    let path = write_graph(&dir, "chain.dcr", "\"A\" -->* \"B\"\n");

    let assert = Command::cargo_bin("dcrcheck")
        .unwrap()
        .args(["execute", "--format", "json", "--run", "A,B"])
        .arg(&path)
        .assert()
        .success();

    let report: serde_json::Value =
        serde_json::from_slice(&assert.get_output().stdout).unwrap();
    assert_eq!(report["steps"][0]["fired"], true);
    assert_eq!(report["steps"][1]["fired"], true);
    assert_eq!(report["accepting"], true);
}

#[test]
fn execute_with_unknown_activity_fails_with_known_ids() {
    let dir = TempDir::new().unwrap();
    let path = write_graph(&dir, "small.dcr", "\"A\"\n");

    let assert = Command::cargo_bin("dcrcheck")
        .unwrap()
        .args(["execute", "--run", "Nope"])
        .arg(&path)
        .assert()
        .failure();

    let stderr = String::from_utf8(assert.get_output().stderr.clone()).unwrap();
    assert!(stderr.contains("unknown activity 'Nope'"));
}

#[test]
fn merge_reports_preservation_failures() {
    let dir = TempDir::new().unwrap();
    let left = write_graph(&dir, "left.dcr", "\"X\"\n");
    let right = write_graph(&dir, "right.dcr", "%\"X\"\n");

    let assert = Command::cargo_bin("dcrcheck")
        .unwrap()
        .args(["merge", "--format", "json"])
        .arg(&left)
        .arg(&right)
        .assert()
        .success();

    let report: serde_json::Value =
        serde_json::from_slice(&assert.get_output().stdout).unwrap();
    assert_eq!(report["preservation_failures"][0]["base"], "left");
}

#[test]
fn trace_command_replays_a_trace_file() {
    let dir = TempDir::new().unwrap();
    let graph = write_graph(&dir, "chain.dcr", "\"A\" -->* \"B\"\n");
    let traces = dir.path().join("traces.json");
    fs::write(
        &traces,
        serde_json::json!([{
            "graph": "chain",
            "traces": [{
                "name": "forced",
                "sequence": ["B"],
                "recorded": "2026-01-05T09:00:00Z",
                "context": { "strict": false, "scope": "Local", "activities": [] },
                "positive": true
            }]
        }])
        .to_string(),
    )
    .unwrap();

    let assert = Command::cargo_bin("dcrcheck")
        .unwrap()
        .args(["trace", "--format", "json", "--traces"])
        .arg(&traces)
        .arg(&graph)
        .assert()
        .success();

    let report: serde_json::Value =
        serde_json::from_slice(&assert.get_output().stdout).unwrap();
    assert_eq!(report["outcomes"][0]["passed"], true);
    assert_eq!(report["outcomes"][0]["accepting"][0], "A");
    assert_eq!(report["outcomes"][0]["accepting"][1], "B");
}
