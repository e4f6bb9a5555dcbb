use assert_cmd::prelude::*;
use serde_json::Value;
use std::fs;
use std::process::Command;

const NODE_LIST: &str = r#"{
  "success": true,
  "data": [
    {"_id": "p1", "Name": "Alpha", "Type": "Exchange", "Status": "Stopped", "Lat": "40.71", "Lng": "-74.00"},
    {"_id": "p2", "Name": "Beta", "Type": "Broker", "Status": "Stopped", "Lat": 51.5, "Lng": -0.12, "PreviousPoint": "p1"},
    {"_id": "p3", "Name": "Gamma", "Type": "Market Maker", "Status": "Running", "Lat": 35.67, "Lng": 139.65, "PreviousPoint": "p2"},
    {"_id": "bad", "Name": "Nowhere", "Lat": "", "Lng": 0}
  ]
}"#;

fn stdout_json(output: std::process::Output) -> Value {
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}

#[test]
fn summary_reports_links_and_skipped_records() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let input = tmp.path().join("points.json");
    fs::write(&input, NODE_LIST).expect("write input");

    let exe = assert_cmd::cargo_bin!("gridmap-cli");
    let output = Command::new(exe)
        .args(["summary", input.to_string_lossy().as_ref()])
        .output()
        .expect("run");
    let out = stdout_json(output);

    assert_eq!(out["providerCount"], 3);
    assert_eq!(out["connectionCount"], 2);
    assert_eq!(out["downLinks"], 1);
    assert_eq!(out["skippedRecords"], 1);
    assert_eq!(out["providers"][2], "Gamma (Market Maker)");
    assert_eq!(out["connections"][0], "Alpha → Beta");
}

#[test]
fn snapshot_reads_stdin() {
    let exe = assert_cmd::cargo_bin!("gridmap-cli");
    let assert = assert_cmd::Command::new(exe)
        .args(["snapshot", "-"])
        .write_stdin(NODE_LIST)
        .assert()
        .success();
    let out: Value = serde_json::from_slice(&assert.get_output().stdout).expect("JSON");

    assert_eq!(out["map"]["state"]["state"], "ready");
    assert_eq!(out["nodes"].as_array().map(Vec::len), Some(3));
    let down = out["edges"]
        .as_array()
        .expect("edges")
        .iter()
        .find(|e| e["bothDown"] == true)
        .expect("one down edge");
    assert_eq!(down["stroke"], "#DB4437");
    assert_eq!(down["blinking"], true);
}

#[test]
fn demo_snapshot_with_random_links() {
    let exe = assert_cmd::cargo_bin!("gridmap-cli");
    let output = Command::new(exe)
        .args(["snapshot", "--demo", "--random-links", "3", "--seed", "7"])
        .output()
        .expect("run");
    let out = stdout_json(output);

    assert_eq!(out["summary"]["providerCount"], 5);
    let edges = out["edges"].as_array().expect("edges");
    assert_eq!(edges.len(), 3);
    for edge in edges {
        assert_eq!(edge["path"].as_array().map(Vec::len), Some(6));
        assert_eq!(edge["sync"]["state"], "local");
    }
}

#[test]
fn config_overlay_changes_zigzag_defaults() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let config = tmp.path().join("gridmap.json");
    fs::write(&config, r#"{ "zigzagSegments": 3 }"#).expect("write config");

    let exe = assert_cmd::cargo_bin!("gridmap-cli");
    let output = Command::new(exe)
        .args([
            "zigzag",
            "--from",
            "0,0",
            "--to",
            "10,10",
            "--config",
            config.to_string_lossy().as_ref(),
        ])
        .output()
        .expect("run");
    let path = stdout_json(output);
    let points = path.as_array().expect("array");
    assert_eq!(points.len(), 4);
    assert_eq!(points[0]["lat"], 0.0);
    assert_eq!(points[3]["lng"], 10.0);
}

#[test]
fn invalid_config_fails() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let config = tmp.path().join("gridmap.json");
    fs::write(&config, r#"{ "blinkIntervalMs": 0 }"#).expect("write config");

    let exe = assert_cmd::cargo_bin!("gridmap-cli");
    Command::new(exe)
        .args(["snapshot", "--demo", "--config", config.to_string_lossy().as_ref()])
        .assert()
        .code(1);
}

#[test]
fn usage_errors_exit_with_2() {
    let exe = assert_cmd::cargo_bin!("gridmap-cli");
    Command::new(exe).args(["zigzag", "--from", "0,0"]).assert().code(2);

    let exe = assert_cmd::cargo_bin!("gridmap-cli");
    Command::new(exe).args(["--bogus"]).assert().code(2);
}

#[test]
fn rejected_envelope_fails() {
    let exe = assert_cmd::cargo_bin!("gridmap-cli");
    assert_cmd::Command::new(exe)
        .args(["summary"])
        .write_stdin(r#"{"success": false, "message": "Token is not valid"}"#)
        .assert()
        .code(1);
}
