//! Integration tests that run the planner binary.

use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_solar-planner"))
        .args(args)
        .env_remove("RUST_LOG")
        .env_remove("SOLAR_PLANNER_SAMPLES")
        .output()
        .expect("solar-planner process should run")
}

fn run_ok(args: &[&str]) -> String {
    let output = run(args);
    assert!(
        output.status.success(),
        "run failed for {args:?}: stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).expect("stdout should be valid UTF-8")
}

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("solar-planner-{}-{name}", std::process::id()))
}

#[test]
fn demo_history_prints_report() {
    let stdout = run_ok(&["--demo-days", "60", "--pv-percent", "30", "--battery-kwh", "5"]);
    assert!(stdout.contains("--- Upgrade Plan ---"), "stdout: {stdout}");
    assert!(stdout.contains("Recommended battery"), "stdout: {stdout}");
}

#[test]
fn json_output_is_tagged() {
    let stdout = run_ok(&["--demo-days", "30", "--window", "month", "--json"]);
    let json: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON");
    assert_eq!(json["status"], "ready");
    assert_eq!(json["window"], "month");
    assert_eq!(json["scenarios"]["base"]["mode"], "measured");
}

#[test]
fn scenario_configs_run() {
    for path in [
        "scenarios/baseline.toml",
        "scenarios/pv_upgrade.toml",
        "scenarios/storage_upgrade.toml",
    ] {
        let stdout = run_ok(&["--config", path, "--demo-days", "200", "--json"]);
        let json: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON");
        assert_eq!(json["status"], "ready", "{path}");
    }
}

#[test]
fn csv_outputs_written() {
    let sweep = temp_path("sweep.csv");
    let trace = temp_path("trace.csv");
    let history = temp_path("history.csv");
    run_ok(&[
        "--demo-days",
        "10",
        "--window",
        "all",
        "--battery-kwh",
        "2",
        "--sweep-out",
        sweep.to_str().unwrap(),
        "--trace-out",
        trace.to_str().unwrap(),
        "--samples-out",
        history.to_str().unwrap(),
    ]);

    let sweep_csv = fs::read_to_string(&sweep).unwrap();
    assert_eq!(sweep_csv.lines().count(), 32);
    let trace_csv = fs::read_to_string(&trace).unwrap();
    assert_eq!(trace_csv.lines().count(), 10 * 24 + 1);

    // Exported history plans the same way when read back.
    let replay = run_ok(&[
        "--samples",
        history.to_str().unwrap(),
        "--window",
        "all",
        "--battery-kwh",
        "2",
        "--json",
    ]);
    let json: serde_json::Value = serde_json::from_str(&replay).unwrap();
    assert_eq!(json["coverage"]["complete_days"], 10);

    for path in [sweep, trace, history] {
        let _ = fs::remove_file(path);
    }
}

#[test]
fn insufficient_history_is_not_an_error() {
    let stdout = run_ok(&["--demo-days", "5", "--now", "2030-01-01T00:00:00Z"]);
    assert!(stdout.contains("Insufficient data"), "stdout: {stdout}");
}

#[test]
fn invalid_override_fails() {
    let output = run(&["--demo-days", "5", "--pv-percent", "-10"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("added_pv_percent"), "stderr: {stderr}");
}

#[test]
fn unknown_preset_fails() {
    let output = run(&["--preset", "nope"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown preset"));
}

#[test]
fn missing_samples_file_fails() {
    let output = run(&["--samples", "does-not-exist.csv"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("failed to load samples"));
}
