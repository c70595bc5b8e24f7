//! End-to-end tests for the competency binary
//!
//! These build and run the binary through cargo and are gated behind the
//! `integration` feature flag. Run with:
//!
//! ```sh
//! cargo test -p competency-cli --features integration
//! ```

#![cfg(feature = "integration")]

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

const DATASET: &str = r#"{
    "categories": [{ "id": 1, "name": "Backend" }],
    "skills": [
        { "id": 10, "name": "Rust", "category_id": 1 },
        { "id": 11, "name": "SQL", "category_id": 1 }
    ],
    "role_profiles": [{ "role": "Engineer", "skills": { "10": "C", "11": "I" } }],
    "collaborators": [{ "id": 1, "name": "Ana", "role": "Engineer" }],
    "sessions": [
        {
            "id": 1, "collaborator_id": 1, "evaluated_at": "2024-01-10T00:00:00Z",
            "assessments": [
                { "skill_id": 10, "level": 1, "criticality": "C", "frequency": "D" },
                { "skill_id": 11, "level": 3, "criticality": "I", "frequency": "W" }
            ]
        },
        {
            "id": 2, "collaborator_id": 1, "evaluated_at": "2024-06-10T00:00:00Z",
            "assessments": [{ "skill_id": 10, "level": 4, "criticality": "C", "frequency": "D" }]
        }
    ]
}"#;

/// Run the binary against a dataset in `dir`, isolated from any project config.
fn competency(dir: &Path, args: &[&str]) -> Output {
    let data = dir.join("team.json");
    Command::new("cargo")
        .args(["run", "-q", "-p", "competency-cli", "--"])
        .arg("--data")
        .arg(&data)
        .args(["--now", "2024-12-31T00:00:00Z"])
        .args(args)
        .env("COMPETENCY_PROJECT_CONFIG_DIR", dir)
        .output()
        .expect("Failed to run competency")
}

fn setup() -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("team.json"), DATASET).unwrap();
    dir
}

fn json(output: &Output) -> serde_json::Value {
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}

#[test]
fn competency_help_lists_commands() {
    let dir = setup();
    let output = competency(dir.path(), &["--help"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("classify"));
    assert!(stdout.contains("metrics"));
    assert!(stdout.contains("evolution"));
    assert!(stdout.contains("config"));
}

#[test]
fn classify_prints_state() {
    let dir = setup();
    let output = competency(dir.path(), &["--json", "classify", "2", "D", "C"]);

    let value = json(&output);
    assert_eq!(value["state"], "critical_gap");
    assert_eq!(value["priority_weight"], 10);
}

#[test]
fn periods_include_first_quarter() {
    let dir = setup();
    let output = competency(dir.path(), &["--json", "periods"]);

    let value = json(&output);
    let ids: Vec<&str> = value
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|p| p["id"].as_str())
        .collect();
    assert!(ids.contains(&"Y-2024"));
    assert!(ids.contains(&"Q-2024-1"));
    assert!(ids.contains(&"M-2024-01"));
}

#[test]
fn snapshot_at_period_shows_historical_level() {
    let dir = setup();
    let output = competency(
        dir.path(),
        &["--json", "snapshot", "Ana", "--period", "Q-2024-1"],
    );

    let value = json(&output);
    assert_eq!(value["skills"]["10"]["assessment"]["level"], 1.0);
    assert_eq!(value["sessions_applied"], 1);
}

#[test]
fn metrics_compare_reports_fewer_gaps() {
    let dir = setup();
    let output = competency(dir.path(), &["--json", "metrics", "--compare", "Q-2024-1"]);

    let value = json(&output);
    assert_eq!(value["metrics"]["current"]["critical_gaps"], 0);
    assert_eq!(value["metrics"]["previous"]["critical_gaps"], 1);
}

#[test]
fn metrics_compare_lists_category_changes() {
    let dir = setup();
    let output = competency(dir.path(), &["--json", "metrics", "--compare", "Q-2024-1"]);

    let value = json(&output);
    let improvements = value["category_changes"]["improvements"].as_array().unwrap();
    assert_eq!(improvements.len(), 1);
    assert_eq!(improvements[0]["name"], "Backend");
    assert_eq!(improvements[0]["delta"], 1.5);
    assert_eq!(value["category_distribution"][0]["total"], 2);
}

#[test]
fn evolution_reports_growth_and_top_improver() {
    let dir = setup();
    let output = competency(dir.path(), &["--json", "evolution", "--range", "ytd"]);

    let value = json(&output);
    assert_eq!(value["collaborators"][0]["start_score"], 2.0);
    assert_eq!(value["collaborators"][0]["current_score"], 4.0);
    assert_eq!(value["top_improver"]["name"], "Ana");
    assert_eq!(value["monthly"].as_array().unwrap().len(), 12);
    assert_eq!(value["monthly"][1]["carried_over"], true);
}

#[test]
fn classify_rejects_unknown_frequency() {
    let dir = setup();
    let output = competency(dir.path(), &["classify", "2", "X", "C"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid value"));
}

#[test]
fn match_switches_month_to_quarter() {
    let dir = setup();
    let output = competency(dir.path(), &["--json", "match", "M-2024-02", "quarter"]);

    let value = json(&output);
    assert_eq!(value["id"], "Q-2024-1");
}

#[test]
fn unknown_collaborator_fails() {
    let dir = setup();
    let output = competency(dir.path(), &["profile", "Nobody"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not found"));
}

#[test]
fn config_show_works_without_config() {
    let dir = setup();
    let output = competency(dir.path(), &["config", "show"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("[periods]"));
    assert!(stdout.contains("quarters_back = 8"));
}
