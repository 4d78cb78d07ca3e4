//! Integration tests for the PanelFlow CLI
//!
//! These tests run the actual CLI binary and verify output.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Get the binary to test
fn panelflow_cmd() -> Command {
    Command::cargo_bin("panelflow").unwrap()
}

const APP_CONFIG: &str = r#"
entryPanel: main
panels:
  - id: main
    title: Main Menu
    handler_class_name: MainHandler
    widgets:
      - id: name
        type: text_input
        title: Your name
      - id: goto_child
        type: panel_link
        title: Open child
        target_panel_id: child
  - id: child
    title: Child
    widgets:
      - id: color
        type: option_select
        title: Color
        options: [red, green]
"#;

fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_help_flag() {
    panelflow_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("state and navigation core"));
}

#[test]
fn test_replay_help() {
    panelflow_cmd()
        .args(["replay", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--stub-handlers"))
        .stdout(predicate::str::contains("--json"));
}

// ============================================================================
// validate
// ============================================================================

#[test]
fn test_validate_valid_config() {
    let temp_dir = TempDir::new().unwrap();
    let config = write(&temp_dir, "app.yaml", APP_CONFIG);

    panelflow_cmd()
        .arg("validate")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("is valid"))
        .stdout(predicate::str::contains("Entry panel: main"))
        .stdout(predicate::str::contains("Panels: 2"))
        .stdout(predicate::str::contains("Widgets: 3"))
        .stdout(predicate::str::contains("Handlers: MainHandler"));
}

#[test]
fn test_validate_json_config() {
    let temp_dir = TempDir::new().unwrap();
    let config = write(
        &temp_dir,
        "app.json",
        r#"{"entryPanel": "main", "panels": [{"id": "main", "title": "Main", "widgets": []}]}"#,
    );

    panelflow_cmd()
        .arg("validate")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Handlers: (none)"));
}

#[test]
fn test_validate_missing_file() {
    panelflow_cmd()
        .args(["validate", "/nonexistent/app.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("PF-010"))
        .stderr(predicate::str::contains("Fix:"));
}

#[test]
fn test_validate_schema_violation() {
    let temp_dir = TempDir::new().unwrap();
    let config = write(
        &temp_dir,
        "bad.yaml",
        r#"
entryPanel: main
panels:
  - id: main
    widgets:
      - id: w
        type: slider
        title: W
"#,
    );

    panelflow_cmd()
        .arg("validate")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("PF-012"));
}

#[test]
fn test_validate_dangling_link() {
    let temp_dir = TempDir::new().unwrap();
    let config = write(
        &temp_dir,
        "dangling.yaml",
        r#"
entryPanel: main
panels:
  - id: main
    title: Main
    widgets:
      - id: go
        type: panel_link
        title: Go
        target_panel_id: nowhere
"#,
    );

    panelflow_cmd()
        .arg("validate")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("PF-013"))
        .stderr(predicate::str::contains("nowhere"));
}

#[test]
fn test_validate_missing_entry_panel() {
    let temp_dir = TempDir::new().unwrap();
    let config = write(
        &temp_dir,
        "entry.yaml",
        r#"
entryPanel: start
panels:
  - id: main
    title: Main
"#,
    );

    panelflow_cmd()
        .arg("validate")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("PF-014"))
        .stderr(predicate::str::contains("start"));
}

// ============================================================================
// replay
// ============================================================================

#[test]
fn test_replay_requires_handlers() {
    let temp_dir = TempDir::new().unwrap();
    let config = write(&temp_dir, "app.yaml", APP_CONFIG);
    let script = write(&temp_dir, "script.yaml", "[]\n");

    panelflow_cmd()
        .arg("replay")
        .arg(&config)
        .arg(&script)
        .assert()
        .failure()
        .stderr(predicate::str::contains("MainHandler"));
}

#[test]
fn test_replay_navigates_with_stub_handlers() {
    let temp_dir = TempDir::new().unwrap();
    let config = write(&temp_dir, "app.yaml", APP_CONFIG);
    let script = write(
        &temp_dir,
        "script.yaml",
        r#"
- type: widget_submitted
  widget_id: name
  value: Ada
- type: widget_submitted
  widget_id: goto_child
  value: true
- type: widget_submitted
  widget_id: color
  value: green
"#,
    );

    panelflow_cmd()
        .arg("replay")
        .arg(&config)
        .arg(&script)
        .arg("--stub-handlers")
        .assert()
        .success()
        .stdout(predicate::str::contains("Replaying 3 events"))
        .stdout(predicate::str::contains("[goto_child]"))
        .stdout(predicate::str::contains("Active panel: child (2 nodes, 0 errors)"));
}

#[test]
fn test_replay_back_and_noops() {
    let temp_dir = TempDir::new().unwrap();
    let config = write(&temp_dir, "app.yaml", APP_CONFIG);
    let script = write(
        &temp_dir,
        "script.yaml",
        r#"
- type: back_navigation
- type: widget_submitted
  widget_id: goto_child
  value: true
- type: horizontal_navigation
  direction: previous
- type: horizontal_navigation
  direction: next
- type: back_navigation
"#,
    );

    panelflow_cmd()
        .arg("replay")
        .arg(&config)
        .arg(&script)
        .arg("--stub-handlers")
        .assert()
        .success()
        .stdout(predicate::str::contains("Active panel: main (1 nodes, 0 errors)"));
}

#[test]
fn test_replay_reports_unknown_widget() {
    let temp_dir = TempDir::new().unwrap();
    let config = write(&temp_dir, "app.yaml", APP_CONFIG);
    let script = write(
        &temp_dir,
        "script.yaml",
        "- type: widget_submitted\n  widget_id: ghost\n  value: 1\n",
    );

    panelflow_cmd()
        .arg("replay")
        .arg(&config)
        .arg(&script)
        .arg("--stub-handlers")
        .assert()
        .success()
        .stdout(predicate::str::contains("Navigation error"))
        .stdout(predicate::str::contains("ghost"))
        .stdout(predicate::str::contains("1 errors"));
}

#[test]
fn test_replay_json_lines() {
    let temp_dir = TempDir::new().unwrap();
    let config = write(&temp_dir, "app.yaml", APP_CONFIG);
    let script = write(
        &temp_dir,
        "script.json",
        r#"[{"type": "widget_submitted", "widget_id": "goto_child", "value": true}]"#,
    );

    let output = panelflow_cmd()
        .arg("replay")
        .arg(&config)
        .arg(&script)
        .args(["--stub-handlers", "--json"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 1);
    let event: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(event["type"], "state_changed");
    assert_eq!(event["tree"]["panel_id"], "main");
    assert_eq!(event["tree"]["stacks"][0]["nodes"][0]["panel_id"], "child");
    assert_eq!(event["tree"]["stacks"][0]["nodes"][0]["is_active"], true);
}

#[test]
fn test_replay_invalid_script() {
    let temp_dir = TempDir::new().unwrap();
    let config = write(&temp_dir, "app.yaml", APP_CONFIG);
    let script = write(&temp_dir, "script.yaml", "- type: teleport\n");

    panelflow_cmd()
        .arg("replay")
        .arg(&config)
        .arg(&script)
        .arg("--stub-handlers")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid event script"));
}

#[test]
fn test_log_file_receives_engine_logs() {
    let temp_dir = TempDir::new().unwrap();
    let config = write(&temp_dir, "app.yaml", APP_CONFIG);
    let log = temp_dir.path().join("logs").join("panelflow.log");

    panelflow_cmd()
        .arg("validate")
        .arg(&config)
        .arg("--log-level")
        .arg("info")
        .arg("--log-file")
        .arg(&log)
        .env_remove("RUST_LOG")
        .assert()
        .success();

    let contents = fs::read_to_string(&log).unwrap();
    assert!(contents.contains("loaded"), "log was: {contents}");
}
