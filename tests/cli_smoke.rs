mod support;

use predicates::prelude::*;
use predicates::str::contains;
use serde_json::Value;

use support::{plank_cmd, TestRoot};

#[test]
fn help_lists_command_groups() {
    plank_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("board").and(contains("ws")).and(contains("serve")));
}

#[test]
fn init_creates_state_and_config() -> Result<(), Box<dyn std::error::Error>> {
    let root = TestRoot::bare()?;
    let output = root
        .cmd("alice")
        .args(["init", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let envelope: Value = serde_json::from_slice(&output)?;
    assert_eq!(envelope["schema_version"], "plank.v1");
    assert_eq!(envelope["command"], "init");
    assert_eq!(envelope["data"]["created"]["config"], Value::Bool(true));
    assert!(root.state_dir().is_dir());
    assert!(root.path().join(".plank.toml").is_file());

    let again = root.json("alice", &["init"]);
    assert_eq!(again["created"]["config"], Value::Bool(false));
    assert_eq!(again["created"]["state_dir"], Value::Bool(false));
    Ok(())
}

#[test]
fn commands_outside_a_board_point_at_init() -> Result<(), Box<dyn std::error::Error>> {
    let root = TestRoot::bare()?;
    root.cmd("alice")
        .args(["ws", "list"])
        .assert()
        .code(2)
        .stderr(contains("No plank board found").and(contains("plank init")));

    let output = root
        .cmd("alice")
        .args(["ws", "list", "--json"])
        .assert()
        .code(2)
        .get_output()
        .stdout
        .clone();
    let envelope: Value = serde_json::from_slice(&output)?;
    assert_eq!(envelope["status"], "error");
    assert_eq!(envelope["command"], "ws list");
    assert_eq!(envelope["error"]["kind"], "user_error");
    Ok(())
}

#[test]
fn root_flag_works_from_elsewhere() -> Result<(), Box<dyn std::error::Error>> {
    let root = TestRoot::init()?;
    let elsewhere = tempfile::tempdir()?;
    plank_cmd()
        .current_dir(elsewhere.path())
        .env("PLANK_ACTOR", "alice")
        .arg("--root")
        .arg(root.path())
        .args(["ws", "new", "Ops"])
        .assert()
        .success()
        .stdout(contains("Workspace created: Ops"));
    Ok(())
}

#[test]
fn events_on_stdout_replace_the_report() -> Result<(), Box<dyn std::error::Error>> {
    let root = TestRoot::init()?;
    let output = root
        .cmd("alice")
        .args(["ws", "new", "Ops", "--json", "--events", "-"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(output)?;
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 1);
    let event: Value = serde_json::from_str(lines[0])?;
    assert_eq!(event["event"], "workspace_created");
    assert_eq!(event["data"]["name"], "Ops");
    Ok(())
}

#[test]
fn invalid_config_is_reported() -> Result<(), Box<dyn std::error::Error>> {
    let root = TestRoot::init()?;
    root.write_file(".plank.toml", "[board]\nbulk_limit = 0\n")?;
    root.cmd("alice")
        .args(["ws", "list"])
        .assert()
        .code(2)
        .stderr(contains("Invalid configuration"));
    Ok(())
}
