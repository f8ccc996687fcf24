mod support;

use predicates::prelude::*;
use predicates::str::contains;
use serde_json::Value;

use support::TestRoot;

#[test]
fn invite_code_admits_new_members() -> Result<(), Box<dyn std::error::Error>> {
    let root = TestRoot::init()?;
    let (ws, code) = root.workspace("alice", "Ops");

    root.cmd("bob")
        .args(["ws", "show", &ws])
        .assert()
        .code(3)
        .stderr(contains("bob is not a member"));

    let joined = root.json("bob", &["ws", "join", &code]);
    assert_eq!(joined["joined"], Value::Bool(true));
    assert_eq!(joined["workspace"]["role"], "member");
    // Members never see the invite code.
    assert!(joined["workspace"].get("invite_code").is_none());

    let again = root.json("bob", &["ws", "join", &code]);
    assert_eq!(again["joined"], Value::Bool(false));

    let members = root.json("bob", &["ws", "members", "Ops"]);
    let names: Vec<&str> = members["members"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["actor"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["alice", "bob"]);
    Ok(())
}

#[test]
fn list_shows_only_member_workspaces() -> Result<(), Box<dyn std::error::Error>> {
    let root = TestRoot::init()?;
    root.workspace("alice", "Ops");
    root.workspace("carol", "Design");

    let listed = root.json("alice", &["ws", "list"]);
    assert_eq!(listed["total"].as_u64(), Some(1));
    assert_eq!(listed["workspaces"][0]["name"], "Ops");

    let all = root.json("alice", &["ws", "list", "--all"]);
    assert_eq!(all["total"].as_u64(), Some(2));
    Ok(())
}

#[test]
fn reset_invite_invalidates_old_code() -> Result<(), Box<dyn std::error::Error>> {
    let root = TestRoot::init()?;
    let (ws, old_code) = root.workspace("alice", "Ops");

    let reset = root.json("alice", &["ws", "invite", &ws, "--reset"]);
    let new_code = reset["invite_code"].as_str().unwrap().to_string();
    assert_ne!(new_code, old_code);

    root.cmd("bob").args(["ws", "join", &old_code]).assert().failure();
    root.cmd("bob").args(["ws", "join", &new_code]).assert().success();

    root.cmd("bob")
        .args(["ws", "invite", &ws])
        .assert()
        .code(3)
        .stderr(contains("must be an admin"));
    Ok(())
}

#[test]
fn roles_and_kick_are_admin_only() -> Result<(), Box<dyn std::error::Error>> {
    let root = TestRoot::init()?;
    let (ws, code) = root.workspace("alice", "Ops");
    root.cmd("bob").args(["ws", "join", &code]).assert().success();
    root.cmd("carol").args(["ws", "join", &code]).assert().success();

    root.cmd("bob")
        .args(["ws", "kick", &ws, "carol"])
        .assert()
        .code(3);

    root.cmd("alice")
        .args(["ws", "role", &ws, "bob", "admin"])
        .assert()
        .success()
        .stdout(contains("bob is now admin"));
    root.cmd("bob")
        .args(["ws", "kick", &ws, "carol"])
        .assert()
        .success();

    root.cmd("carol")
        .args(["board", "show", "--workspace", &ws])
        .assert()
        .code(3);

    root.cmd("alice")
        .args(["ws", "role", &ws, "bob", "owner"])
        .assert()
        .code(2);
    Ok(())
}

#[test]
fn rm_needs_force_while_tasks_remain() -> Result<(), Box<dyn std::error::Error>> {
    let root = TestRoot::init()?;
    let (ws, _) = root.workspace("alice", "Ops");
    root.task("alice", &ws, "A", "todo");
    root.json("alice", &["note", "new", "Runbook", "--workspace", &ws]);

    root.cmd("alice")
        .args(["ws", "rm", &ws])
        .assert()
        .failure()
        .stderr(contains("--force"));

    let removal = root.json("alice", &["ws", "rm", &ws, "--force"]);
    assert_eq!(removal["tasks_deleted"].as_u64(), Some(1));
    assert_eq!(removal["notes_deleted"].as_u64(), Some(1));

    root.cmd("alice")
        .args(["ws", "show", &ws])
        .assert()
        .code(2)
        .stderr(contains("Workspace not found").and(contains("plank ws list")));
    Ok(())
}

#[test]
fn duplicate_workspace_names_are_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let root = TestRoot::init()?;
    root.workspace("alice", "Ops");
    root.cmd("bob").args(["ws", "new", "ops"]).assert().code(2);
    Ok(())
}
