mod support;

use predicates::str::contains;
use serde_json::Value;

use support::TestRoot;

#[test]
fn task_edit_and_clear_fields() -> Result<(), Box<dyn std::error::Error>> {
    let root = TestRoot::init()?;
    let (ws, _) = root.workspace("alice", "Ops");
    let created = root.json(
        "alice",
        &[
            "task", "new", "Rotate keys", "--workspace", &ws, "--assignee", "bob", "--due",
            "2026-11-01",
        ],
    );
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["due_date"], "2026-11-01");

    let edited = root.json(
        "alice",
        &["task", "edit", &id, "--title", "Rotate all keys", "--clear", "assignee"],
    );
    assert_eq!(edited["changed"], Value::Bool(true));
    assert_eq!(edited["task"]["title"], "Rotate all keys");
    assert!(edited["task"].get("assignee").map_or(true, Value::is_null));

    let unchanged = root.json("alice", &["task", "edit", &id, "--title", "Rotate all keys"]);
    assert_eq!(unchanged["changed"], Value::Bool(false));

    root.cmd("alice")
        .args(["task", "edit", &id, "--clear", "status"])
        .assert()
        .code(2);
    Ok(())
}

#[test]
fn task_list_filters() -> Result<(), Box<dyn std::error::Error>> {
    let root = TestRoot::init()?;
    let (ops, _) = root.workspace("alice", "Ops");
    let (web, _) = root.workspace("carol", "Web");
    root.json(
        "alice",
        &["task", "new", "Patch kernel", "--workspace", &ops, "--due", "2026-10-20"],
    );
    root.json(
        "alice",
        &["task", "new", "Write postmortem", "--workspace", &ops, "--status", "done"],
    );
    root.task("carol", &web, "Hidden from alice", "todo");

    let all = root.json("alice", &["task", "list"]);
    assert_eq!(all["total"].as_u64(), Some(2));

    let done = root.json("alice", &["task", "list", "--status", "done"]);
    assert_eq!(done["tasks"][0]["title"], "Write postmortem");

    let search = root.json("alice", &["task", "list", "--search", "KERNEL"]);
    assert_eq!(search["total"].as_u64(), Some(1));

    let due = root.json("alice", &["task", "list", "--due-before", "2026-10-21"]);
    assert_eq!(due["tasks"][0]["title"], "Patch kernel");
    let none_due = root.json("alice", &["task", "list", "--due-before", "2026-10-20"]);
    assert_eq!(none_due["total"].as_u64(), Some(0));

    root.cmd("alice")
        .args(["task", "list", "--workspace", &web])
        .assert()
        .code(3);
    Ok(())
}

#[test]
fn comments_show_on_task_details() -> Result<(), Box<dyn std::error::Error>> {
    let root = TestRoot::init()?;
    let (ws, code) = root.workspace("alice", "Ops");
    root.cmd("bob").args(["ws", "join", &code]).assert().success();
    let id = root.task("alice", &ws, "Deploy", "todo");

    root.cmd("bob")
        .args(["task", "comment", &id, "looks good"])
        .assert()
        .success();

    let details = root.json("alice", &["task", "show", &id]);
    assert_eq!(details["task"]["comments_count"].as_u64(), Some(1));
    assert_eq!(details["comments"][0]["actor"], "bob");
    assert_eq!(details["comments"][0]["comment"], "looks good");

    root.cmd("alice")
        .args(["task", "comment", &id, "   "])
        .assert()
        .code(2);
    Ok(())
}

#[test]
fn deleted_task_leaves_a_gap() -> Result<(), Box<dyn std::error::Error>> {
    let root = TestRoot::init()?;
    let (ws, _) = root.workspace("alice", "Ops");
    let a = root.task("alice", &ws, "A", "todo");
    let b = root.task("alice", &ws, "B", "todo");

    root.cmd("alice").args(["task", "rm", &a]).assert().success();
    assert_eq!(root.column("alice", &ws, "todo"), vec![(b.clone(), 2000)]);

    root.cmd("alice")
        .args(["task", "show", &a])
        .assert()
        .code(2)
        .stderr(contains("Task not found"));
    Ok(())
}

#[test]
fn rebuild_restores_snapshots_from_logs() -> Result<(), Box<dyn std::error::Error>> {
    let root = TestRoot::init()?;
    let (ws, _) = root.workspace("alice", "Ops");
    let a = root.task("alice", &ws, "A", "todo");
    let b = root.task("alice", &ws, "B", "todo");
    root.cmd("alice")
        .args(["board", "move", &b, "todo", "--index", "0"])
        .assert()
        .success();

    std::fs::remove_file(root.state_dir().join("tasks.snapshot.json")).ok();
    let rebuilt = root.json("alice", &["task", "rebuild"]);
    assert_eq!(rebuilt["tasks"].as_u64(), Some(2));

    let todo = root.column("alice", &ws, "todo");
    assert_eq!(todo, vec![(b, 1000), (a, 2000)]);
    Ok(())
}

#[test]
fn projects_archive_and_list() -> Result<(), Box<dyn std::error::Error>> {
    let root = TestRoot::init()?;
    let (ws, _) = root.workspace("alice", "Ops");
    let project = root.json("alice", &["project", "new", "Q4", "--workspace", &ws]);
    let id = project["id"].as_str().unwrap().to_string();

    let archived = root.json("alice", &["project", "archive", &id]);
    assert_eq!(archived["changed"], Value::Bool(true));
    assert_eq!(archived["project"]["archived"], Value::Bool(true));

    let listed = root.json("alice", &["project", "list", "--workspace", &ws]);
    assert_eq!(listed["total"].as_u64(), Some(0));
    let all = root.json("alice", &["project", "list", "--workspace", &ws, "--all"]);
    assert_eq!(all["total"].as_u64(), Some(1));

    root.json("alice", &["project", "unarchive", &id]);
    let edited = root.json("alice", &["project", "edit", &id, "--name", "Q4 launch"]);
    assert_eq!(edited["project"]["name"], "Q4 launch");
    Ok(())
}
