#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

/// A fresh board root in a temp dir, initialized with `plank init`.
pub struct TestRoot {
    dir: TempDir,
}

impl TestRoot {
    pub fn init() -> Result<Self, Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let root = Self { dir };
        root.cmd("alice").arg("init").assert().success();
        Ok(root)
    }

    /// An empty temp dir with no `.plank/`.
    pub fn bare() -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            dir: tempfile::tempdir()?,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn state_dir(&self) -> PathBuf {
        self.dir.path().join(".plank")
    }

    pub fn write_file(&self, rel_path: &str, contents: &str) -> std::io::Result<PathBuf> {
        let path = self.dir.path().join(rel_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents)?;
        Ok(path)
    }

    /// `plank` run inside the root as `actor`, with no ambient overrides.
    pub fn cmd(&self, actor: &str) -> Command {
        let mut cmd = plank_cmd();
        cmd.current_dir(self.path())
            .env("PLANK_ACTOR", actor)
            .env_remove("PLANK_ROOT")
            .env_remove("PLANK_EVENTS")
            .env_remove("RUST_LOG");
        cmd
    }

    /// Run a command with `--json` and return the `data` of its envelope.
    pub fn json(&self, actor: &str, args: &[&str]) -> Value {
        let output = self
            .cmd(actor)
            .args(args)
            .arg("--json")
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        let envelope: Value = serde_json::from_slice(&output).expect("json envelope");
        assert_eq!(envelope["status"], "success");
        envelope["data"].clone()
    }

    /// Create a workspace as `admin` and return (id, invite code).
    pub fn workspace(&self, admin: &str, name: &str) -> (String, String) {
        let data = self.json(admin, &["ws", "new", name]);
        (
            data["id"].as_str().expect("workspace id").to_string(),
            data["invite_code"].as_str().expect("invite code").to_string(),
        )
    }

    pub fn task(&self, actor: &str, workspace: &str, title: &str, status: &str) -> String {
        let data = self.json(
            actor,
            &["task", "new", title, "--workspace", workspace, "--status", status],
        );
        data["id"].as_str().expect("task id").to_string()
    }

    /// Ids of one board column, in order.
    pub fn column(&self, actor: &str, workspace: &str, status: &str) -> Vec<(String, u64)> {
        let board = self.json(actor, &["board", "show", "--workspace", workspace]);
        board["columns"]
            .as_array()
            .expect("columns")
            .iter()
            .find(|column| column["status"] == status)
            .expect("column")["tasks"]
            .as_array()
            .expect("tasks")
            .iter()
            .map(|task| {
                (
                    task["id"].as_str().expect("id").to_string(),
                    task["position"].as_u64().expect("position"),
                )
            })
            .collect()
    }
}

pub fn plank_cmd() -> Command {
    Command::cargo_bin("plank").expect("plank binary")
}
