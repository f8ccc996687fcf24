//! Storage layer for plank
//!
//! All board state lives under `.plank/` in the board root:
//!
//! ```text
//! .plank.toml                   # Board configuration (optional)
//! .plank/
//!   actor                       # Persisted actor identity
//!   workspaces.json             # Workspace registry with members
//!   projects.jsonl              # Project events
//!   projects.snapshot.json      # Project state rebuilt from events
//!   tasks.jsonl                 # Task events
//!   tasks.snapshot.json         # Task state rebuilt from events
//!   notes.json                  # Workspace notes
//!   messages.jsonl              # Discussion messages
//! ```

use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};

use crate::error::{Error, Result};
use crate::lock;

/// Name of the state directory inside a board root
pub const STATE_DIR: &str = ".plank";

const ACTOR_FILE: &str = "actor";
const WORKSPACES_FILE: &str = "workspaces.json";
const PROJECTS_LOG: &str = "projects.jsonl";
const PROJECTS_SNAPSHOT: &str = "projects.snapshot.json";
const TASKS_LOG: &str = "tasks.jsonl";
const TASKS_SNAPSHOT: &str = "tasks.snapshot.json";
const NOTES_FILE: &str = "notes.json";
const MESSAGES_LOG: &str = "messages.jsonl";

/// Storage manager for one board root
#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Walk up from `start` to the first directory holding `.plank/`.
    pub fn discover(start: &Path) -> Result<Self> {
        let start = if start.is_absolute() {
            start.to_path_buf()
        } else {
            std::env::current_dir()?.join(start)
        };
        let mut current = Some(start.as_path());
        while let Some(dir) = current {
            if dir.join(STATE_DIR).is_dir() {
                return Ok(Self::new(dir.to_path_buf()));
            }
            current = dir.parent();
        }
        Err(Error::RootNotFound(start))
    }

    // =========================================================================
    // Path accessors
    // =========================================================================

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn state_dir(&self) -> PathBuf {
        self.root.join(STATE_DIR)
    }

    pub fn actor_file(&self) -> PathBuf {
        self.state_dir().join(ACTOR_FILE)
    }

    pub fn workspaces_file(&self) -> PathBuf {
        self.state_dir().join(WORKSPACES_FILE)
    }

    pub fn projects_log(&self) -> PathBuf {
        self.state_dir().join(PROJECTS_LOG)
    }

    pub fn projects_snapshot(&self) -> PathBuf {
        self.state_dir().join(PROJECTS_SNAPSHOT)
    }

    pub fn tasks_log(&self) -> PathBuf {
        self.state_dir().join(TASKS_LOG)
    }

    pub fn tasks_snapshot(&self) -> PathBuf {
        self.state_dir().join(TASKS_SNAPSHOT)
    }

    pub fn notes_file(&self) -> PathBuf {
        self.state_dir().join(NOTES_FILE)
    }

    pub fn messages_log(&self) -> PathBuf {
        self.state_dir().join(MESSAGES_LOG)
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    /// Create `.plank/` and empty logs. Existing files are left alone.
    pub fn init(&self) -> Result<bool> {
        let existed = self.is_initialized();
        fs::create_dir_all(self.state_dir())?;
        for log in [self.projects_log(), self.tasks_log(), self.messages_log()] {
            if !log.exists() {
                File::create(&log)?;
            }
        }
        Ok(!existed)
    }

    pub fn is_initialized(&self) -> bool {
        self.state_dir().is_dir()
    }

    // =========================================================================
    // File I/O helpers
    // =========================================================================

    /// Write JSON via temp file + rename.
    pub fn write_json<T: Serialize>(&self, path: &Path, data: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(data)?;
        lock::write_atomic(path, json.as_bytes())
    }

    pub fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<T> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Append one record per line. Callers hold the log's lock.
    pub fn append_jsonl<T: Serialize>(&self, path: &Path, records: &[T]) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut buffer = Vec::new();
        for record in records {
            serde_json::to_writer(&mut buffer, record)?;
            buffer.push(b'\n');
        }

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        file.write_all(&buffer)?;
        file.sync_all()?;
        Ok(())
    }

    /// Read every record of a JSONL file; a missing file reads as empty.
    pub fn read_jsonl<T: DeserializeOwned>(&self, path: &Path) -> Result<Vec<T>> {
        if !path.exists() {
            return Ok(Vec::new());
        }

        let reader = BufReader::new(File::open(path)?);
        let mut records = Vec::new();
        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record = serde_json::from_str(&line).map_err(|err| {
                Error::OperationFailed(format!(
                    "{}:{}: {err}",
                    path.display(),
                    line_no + 1
                ))
            })?;
            records.push(record);
        }
        Ok(records)
    }

    /// Rewrite a JSONL file in one atomic step.
    pub fn rewrite_jsonl<T: Serialize>(&self, path: &Path, records: &[T]) -> Result<()> {
        let mut buffer = Vec::new();
        for record in records {
            serde_json::to_writer(&mut buffer, record)?;
            buffer.push(b'\n');
        }
        lock::write_atomic(path, &buffer)
    }

    /// Read-modify-write of a JSON registry under its lock.
    pub fn update_registry<R, T, F>(&self, path: &Path, f: F) -> Result<T>
    where
        R: Default + Serialize + DeserializeOwned,
        F: FnOnce(&mut R) -> Result<T>,
    {
        lock::with_lock(path, || {
            let mut registry: R = if path.exists() {
                self.read_json(path)?
            } else {
                R::default()
            };
            let result = f(&mut registry)?;
            self.write_json(path, &registry)?;
            Ok(result)
        })
    }

    /// Read a JSON registry; a missing file reads as the default.
    pub fn read_registry<R>(&self, path: &Path) -> Result<R>
    where
        R: Default + DeserializeOwned,
    {
        if !path.exists() {
            return Ok(R::default());
        }
        self.read_json(path)
    }

    // =========================================================================
    // Actor persistence
    // =========================================================================

    pub fn read_actor(&self) -> Result<Option<String>> {
        let path = self.actor_file();
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(path)?;
        let actor = raw.trim();
        Ok((!actor.is_empty()).then(|| actor.to_string()))
    }

    pub fn write_actor(&self, actor: &str) -> Result<()> {
        lock::write_atomic(self.actor_file(), format!("{actor}\n").as_bytes())
    }
}
