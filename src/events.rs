//! Domain events for integrations.
//!
//! With `--events <path>` (or `PLANK_EVENTS`) every successful mutation
//! appends one JSON line describing what changed. `--events -` streams them
//! to stdout instead, in which case the command report is suppressed so the
//! stream stays parseable.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;

pub const EVENT_SCHEMA_VERSION: &str = "plank.event.v1";

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    WorkspaceCreated,
    WorkspaceEdited,
    WorkspaceRemoved,
    InviteReset,
    MemberJoined,
    MemberRoleChanged,
    MemberRemoved,
    ProjectCreated,
    ProjectEdited,
    ProjectArchived,
    ProjectUnarchived,
    TaskCreated,
    TaskEdited,
    TaskMoved,
    TaskBatchUpdated,
    TaskCommented,
    TaskDeleted,
    NoteCreated,
    NoteEdited,
    NoteDeleted,
    MessagePosted,
}

/// One line of the event stream.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    pub schema_version: &'static str,
    pub event: EventKind,
    pub timestamp: DateTime<Utc>,
    pub actor: String,
    pub data: serde_json::Value,
}

impl Event {
    pub fn new<T: Serialize>(event: EventKind, actor: &str, data: &T) -> Result<Self> {
        Ok(Self {
            schema_version: EVENT_SCHEMA_VERSION,
            event,
            timestamp: Utc::now(),
            actor: actor.to_string(),
            data: serde_json::to_value(data)?,
        })
    }
}

/// Where events go for one command. Disabled when no destination is set.
pub struct EventStream {
    writer: Option<Box<dyn Write + Send>>,
    to_stdout: bool,
}

impl EventStream {
    pub fn disabled() -> Self {
        Self {
            writer: None,
            to_stdout: false,
        }
    }

    /// Open from the flag value: empty is off, `-` is stdout, else a file
    /// opened for append.
    pub fn open(flag: Option<&str>) -> Result<Self> {
        let Some(target) = flag.map(str::trim).filter(|t| !t.is_empty()) else {
            return Ok(Self::disabled());
        };
        if target == "-" {
            return Ok(Self {
                writer: Some(Box::new(io::stdout())),
                to_stdout: true,
            });
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(Path::new(target))?;
        Ok(Self {
            writer: Some(Box::new(file)),
            to_stdout: false,
        })
    }

    /// True when events own stdout.
    pub fn is_stdout(&self) -> bool {
        self.to_stdout
    }

    /// Write one event. The mutation already happened, so a failure is
    /// returned as a warning for the command report instead of an error.
    pub fn emit<T: Serialize>(&mut self, kind: EventKind, actor: &str, data: &T) -> Option<String> {
        let writer = self.writer.as_mut()?;
        let written = Event::new(kind, actor, data).and_then(|event| {
            let mut line = serde_json::to_vec(&event)?;
            line.push(b'\n');
            writer.write_all(&line)?;
            writer.flush()?;
            Ok(())
        });
        match written {
            Ok(()) => {
                tracing::debug!(event = ?kind, actor, "event emitted");
                None
            }
            Err(err) => {
                tracing::warn!(event = ?kind, error = %err, "event output failed");
                Some(format!("event output failed: {err}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_flag_disables_events() {
        let mut stream = EventStream::open(Some("  ")).unwrap();
        assert!(!stream.is_stdout());
        assert_eq!(stream.emit(EventKind::TaskCreated, "alice", &1), None);

        assert!(EventStream::open(Some("-")).unwrap().is_stdout());
    }

    #[test]
    fn file_stream_appends_across_commands() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        let flag = path.to_str().unwrap();

        let payload = serde_json::json!({ "applied": [{ "id": "pl-abc", "status": "done" }] });
        assert!(EventStream::open(Some(flag))
            .unwrap()
            .emit(EventKind::TaskMoved, "alice", &payload)
            .is_none());
        assert!(EventStream::open(Some(flag))
            .unwrap()
            .emit(EventKind::TaskBatchUpdated, "bob", &payload)
            .is_none());

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event"], "task_moved");
        assert_eq!(lines[1]["event"], "task_batch_updated");
        assert_eq!(lines[1]["actor"], "bob");
        assert_eq!(lines[0]["schema_version"], EVENT_SCHEMA_VERSION);
        assert_eq!(lines[0]["data"]["applied"][0]["status"], "done");
    }

    #[test]
    fn unopenable_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("no-such-dir").join("events.jsonl");
        assert!(EventStream::open(missing.to_str()).is_err());
    }
}
