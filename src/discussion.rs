//! Workspace discussion channel.
//!
//! Messages are appended to `.plank/messages.jsonl`; only deleting a
//! workspace rewrites the log.
//! [`DiscussionStore::follow`] watches the log with `notify` and hands new
//! messages of one workspace to a callback as they land.

use std::sync::mpsc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::DiscussionConfig;
use crate::error::{Error, Result};
use crate::lock;
use crate::storage::Storage;
use crate::workspace::WorkspaceStore;

const WATCH_DEBOUNCE_MS: u64 = 100;
const DEFAULT_LOG_LIMIT: usize = 50;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub id: String,
    pub workspace_id: String,
    pub author: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct DiscussionStore {
    storage: Storage,
    config: DiscussionConfig,
    workspaces: WorkspaceStore,
}

impl DiscussionStore {
    pub fn new(storage: Storage, config: DiscussionConfig) -> Self {
        let workspaces = WorkspaceStore::new(storage.clone());
        Self {
            storage,
            config,
            workspaces,
        }
    }

    fn read_all(&self) -> Result<Vec<Message>> {
        self.storage.read_jsonl(&self.storage.messages_log())
    }

    pub fn post(
        &self,
        workspace: &str,
        body: &str,
        reply_to: Option<&str>,
        actor: &str,
    ) -> Result<Message> {
        let ws = self.workspaces.require_member(workspace, actor)?;
        let body = body.trim();
        if body.is_empty() {
            return Err(Error::InvalidArgument("message cannot be empty".to_string()));
        }
        let len = body.chars().count();
        if len > self.config.max_message_len {
            return Err(Error::InvalidArgument(format!(
                "message is {len} characters (limit {})",
                self.config.max_message_len
            )));
        }

        let log = self.storage.messages_log();
        let message = lock::with_lock(&log, || {
            let reply_to = match reply_to {
                Some(parent) => {
                    let parent = parent.trim().to_ascii_lowercase();
                    let found = self
                        .read_all()?
                        .into_iter()
                        .find(|m| m.id == parent && m.workspace_id == ws.id)
                        .ok_or_else(|| {
                            Error::InvalidArgument(format!(
                                "reply target {parent} is not a message of {}",
                                ws.name
                            ))
                        })?;
                    Some(found.id)
                }
                None => None,
            };
            let message = Message {
                id: format!("msg-{}", &Uuid::new_v4().simple().to_string()[..12]),
                workspace_id: ws.id.clone(),
                author: actor.to_string(),
                body: body.to_string(),
                reply_to,
                created_at: Utc::now(),
            };
            self.storage
                .append_jsonl(&log, std::slice::from_ref(&message))?;
            Ok(message)
        })?;
        tracing::info!(message = %message.id, workspace = %message.workspace_id, "message posted");
        Ok(message)
    }

    /// The newest `limit` messages after `since`, oldest first.
    pub fn list(
        &self,
        workspace: &str,
        actor: &str,
        since: Option<DateTime<Utc>>,
        limit: Option<usize>,
    ) -> Result<Vec<Message>> {
        let ws = self.workspaces.require_member(workspace, actor)?;
        let mut messages: Vec<Message> = self
            .read_all()?
            .into_iter()
            .filter(|m| m.workspace_id == ws.id)
            .filter(|m| since.map(|t| m.created_at > t).unwrap_or(true))
            .collect();
        let limit = limit.unwrap_or(DEFAULT_LOG_LIMIT);
        if messages.len() > limit {
            messages.drain(..messages.len() - limit);
        }
        Ok(messages)
    }

    /// Block and feed new messages of `workspace` to `on_message` until it
    /// returns `Ok(false)` or an error.
    pub fn follow<F>(&self, workspace: &str, actor: &str, mut on_message: F) -> Result<()>
    where
        F: FnMut(&Message) -> Result<bool>,
    {
        let ws = self.workspaces.require_member(workspace, actor)?;
        let log = self.storage.messages_log();
        let mut seen = self.read_all()?.len();

        let (event_tx, event_rx) = mpsc::channel();
        let mut watcher: RecommendedWatcher = notify::recommended_watcher(move |res| {
            let _ = event_tx.send(res);
        })
        .map_err(|err| Error::OperationFailed(format!("watch {}: {err}", log.display())))?;
        watcher
            .watch(&self.storage.state_dir(), RecursiveMode::NonRecursive)
            .map_err(|err| Error::OperationFailed(format!("watch {}: {err}", log.display())))?;
        tracing::debug!(workspace = %ws.id, "following discussion");

        let debounce = Duration::from_millis(WATCH_DEBOUNCE_MS);
        let mut pending: Option<Instant> = None;
        loop {
            let timeout = pending
                .map(|deadline| deadline.saturating_duration_since(Instant::now()))
                .unwrap_or(Duration::from_secs(3600));
            match event_rx.recv_timeout(timeout) {
                Ok(Ok(event)) => {
                    if event
                        .paths
                        .iter()
                        .any(|path| path.file_name() == log.file_name())
                    {
                        pending = Some(Instant::now() + debounce);
                    }
                }
                Ok(Err(err)) => tracing::warn!(error = %err, "discussion watcher error"),
                Err(mpsc::RecvTimeoutError::Timeout) => {
                    if pending.take().is_none() {
                        continue;
                    }
                    let all = self.read_all()?;
                    for message in all.iter().skip(seen) {
                        if message.workspace_id == ws.id && !on_message(message)? {
                            return Ok(());
                        }
                    }
                    seen = all.len();
                }
                Err(mpsc::RecvTimeoutError::Disconnected) => return Ok(()),
            }
        }
    }

    pub fn delete_workspace_messages(&self, workspace_id: &str) -> Result<usize> {
        let log = self.storage.messages_log();
        lock::with_lock(&log, || {
            let mut messages = self.read_all()?;
            let before = messages.len();
            messages.retain(|m| m.workspace_id != workspace_id);
            let removed = before - messages.len();
            if removed > 0 {
                self.storage.rewrite_jsonl(&log, &messages)?;
            }
            Ok(removed)
        })
    }
}

/// Parse an RFC 3339 timestamp for `--since`.
pub fn parse_since(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|t| t.with_timezone(&Utc))
        .map_err(|err| Error::InvalidArgument(format!("invalid timestamp '{}': {err}", raw.trim())))
}
