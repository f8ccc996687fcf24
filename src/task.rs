//! Task storage and board mutations.
//!
//! `.plank/tasks.jsonl` is an append-only event log replayed in file order;
//! `.plank/tasks.snapshot.json` holds the folded state and is rewritten on
//! every append. All writers go through [`TaskStore::commit`], which plans
//! events against the snapshot while holding the log lock, so validation and
//! persistence see the same state.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::actor::validate_actor;
use crate::board::{
    Board, BoardCard, MoveRequest, PositionChange, TaskStatus, MAX_COLUMN_LEN, POSITION_CEILING,
};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::lock;
use crate::project::ProjectStore;
use crate::storage::Storage;
use crate::workspace::{Workspace, WorkspaceStore};

const TASKS_SCHEMA_VERSION: &str = "plank.tasks.v1";
const TASK_ID_DELIMS: [&str; 2] = ["-", "/"];
const ULID_TIME_LEN: usize = 10;
const ULID_RANDOM_LEN: usize = 16;
const ULID_CHARSET: &str = "0123456789abcdefghjkmnpqrstvwxyz";
const ULID_CHARSET_LEN: u128 = 32;
const MAX_TITLE_LEN: usize = 200;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskEventType {
    TaskCreated,
    TaskEdited,
    TaskMoved,
    TaskCommented,
    TaskDeleted,
}

/// Optional task fields that an edit can clear.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskField {
    Description,
    Project,
    Assignee,
    DueDate,
}

impl std::str::FromStr for TaskField {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "description" => Ok(Self::Description),
            "project" => Ok(Self::Project),
            "assignee" => Ok(Self::Assignee),
            "due_date" | "due" => Ok(Self::DueDate),
            other => Err(format!(
                "invalid field '{other}' (expected description|project|assignee|due_date)"
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskEvent {
    pub event_id: String,
    pub task_id: String,
    #[serde(rename = "type")]
    pub event_type: TaskEventType,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub clear: Vec<TaskField>,
}

impl TaskEvent {
    pub fn new(event_type: TaskEventType, task_id: impl Into<String>) -> Self {
        Self {
            event_id: Ulid::new().to_string(),
            task_id: task_id.into(),
            event_type,
            timestamp: Utc::now(),
            actor: None,
            workspace_id: None,
            project_id: None,
            title: None,
            description: None,
            status: None,
            position: None,
            assignee: None,
            due_date: None,
            comment: None,
            clear: Vec::new(),
        }
    }

    fn moved(change: &PositionChange, workspace_id: &str, actor: &str) -> Self {
        let mut event = Self::new(TaskEventType::TaskMoved, change.id.clone());
        event.actor = Some(actor.to_string());
        event.workspace_id = Some(workspace_id.to_string());
        event.status = Some(change.status);
        event.position = Some(change.position);
        event
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: String,
    pub workspace_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: TaskStatus,
    pub position: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
    pub comments_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_comment_at: Option<DateTime<Utc>>,
}

impl TaskRecord {
    pub fn card(&self) -> BoardCard {
        BoardCard {
            id: self.id.clone(),
            status: self.status,
            position: self.position,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSnapshot {
    pub schema_version: String,
    pub generated_at: DateTime<Utc>,
    pub tasks: Vec<TaskRecord>,
}

impl TaskSnapshot {
    pub fn empty() -> Self {
        Self {
            schema_version: TASKS_SCHEMA_VERSION.to_string(),
            generated_at: Utc::now(),
            tasks: Vec::new(),
        }
    }

    /// Board of one workspace.
    pub fn board(&self, workspace_id: &str) -> Board {
        Board::from_cards(
            self.tasks
                .iter()
                .filter(|task| task.workspace_id == workspace_id)
                .map(TaskRecord::card),
        )
    }

    fn find(&self, id: &str) -> Option<&TaskRecord> {
        let needle = normalize_id(id);
        self.tasks.iter().find(|task| normalize_id(&task.id) == needle)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskComment {
    pub timestamp: DateTime<Utc>,
    pub actor: Option<String>,
    pub comment: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskDetails {
    pub task: TaskRecord,
    pub comments: Vec<TaskComment>,
    pub events: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewTask {
    pub workspace: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
}

/// Partial update; `clear` empties optional fields.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TaskEdit {
    pub title: Option<String>,
    pub description: Option<String>,
    pub project: Option<String>,
    pub assignee: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub clear: Vec<TaskField>,
}

#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub workspace: Option<String>,
    pub project: Option<String>,
    pub status: Option<TaskStatus>,
    pub assignee: Option<String>,
    pub search: Option<String>,
    pub due_before: Option<NaiveDate>,
}

/// Batch of position updates for one workspace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkUpdate {
    pub workspace_id: String,
    pub tasks: Vec<PositionChange>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub workspace_id: String,
    pub applied: Vec<PositionChange>,
    pub unchanged: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BoardColumn {
    pub status: TaskStatus,
    pub title: String,
    pub tasks: Vec<TaskRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BoardView {
    pub workspace_id: String,
    pub workspace_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    pub columns: Vec<BoardColumn>,
}

#[derive(Debug, Clone)]
pub struct TaskStore {
    storage: Storage,
    config: Config,
    workspaces: WorkspaceStore,
    projects: ProjectStore,
}

impl TaskStore {
    pub fn new(storage: Storage, config: Config) -> Self {
        let workspaces = WorkspaceStore::new(storage.clone());
        let projects = ProjectStore::new(storage.clone());
        Self {
            storage,
            config,
            workspaces,
            projects,
        }
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Plan events against the current snapshot under the log lock, then
    /// append them and refresh the snapshot. No events means no write.
    fn commit<T, F>(&self, plan: F) -> Result<T>
    where
        F: FnOnce(&TaskSnapshot) -> Result<(Vec<TaskEvent>, T)>,
    {
        let log = self.storage.tasks_log();
        lock::with_lock(&log, || {
            let mut snapshot = self.load_snapshot()?;
            let (events, out) = plan(&snapshot)?;
            if events.is_empty() {
                return Ok(out);
            }
            let mut map: HashMap<String, TaskRecord> = snapshot
                .tasks
                .drain(..)
                .map(|task| (task.id.clone(), task))
                .collect();
            for event in &events {
                apply_event(&mut map, event)?;
            }
            self.storage.append_jsonl(&log, &events)?;
            snapshot.tasks = sorted(map);
            snapshot.generated_at = Utc::now();
            self.storage
                .write_json(&self.storage.tasks_snapshot(), &snapshot)?;
            Ok(out)
        })
    }

    /// Snapshot if present, otherwise replay the log.
    pub fn load_snapshot(&self) -> Result<TaskSnapshot> {
        let path = self.storage.tasks_snapshot();
        if path.exists() {
            return self.storage.read_json(&path);
        }
        let events = self.load_events()?;
        build_snapshot(&events)
    }

    fn load_events(&self) -> Result<Vec<TaskEvent>> {
        self.storage.read_jsonl(&self.storage.tasks_log())
    }

    pub fn get(&self, task_id: &str) -> Result<TaskRecord> {
        let resolved = self.resolve_task_id(task_id)?;
        self.load_snapshot()?
            .tasks
            .into_iter()
            .find(|task| task.id == resolved)
            .ok_or_else(|| Error::TaskNotFound(task_id.to_string()))
    }

    /// Fetch a task and check the actor's membership of its workspace.
    pub fn get_for(&self, task_id: &str, actor: &str) -> Result<(TaskRecord, Workspace)> {
        let task = self.get(task_id)?;
        let ws = self.workspaces.require_member(&task.workspace_id, actor)?;
        Ok((task, ws))
    }

    pub fn list(&self, filter: &TaskFilter, actor: &str) -> Result<Vec<TaskRecord>> {
        let visible: HashSet<String> = match filter.workspace.as_deref() {
            Some(key) => [self.workspaces.require_member(key, actor)?.id]
                .into_iter()
                .collect(),
            None => self
                .workspaces
                .list(Some(actor))?
                .into_iter()
                .map(|ws| ws.id)
                .collect(),
        };
        let project_id = match filter.project.as_deref() {
            Some(project) => Some(self.projects.resolve_project_id(project)?),
            None => None,
        };
        let search = filter
            .search
            .as_deref()
            .map(|term| term.trim().to_lowercase())
            .filter(|term| !term.is_empty());

        let mut tasks: Vec<TaskRecord> = self
            .load_snapshot()?
            .tasks
            .into_iter()
            .filter(|task| visible.contains(&task.workspace_id))
            .filter(|task| project_id.is_none() || task.project_id == project_id)
            .filter(|task| filter.status.map(|s| s == task.status).unwrap_or(true))
            .filter(|task| {
                filter
                    .assignee
                    .as_deref()
                    .map(|who| task.assignee.as_deref() == Some(who))
                    .unwrap_or(true)
            })
            .filter(|task| {
                filter
                    .due_before
                    .map(|date| task.due_date.map(|due| due < date).unwrap_or(false))
                    .unwrap_or(true)
            })
            .filter(|task| match search.as_deref() {
                Some(term) => {
                    task.title.to_lowercase().contains(term)
                        || task
                            .description
                            .as_deref()
                            .map(|d| d.to_lowercase().contains(term))
                            .unwrap_or(false)
                }
                None => true,
            })
            .collect();
        tasks.sort_by(|a, b| {
            a.workspace_id
                .cmp(&b.workspace_id)
                .then_with(|| a.status.cmp(&b.status))
                .then_with(|| a.position.cmp(&b.position))
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(tasks)
    }

    /// Ordering-only view of a workspace, used by the planner.
    pub fn board(&self, workspace_id: &str) -> Result<Board> {
        Ok(self.load_snapshot()?.board(workspace_id))
    }

    /// Columns with full task records. A project narrows the view; positions
    /// stay workspace-wide.
    pub fn board_view(
        &self,
        workspace: &str,
        actor: &str,
        project: Option<&str>,
    ) -> Result<BoardView> {
        let ws = self.workspaces.require_member(workspace, actor)?;
        let project_id = match project {
            Some(project) => {
                let record = self.projects.get(project)?;
                if record.workspace_id != ws.id {
                    return Err(Error::ProjectNotFound(project.to_string()));
                }
                Some(record.id)
            }
            None => None,
        };
        let snapshot = self.load_snapshot()?;
        let mut by_status: HashMap<TaskStatus, Vec<TaskRecord>> = HashMap::new();
        for task in snapshot.tasks {
            if task.workspace_id != ws.id {
                continue;
            }
            if project_id.is_some() && task.project_id != project_id {
                continue;
            }
            by_status.entry(task.status).or_default().push(task);
        }
        let columns = TaskStatus::ALL
            .iter()
            .map(|status| {
                let mut tasks = by_status.remove(status).unwrap_or_default();
                tasks.sort_by(|a, b| a.position.cmp(&b.position).then_with(|| a.id.cmp(&b.id)));
                BoardColumn {
                    status: *status,
                    title: status.title().to_string(),
                    tasks,
                }
            })
            .collect();
        Ok(BoardView {
            workspace_id: ws.id,
            workspace_name: ws.name,
            project_id,
            columns,
        })
    }

    pub fn create(&self, new: NewTask, actor: &str) -> Result<TaskRecord> {
        let ws = self.workspaces.require_member(&new.workspace, actor)?;
        let title = validate_title(&new.title)?;
        let status = match new.status {
            Some(status) => status,
            None => self.config.tasks.default_status()?,
        };
        let project_id = match new.project.as_deref() {
            Some(project) => Some(self.project_in(&ws, project)?),
            None => None,
        };
        let assignee = match new.assignee.as_deref() {
            Some(who) => Some(check_assignee(&ws, who)?),
            None => None,
        };

        let task_id = self.commit(|snapshot| {
            let task_id = generate_task_id(&self.config, snapshot);
            let mut board = snapshot.board(&ws.id);
            let changes = board.append_card(&task_id, status)?;

            let mut events = Vec::with_capacity(changes.len());
            for change in &changes {
                if change.id == task_id {
                    let mut event = TaskEvent::new(TaskEventType::TaskCreated, task_id.clone());
                    event.actor = Some(actor.to_string());
                    event.workspace_id = Some(ws.id.clone());
                    event.project_id = project_id.clone();
                    event.title = Some(title.clone());
                    event.description = normalize_text(new.description.clone());
                    event.status = Some(change.status);
                    event.position = Some(change.position);
                    event.assignee = assignee.clone();
                    event.due_date = new.due_date;
                    events.push(event);
                } else {
                    events.push(TaskEvent::moved(change, &ws.id, actor));
                }
            }
            // Created first so replays never move a missing task.
            events.sort_by_key(|event| event.event_type != TaskEventType::TaskCreated);
            Ok((events, task_id))
        })?;
        tracing::info!(task = %task_id, workspace = %ws.id, %status, "task created");
        self.get(&task_id)
    }

    /// Returns false when nothing changed.
    pub fn edit(&self, task_id: &str, edit: TaskEdit, actor: &str) -> Result<bool> {
        let (current, ws) = self.get_for(task_id, actor)?;
        let mut event = TaskEvent::new(TaskEventType::TaskEdited, current.id.clone());
        event.actor = Some(actor.to_string());

        let mut clear: Vec<TaskField> = Vec::new();
        for field in edit.clear {
            if !clear.contains(&field) {
                clear.push(field);
            }
        }
        let conflicts = |field: TaskField, set: bool| {
            if set && clear.contains(&field) {
                Err(Error::InvalidArgument(format!(
                    "cannot both set and clear {field:?}"
                )))
            } else {
                Ok(())
            }
        };
        conflicts(TaskField::Description, edit.description.is_some())?;
        conflicts(TaskField::Project, edit.project.is_some())?;
        conflicts(TaskField::Assignee, edit.assignee.is_some())?;
        conflicts(TaskField::DueDate, edit.due_date.is_some())?;

        if let Some(title) = edit.title.as_deref() {
            let title = validate_title(title)?;
            if title != current.title {
                event.title = Some(title);
            }
        }
        if let Some(description) = normalize_text(edit.description) {
            if current.description.as_deref() != Some(description.as_str()) {
                event.description = Some(description);
            }
        }
        if let Some(project) = edit.project.as_deref() {
            let project_id = self.project_in(&ws, project)?;
            if current.project_id.as_deref() != Some(project_id.as_str()) {
                event.project_id = Some(project_id);
            }
        }
        if let Some(who) = edit.assignee.as_deref() {
            let who = check_assignee(&ws, who)?;
            if current.assignee.as_deref() != Some(who.as_str()) {
                event.assignee = Some(who);
            }
        }
        if let Some(due) = edit.due_date {
            if current.due_date != Some(due) {
                event.due_date = Some(due);
            }
        }
        event.clear = clear
            .into_iter()
            .filter(|field| match field {
                TaskField::Description => current.description.is_some(),
                TaskField::Project => current.project_id.is_some(),
                TaskField::Assignee => current.assignee.is_some(),
                TaskField::DueDate => current.due_date.is_some(),
            })
            .collect();

        let changed = event.title.is_some()
            || event.description.is_some()
            || event.project_id.is_some()
            || event.assignee.is_some()
            || event.due_date.is_some()
            || !event.clear.is_empty();
        if !changed {
            return Ok(false);
        }
        self.commit(|snapshot| {
            if snapshot.find(&current.id).is_none() {
                return Err(Error::TaskNotFound(current.id.clone()));
            }
            Ok((vec![event], ()))
        })?;
        tracing::info!(task = %current.id, "task edited");
        Ok(true)
    }

    /// Move a task to `index` of column `to`. The move is planned against
    /// the locked state and goes through the same guard as external batches.
    pub fn move_task(
        &self,
        task_id: &str,
        to: TaskStatus,
        index: usize,
        actor: &str,
    ) -> Result<BatchReport> {
        let (task, ws) = self.get_for(task_id, actor)?;
        let report = self.commit(|snapshot| {
            let board = snapshot.board(&ws.id);
            let changes = board.plan_move(&MoveRequest {
                task_id: task.id.clone(),
                to,
                index,
            })?;
            if changes.is_empty() {
                return Ok((
                    Vec::new(),
                    BatchReport {
                        workspace_id: ws.id.clone(),
                        applied: Vec::new(),
                        unchanged: vec![task.id.clone()],
                    },
                ));
            }
            plan_batch(snapshot, &ws, &changes, actor)
        })?;
        tracing::info!(
            task = %task.id,
            to = %to,
            index,
            applied = report.applied.len(),
            "task moved"
        );
        Ok(report)
    }

    /// Apply a client-computed batch of position changes.
    ///
    /// The whole batch is rejected when it is empty or too large, repeats a
    /// task, carries an out-of-range position, names an unknown task, mixes
    /// workspaces, comes from a non-member, or would leave two tasks of a
    /// touched column on the same position. Otherwise every changed task gets
    /// one `task_moved` event in a single append.
    pub fn apply_batch(&self, batch: &BulkUpdate, actor: &str) -> Result<BatchReport> {
        let result = self.apply_batch_inner(batch, actor);
        match &result {
            Ok(report) => tracing::info!(
                workspace = %report.workspace_id,
                applied = report.applied.len(),
                unchanged = report.unchanged.len(),
                "batch applied"
            ),
            Err(err) => tracing::warn!(
                workspace = %batch.workspace_id,
                tasks = batch.tasks.len(),
                error = %err,
                "batch rejected"
            ),
        }
        result
    }

    fn apply_batch_inner(&self, batch: &BulkUpdate, actor: &str) -> Result<BatchReport> {
        let limit = self.config.board.bulk_limit;
        if batch.tasks.is_empty() {
            return Err(Error::InvalidArgument("batch has no tasks".to_string()));
        }
        if batch.tasks.len() > limit {
            return Err(Error::InvalidArgument(format!(
                "batch has {} tasks (limit {limit})",
                batch.tasks.len()
            )));
        }
        let ws = self.workspaces.get(&batch.workspace_id)?;
        self.commit(|snapshot| plan_batch(snapshot, &ws, &batch.tasks, actor))
    }

    pub fn comment(&self, task_id: &str, comment: &str, actor: &str) -> Result<TaskRecord> {
        let (task, _ws) = self.get_for(task_id, actor)?;
        let comment = comment.trim();
        if comment.is_empty() {
            return Err(Error::InvalidArgument("comment cannot be empty".to_string()));
        }
        self.commit(|snapshot| {
            if snapshot.find(&task.id).is_none() {
                return Err(Error::TaskNotFound(task.id.clone()));
            }
            let mut event = TaskEvent::new(TaskEventType::TaskCommented, task.id.clone());
            event.actor = Some(actor.to_string());
            event.comment = Some(comment.to_string());
            Ok((vec![event], ()))
        })?;
        tracing::info!(task = %task.id, "task commented");
        self.get(&task.id)
    }

    /// Delete a task. Its column keeps the gap until the next reorder.
    pub fn delete(&self, task_id: &str, actor: &str) -> Result<TaskRecord> {
        let (task, _ws) = self.get_for(task_id, actor)?;
        self.commit(|snapshot| {
            if snapshot.find(&task.id).is_none() {
                return Err(Error::TaskNotFound(task.id.clone()));
            }
            let mut event = TaskEvent::new(TaskEventType::TaskDeleted, task.id.clone());
            event.actor = Some(actor.to_string());
            event.workspace_id = Some(task.workspace_id.clone());
            Ok((vec![event], ()))
        })?;
        tracing::info!(task = %task.id, "task deleted");
        Ok(task)
    }

    /// Delete every task of a workspace; the caller checks permissions.
    /// Without `force` a workspace that still has tasks is refused. The
    /// check and the deletion share one lock hold.
    pub fn delete_workspace_tasks(&self, ws: &Workspace, actor: &str, force: bool) -> Result<usize> {
        let removed = self.commit(|snapshot| {
            let events: Vec<TaskEvent> = snapshot
                .tasks
                .iter()
                .filter(|task| task.workspace_id == ws.id)
                .map(|task| {
                    let mut event = TaskEvent::new(TaskEventType::TaskDeleted, task.id.clone());
                    event.actor = Some(actor.to_string());
                    event.workspace_id = Some(ws.id.clone());
                    event
                })
                .collect();
            let count = events.len();
            if count > 0 && !force {
                return Err(Error::InvalidArgument(format!(
                    "workspace {} still has {count} task(s); use --force to delete them",
                    ws.name
                )));
            }
            Ok((events, count))
        })?;
        tracing::info!(workspace = %ws.id, removed, "workspace tasks deleted");
        Ok(removed)
    }

    pub fn count_in_workspace(&self, workspace_id: &str) -> Result<usize> {
        Ok(self
            .load_snapshot()?
            .tasks
            .iter()
            .filter(|task| task.workspace_id == workspace_id)
            .count())
    }

    pub fn details(&self, task_id: &str, actor: &str) -> Result<TaskDetails> {
        let (task, _ws) = self.get_for(task_id, actor)?;
        let events: Vec<TaskEvent> = self
            .load_events()?
            .into_iter()
            .filter(|event| event.task_id == task.id)
            .collect();
        let comments = events
            .iter()
            .filter(|event| event.event_type == TaskEventType::TaskCommented)
            .filter_map(|event| {
                event.comment.as_ref().map(|comment| TaskComment {
                    timestamp: event.timestamp,
                    actor: event.actor.clone(),
                    comment: comment.clone(),
                })
            })
            .collect();
        Ok(TaskDetails {
            task,
            comments,
            events: events.len(),
        })
    }

    /// Replay the log and overwrite the snapshot.
    pub fn rebuild(&self) -> Result<usize> {
        let log = self.storage.tasks_log();
        lock::with_lock(&log, || {
            let events = self.load_events()?;
            let snapshot = build_snapshot(&events)?;
            self.storage
                .write_json(&self.storage.tasks_snapshot(), &snapshot)?;
            Ok(snapshot.tasks.len())
        })
    }

    pub fn resolve_task_id(&self, input: &str) -> Result<String> {
        let snapshot = self.load_snapshot()?;
        resolve_in(&snapshot, input)
    }

    fn project_in(&self, ws: &Workspace, project: &str) -> Result<String> {
        let record = self.projects.get(project)?;
        if record.workspace_id != ws.id {
            return Err(Error::InvalidArgument(format!(
                "project {} belongs to another workspace",
                record.id
            )));
        }
        if record.archived {
            return Err(Error::InvalidArgument(format!(
                "project {} is archived",
                record.id
            )));
        }
        Ok(record.id)
    }
}

/// Validate a batch against `snapshot` and turn it into move events.
fn plan_batch(
    snapshot: &TaskSnapshot,
    ws: &Workspace,
    changes: &[PositionChange],
    actor: &str,
) -> Result<(Vec<TaskEvent>, BatchReport)> {
    let mut seen = HashSet::new();
    for change in changes {
        if !seen.insert(normalize_id(&change.id)) {
            return Err(Error::InvalidArgument(format!(
                "task {} appears twice in the batch",
                change.id
            )));
        }
        if change.position == 0 || change.position > POSITION_CEILING {
            return Err(Error::InvalidArgument(format!(
                "position {} of task {} is outside 1..={POSITION_CEILING}",
                change.position, change.id
            )));
        }
    }

    let mut resolved: Vec<(&TaskRecord, &PositionChange)> = Vec::with_capacity(changes.len());
    for change in changes {
        let task = snapshot
            .find(&change.id)
            .ok_or_else(|| Error::TaskNotFound(change.id.clone()))?;
        resolved.push((task, change));
    }

    let foreign: Vec<String> = resolved
        .iter()
        .filter(|(task, _)| task.workspace_id != ws.id)
        .map(|(task, _)| task.id.clone())
        .collect();
    if !foreign.is_empty() {
        return Err(Error::MixedWorkspaces {
            workspace: ws.id.clone(),
            foreign,
        });
    }

    ws.ensure_member(actor)?;

    let normalized: Vec<PositionChange> = resolved
        .iter()
        .map(|(task, change)| PositionChange {
            id: task.id.clone(),
            status: change.status,
            position: change.position,
        })
        .collect();
    let mut board = snapshot.board(&ws.id);
    let mut touched: Vec<TaskStatus> = resolved
        .iter()
        .flat_map(|(task, change)| [task.status, change.status])
        .collect();
    touched.sort();
    touched.dedup();
    let before: Vec<usize> = touched.iter().map(|s| board.column(*s).len()).collect();
    board.apply_changes(&normalized);
    for (status, was) in touched.iter().zip(before) {
        let len = board.column(*status).len();
        if len > MAX_COLUMN_LEN && len > was {
            return Err(Error::ColumnFull {
                status: status.to_string(),
                limit: MAX_COLUMN_LEN,
            });
        }
    }
    if let Some((status, position)) = board.first_violation(&touched) {
        return Err(Error::PositionConflict {
            status: status.to_string(),
            position,
        });
    }

    let mut events = Vec::new();
    let mut applied = Vec::new();
    let mut unchanged = Vec::new();
    for ((task, _), change) in resolved.iter().zip(normalized) {
        if task.status == change.status && task.position == change.position {
            unchanged.push(change.id);
        } else {
            events.push(TaskEvent::moved(&change, &ws.id, actor));
            applied.push(change);
        }
    }
    Ok((
        events,
        BatchReport {
            workspace_id: ws.id.clone(),
            applied,
            unchanged,
        },
    ))
}

fn check_assignee(ws: &Workspace, who: &str) -> Result<String> {
    let who = validate_actor(who)?;
    if !ws.is_member(&who) {
        return Err(Error::NotAMember {
            workspace: ws.name.clone(),
            actor: who,
        });
    }
    Ok(who)
}

fn validate_title(title: &str) -> Result<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(Error::InvalidArgument("task title cannot be empty".to_string()));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(Error::InvalidArgument(format!(
            "task title must be at most {MAX_TITLE_LEN} characters"
        )));
    }
    Ok(title.to_string())
}

fn normalize_text(text: Option<String>) -> Option<String> {
    let text = text?;
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Parse a `YYYY-MM-DD` due date.
pub fn parse_due_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
        Error::InvalidArgument(format!("invalid date '{}' (expected YYYY-MM-DD)", raw.trim()))
    })
}

fn build_snapshot(events: &[TaskEvent]) -> Result<TaskSnapshot> {
    let mut map: HashMap<String, TaskRecord> = HashMap::new();
    for event in events {
        apply_event(&mut map, event)?;
    }
    Ok(TaskSnapshot {
        schema_version: TASKS_SCHEMA_VERSION.to_string(),
        generated_at: Utc::now(),
        tasks: sorted(map),
    })
}

fn sorted(map: HashMap<String, TaskRecord>) -> Vec<TaskRecord> {
    let mut tasks: Vec<TaskRecord> = map.into_values().collect();
    tasks.sort_by(|a, b| a.id.cmp(&b.id));
    tasks
}

fn apply_event(map: &mut HashMap<String, TaskRecord>, event: &TaskEvent) -> Result<()> {
    let missing = || Error::TaskNotFound(event.task_id.clone());
    match event.event_type {
        TaskEventType::TaskCreated => {
            if map.contains_key(&event.task_id) {
                return Err(Error::InvalidArgument(format!(
                    "task already exists: {}",
                    event.task_id
                )));
            }
            let incomplete = |field: &str| {
                Error::OperationFailed(format!(
                    "task_created for {} has no {field}",
                    event.task_id
                ))
            };
            map.insert(
                event.task_id.clone(),
                TaskRecord {
                    id: event.task_id.clone(),
                    workspace_id: event
                        .workspace_id
                        .clone()
                        .ok_or_else(|| incomplete("workspace_id"))?,
                    project_id: event.project_id.clone(),
                    title: event.title.clone().ok_or_else(|| incomplete("title"))?,
                    description: event.description.clone(),
                    status: event.status.ok_or_else(|| incomplete("status"))?,
                    position: event.position.ok_or_else(|| incomplete("position"))?,
                    assignee: event.assignee.clone(),
                    due_date: event.due_date,
                    created_at: event.timestamp,
                    updated_at: event.timestamp,
                    created_by: event.actor.clone(),
                    updated_by: event.actor.clone(),
                    comments_count: 0,
                    last_comment_at: None,
                },
            );
        }
        TaskEventType::TaskEdited => {
            let task = map.get_mut(&event.task_id).ok_or_else(missing)?;
            if let Some(title) = event.title.as_ref() {
                task.title = title.clone();
            }
            if event.description.is_some() {
                task.description = event.description.clone();
            }
            if event.project_id.is_some() {
                task.project_id = event.project_id.clone();
            }
            if event.assignee.is_some() {
                task.assignee = event.assignee.clone();
            }
            if event.due_date.is_some() {
                task.due_date = event.due_date;
            }
            for field in &event.clear {
                match field {
                    TaskField::Description => task.description = None,
                    TaskField::Project => task.project_id = None,
                    TaskField::Assignee => task.assignee = None,
                    TaskField::DueDate => task.due_date = None,
                }
            }
            task.updated_at = event.timestamp;
            task.updated_by = event.actor.clone();
        }
        TaskEventType::TaskMoved => {
            let task = map.get_mut(&event.task_id).ok_or_else(missing)?;
            if let Some(status) = event.status {
                task.status = status;
            }
            if let Some(position) = event.position {
                task.position = position;
            }
            task.updated_at = event.timestamp;
            task.updated_by = event.actor.clone();
        }
        TaskEventType::TaskCommented => {
            let task = map.get_mut(&event.task_id).ok_or_else(missing)?;
            task.comments_count = task.comments_count.saturating_add(1);
            task.last_comment_at = Some(event.timestamp);
            task.updated_at = event.timestamp;
        }
        TaskEventType::TaskDeleted => {
            map.remove(&event.task_id).ok_or_else(missing)?;
        }
    }
    Ok(())
}

fn resolve_in(snapshot: &TaskSnapshot, input: &str) -> Result<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidArgument("task id cannot be empty".to_string()));
    }

    let trimmed_norm = normalize_id(trimmed);
    let candidate_norm = suffix_from_id(&trimmed_norm).to_string();
    if candidate_norm.is_empty() {
        return Err(Error::InvalidArgument("task id cannot be empty".to_string()));
    }

    let mut exact: Vec<String> = Vec::new();
    let mut matches: Vec<String> = Vec::new();
    for task in &snapshot.tasks {
        let id_norm = normalize_id(&task.id);
        let suffix_norm = suffix_from_id(&id_norm);
        if id_norm == trimmed_norm || suffix_norm == trimmed_norm {
            exact.push(task.id.clone());
            continue;
        }
        if suffix_norm.starts_with(&candidate_norm) {
            matches.push(task.id.clone());
        }
    }

    if exact.len() == 1 {
        return Ok(exact.remove(0));
    }
    let candidates = if exact.is_empty() { matches } else { exact };
    let mut candidates = candidates;
    candidates.sort();
    candidates.dedup();
    match candidates.len() {
        0 => Err(Error::TaskNotFound(trimmed.to_string())),
        1 => Ok(candidates.remove(0)),
        _ => Err(Error::InvalidArgument(format!(
            "ambiguous task id '{}': {}",
            trimmed,
            candidates.join(", ")
        ))),
    }
}

fn generate_task_id(config: &Config, snapshot: &TaskSnapshot) -> String {
    let prefix = config.tasks.id_prefix.trim().to_ascii_lowercase();
    let mut existing_suffixes = HashSet::new();
    let mut suffix_counts: HashMap<usize, usize> = HashMap::new();
    for task in &snapshot.tasks {
        let id_norm = normalize_id(&task.id);
        let suffix = suffix_from_id(&id_norm);
        if suffix.is_empty() {
            continue;
        }
        existing_suffixes.insert(suffix.to_string());
        if is_ulid_suffix(suffix) {
            *suffix_counts.entry(suffix.len()).or_insert(0) += 1;
        }
    }

    let target_len = select_suffix_len(config.tasks.id_min_len, &suffix_counts);
    loop {
        let base = Ulid::new().to_string();
        if let Some(suffix) = unique_suffix_from_base(&base, target_len, &existing_suffixes) {
            return format!("{prefix}-{suffix}");
        }
    }
}

/// Suffix from the random half of a ULID, unless already taken.
fn unique_suffix_from_base(
    base: &str,
    len: usize,
    existing_suffixes: &HashSet<String>,
) -> Option<String> {
    let base = base.to_lowercase();
    let random_end = ULID_TIME_LEN + ULID_RANDOM_LEN;
    if base.len() < random_end || len == 0 || len > ULID_RANDOM_LEN {
        return None;
    }
    let candidate = &base[ULID_TIME_LEN..ULID_TIME_LEN + len];
    if existing_suffixes.contains(candidate) {
        return None;
    }
    Some(candidate.to_string())
}

/// Grow the suffix only once every id of the current length is used.
fn select_suffix_len(min_len: usize, suffix_counts: &HashMap<usize, usize>) -> usize {
    let mut len = min_len;
    while len < ULID_RANDOM_LEN {
        let used = suffix_counts.get(&len).copied().unwrap_or(0) as u128;
        if used < ulid_space_for_len(len) {
            break;
        }
        len += 1;
    }
    len
}

fn normalize_id(value: &str) -> String {
    value.trim().to_ascii_lowercase()
}

fn suffix_from_id(id_norm: &str) -> &str {
    let earliest = TASK_ID_DELIMS
        .iter()
        .filter_map(|delim| id_norm.find(delim))
        .min();
    match earliest {
        Some(idx) if idx + 1 < id_norm.len() => &id_norm[idx + 1..],
        Some(_) => "",
        None => id_norm,
    }
}

fn is_ulid_suffix(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|ch| ULID_CHARSET.contains(ch))
}

fn ulid_space_for_len(len: usize) -> u128 {
    ULID_CHARSET_LEN.saturating_pow(len as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::slot_position;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        store: TaskStore,
        workspaces: WorkspaceStore,
        ws: String,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = Storage::new(dir.path().to_path_buf());
        storage.init().expect("init");
        let workspaces = WorkspaceStore::new(storage.clone());
        let ws = workspaces.create("Ops", None, "alice").expect("workspace").id;
        let store = TaskStore::new(storage, Config::default());
        Fixture {
            _dir: dir,
            store,
            workspaces,
            ws,
        }
    }

    fn new_task(ws: &str, title: &str, status: TaskStatus) -> NewTask {
        NewTask {
            workspace: ws.to_string(),
            title: title.to_string(),
            status: Some(status),
            ..NewTask::default()
        }
    }

    fn add(fx: &Fixture, title: &str, status: TaskStatus) -> TaskRecord {
        fx.store
            .create(new_task(&fx.ws, title, status), "alice")
            .expect("create task")
    }

    fn column_titles(fx: &Fixture, status: TaskStatus) -> Vec<String> {
        let view = fx.store.board_view(&fx.ws, "alice", None).expect("board");
        view.columns
            .into_iter()
            .find(|c| c.status == status)
            .map(|c| c.tasks.into_iter().map(|t| t.title).collect())
            .unwrap_or_default()
    }

    #[test]
    fn create_appends_to_the_column_tail() {
        let fx = fixture();
        let a = add(&fx, "a", TaskStatus::Todo);
        let b = add(&fx, "b", TaskStatus::Todo);
        let c = add(&fx, "c", TaskStatus::Done);
        assert_eq!(a.position, 1000);
        assert_eq!(b.position, 2000);
        assert_eq!(c.position, 1000);
        assert!(a.id.starts_with("pl-"));
        assert_eq!(a.id.len(), "pl-".len() + 3);
    }

    #[test]
    fn default_status_comes_from_config() {
        let fx = fixture();
        let task = fx
            .store
            .create(
                NewTask {
                    workspace: fx.ws.clone(),
                    title: "plain".to_string(),
                    ..NewTask::default()
                },
                "alice",
            )
            .unwrap();
        assert_eq!(task.status, TaskStatus::Todo);
    }

    #[test]
    fn move_task_reorders_and_renumbers() {
        let fx = fixture();
        add(&fx, "a", TaskStatus::Todo);
        add(&fx, "b", TaskStatus::Todo);
        let c = add(&fx, "c", TaskStatus::Todo);

        let report = fx.store.move_task(&c.id, TaskStatus::Todo, 0, "alice").unwrap();
        assert_eq!(report.applied.len(), 3);
        assert_eq!(column_titles(&fx, TaskStatus::Todo), vec!["c", "a", "b"]);

        let again = fx.store.move_task(&c.id, TaskStatus::Todo, 0, "alice").unwrap();
        assert!(again.applied.is_empty());
        assert_eq!(again.unchanged, vec![c.id.clone()]);
    }

    #[test]
    fn move_across_columns_updates_status() {
        let fx = fixture();
        let a = add(&fx, "a", TaskStatus::Todo);
        add(&fx, "b", TaskStatus::Todo);
        add(&fx, "x", TaskStatus::Done);

        fx.store.move_task(&a.id, TaskStatus::Done, 5, "alice").unwrap();
        let moved = fx.store.get(&a.id).unwrap();
        assert_eq!(moved.status, TaskStatus::Done);
        assert_eq!(moved.position, slot_position(1));
        assert_eq!(column_titles(&fx, TaskStatus::Todo), vec!["b"]);
        assert_eq!(fx.store.get(&column_ids(&fx, TaskStatus::Todo)[0]).unwrap().position, 1000);
    }

    fn column_ids(fx: &Fixture, status: TaskStatus) -> Vec<String> {
        fx.store
            .board(&fx.ws)
            .unwrap()
            .column(status)
            .iter()
            .map(|c| c.id.clone())
            .collect()
    }

    #[test]
    fn batch_rejects_tasks_from_other_workspaces() {
        let fx = fixture();
        let other = fx.workspaces.create("Other", None, "alice").unwrap().id;
        let mine = add(&fx, "mine", TaskStatus::Todo);
        let theirs = fx
            .store
            .create(new_task(&other, "theirs", TaskStatus::Todo), "alice")
            .unwrap();

        let batch = BulkUpdate {
            workspace_id: fx.ws.clone(),
            tasks: vec![
                PositionChange {
                    id: mine.id.clone(),
                    status: TaskStatus::Done,
                    position: 1000,
                },
                PositionChange {
                    id: theirs.id.clone(),
                    status: TaskStatus::Done,
                    position: 2000,
                },
            ],
        };
        let err = fx.store.apply_batch(&batch, "alice").unwrap_err();
        match err {
            Error::MixedWorkspaces { foreign, .. } => assert_eq!(foreign, vec![theirs.id]),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(fx.store.get(&mine.id).unwrap().status, TaskStatus::Todo);
    }

    #[test]
    fn batch_rejects_position_collisions() {
        let fx = fixture();
        let a = add(&fx, "a", TaskStatus::Todo);
        add(&fx, "b", TaskStatus::Todo);
        let batch = BulkUpdate {
            workspace_id: fx.ws.clone(),
            tasks: vec![PositionChange {
                id: a.id.clone(),
                status: TaskStatus::Todo,
                position: 2000,
            }],
        };
        let err = fx.store.apply_batch(&batch, "alice").unwrap_err();
        assert!(matches!(err, Error::PositionConflict { position: 2000, .. }));
    }

    #[test]
    fn batch_cannot_overfill_a_column() {
        let fx = fixture();
        let seed = add(&fx, "seed", TaskStatus::Todo);
        let stray = add(&fx, "stray", TaskStatus::Backlog);

        // Fill todo to the cap directly in the snapshot; creating a thousand
        // tasks one append at a time is needlessly slow.
        let mut snapshot = fx.store.load_snapshot().unwrap();
        for i in 1..MAX_COLUMN_LEN {
            let mut task = seed.clone();
            task.id = format!("pl-fill{i:04}");
            task.position = slot_position(i);
            snapshot.tasks.push(task);
        }
        let storage = fx.store.storage();
        storage.write_json(&storage.tasks_snapshot(), &snapshot).unwrap();

        let batch = BulkUpdate {
            workspace_id: fx.ws.clone(),
            tasks: vec![PositionChange {
                id: stray.id.clone(),
                status: TaskStatus::Todo,
                position: 500,
            }],
        };
        let err = fx.store.apply_batch(&batch, "alice").unwrap_err();
        assert!(matches!(err, Error::ColumnFull { limit: MAX_COLUMN_LEN, .. }));
        assert_eq!(fx.store.get(&stray.id).unwrap().status, TaskStatus::Backlog);

        // Reordering inside the full column still works.
        let report = fx
            .store
            .move_task(&seed.id, TaskStatus::Todo, 1, "alice")
            .unwrap();
        assert!(!report.applied.is_empty());
        let board = fx.store.board(&fx.ws).unwrap();
        assert_eq!(board.column(TaskStatus::Todo).len(), MAX_COLUMN_LEN);
        assert!(board.is_ordered());
    }

    #[test]
    fn workspace_task_purge_needs_force_while_tasks_remain() {
        let fx = fixture();
        let ws = fx.workspaces.get(&fx.ws).unwrap();
        assert_eq!(fx.store.delete_workspace_tasks(&ws, "alice", false).unwrap(), 0);

        let task = add(&fx, "late arrival", TaskStatus::Todo);
        let err = fx
            .store
            .delete_workspace_tasks(&ws, "alice", false)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(ref msg) if msg.contains("--force")));
        assert!(fx.store.get(&task.id).is_ok());

        assert_eq!(fx.store.delete_workspace_tasks(&ws, "alice", true).unwrap(), 1);
        assert_eq!(fx.store.count_in_workspace(&fx.ws).unwrap(), 0);
    }

    #[test]
    fn batch_validates_shape_before_touching_state() {
        let fx = fixture();
        let a = add(&fx, "a", TaskStatus::Todo);
        let change = |position| PositionChange {
            id: a.id.clone(),
            status: TaskStatus::Todo,
            position,
        };
        let empty = BulkUpdate {
            workspace_id: fx.ws.clone(),
            tasks: Vec::new(),
        };
        assert!(matches!(
            fx.store.apply_batch(&empty, "alice"),
            Err(Error::InvalidArgument(_))
        ));
        let dup = BulkUpdate {
            workspace_id: fx.ws.clone(),
            tasks: vec![change(1000), change(3000)],
        };
        assert!(matches!(
            fx.store.apply_batch(&dup, "alice"),
            Err(Error::InvalidArgument(_))
        ));
        let too_high = BulkUpdate {
            workspace_id: fx.ws.clone(),
            tasks: vec![change(POSITION_CEILING + 1)],
        };
        assert!(matches!(
            fx.store.apply_batch(&too_high, "alice"),
            Err(Error::InvalidArgument(_))
        ));
        let unknown = BulkUpdate {
            workspace_id: fx.ws.clone(),
            tasks: vec![PositionChange {
                id: "pl-zzzz".to_string(),
                status: TaskStatus::Todo,
                position: 1000,
            }],
        };
        assert!(matches!(
            fx.store.apply_batch(&unknown, "alice"),
            Err(Error::TaskNotFound(_))
        ));
    }

    #[test]
    fn batch_requires_membership_and_reports_unchanged() {
        let fx = fixture();
        let a = add(&fx, "a", TaskStatus::Todo);
        let b = add(&fx, "b", TaskStatus::Todo);
        let batch = BulkUpdate {
            workspace_id: fx.ws.clone(),
            tasks: vec![
                PositionChange {
                    id: a.id.clone(),
                    status: TaskStatus::Todo,
                    position: 1000,
                },
                PositionChange {
                    id: b.id.clone(),
                    status: TaskStatus::InProgress,
                    position: 1000,
                },
            ],
        };
        assert!(matches!(
            fx.store.apply_batch(&batch, "mallory"),
            Err(Error::NotAMember { .. })
        ));

        let report = fx.store.apply_batch(&batch, "alice").unwrap();
        assert_eq!(report.unchanged, vec![a.id]);
        assert_eq!(report.applied.len(), 1);
        assert_eq!(fx.store.get(&b.id).unwrap().status, TaskStatus::InProgress);
    }

    #[test]
    fn delete_leaves_gap_and_append_continues_after_tail() {
        let fx = fixture();
        add(&fx, "a", TaskStatus::Todo);
        let b = add(&fx, "b", TaskStatus::Todo);
        add(&fx, "c", TaskStatus::Todo);
        fx.store.delete(&b.id, "alice").unwrap();

        let d = add(&fx, "d", TaskStatus::Todo);
        assert_eq!(d.position, 4000);
        assert!(fx.store.board(&fx.ws).unwrap().is_ordered());
        assert!(matches!(fx.store.get(&b.id), Err(Error::TaskNotFound(_))));
    }

    #[test]
    fn edit_validates_assignee_and_supports_clears() {
        let fx = fixture();
        let task = add(&fx, "a", TaskStatus::Todo);
        let err = fx
            .store
            .edit(
                &task.id,
                TaskEdit {
                    assignee: Some("bob".to_string()),
                    ..TaskEdit::default()
                },
                "alice",
            )
            .unwrap_err();
        assert!(matches!(err, Error::NotAMember { .. }));

        let changed = fx
            .store
            .edit(
                &task.id,
                TaskEdit {
                    assignee: Some("alice".to_string()),
                    due_date: Some(parse_due_date("2026-03-01").unwrap()),
                    ..TaskEdit::default()
                },
                "alice",
            )
            .unwrap();
        assert!(changed);
        let cleared = fx
            .store
            .edit(
                &task.id,
                TaskEdit {
                    clear: vec![TaskField::Assignee],
                    ..TaskEdit::default()
                },
                "alice",
            )
            .unwrap();
        assert!(cleared);
        let current = fx.store.get(&task.id).unwrap();
        assert!(current.assignee.is_none());
        assert!(current.due_date.is_some());
        assert!(!fx.store.edit(&task.id, TaskEdit::default(), "alice").unwrap());
    }

    #[test]
    fn comments_are_counted_and_listed() {
        let fx = fixture();
        let task = add(&fx, "a", TaskStatus::Todo);
        fx.store.comment(&task.id, "first", "alice").unwrap();
        fx.store.comment(&task.id, "second", "alice").unwrap();
        let details = fx.store.details(&task.id, "alice").unwrap();
        assert_eq!(details.task.comments_count, 2);
        let texts: Vec<&str> = details.comments.iter().map(|c| c.comment.as_str()).collect();
        assert_eq!(texts, vec!["first", "second"]);
        assert!(fx.store.comment(&task.id, "  ", "alice").is_err());
    }

    #[test]
    fn list_filters_by_status_and_search() {
        let fx = fixture();
        add(&fx, "Write docs", TaskStatus::Todo);
        add(&fx, "Fix login", TaskStatus::InProgress);
        add(&fx, "Docs review", TaskStatus::InReview);

        let filter = TaskFilter {
            search: Some("docs".to_string()),
            ..TaskFilter::default()
        };
        assert_eq!(fx.store.list(&filter, "alice").unwrap().len(), 2);
        let filter = TaskFilter {
            status: Some(TaskStatus::InProgress),
            ..TaskFilter::default()
        };
        let tasks = fx.store.list(&filter, "alice").unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "Fix login");
        assert!(fx.store.list(&TaskFilter::default(), "mallory").unwrap().is_empty());
    }

    #[test]
    fn resolve_accepts_suffix_prefix_and_delimiters() {
        let fx = fixture();
        let task = add(&fx, "a", TaskStatus::Todo);
        let suffix = task.id.trim_start_matches("pl-").to_string();
        assert_eq!(fx.store.resolve_task_id(&suffix).unwrap(), task.id);
        assert_eq!(
            fx.store.resolve_task_id(&format!("PL/{}", suffix.to_uppercase())).unwrap(),
            task.id
        );
        assert!(matches!(
            fx.store.resolve_task_id("nothing-here"),
            Err(Error::TaskNotFound(_))
        ));
    }

    #[test]
    fn rebuild_reproduces_the_snapshot() {
        let fx = fixture();
        let a = add(&fx, "a", TaskStatus::Todo);
        add(&fx, "b", TaskStatus::Todo);
        fx.store.move_task(&a.id, TaskStatus::Done, 0, "alice").unwrap();
        let before = fx.store.load_snapshot().unwrap();

        std::fs::remove_file(fx.store.storage.tasks_snapshot()).unwrap();
        assert_eq!(fx.store.rebuild().unwrap(), 2);
        let after = fx.store.load_snapshot().unwrap();
        let key = |s: &TaskSnapshot| -> Vec<(String, TaskStatus, u32)> {
            s.tasks.iter().map(|t| (t.id.clone(), t.status, t.position)).collect()
        };
        assert_eq!(key(&before), key(&after));
    }

    #[test]
    fn suffix_length_grows_only_when_space_is_exhausted() {
        let mut counts = HashMap::new();
        assert_eq!(select_suffix_len(3, &counts), 3);
        counts.insert(3, 32 * 32 * 32);
        assert_eq!(select_suffix_len(3, &counts), 4);
    }
}
