//! Projects group tasks inside a workspace.
//!
//! `.plank/projects.jsonl` holds one [`ProjectEvent`] per change and is the
//! source of truth. `.plank/projects.snapshot.json` is the folded state,
//! rewritten under the log lock on every append. Replay follows file order.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::error::{Error, Result};
use crate::lock;
use crate::storage::Storage;
use crate::workspace::WorkspaceStore;

const PROJECTS_SCHEMA_VERSION: &str = "plank.projects.v1";
const ID_PREFIX: &str = "prj-";
const ID_SUFFIX_LEN: usize = 8;

/// What happened to a project. The `type` tag sits beside the envelope
/// fields of [`ProjectEvent`] in each log line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProjectChange {
    Created {
        workspace_id: String,
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    /// `description: Some("")` clears it.
    Edited {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    Archived,
    Unarchived,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectEvent {
    pub event_id: String,
    pub project_id: String,
    pub at: DateTime<Utc>,
    pub actor: String,
    #[serde(flatten)]
    pub change: ProjectChange,
}

impl ProjectEvent {
    fn by(actor: &str, project_id: &str, change: ProjectChange) -> Self {
        Self {
            event_id: Ulid::new().to_string(),
            project_id: project_id.to_string(),
            at: Utc::now(),
            actor: actor.to_string(),
            change,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub id: String,
    pub workspace_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub archived: bool,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub updated_at: DateTime<Utc>,
    pub updated_by: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectSnapshot {
    pub schema_version: String,
    pub generated_at: DateTime<Utc>,
    pub projects: Vec<ProjectRecord>,
}

/// Fold events into records keyed by id.
fn fold(
    projects: &mut BTreeMap<String, ProjectRecord>,
    event: &ProjectEvent,
) -> Result<()> {
    if let ProjectChange::Created {
        workspace_id,
        name,
        description,
    } = &event.change
    {
        if projects.contains_key(&event.project_id) {
            return Err(Error::InvalidArgument(format!(
                "project {} created twice in log",
                event.project_id
            )));
        }
        projects.insert(
            event.project_id.clone(),
            ProjectRecord {
                id: event.project_id.clone(),
                workspace_id: workspace_id.clone(),
                name: name.clone(),
                description: non_blank(description.clone()),
                archived: false,
                created_at: event.at,
                created_by: event.actor.clone(),
                updated_at: event.at,
                updated_by: event.actor.clone(),
            },
        );
        return Ok(());
    }

    let record = projects
        .get_mut(&event.project_id)
        .ok_or_else(|| Error::ProjectNotFound(event.project_id.clone()))?;
    match &event.change {
        ProjectChange::Edited { name, description } => {
            if let Some(name) = name {
                record.name = name.clone();
            }
            if description.is_some() {
                record.description = non_blank(description.clone());
            }
        }
        ProjectChange::Archived => record.archived = true,
        ProjectChange::Unarchived => record.archived = false,
        ProjectChange::Created { .. } => {}
    }
    record.updated_at = event.at;
    record.updated_by = event.actor.clone();
    Ok(())
}

fn snapshot_of(projects: BTreeMap<String, ProjectRecord>) -> ProjectSnapshot {
    ProjectSnapshot {
        schema_version: PROJECTS_SCHEMA_VERSION.to_string(),
        generated_at: Utc::now(),
        projects: projects.into_values().collect(),
    }
}

fn non_blank(text: Option<String>) -> Option<String> {
    text.filter(|value| !value.trim().is_empty())
}

fn clean_name(name: &str) -> Result<String> {
    match name.trim() {
        "" => Err(Error::InvalidArgument(
            "project name cannot be empty".to_string(),
        )),
        trimmed => Ok(trimmed.to_string()),
    }
}

#[derive(Debug, Clone)]
pub struct ProjectStore {
    storage: Storage,
    workspaces: WorkspaceStore,
}

impl ProjectStore {
    pub fn new(storage: Storage) -> Self {
        Self {
            workspaces: WorkspaceStore::new(storage.clone()),
            storage,
        }
    }

    /// Append `events` and refresh the snapshot in one locked step.
    fn record(&self, events: Vec<ProjectEvent>) -> Result<()> {
        if events.is_empty() {
            return Ok(());
        }
        let log = self.storage.projects_log();
        lock::with_lock(&log, || {
            let mut projects: BTreeMap<String, ProjectRecord> = self
                .load_snapshot()?
                .projects
                .into_iter()
                .map(|record| (record.id.clone(), record))
                .collect();
            for event in &events {
                fold(&mut projects, event)?;
            }
            self.storage.append_jsonl(&log, &events)?;
            self.storage
                .write_json(&self.storage.projects_snapshot(), &snapshot_of(projects))
        })?;
        for event in &events {
            tracing::debug!(project = %event.project_id, change = ?event.change, "project event recorded");
        }
        Ok(())
    }

    /// Projects of a workspace the actor belongs to, by name.
    pub fn list(
        &self,
        workspace: &str,
        actor: &str,
        include_archived: bool,
    ) -> Result<Vec<ProjectRecord>> {
        let ws = self.workspaces.require_member(workspace, actor)?;
        let mut projects: Vec<ProjectRecord> = self
            .load_snapshot()?
            .projects
            .into_iter()
            .filter(|p| p.workspace_id == ws.id && (include_archived || !p.archived))
            .collect();
        projects.sort_by_cached_key(|p| (p.name.to_lowercase(), p.id.clone()));
        Ok(projects)
    }

    /// Look up by full id, id prefix, or the suffix after `prj-`.
    pub fn get(&self, key: &str) -> Result<ProjectRecord> {
        let id = self.resolve_project_id(key)?;
        self.load_snapshot()?
            .projects
            .into_iter()
            .find(|p| p.id == id)
            .ok_or_else(|| Error::ProjectNotFound(key.to_string()))
    }

    /// [`get`](Self::get), restricted to workspaces the actor belongs to.
    pub fn get_for(&self, key: &str, actor: &str) -> Result<ProjectRecord> {
        let project = self.get(key)?;
        self.workspaces.require_member(&project.workspace_id, actor)?;
        Ok(project)
    }

    pub fn create(
        &self,
        workspace: &str,
        name: &str,
        description: Option<String>,
        actor: &str,
    ) -> Result<ProjectRecord> {
        let ws = self.workspaces.require_member(workspace, actor)?;
        let name = clean_name(name)?;
        let id = self.fresh_id()?;
        self.record(vec![ProjectEvent::by(
            actor,
            &id,
            ProjectChange::Created {
                workspace_id: ws.id,
                name,
                description: non_blank(description),
            },
        )])?;
        self.get(&id)
    }

    /// Rename and/or redescribe. `Ok(false)` when the values already match.
    pub fn edit(
        &self,
        key: &str,
        name: Option<String>,
        description: Option<String>,
        actor: &str,
    ) -> Result<bool> {
        let current = self.get_for(key, actor)?;
        let name = name
            .as_deref()
            .map(clean_name)
            .transpose()?
            .filter(|name| *name != current.name);
        let description = description
            .filter(|text| non_blank(Some(text.clone())) != current.description);
        if name.is_none() && description.is_none() {
            return Ok(false);
        }
        self.record(vec![ProjectEvent::by(
            actor,
            &current.id,
            ProjectChange::Edited { name, description },
        )])?;
        Ok(true)
    }

    /// Archive or restore; admins only. `Ok(false)` when already in that state.
    pub fn set_archived(&self, key: &str, archived: bool, actor: &str) -> Result<bool> {
        let current = self.get(key)?;
        self.workspaces.require_admin(&current.workspace_id, actor)?;
        if current.archived == archived {
            return Ok(false);
        }
        let change = if archived {
            ProjectChange::Archived
        } else {
            ProjectChange::Unarchived
        };
        self.record(vec![ProjectEvent::by(actor, &current.id, change)])?;
        Ok(true)
    }

    /// Archive every active project of a deleted workspace.
    pub fn archive_all(&self, workspace_id: &str, actor: &str) -> Result<usize> {
        let events: Vec<ProjectEvent> = self
            .load_snapshot()?
            .projects
            .iter()
            .filter(|p| p.workspace_id == workspace_id && !p.archived)
            .map(|p| ProjectEvent::by(actor, &p.id, ProjectChange::Archived))
            .collect();
        let count = events.len();
        self.record(events)?;
        Ok(count)
    }

    pub fn resolve_project_id(&self, key: &str) -> Result<String> {
        let needle = key.trim().to_ascii_lowercase();
        if needle.is_empty() {
            return Err(Error::InvalidArgument(
                "project id cannot be empty".to_string(),
            ));
        }
        let ids: Vec<String> = self
            .load_snapshot()?
            .projects
            .into_iter()
            .map(|p| p.id)
            .collect();
        if let Some(exact) = ids.iter().find(|id| id.eq_ignore_ascii_case(&needle)) {
            return Ok(exact.clone());
        }
        let suffix = format!("{ID_PREFIX}{needle}");
        let matches: Vec<&String> = ids
            .iter()
            .filter(|id| {
                let id = id.to_ascii_lowercase();
                id.starts_with(&needle) || id.starts_with(&suffix)
            })
            .collect();
        match matches.as_slice() {
            [] => Err(Error::ProjectNotFound(key.trim().to_string())),
            [only] => Ok((*only).clone()),
            many => Err(Error::InvalidArgument(format!(
                "ambiguous project id '{}' matches {} projects",
                key.trim(),
                many.len()
            ))),
        }
    }

    fn fresh_id(&self) -> Result<String> {
        let taken = self.load_snapshot()?.projects;
        loop {
            let ulid = Ulid::new().to_string().to_ascii_lowercase();
            let id = format!("{ID_PREFIX}{}", &ulid[ulid.len() - ID_SUFFIX_LEN..]);
            if taken.iter().all(|p| p.id != id) {
                return Ok(id);
            }
        }
    }

    /// The snapshot, or a replay of the log when it is missing.
    pub fn load_snapshot(&self) -> Result<ProjectSnapshot> {
        let path = self.storage.projects_snapshot();
        if path.exists() {
            return self.storage.read_json(&path);
        }
        self.replay()
    }

    fn replay(&self) -> Result<ProjectSnapshot> {
        let events: Vec<ProjectEvent> = self.storage.read_jsonl(&self.storage.projects_log())?;
        let mut projects = BTreeMap::new();
        for event in &events {
            fold(&mut projects, event)?;
        }
        Ok(snapshot_of(projects))
    }

    /// Replay the log and overwrite the snapshot. Returns the project count.
    pub fn rebuild(&self) -> Result<usize> {
        let log = self.storage.projects_log();
        lock::with_lock(&log, || {
            let snapshot = self.replay()?;
            self.storage
                .write_json(&self.storage.projects_snapshot(), &snapshot)?;
            Ok(snapshot.projects.len())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board() -> (tempfile::TempDir, ProjectStore, String) {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path().to_path_buf());
        storage.init().unwrap();
        let ws = WorkspaceStore::new(storage.clone())
            .create("Ops", None, "alice")
            .unwrap();
        (dir, ProjectStore::new(storage), ws.id)
    }

    #[test]
    fn short_keys_resolve_to_the_project() {
        let (_dir, store, ws) = board();
        let project = store
            .create(&ws, "  Alpha ", Some("desc".to_string()), "alice")
            .unwrap();
        assert!(project.id.starts_with("prj-"));
        assert_eq!(project.name, "Alpha");
        assert_eq!(project.created_by, "alice");
        assert_eq!(store.resolve_project_id(&project.id[4..]).unwrap(), project.id);
        assert_eq!(store.resolve_project_id(&project.id.to_uppercase()).unwrap(), project.id);
        assert!(store.get("prj-zzzzzzzzz").unwrap_err().is_not_found());
    }

    #[test]
    fn non_members_cannot_create_projects() {
        let (_dir, store, ws) = board();
        let err = store.create(&ws, "Alpha", None, "mallory").unwrap_err();
        assert!(matches!(err, Error::NotAMember { .. }));
        assert!(store.create(&ws, "   ", None, "alice").is_err());
    }

    #[test]
    fn archived_projects_are_hidden_unless_asked() {
        let (_dir, store, ws) = board();
        let project = store.create(&ws, "Alpha", None, "alice").unwrap();
        store.create(&ws, "beta", None, "alice").unwrap();
        assert!(store.set_archived(&project.id, true, "alice").unwrap());
        assert!(!store.set_archived(&project.id, true, "alice").unwrap());

        let names = |all| -> Vec<String> {
            store
                .list(&ws, "alice", all)
                .unwrap()
                .into_iter()
                .map(|p| p.name)
                .collect()
        };
        assert_eq!(names(false), ["beta"]);
        assert_eq!(names(true), ["Alpha", "beta"]);
    }

    #[test]
    fn edit_only_records_real_changes() {
        let (_dir, store, ws) = board();
        let project = store.create(&ws, "Alpha", None, "alice").unwrap();
        assert!(!store.edit(&project.id, Some(" Alpha".into()), None, "alice").unwrap());
        assert!(store.edit(&project.id, None, Some("notes".into()), "alice").unwrap());
        assert_eq!(store.get(&project.id).unwrap().description.as_deref(), Some("notes"));
        assert!(store.edit(&project.id, None, Some(String::new()), "alice").unwrap());
        assert!(store.get(&project.id).unwrap().description.is_none());
        assert!(!store.edit(&project.id, None, Some(String::new()), "alice").unwrap());
    }

    #[test]
    fn log_lines_carry_a_type_tag() {
        let (_dir, store, ws) = board();
        let project = store.create(&ws, "Alpha", None, "alice").unwrap();
        store.set_archived(&project.id, true, "alice").unwrap();
        let lines: Vec<serde_json::Value> =
            store.storage.read_jsonl(&store.storage.projects_log()).unwrap();
        assert_eq!(lines[0]["type"], "created");
        assert_eq!(lines[0]["workspace_id"], ws.as_str());
        assert_eq!(lines[1]["type"], "archived");
    }

    #[test]
    fn rebuild_matches_incremental_snapshot() {
        let (_dir, store, ws) = board();
        let one = store.create(&ws, "One", None, "alice").unwrap();
        store.create(&ws, "Two", None, "alice").unwrap();
        store.edit(&one.id, Some("Uno".into()), None, "alice").unwrap();
        let before = store.load_snapshot().unwrap().projects;

        std::fs::remove_file(store.storage.projects_snapshot()).unwrap();
        assert_eq!(store.load_snapshot().unwrap().projects, before);
        assert_eq!(store.rebuild().unwrap(), 2);
        assert_eq!(store.get(&one.id).unwrap().name, "Uno");
    }
}
