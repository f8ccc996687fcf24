//! Opened board root: storage, config and every store over it.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::Config;
use crate::discussion::DiscussionStore;
use crate::error::Result;
use crate::notes::NoteStore;
use crate::project::ProjectStore;
use crate::storage::Storage;
use crate::task::TaskStore;
use crate::workspace::{Workspace, WorkspaceStore};

#[derive(Debug, Clone)]
pub struct Context {
    pub storage: Storage,
    pub config: Config,
    pub workspaces: WorkspaceStore,
    pub projects: ProjectStore,
    pub tasks: TaskStore,
    pub notes: NoteStore,
    pub discussion: DiscussionStore,
}

/// What a workspace deletion removed.
#[derive(Debug, Clone, Serialize)]
pub struct WorkspaceRemoval {
    pub workspace: Workspace,
    pub tasks_deleted: usize,
    pub projects_archived: usize,
    pub notes_deleted: usize,
    pub messages_deleted: usize,
}

impl Context {
    /// Discover the board root from `root` (or the current directory).
    pub fn open(root: Option<&Path>) -> Result<Self> {
        let start = match root {
            Some(path) => path.to_path_buf(),
            None => std::env::current_dir()?,
        };
        let storage = Storage::discover(&start)?;
        Self::from_storage(storage)
    }

    pub fn from_storage(storage: Storage) -> Result<Self> {
        let config = Config::load_from_root(storage.root())?;
        Ok(Self::with_config(storage, config))
    }

    pub fn with_config(storage: Storage, config: Config) -> Self {
        Self {
            workspaces: WorkspaceStore::new(storage.clone()),
            projects: ProjectStore::new(storage.clone()),
            tasks: TaskStore::new(storage.clone(), config.clone()),
            notes: NoteStore::new(storage.clone()),
            discussion: DiscussionStore::new(storage.clone(), config.discussion.clone()),
            storage,
            config,
        }
    }

    pub fn root(&self) -> PathBuf {
        self.storage.root().to_path_buf()
    }

    /// Delete a workspace. Refuses while tasks remain unless `force`; a
    /// forced delete removes its tasks, notes and messages and archives
    /// its projects.
    pub fn delete_workspace(&self, key: &str, actor: &str, force: bool) -> Result<WorkspaceRemoval> {
        let ws = self.workspaces.require_admin(key, actor)?;
        let tasks_deleted = self.tasks.delete_workspace_tasks(&ws, actor, force)?;
        let projects_archived = self.projects.archive_all(&ws.id, actor)?;
        let notes_deleted = self.notes.delete_workspace_notes(&ws.id)?;
        let messages_deleted = self.discussion.delete_workspace_messages(&ws.id)?;
        let workspace = self.workspaces.remove(&ws.id, actor)?;
        tracing::info!(
            workspace = %workspace.id,
            tasks_deleted,
            projects_archived,
            "workspace deleted"
        );
        Ok(WorkspaceRemoval {
            workspace,
            tasks_deleted,
            projects_archived,
            notes_deleted,
            messages_deleted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::TaskStatus;
    use crate::error::Error;
    use crate::task::NewTask;

    #[test]
    fn delete_workspace_requires_force_when_tasks_remain() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path().to_path_buf());
        storage.init().unwrap();
        let ctx = Context::from_storage(storage).unwrap();
        let ws = ctx.workspaces.create("Ops", None, "alice").unwrap();
        ctx.projects.create(&ws.id, "Alpha", None, "alice").unwrap();
        ctx.tasks
            .create(
                NewTask {
                    workspace: ws.id.clone(),
                    title: "a".to_string(),
                    status: Some(TaskStatus::Todo),
                    ..NewTask::default()
                },
                "alice",
            )
            .unwrap();

        assert!(matches!(
            ctx.delete_workspace(&ws.id, "alice", false),
            Err(Error::InvalidArgument(_))
        ));
        let removal = ctx.delete_workspace(&ws.id, "alice", true).unwrap();
        assert_eq!(removal.tasks_deleted, 1);
        assert_eq!(removal.projects_archived, 1);
        assert!(ctx.workspaces.get(&ws.id).is_err());
    }

    #[test]
    fn open_discovers_root_from_nested_dir() {
        let dir = tempfile::tempdir().unwrap();
        Storage::new(dir.path().to_path_buf()).init().unwrap();
        let nested = dir.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();
        let ctx = Context::open(Some(&nested)).unwrap();
        assert_eq!(ctx.root(), dir.path());
    }
}
