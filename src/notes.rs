//! Workspace notes, kept in the locked `.plank/notes.json` registry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::error::{Error, Result};
use crate::storage::Storage;
use crate::workspace::WorkspaceStore;

const NOTE_ID_PREFIX: &str = "note";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub workspace_id: String,
    pub title: String,
    #[serde(default)]
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub updated_at: DateTime<Utc>,
    pub updated_by: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotesRegistry {
    pub notes: Vec<Note>,
}

impl NotesRegistry {
    fn position(&self, key: &str) -> Result<usize> {
        let needle = key.trim().to_ascii_lowercase();
        if needle.is_empty() {
            return Err(Error::InvalidArgument("note id cannot be empty".to_string()));
        }
        let hits: Vec<usize> = self
            .notes
            .iter()
            .enumerate()
            .filter(|(_, note)| {
                let id = note.id.to_ascii_lowercase();
                id == needle || id.starts_with(&needle) || id.ends_with(&format!("-{needle}"))
            })
            .map(|(idx, _)| idx)
            .collect();
        if let Some(idx) = hits
            .iter()
            .copied()
            .find(|idx| self.notes[*idx].id.eq_ignore_ascii_case(&needle))
        {
            return Ok(idx);
        }
        match hits.as_slice() {
            [] => Err(Error::NoteNotFound(key.trim().to_string())),
            [idx] => Ok(*idx),
            many => Err(Error::InvalidArgument(format!(
                "ambiguous note id '{}': {}",
                key.trim(),
                many.iter()
                    .map(|idx| self.notes[*idx].id.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NoteStore {
    storage: Storage,
    workspaces: WorkspaceStore,
}

impl NoteStore {
    pub fn new(storage: Storage) -> Self {
        let workspaces = WorkspaceStore::new(storage.clone());
        Self {
            storage,
            workspaces,
        }
    }

    fn read(&self) -> Result<NotesRegistry> {
        self.storage.read_registry(&self.storage.notes_file())
    }

    fn update<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut NotesRegistry) -> Result<T>,
    {
        self.storage
            .update_registry(&self.storage.notes_file(), f)
    }

    /// Notes of a workspace, most recently updated first.
    pub fn list(&self, workspace: &str, actor: &str) -> Result<Vec<Note>> {
        let ws = self.workspaces.require_member(workspace, actor)?;
        let mut notes = self.read()?.notes;
        notes.retain(|note| note.workspace_id == ws.id);
        notes.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.id.cmp(&b.id)));
        Ok(notes)
    }

    pub fn get(&self, key: &str, actor: &str) -> Result<Note> {
        let registry = self.read()?;
        let note = registry.notes[registry.position(key)?].clone();
        self.workspaces.require_member(&note.workspace_id, actor)?;
        Ok(note)
    }

    pub fn create(&self, workspace: &str, title: &str, body: &str, actor: &str) -> Result<Note> {
        let ws = self.workspaces.require_member(workspace, actor)?;
        let title = validate_title(title)?;
        let body = body.to_string();
        let actor = actor.to_string();
        let note = self.update(move |registry| {
            let now = Utc::now();
            let raw = Ulid::new().to_string().to_ascii_lowercase();
            let note = Note {
                id: format!("{NOTE_ID_PREFIX}-{}", &raw[raw.len() - 8..]),
                workspace_id: ws.id,
                title,
                body,
                created_at: now,
                created_by: actor.clone(),
                updated_at: now,
                updated_by: actor,
            };
            registry.notes.push(note.clone());
            Ok(note)
        })?;
        tracing::info!(note = %note.id, workspace = %note.workspace_id, "note created");
        Ok(note)
    }

    /// Returns the note and whether anything changed.
    pub fn edit(
        &self,
        key: &str,
        title: Option<String>,
        body: Option<String>,
        actor: &str,
    ) -> Result<(Note, bool)> {
        let current = self.get(key, actor)?;
        let title = title.as_deref().map(validate_title).transpose()?;
        self.update(|registry| {
            let idx = registry.position(&current.id)?;
            let note = &mut registry.notes[idx];
            let mut changed = false;
            if let Some(title) = title {
                if title != note.title {
                    note.title = title;
                    changed = true;
                }
            }
            if let Some(body) = body {
                if body != note.body {
                    note.body = body;
                    changed = true;
                }
            }
            if changed {
                note.updated_at = Utc::now();
                note.updated_by = actor.to_string();
            }
            Ok((note.clone(), changed))
        })
    }

    pub fn delete(&self, key: &str, actor: &str) -> Result<Note> {
        let current = self.get(key, actor)?;
        let removed = self.update(|registry| {
            let idx = registry.position(&current.id)?;
            Ok(registry.notes.remove(idx))
        })?;
        tracing::info!(note = %removed.id, "note deleted");
        Ok(removed)
    }

    /// Drop every note of a workspace (used when it is deleted).
    pub fn delete_workspace_notes(&self, workspace_id: &str) -> Result<usize> {
        self.update(|registry| {
            let before = registry.notes.len();
            registry.notes.retain(|note| note.workspace_id != workspace_id);
            Ok(before - registry.notes.len())
        })
    }
}

fn validate_title(title: &str) -> Result<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(Error::InvalidArgument("note title cannot be empty".to_string()));
    }
    Ok(title.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (tempfile::TempDir, NoteStore, String) {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path().to_path_buf());
        storage.init().unwrap();
        let ws = WorkspaceStore::new(storage.clone())
            .create("Ops", None, "alice")
            .unwrap();
        (dir, NoteStore::new(storage), ws.id)
    }

    #[test]
    fn notes_are_scoped_to_members() {
        let (_dir, store, ws) = setup();
        let note = store.create(&ws, "Runbook", "restart it", "alice").unwrap();
        assert!(note.id.starts_with("note-"));
        assert_eq!(store.list(&ws, "alice").unwrap().len(), 1);
        assert!(matches!(
            store.get(&note.id, "mallory"),
            Err(Error::NotAMember { .. })
        ));
        assert!(store.create(&ws, "x", "", "mallory").is_err());
    }

    #[test]
    fn edit_and_delete_by_suffix() {
        let (_dir, store, ws) = setup();
        let note = store.create(&ws, "Runbook", "", "alice").unwrap();
        let suffix = note.id.trim_start_matches("note-");

        let (edited, changed) = store
            .edit(suffix, None, Some("step one".to_string()), "alice")
            .unwrap();
        assert!(changed);
        assert_eq!(edited.body, "step one");
        let (_, changed) = store.edit(suffix, Some("Runbook".to_string()), None, "alice").unwrap();
        assert!(!changed);

        store.delete(suffix, "alice").unwrap();
        assert!(matches!(store.get(&note.id, "alice"), Err(Error::NoteNotFound(_))));
    }
}
