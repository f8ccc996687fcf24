//! Workspaces and their members.
//!
//! The registry lives in `.plank/workspaces.json` and is always rewritten
//! under its lock. A workspace keeps at least one admin at all times.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::storage::Storage;

const WORKSPACE_ID_PREFIX: &str = "ws";
const WORKSPACE_ID_SUFFIX_LEN: usize = 8;
const INVITE_CODE_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Member,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Member => "member",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "member" => Ok(Role::Member),
            other => Err(format!("invalid role '{other}' (expected admin|member)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub actor: String,
    pub role: Role,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workspace {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub invite_code: String,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub members: Vec<Member>,
}

impl Workspace {
    pub fn member(&self, actor: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.actor == actor)
    }

    pub fn is_member(&self, actor: &str) -> bool {
        self.member(actor).is_some()
    }

    pub fn is_admin(&self, actor: &str) -> bool {
        self.member(actor).map(|m| m.role == Role::Admin).unwrap_or(false)
    }

    pub fn ensure_member(&self, actor: &str) -> Result<()> {
        require_member_in(self, actor)
    }

    fn admin_count(&self) -> usize {
        self.members.iter().filter(|m| m.role == Role::Admin).count()
    }
}

/// Registry of all workspaces on this board
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkspacesRegistry {
    pub workspaces: Vec<Workspace>,
}

impl WorkspacesRegistry {
    /// Resolve by exact id, exact name (case-insensitive) or unique id prefix.
    pub fn resolve(&self, key: &str) -> Result<usize> {
        let key = key.trim();
        if key.is_empty() {
            return Err(Error::InvalidArgument(
                "workspace id cannot be empty".to_string(),
            ));
        }
        let needle = key.to_ascii_lowercase();

        if let Some(idx) = self
            .workspaces
            .iter()
            .position(|ws| ws.id.to_ascii_lowercase() == needle)
        {
            return Ok(idx);
        }
        if let Some(idx) = self
            .workspaces
            .iter()
            .position(|ws| ws.name.to_ascii_lowercase() == needle)
        {
            return Ok(idx);
        }

        let prefixed: Vec<usize> = self
            .workspaces
            .iter()
            .enumerate()
            .filter(|(_, ws)| ws.id.to_ascii_lowercase().starts_with(&needle))
            .map(|(idx, _)| idx)
            .collect();
        match prefixed.as_slice() {
            [idx] => Ok(*idx),
            [] => Err(Error::WorkspaceNotFound(key.to_string())),
            many => Err(Error::InvalidArgument(format!(
                "ambiguous workspace id '{}': {}",
                key,
                many.iter()
                    .map(|idx| self.workspaces[*idx].id.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ))),
        }
    }

    fn find_by_invite(&self, code: &str) -> Option<usize> {
        let code = code.trim().to_ascii_lowercase();
        self.workspaces.iter().position(|ws| ws.invite_code == code)
    }

    fn name_taken(&self, name: &str, except_id: Option<&str>) -> bool {
        self.workspaces.iter().any(|ws| {
            ws.name.eq_ignore_ascii_case(name) && Some(ws.id.as_str()) != except_id
        })
    }

    /// Unique ids and names, every workspace with an admin.
    pub fn validate(&self) -> Result<()> {
        let mut ids = HashSet::new();
        let mut names = HashSet::new();
        for ws in &self.workspaces {
            if !ids.insert(ws.id.clone()) {
                return Err(Error::InvalidArgument(format!(
                    "duplicate workspace id: {}",
                    ws.id
                )));
            }
            if !names.insert(ws.name.to_ascii_lowercase()) {
                return Err(Error::InvalidArgument(format!(
                    "duplicate workspace name: {}",
                    ws.name
                )));
            }
            if ws.admin_count() == 0 {
                return Err(Error::InvalidArgument(format!(
                    "workspace {} would be left without an admin",
                    ws.name
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JoinOutcome {
    pub workspace: Workspace,
    pub joined: bool,
}

#[derive(Debug, Clone)]
pub struct WorkspaceStore {
    storage: Storage,
}

impl WorkspaceStore {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    fn read(&self) -> Result<WorkspacesRegistry> {
        self.storage.read_registry(&self.storage.workspaces_file())
    }

    fn update<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut WorkspacesRegistry) -> Result<T>,
    {
        self.storage
            .update_registry(&self.storage.workspaces_file(), |registry: &mut WorkspacesRegistry| {
                let result = f(registry)?;
                registry.validate()?;
                Ok(result)
            })
    }

    /// All workspaces, or only those `member` belongs to.
    pub fn list(&self, member: Option<&str>) -> Result<Vec<Workspace>> {
        let mut workspaces = self.read()?.workspaces;
        if let Some(actor) = member {
            workspaces.retain(|ws| ws.is_member(actor));
        }
        workspaces.sort_by(|a, b| a.name.to_ascii_lowercase().cmp(&b.name.to_ascii_lowercase()));
        Ok(workspaces)
    }

    pub fn get(&self, key: &str) -> Result<Workspace> {
        let registry = self.read()?;
        let idx = registry.resolve(key)?;
        Ok(registry.workspaces[idx].clone())
    }

    pub fn create(&self, name: &str, description: Option<String>, actor: &str) -> Result<Workspace> {
        let name = validate_name(name)?;
        let description = normalize_description(description);
        let actor = actor.to_string();
        let workspace = self.update(|registry| {
            if registry.name_taken(&name, None) {
                return Err(Error::InvalidArgument(format!(
                    "workspace already exists: {name}"
                )));
            }
            let now = Utc::now();
            let existing: HashSet<&str> = registry.workspaces.iter().map(|ws| ws.id.as_str()).collect();
            let id = loop {
                let candidate = generate_workspace_id();
                if !existing.contains(candidate.as_str()) {
                    break candidate;
                }
            };
            let workspace = Workspace {
                id,
                name,
                description,
                invite_code: generate_invite_code(),
                created_at: now,
                created_by: actor.clone(),
                updated_at: now,
                members: vec![Member {
                    actor: actor.clone(),
                    role: Role::Admin,
                    joined_at: now,
                }],
            };
            registry.workspaces.push(workspace.clone());
            Ok(workspace)
        })?;
        tracing::info!(workspace = %workspace.id, actor = %workspace.created_by, "workspace created");
        Ok(workspace)
    }

    /// Rename or re-describe a workspace. `Some("")` clears the description.
    pub fn edit(
        &self,
        key: &str,
        name: Option<String>,
        description: Option<String>,
        actor: &str,
    ) -> Result<Workspace> {
        let name = name.map(|n| validate_name(&n)).transpose()?;
        self.update(|registry| {
            let idx = registry.resolve(key)?;
            let id = registry.workspaces[idx].id.clone();
            require_admin_in(&registry.workspaces[idx], actor)?;
            if let Some(name) = name.as_deref() {
                if registry.name_taken(name, Some(&id)) {
                    return Err(Error::InvalidArgument(format!(
                        "workspace already exists: {name}"
                    )));
                }
            }
            let ws = &mut registry.workspaces[idx];
            if let Some(name) = name {
                ws.name = name;
            }
            if description.is_some() {
                ws.description = normalize_description(description);
            }
            ws.updated_at = Utc::now();
            Ok(ws.clone())
        })
    }

    /// Drop a workspace from the registry. Callers clean up its tasks.
    pub fn remove(&self, key: &str, actor: &str) -> Result<Workspace> {
        let removed = self.update(|registry| {
            let idx = registry.resolve(key)?;
            require_admin_in(&registry.workspaces[idx], actor)?;
            Ok(registry.workspaces.remove(idx))
        })?;
        tracing::info!(workspace = %removed.id, actor, "workspace removed");
        Ok(removed)
    }

    /// Join through an invite code. Joining twice is a no-op.
    pub fn join(&self, invite_code: &str, actor: &str) -> Result<JoinOutcome> {
        let code = invite_code.trim();
        if code.is_empty() {
            return Err(Error::InvalidArgument(
                "invite code cannot be empty".to_string(),
            ));
        }
        let outcome = self.update(|registry| {
            let idx = registry
                .find_by_invite(code)
                .ok_or_else(|| Error::InvalidArgument(format!("unknown invite code: {code}")))?;
            let ws = &mut registry.workspaces[idx];
            if ws.is_member(actor) {
                return Ok(JoinOutcome {
                    workspace: ws.clone(),
                    joined: false,
                });
            }
            ws.members.push(Member {
                actor: actor.to_string(),
                role: Role::Member,
                joined_at: Utc::now(),
            });
            ws.updated_at = Utc::now();
            Ok(JoinOutcome {
                workspace: ws.clone(),
                joined: true,
            })
        })?;
        if outcome.joined {
            tracing::info!(workspace = %outcome.workspace.id, actor, "member joined");
        }
        Ok(outcome)
    }

    /// Issue a fresh invite code; the old one stops working.
    pub fn reset_invite(&self, key: &str, actor: &str) -> Result<Workspace> {
        self.update(|registry| {
            let idx = registry.resolve(key)?;
            require_admin_in(&registry.workspaces[idx], actor)?;
            let ws = &mut registry.workspaces[idx];
            ws.invite_code = generate_invite_code();
            ws.updated_at = Utc::now();
            Ok(ws.clone())
        })
    }

    pub fn set_role(&self, key: &str, target: &str, role: Role, actor: &str) -> Result<Workspace> {
        self.update(|registry| {
            let idx = registry.resolve(key)?;
            require_admin_in(&registry.workspaces[idx], actor)?;
            let ws = &mut registry.workspaces[idx];
            let current = ws
                .member(target)
                .map(|m| m.role)
                .ok_or_else(|| Error::InvalidArgument(format!("{target} is not a member of {}", ws.name)))?;
            if current == Role::Admin && role == Role::Member && ws.admin_count() == 1 {
                return Err(Error::InvalidArgument(format!(
                    "{target} is the last admin of {}",
                    ws.name
                )));
            }
            if let Some(member) = ws.members.iter_mut().find(|m| m.actor == target) {
                member.role = role;
            }
            ws.updated_at = Utc::now();
            Ok(ws.clone())
        })
    }

    /// Remove a member. Admins may remove anyone; members may remove themselves.
    pub fn remove_member(&self, key: &str, target: &str, actor: &str) -> Result<Workspace> {
        self.update(|registry| {
            let idx = registry.resolve(key)?;
            let ws = &mut registry.workspaces[idx];
            if target != actor {
                require_admin_in(ws, actor)?;
            } else {
                require_member_in(ws, actor)?;
            }
            let member = ws
                .member(target)
                .cloned()
                .ok_or_else(|| Error::InvalidArgument(format!("{target} is not a member of {}", ws.name)))?;
            if member.role == Role::Admin && ws.admin_count() == 1 {
                return Err(Error::InvalidArgument(format!(
                    "{target} is the last admin of {}",
                    ws.name
                )));
            }
            ws.members.retain(|m| m.actor != target);
            ws.updated_at = Utc::now();
            Ok(ws.clone())
        })
    }

    /// Resolve `key` and check that `actor` belongs to it.
    pub fn require_member(&self, key: &str, actor: &str) -> Result<Workspace> {
        let ws = self.get(key)?;
        require_member_in(&ws, actor)?;
        Ok(ws)
    }

    /// Resolve `key` and check that `actor` administers it.
    pub fn require_admin(&self, key: &str, actor: &str) -> Result<Workspace> {
        let ws = self.get(key)?;
        require_admin_in(&ws, actor)?;
        Ok(ws)
    }
}

fn require_member_in(ws: &Workspace, actor: &str) -> Result<()> {
    if ws.is_member(actor) {
        Ok(())
    } else {
        Err(Error::NotAMember {
            workspace: ws.name.clone(),
            actor: actor.to_string(),
        })
    }
}

fn require_admin_in(ws: &Workspace, actor: &str) -> Result<()> {
    require_member_in(ws, actor)?;
    if ws.is_admin(actor) {
        Ok(())
    } else {
        Err(Error::AdminRequired {
            workspace: ws.name.clone(),
            actor: actor.to_string(),
        })
    }
}

fn validate_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::InvalidArgument(
            "workspace name cannot be empty".to_string(),
        ));
    }
    if name.chars().count() > 80 {
        return Err(Error::InvalidArgument(
            "workspace name must be at most 80 characters".to_string(),
        ));
    }
    Ok(name.to_string())
}

fn normalize_description(description: Option<String>) -> Option<String> {
    let description = description?;
    let trimmed = description.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn generate_workspace_id() -> String {
    let raw = Ulid::new().to_string().to_ascii_lowercase();
    format!(
        "{WORKSPACE_ID_PREFIX}-{}",
        &raw[raw.len() - WORKSPACE_ID_SUFFIX_LEN..]
    )
}

fn generate_invite_code() -> String {
    Uuid::new_v4().simple().to_string()[..INVITE_CODE_LEN].to_string()
}
