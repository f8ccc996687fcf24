//! Workspace and membership commands
//!
//! Implements `plank ws new|list|show|edit|rm|join|invite|members|role|kick`.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cli::GlobalOptions;
use crate::error::{Error, Result};
use crate::events::EventKind;
use crate::output::{emit_success, HumanOutput};
use crate::workspace::{Member, Role, Workspace};

/// Options for `plank ws new`
pub struct NewOptions {
    pub name: String,
    pub description: Option<String>,
    pub globals: GlobalOptions,
}

pub struct ListOptions {
    pub all: bool,
    pub globals: GlobalOptions,
}

/// Options for commands that only name a workspace
pub struct KeyOptions {
    pub workspace: String,
    pub globals: GlobalOptions,
}

pub struct EditOptions {
    pub workspace: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub globals: GlobalOptions,
}

pub struct RmOptions {
    pub workspace: String,
    pub force: bool,
    pub globals: GlobalOptions,
}

pub struct JoinOptions {
    pub code: String,
    pub globals: GlobalOptions,
}

pub struct InviteOptions {
    pub workspace: String,
    pub reset: bool,
    pub globals: GlobalOptions,
}

pub struct RoleOptions {
    pub workspace: String,
    pub member: String,
    pub role: String,
    pub globals: GlobalOptions,
}

pub struct KickOptions {
    pub workspace: String,
    pub member: String,
    pub globals: GlobalOptions,
}

/// Workspace as shown to a caller; the invite code only reaches admins.
#[derive(Debug, Serialize)]
pub struct WorkspaceView {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invite_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    pub members: usize,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
}

impl WorkspaceView {
    fn new(ws: &Workspace, actor: &str) -> Self {
        Self {
            id: ws.id.clone(),
            name: ws.name.clone(),
            description: ws.description.clone(),
            invite_code: ws.is_admin(actor).then(|| ws.invite_code.clone()),
            role: ws.member(actor).map(|m| m.role),
            members: ws.members.len(),
            created_at: ws.created_at,
            created_by: ws.created_by.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ListOutput {
    total: usize,
    workspaces: Vec<WorkspaceView>,
}

#[derive(Debug, Serialize)]
struct MembersOutput {
    workspace_id: String,
    members: Vec<Member>,
}

#[derive(Debug, Serialize)]
struct MemberChange<'a> {
    workspace_id: &'a str,
    member: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<Role>,
}

pub fn run_new(opts: NewOptions) -> Result<()> {
    let mut session = opts.globals.open()?;
    let ws = session
        .ctx
        .workspaces
        .create(&opts.name, opts.description, &session.actor)?;
    let warning = session.emit(EventKind::WorkspaceCreated, &ws);
    let view = WorkspaceView::new(&ws, &session.actor);

    let mut human = HumanOutput::new(format!("Workspace created: {}", ws.name));
    human.push_summary("ID", ws.id.clone());
    human.push_summary("Invite code", ws.invite_code.clone());
    human.push_summary("Admin", session.actor.clone());
    human.extend_warnings(warning);
    human.push_next_step(format!("plank task new --workspace {} \"<title>\"", ws.id));

    emit_success(session.output(), "ws new", &view, Some(&human))
}

pub fn run_list(opts: ListOptions) -> Result<()> {
    let session = opts.globals.open()?;
    let member = (!opts.all).then_some(session.actor.as_str());
    let workspaces = session.ctx.workspaces.list(member)?;
    let views: Vec<WorkspaceView> = workspaces
        .iter()
        .map(|ws| WorkspaceView::new(ws, &session.actor))
        .collect();

    let mut human = HumanOutput::new("Workspaces");
    human.push_summary("Total", views.len().to_string());
    for view in &views {
        let role = view.role.map(|r| r.as_str()).unwrap_or("-");
        human.push_detail(format!("{}  {}  ({role}, {} members)", view.id, view.name, view.members));
    }
    if views.is_empty() {
        human.push_next_step("plank ws new <name>");
        human.push_next_step("plank ws join <invite-code>");
    }

    let output = ListOutput {
        total: views.len(),
        workspaces: views,
    };
    emit_success(session.output(), "ws list", &output, Some(&human))
}

pub fn run_show(opts: KeyOptions) -> Result<()> {
    let session = opts.globals.open()?;
    let ws = session
        .ctx
        .workspaces
        .require_member(&opts.workspace, &session.actor)?;
    let tasks = session.ctx.tasks.count_in_workspace(&ws.id)?;
    let view = WorkspaceView::new(&ws, &session.actor);

    let mut human = HumanOutput::new(format!("Workspace {}", ws.name));
    human.push_summary("ID", ws.id.clone());
    if let Some(description) = ws.description.as_deref() {
        human.push_summary("Description", description);
    }
    if let Some(code) = view.invite_code.as_deref() {
        human.push_summary("Invite code", code);
    }
    human.push_summary("Members", ws.members.len().to_string());
    human.push_summary("Tasks", tasks.to_string());
    human.push_summary("Created", format!("{} by {}", ws.created_at.to_rfc3339(), ws.created_by));

    emit_success(session.output(), "ws show", &view, Some(&human))
}

pub fn run_edit(opts: EditOptions) -> Result<()> {
    if opts.name.is_none() && opts.description.is_none() {
        return Err(Error::InvalidArgument(
            "nothing to edit (use --name or --description)".to_string(),
        ));
    }
    let mut session = opts.globals.open()?;
    let ws = session
        .ctx
        .workspaces
        .edit(&opts.workspace, opts.name, opts.description, &session.actor)?;
    let warning = session.emit(EventKind::WorkspaceEdited, &ws);

    let mut human = HumanOutput::new(format!("Workspace updated: {}", ws.name));
    human.push_summary("ID", ws.id.clone());
    human.extend_warnings(warning);
    let view = WorkspaceView::new(&ws, &session.actor);
    emit_success(session.output(), "ws edit", &view, Some(&human))
}

pub fn run_rm(opts: RmOptions) -> Result<()> {
    let mut session = opts.globals.open()?;
    let removal = session
        .ctx
        .delete_workspace(&opts.workspace, &session.actor, opts.force)?;
    let warning = session.emit(EventKind::WorkspaceRemoved, &removal);

    let mut human = HumanOutput::new(format!("Workspace deleted: {}", removal.workspace.name));
    human.push_summary("ID", removal.workspace.id.clone());
    human.push_summary("Tasks deleted", removal.tasks_deleted.to_string());
    human.push_summary("Projects archived", removal.projects_archived.to_string());
    human.push_summary("Notes deleted", removal.notes_deleted.to_string());
    human.push_summary("Messages deleted", removal.messages_deleted.to_string());
    human.extend_warnings(warning);

    emit_success(session.output(), "ws rm", &removal, Some(&human))
}

pub fn run_join(opts: JoinOptions) -> Result<()> {
    let mut session = opts.globals.open()?;
    let outcome = session.ctx.workspaces.join(&opts.code, &session.actor)?;
    let warning = if outcome.joined {
        session.events.emit(
            EventKind::MemberJoined,
            &session.actor,
            &MemberChange {
                workspace_id: &outcome.workspace.id,
                member: &session.actor,
                role: Some(Role::Member),
            },
        )
    } else {
        None
    };

    let header = if outcome.joined {
        format!("Joined workspace {}", outcome.workspace.name)
    } else {
        format!("Already a member of {}", outcome.workspace.name)
    };
    let mut human = HumanOutput::new(header);
    human.push_summary("ID", outcome.workspace.id.clone());
    human.extend_warnings(warning);
    human.push_next_step(format!("plank board show --workspace {}", outcome.workspace.id));

    #[derive(Serialize)]
    struct JoinOutput {
        workspace: WorkspaceView,
        joined: bool,
    }
    let output = JoinOutput {
        workspace: WorkspaceView::new(&outcome.workspace, &session.actor),
        joined: outcome.joined,
    };
    emit_success(session.output(), "ws join", &output, Some(&human))
}

pub fn run_invite(opts: InviteOptions) -> Result<()> {
    let mut session = opts.globals.open()?;
    let (ws, warning) = if opts.reset {
        let ws = session
            .ctx
            .workspaces
            .reset_invite(&opts.workspace, &session.actor)?;
        let warning = session.emit(
            EventKind::InviteReset,
            &serde_json::json!({ "workspace_id": ws.id }),
        );
        (ws, warning)
    } else {
        let ws = session
            .ctx
            .workspaces
            .require_admin(&opts.workspace, &session.actor)?;
        (ws, None)
    };

    #[derive(Serialize)]
    struct InviteOutput<'a> {
        workspace_id: &'a str,
        invite_code: &'a str,
        reset: bool,
    }

    let mut human = HumanOutput::new(format!("Invite code for {}", ws.name));
    human.push_summary("Code", ws.invite_code.clone());
    human.extend_warnings(warning);
    human.push_next_step(format!("plank ws join {}", ws.invite_code));

    emit_success(
        session.output(),
        "ws invite",
        &InviteOutput {
            workspace_id: &ws.id,
            invite_code: &ws.invite_code,
            reset: opts.reset,
        },
        Some(&human),
    )
}

pub fn run_members(opts: KeyOptions) -> Result<()> {
    let session = opts.globals.open()?;
    let ws = session
        .ctx
        .workspaces
        .require_member(&opts.workspace, &session.actor)?;

    let mut human = HumanOutput::new(format!("Members of {}", ws.name));
    human.push_summary("Total", ws.members.len().to_string());
    for member in &ws.members {
        human.push_detail(format!(
            "{}  {}  joined {}",
            member.actor,
            member.role.as_str(),
            member.joined_at.format("%Y-%m-%d")
        ));
    }

    let output = MembersOutput {
        workspace_id: ws.id,
        members: ws.members,
    };
    emit_success(session.output(), "ws members", &output, Some(&human))
}

pub fn run_role(opts: RoleOptions) -> Result<()> {
    let role: Role = opts.role.parse().map_err(Error::InvalidArgument)?;
    let mut session = opts.globals.open()?;
    let ws = session
        .ctx
        .workspaces
        .set_role(&opts.workspace, &opts.member, role, &session.actor)?;
    let change = MemberChange {
        workspace_id: &ws.id,
        member: &opts.member,
        role: Some(role),
    };
    let warning = session.emit(EventKind::MemberRoleChanged, &change);

    let mut human = HumanOutput::new(format!("{} is now {} of {}", opts.member, role.as_str(), ws.name));
    human.extend_warnings(warning);
    emit_success(session.output(), "ws role", &change, Some(&human))
}

pub fn run_kick(opts: KickOptions) -> Result<()> {
    let mut session = opts.globals.open()?;
    let ws = session
        .ctx
        .workspaces
        .remove_member(&opts.workspace, &opts.member, &session.actor)?;
    let change = MemberChange {
        workspace_id: &ws.id,
        member: &opts.member,
        role: None,
    };
    let warning = session.emit(EventKind::MemberRemoved, &change);

    let header = if opts.member == session.actor {
        format!("Left workspace {}", ws.name)
    } else {
        format!("Removed {} from {}", opts.member, ws.name)
    };
    let mut human = HumanOutput::new(header);
    human.extend_warnings(warning);
    emit_success(session.output(), "ws kick", &change, Some(&human))
}
