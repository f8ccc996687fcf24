//! Command-line interface for plank
//!
//! This module defines the CLI structure using clap derive macros.
//! Each command group is implemented in its own submodule.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde::Serialize;

use crate::context::Context;
use crate::error::Result;
use crate::events::{EventKind, EventStream};
use crate::output::OutputOptions;

mod actor;
mod board;
mod chat;
mod init;
mod note;
mod project;
mod serve;
mod task;
mod ws;

/// plank - local-first Kanban boards
///
/// Workspaces with members, projects and tasks on a five-column board,
/// notes and a discussion channel, all stored under `.plank/`.
#[derive(Parser, Debug)]
#[command(name = "plank")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Board root (defaults to the nearest directory containing .plank/)
    #[arg(long, global = true, env = "PLANK_ROOT")]
    pub root: Option<PathBuf>,

    /// Actor identity for this invocation
    #[arg(long, global = true, env = "PLANK_ACTOR")]
    pub actor: Option<String>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit domain events as JSON lines to a file, or `-` for stdout
    #[arg(long, global = true, env = "PLANK_EVENTS")]
    pub events: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create .plank/ and a default .plank.toml
    Init,

    /// Actor identity
    #[command(subcommand)]
    Actor(ActorCommands),

    /// Workspaces and members
    #[command(subcommand)]
    Ws(WsCommands),

    /// Projects inside a workspace
    #[command(subcommand)]
    Project(ProjectCommands),

    /// Tasks
    #[command(subcommand)]
    Task(TaskCommands),

    /// Kanban board ordering
    #[command(subcommand)]
    Board(BoardCommands),

    /// Workspace notes
    #[command(subcommand)]
    Note(NoteCommands),

    /// Workspace discussion
    #[command(subcommand)]
    Chat(ChatCommands),

    /// Serve the HTTP API
    Serve {
        /// Socket address (overrides server.bind)
        #[arg(long)]
        bind: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ActorCommands {
    /// Persist the actor name in .plank/actor
    Set { name: String },
    /// Show the resolved actor
    Show,
}

#[derive(Subcommand, Debug)]
pub enum WsCommands {
    /// Create a workspace (you become its admin)
    New {
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// List workspaces you belong to
    List {
        /// Include workspaces you are not a member of
        #[arg(long)]
        all: bool,
    },
    /// Show a workspace
    Show { workspace: String },
    /// Rename or describe a workspace (admin)
    Edit {
        workspace: String,
        #[arg(long)]
        name: Option<String>,
        /// Empty string clears the description
        #[arg(long)]
        description: Option<String>,
    },
    /// Delete a workspace (admin)
    Rm {
        workspace: String,
        /// Also delete its tasks, notes and messages
        #[arg(long)]
        force: bool,
    },
    /// Join a workspace by invite code
    Join { code: String },
    /// Show the invite code (admin)
    Invite {
        workspace: String,
        /// Generate a new code, invalidating the old one
        #[arg(long)]
        reset: bool,
    },
    /// List members
    Members { workspace: String },
    /// Change a member's role (admin)
    Role {
        workspace: String,
        member: String,
        /// admin or member
        role: String,
    },
    /// Remove a member (admin), or leave with your own name
    Kick { workspace: String, member: String },
}

#[derive(Subcommand, Debug)]
pub enum ProjectCommands {
    /// Create a project
    New {
        name: String,
        #[arg(short, long)]
        workspace: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// List projects of a workspace
    List {
        #[arg(short, long)]
        workspace: String,
        /// Include archived projects
        #[arg(long)]
        all: bool,
    },
    /// Show a project
    Show { project: String },
    /// Rename or describe a project
    Edit {
        project: String,
        #[arg(long)]
        name: Option<String>,
        /// Empty string clears the description
        #[arg(long)]
        description: Option<String>,
    },
    /// Archive a project (admin)
    Archive { project: String },
    /// Restore an archived project (admin)
    Unarchive { project: String },
}

#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// Create a task at the end of its column
    New {
        title: String,
        #[arg(short, long)]
        workspace: String,
        #[arg(long)]
        description: Option<String>,
        /// backlog, todo, in_progress, in_review or done
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        project: Option<String>,
        #[arg(long)]
        assignee: Option<String>,
        /// YYYY-MM-DD
        #[arg(long)]
        due: Option<String>,
    },
    /// List tasks in your workspaces
    List {
        #[arg(short, long)]
        workspace: Option<String>,
        #[arg(long)]
        project: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        assignee: Option<String>,
        /// Case-insensitive match on title and description
        #[arg(long)]
        search: Option<String>,
        /// Only tasks due before this date
        #[arg(long)]
        due_before: Option<String>,
    },
    /// Show a task with its comments
    Show { task: String },
    /// Edit task fields
    Edit {
        task: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        project: Option<String>,
        #[arg(long)]
        assignee: Option<String>,
        #[arg(long)]
        due: Option<String>,
        /// Clear a field: description, project, assignee or due_date
        #[arg(long, value_name = "FIELD")]
        clear: Vec<String>,
    },
    /// Comment on a task
    Comment { task: String, text: String },
    /// Delete a task
    Rm { task: String },
    /// Rebuild task and project snapshots from their logs
    Rebuild,
}

#[derive(Subcommand, Debug)]
pub enum BoardCommands {
    /// Show the board columns in order
    Show {
        #[arg(short, long)]
        workspace: String,
        /// Only show tasks of this project
        #[arg(long)]
        project: Option<String>,
    },
    /// Move a task to an index of a column
    Move {
        task: String,
        /// Destination column
        status: String,
        /// Zero-based index in the destination (defaults to the end)
        #[arg(long)]
        index: Option<usize>,
    },
    /// Apply a batch of position changes from JSON
    Apply {
        /// File with a batch, or `-` for stdin
        file: PathBuf,
        /// Workspace for a bare array of changes
        #[arg(short, long)]
        workspace: Option<String>,
    },
    /// Interactive board
    Tui {
        #[arg(short, long)]
        workspace: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum NoteCommands {
    /// Create a note
    New {
        title: String,
        #[arg(short, long)]
        workspace: String,
        #[arg(long, default_value = "")]
        body: String,
    },
    /// List notes of a workspace
    List {
        #[arg(short, long)]
        workspace: String,
    },
    /// Show a note
    Show { note: String },
    /// Edit a note
    Edit {
        note: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        body: Option<String>,
    },
    /// Delete a note
    Rm { note: String },
}

#[derive(Subcommand, Debug)]
pub enum ChatCommands {
    /// Post a message
    Post {
        body: String,
        #[arg(short, long)]
        workspace: String,
        /// Message id this replies to
        #[arg(long)]
        reply_to: Option<String>,
    },
    /// Show recent messages
    Log {
        #[arg(short, long)]
        workspace: String,
        /// Only messages after this RFC 3339 timestamp
        #[arg(long)]
        since: Option<String>,
        /// Number of newest messages (default 50)
        #[arg(long)]
        limit: Option<usize>,
        /// Keep printing new messages until interrupted
        #[arg(short, long)]
        follow: bool,
    },
}

/// Flags shared by every command.
#[derive(Debug, Clone, Default)]
pub(crate) struct GlobalOptions {
    pub root: Option<PathBuf>,
    pub actor: Option<String>,
    pub json: bool,
    pub quiet: bool,
    pub events: Option<String>,
}

/// An opened board plus the resolved actor and event output.
pub(crate) struct Session {
    pub ctx: Context,
    pub actor: String,
    pub events: EventStream,
    json: bool,
    quiet: bool,
}

impl GlobalOptions {
    pub fn open(&self) -> Result<Session> {
        let ctx = Context::open(self.root.as_deref())?;
        let actor = crate::actor::resolve_actor(Some(&ctx.storage), self.actor.as_deref())?;
        let events = EventStream::open(self.events.as_deref())?;
        Ok(Session {
            ctx,
            actor,
            events,
            json: self.json,
            quiet: self.quiet,
        })
    }
}

impl Session {
    /// Events on stdout take over the stream: no JSON report, no human text.
    pub fn output(&self) -> OutputOptions {
        OutputOptions {
            json: self.json && !self.events.is_stdout(),
            quiet: self.quiet || self.events.is_stdout(),
        }
    }

    /// Emit one event; a failure becomes a warning on the command output.
    pub fn emit<T: Serialize>(&mut self, kind: EventKind, data: &T) -> Option<String> {
        self.events.emit(kind, &self.actor, data)
    }
}

pub(crate) fn parse_due(raw: Option<&str>) -> Result<Option<NaiveDate>> {
    raw.map(crate::task::parse_due_date).transpose()
}

impl Cli {
    fn globals(&self) -> GlobalOptions {
        GlobalOptions {
            root: self.root.clone(),
            actor: self.actor.clone(),
            json: self.json,
            quiet: self.quiet,
            events: self.events.clone(),
        }
    }

    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let globals = self.globals();
        match self.command {
            Commands::Init => init::run(globals),
            Commands::Actor(cmd) => match cmd {
                ActorCommands::Set { name } => actor::run_set(actor::SetOptions { name, globals }),
                ActorCommands::Show => actor::run_show(globals),
            },
            Commands::Ws(cmd) => match cmd {
                WsCommands::New { name, description } => ws::run_new(ws::NewOptions {
                    name,
                    description,
                    globals,
                }),
                WsCommands::List { all } => ws::run_list(ws::ListOptions { all, globals }),
                WsCommands::Show { workspace } => ws::run_show(ws::KeyOptions { workspace, globals }),
                WsCommands::Edit {
                    workspace,
                    name,
                    description,
                } => ws::run_edit(ws::EditOptions {
                    workspace,
                    name,
                    description,
                    globals,
                }),
                WsCommands::Rm { workspace, force } => ws::run_rm(ws::RmOptions {
                    workspace,
                    force,
                    globals,
                }),
                WsCommands::Join { code } => ws::run_join(ws::JoinOptions { code, globals }),
                WsCommands::Invite { workspace, reset } => ws::run_invite(ws::InviteOptions {
                    workspace,
                    reset,
                    globals,
                }),
                WsCommands::Members { workspace } => {
                    ws::run_members(ws::KeyOptions { workspace, globals })
                }
                WsCommands::Role {
                    workspace,
                    member,
                    role,
                } => ws::run_role(ws::RoleOptions {
                    workspace,
                    member,
                    role,
                    globals,
                }),
                WsCommands::Kick { workspace, member } => ws::run_kick(ws::KickOptions {
                    workspace,
                    member,
                    globals,
                }),
            },
            Commands::Project(cmd) => match cmd {
                ProjectCommands::New {
                    name,
                    workspace,
                    description,
                } => project::run_new(project::NewOptions {
                    name,
                    workspace,
                    description,
                    globals,
                }),
                ProjectCommands::List { workspace, all } => {
                    project::run_list(project::ListOptions {
                        workspace,
                        all,
                        globals,
                    })
                }
                ProjectCommands::Show { project } => {
                    project::run_show(project::KeyOptions { project, globals })
                }
                ProjectCommands::Edit {
                    project,
                    name,
                    description,
                } => project::run_edit(project::EditOptions {
                    project,
                    name,
                    description,
                    globals,
                }),
                ProjectCommands::Archive { project } => {
                    project::run_archive(project::KeyOptions { project, globals }, true)
                }
                ProjectCommands::Unarchive { project } => {
                    project::run_archive(project::KeyOptions { project, globals }, false)
                }
            },
            Commands::Task(cmd) => match cmd {
                TaskCommands::New {
                    title,
                    workspace,
                    description,
                    status,
                    project,
                    assignee,
                    due,
                } => task::run_new(task::NewOptions {
                    title,
                    workspace,
                    description,
                    status,
                    project,
                    assignee,
                    due,
                    globals,
                }),
                TaskCommands::List {
                    workspace,
                    project,
                    status,
                    assignee,
                    search,
                    due_before,
                } => task::run_list(task::ListOptions {
                    workspace,
                    project,
                    status,
                    assignee,
                    search,
                    due_before,
                    globals,
                }),
                TaskCommands::Show { task } => task::run_show(task::KeyOptions { task, globals }),
                TaskCommands::Edit {
                    task,
                    title,
                    description,
                    project,
                    assignee,
                    due,
                    clear,
                } => task::run_edit(task::EditOptions {
                    task,
                    title,
                    description,
                    project,
                    assignee,
                    due,
                    clear,
                    globals,
                }),
                TaskCommands::Comment { task, text } => task::run_comment(task::CommentOptions {
                    task,
                    text,
                    globals,
                }),
                TaskCommands::Rm { task } => task::run_rm(task::KeyOptions { task, globals }),
                TaskCommands::Rebuild => task::run_rebuild(globals),
            },
            Commands::Board(cmd) => match cmd {
                BoardCommands::Show { workspace, project } => board::run_show(board::ShowOptions {
                    workspace,
                    project,
                    globals,
                }),
                BoardCommands::Move {
                    task,
                    status,
                    index,
                } => board::run_move(board::MoveOptions {
                    task,
                    status,
                    index,
                    globals,
                }),
                BoardCommands::Apply { file, workspace } => board::run_apply(board::ApplyOptions {
                    file,
                    workspace,
                    globals,
                }),
                BoardCommands::Tui { workspace } => board::run_tui(workspace, globals),
            },
            Commands::Note(cmd) => match cmd {
                NoteCommands::New {
                    title,
                    workspace,
                    body,
                } => note::run_new(note::NewOptions {
                    title,
                    workspace,
                    body,
                    globals,
                }),
                NoteCommands::List { workspace } => {
                    note::run_list(note::ListOptions { workspace, globals })
                }
                NoteCommands::Show { note } => note::run_show(note::KeyOptions { note, globals }),
                NoteCommands::Edit { note, title, body } => note::run_edit(note::EditOptions {
                    note,
                    title,
                    body,
                    globals,
                }),
                NoteCommands::Rm { note } => note::run_rm(note::KeyOptions { note, globals }),
            },
            Commands::Chat(cmd) => match cmd {
                ChatCommands::Post {
                    body,
                    workspace,
                    reply_to,
                } => chat::run_post(chat::PostOptions {
                    body,
                    workspace,
                    reply_to,
                    globals,
                }),
                ChatCommands::Log {
                    workspace,
                    since,
                    limit,
                    follow,
                } => chat::run_log(chat::LogOptions {
                    workspace,
                    since,
                    limit,
                    follow,
                    globals,
                }),
            },
            Commands::Serve { bind } => serve::run(bind, globals),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_board_move_with_globals() {
        let cli = Cli::try_parse_from([
            "plank", "--json", "--actor", "alice", "board", "move", "pl-abc", "done", "--index", "0",
        ])
        .unwrap();
        assert!(cli.json);
        assert_eq!(cli.actor.as_deref(), Some("alice"));
        match cli.command {
            Commands::Board(BoardCommands::Move { task, status, index }) => {
                assert_eq!(task, "pl-abc");
                assert_eq!(status, "done");
                assert_eq!(index, Some(0));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
