//! plank - shared Kanban boards for small teams
//!
//! The core is the board: five fixed columns whose cards carry integer
//! positions on a fixed step, reordered by moves and by client-computed
//! bulk updates that must stay inside one workspace.
//!
//! # Core Concepts
//!
//! - **Workspaces**: membership boundary, joined with an invite code
//! - **Board**: per-workspace columns ordered by `position`
//! - **Bulk updates**: all-or-nothing batches guarded by workspace
//! - **Event logs**: append-only JSONL with rebuildable snapshots
//!
//! # Module Organization
//!
//! - `board`: column model and position planning
//! - `task` / `project`: event-sourced stores
//! - `workspace`: workspaces, members and roles
//! - `notes` / `discussion`: workspace notes and message log
//! - `context`: the stores opened against one root
//! - `server`: HTTP API over the same stores
//! - `ui`: terminal board
//! - `cli`, `output`, `events`: command surface
//! - `config`, `storage`, `lock`, `actor`, `error`: plumbing

pub mod actor;
pub mod board;
pub mod cli;
pub mod config;
pub mod context;
pub mod discussion;
pub mod error;
pub mod events;
pub mod lock;
pub mod notes;
pub mod output;
pub mod project;
pub mod server;
pub mod storage;
pub mod task;
pub mod ui;
pub mod workspace;

pub use error::{Error, Result};
