//! Error types for plank
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (bad args, missing board root, unknown ids)
//! - 3: Blocked by policy (membership, admin role, mixed-workspace batches)
//! - 4: Operation failed (I/O, serialization, lock contention)

use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the plank CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const POLICY_BLOCKED: i32 = 3;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for plank operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("No plank board found from {0}")]
    RootNotFound(PathBuf),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Workspace not found: {0}")]
    WorkspaceNotFound(String),

    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Note not found: {0}")]
    NoteNotFound(String),

    #[error("Position {position} is used twice in column {status}")]
    PositionConflict { status: String, position: u32 },

    // Policy blocks (exit code 3)
    #[error("{actor} is not a member of workspace {workspace}")]
    NotAMember { workspace: String, actor: String },

    #[error("{actor} must be an admin of workspace {workspace}")]
    AdminRequired { workspace: String, actor: String },

    #[error("Batch mixes tasks outside workspace {workspace}: {}", foreign.join(", "))]
    MixedWorkspaces {
        workspace: String,
        foreign: Vec<String>,
    },

    #[error("Column {status} is full ({limit} cards)")]
    ColumnFull { status: String, limit: usize },

    // Operation failures (exit code 4)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Lock acquisition failed: {0}")]
    LockFailed(PathBuf),

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            // User errors
            Error::RootNotFound(_)
            | Error::InvalidConfig(_)
            | Error::InvalidArgument(_)
            | Error::WorkspaceNotFound(_)
            | Error::ProjectNotFound(_)
            | Error::TaskNotFound(_)
            | Error::NoteNotFound(_)
            | Error::PositionConflict { .. } => exit_codes::USER_ERROR,

            // Policy blocks
            Error::NotAMember { .. }
            | Error::AdminRequired { .. }
            | Error::MixedWorkspaces { .. }
            | Error::ColumnFull { .. } => exit_codes::POLICY_BLOCKED,

            // Operation failures
            Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::TomlSerialize(_)
            | Error::LockFailed(_)
            | Error::OperationFailed(_) => exit_codes::OPERATION_FAILED,
        }
    }

    /// True for lookups of ids that do not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::WorkspaceNotFound(_)
                | Error::ProjectNotFound(_)
                | Error::TaskNotFound(_)
                | Error::NoteNotFound(_)
        )
    }

    /// Structured details for machine consumers.
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::NotAMember { workspace, actor } | Error::AdminRequired { workspace, actor } => {
                Some(serde_json::json!({
                    "workspace": workspace,
                    "actor": actor,
                }))
            }
            Error::MixedWorkspaces { workspace, foreign } => Some(serde_json::json!({
                "workspace": workspace,
                "foreign_tasks": foreign,
            })),
            Error::ColumnFull { status, limit } => Some(serde_json::json!({
                "status": status,
                "limit": limit,
            })),
            Error::PositionConflict { status, position } => Some(serde_json::json!({
                "status": status,
                "position": position,
            })),
            _ => None,
        }
    }
}

/// Result type alias for plank operations
pub type Result<T> = std::result::Result<T, Error>;
