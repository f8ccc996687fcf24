//! Command reports for the plank CLI.
//!
//! Every command builds a serializable report plus a [`HumanOutput`]. With
//! `--json` the report is printed inside a versioned [`Envelope`]; otherwise
//! the human form is rendered as a header followed by optional sections.

use serde::Serialize;

use crate::error::{exit_codes, Error, Result};

pub const SCHEMA_VERSION: &str = "plank.v1";

/// Top-level commands whose name includes the subcommand in reports.
const GROUPED_COMMANDS: [&str; 7] = ["ws", "actor", "project", "task", "board", "note", "chat"];

#[derive(Debug, Clone, Copy)]
pub struct OutputOptions {
    pub json: bool,
    pub quiet: bool,
}

/// Human-readable side of a report.
#[derive(Debug, Clone, Default)]
pub struct HumanOutput {
    header: String,
    summary: Vec<(String, String)>,
    details: Vec<String>,
    warnings: Vec<String>,
    next_steps: Vec<String>,
}

impl HumanOutput {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            ..Self::default()
        }
    }

    /// `key: value` line; an empty value prints the key alone.
    pub fn push_summary(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.summary.push((key.into(), value.into()));
    }

    pub fn push_detail(&mut self, value: impl Into<String>) {
        self.details.push(value.into());
    }

    pub fn push_warning(&mut self, value: impl Into<String>) {
        self.warnings.push(value.into());
    }

    pub fn extend_warnings(&mut self, values: impl IntoIterator<Item = String>) {
        self.warnings.extend(values);
    }

    pub fn push_next_step(&mut self, value: impl Into<String>) {
        self.next_steps.push(value.into());
    }

    pub fn render(&self) -> String {
        let mut out = self.header.clone();
        if !self.summary.is_empty() {
            out.push_str("\n\nSummary:");
            for (key, value) in &self.summary {
                if value.is_empty() {
                    out.push_str(&format!("\n- {key}"));
                } else {
                    out.push_str(&format!("\n- {key}: {value}"));
                }
            }
        }
        for (title, items) in [
            ("Details", &self.details),
            ("Warnings", &self.warnings),
            ("Next steps", &self.next_steps),
        ] {
            if items.is_empty() {
                continue;
            }
            out.push_str(&format!("\n\n{title}:"));
            for item in items {
                out.push_str(&format!("\n- {item}"));
            }
        }
        out
    }
}

/// JSON wrapper shared by success and error reports.
#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    schema_version: &'static str,
    command: &'a str,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorBody>,
    #[serde(skip_serializing_if = "no_items")]
    warnings: &'a [String],
    #[serde(skip_serializing_if = "no_items")]
    next_steps: &'a [String],
}

fn no_items(items: &&[String]) -> bool {
    items.is_empty()
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
    code: i32,
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

fn print_envelope<T: Serialize>(envelope: &Envelope<'_, T>) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(envelope)?);
    Ok(())
}

pub fn emit_success<T: Serialize>(
    options: OutputOptions,
    command: &str,
    data: &T,
    human: Option<&HumanOutput>,
) -> Result<()> {
    if options.json {
        return print_envelope(&Envelope {
            schema_version: SCHEMA_VERSION,
            command,
            status: "success",
            data: Some(data),
            error: None,
            warnings: human.map(|h| h.warnings.as_slice()).unwrap_or_default(),
            next_steps: human.map(|h| h.next_steps.as_slice()).unwrap_or_default(),
        });
    }
    if let (false, Some(human)) = (options.quiet, human) {
        println!("{}", human.render());
    }
    Ok(())
}

/// Report a failed command: an envelope on stdout with `--json`, else
/// `error:` and an optional `hint:` on stderr.
pub fn emit_error(command: &str, err: &Error, json: bool) -> Result<()> {
    let next_steps = error_next_steps(err);
    if json {
        return print_envelope::<()>(&Envelope {
            schema_version: SCHEMA_VERSION,
            command,
            status: "error",
            data: None,
            error: Some(ErrorBody {
                message: err.to_string(),
                code: err.exit_code(),
                kind: error_kind(err),
                details: err.details(),
            }),
            warnings: &[],
            next_steps: &next_steps,
        });
    }
    eprintln!("error: {err}");
    if let Some(hint) = next_steps.first() {
        eprintln!("hint: {hint}");
    }
    Ok(())
}

/// Best-effort command name from argv, for error reports emitted before or
/// after clap has parsed anything.
pub fn infer_command_name_from_args() -> String {
    command_name_from(std::env::args().skip(1))
}

fn command_name_from(args: impl Iterator<Item = String>) -> String {
    let mut words = args.filter(|arg| !arg.starts_with('-'));
    match (words.next(), words.next()) {
        (None, _) => "plank".to_string(),
        (Some(group), Some(sub)) if GROUPED_COMMANDS.contains(&group.as_str()) => {
            format!("{group} {sub}")
        }
        (Some(command), _) => command,
    }
}

fn error_kind(err: &Error) -> &'static str {
    match err.exit_code() {
        exit_codes::USER_ERROR => "user_error",
        exit_codes::POLICY_BLOCKED => "policy_blocked",
        _ => "operation_failed",
    }
}

fn error_next_steps(err: &Error) -> Vec<String> {
    let step = match err {
        Error::RootNotFound(_) => "plank init".to_string(),
        Error::InvalidConfig(_) => "fix .plank.toml then retry".to_string(),
        Error::WorkspaceNotFound(_) => "plank ws list".to_string(),
        Error::ProjectNotFound(_) => "plank project list --workspace <ws>".to_string(),
        Error::TaskNotFound(_) => "plank task list".to_string(),
        Error::NoteNotFound(_) => "plank note list --workspace <ws>".to_string(),
        Error::NotAMember { workspace, .. } => {
            format!("ask an admin of {workspace} for the invite code, then plank ws join <code>")
        }
        Error::AdminRequired { workspace, .. } => format!("plank ws members {workspace}"),
        Error::MixedWorkspaces { .. } => "send one batch per workspace".to_string(),
        Error::PositionConflict { .. } => {
            "plank board show --workspace <ws> then plan the move again".to_string()
        }
        Error::ColumnFull { status, .. } => format!("move or delete cards from {status} first"),
        Error::LockFailed(_) => "retry; another plank process holds the lock".to_string(),
        _ => return Vec::new(),
    };
    vec![step]
}
