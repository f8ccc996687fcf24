//! plank board command implementations.

use std::io::Read;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::board::{parse_status, PositionChange};
use crate::cli::task::format_task_line;
use crate::cli::GlobalOptions;
use crate::error::{Error, Result};
use crate::events::EventKind;
use crate::output::{emit_success, HumanOutput};
use crate::task::{BatchReport, BulkUpdate};

pub struct ShowOptions {
    pub workspace: String,
    pub project: Option<String>,
    pub globals: GlobalOptions,
}

pub struct MoveOptions {
    pub task: String,
    pub status: String,
    pub index: Option<usize>,
    pub globals: GlobalOptions,
}

pub struct ApplyOptions {
    pub file: PathBuf,
    pub workspace: Option<String>,
    pub globals: GlobalOptions,
}

/// Batch files either carry their workspace or are a bare list of changes.
#[derive(Deserialize)]
#[serde(untagged)]
enum BatchInput {
    Full(BulkUpdate),
    Changes(Vec<PositionChange>),
}

pub fn run_show(options: ShowOptions) -> Result<()> {
    let session = options.globals.open()?;
    let view = session.ctx.tasks.board_view(
        &options.workspace,
        &session.actor,
        options.project.as_deref(),
    )?;

    let mut human = HumanOutput::new(format!("Board {}", view.workspace_name));
    human.push_summary("Workspace", view.workspace_id.clone());
    if let Some(project) = view.project_id.as_deref() {
        human.push_summary("Project", project);
    }
    for column in &view.columns {
        human.push_summary(column.title.clone(), column.tasks.len().to_string());
        for task in &column.tasks {
            human.push_detail(format_task_line(task));
        }
    }

    emit_success(session.output(), "board show", &view, Some(&human))
}

pub fn run_move(options: MoveOptions) -> Result<()> {
    let status = parse_status(&options.status)?;
    let index = options.index.unwrap_or(usize::MAX);
    let mut session = options.globals.open()?;
    let report = session
        .ctx
        .tasks
        .move_task(&options.task, status, index, &session.actor)?;
    let warning = if report.applied.is_empty() {
        None
    } else {
        session.emit(EventKind::TaskMoved, &report)
    };

    let header = if report.applied.is_empty() {
        "Task already in place".to_string()
    } else {
        format!("Task moved to {status}")
    };
    let human = report_human(header, &report, warning);
    emit_success(session.output(), "board move", &report, Some(&human))
}

pub fn run_apply(options: ApplyOptions) -> Result<()> {
    let raw = read_input(&options.file)?;
    let batch = parse_batch(&raw, options.workspace.as_deref())?;
    let mut session = options.globals.open()?;
    let report = session.ctx.tasks.apply_batch(&batch, &session.actor)?;
    let warning = if report.applied.is_empty() {
        None
    } else {
        session.emit(EventKind::TaskBatchUpdated, &report)
    };

    let header = format!("Batch applied: {} task(s) moved", report.applied.len());
    let human = report_human(header, &report, warning);
    emit_success(session.output(), "board apply", &report, Some(&human))
}

pub fn run_tui(workspace: String, globals: GlobalOptions) -> Result<()> {
    let session = globals.open()?;
    session
        .ctx
        .workspaces
        .require_member(&workspace, &session.actor)?;
    crate::ui::board_viewer::run(session.ctx.tasks.clone(), &workspace, session.actor)
}

fn report_human(header: String, report: &BatchReport, warning: Option<String>) -> HumanOutput {
    let mut human = HumanOutput::new(header);
    human.extend_warnings(warning);
    human.push_summary("Workspace", report.workspace_id.clone());
    human.push_summary("Applied", report.applied.len().to_string());
    if !report.unchanged.is_empty() {
        human.push_summary("Unchanged", report.unchanged.len().to_string());
    }
    for change in &report.applied {
        human.push_detail(format!("{}  {} @{}", change.id, change.status, change.position));
    }
    human
}

fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut raw = String::new();
        std::io::stdin().read_to_string(&mut raw)?;
        return Ok(raw);
    }
    std::fs::read_to_string(path).map_err(|err| {
        Error::InvalidArgument(format!("cannot read {}: {err}", path.display()))
    })
}

fn parse_batch(raw: &str, workspace: Option<&str>) -> Result<BulkUpdate> {
    let input: BatchInput = serde_json::from_str(raw)
        .map_err(|err| Error::InvalidArgument(format!("invalid batch: {err}")))?;
    match (input, workspace) {
        (BatchInput::Full(batch), None) => Ok(batch),
        (BatchInput::Full(batch), Some(ws)) if batch.workspace_id == ws => Ok(batch),
        (BatchInput::Full(batch), Some(ws)) => Err(Error::InvalidArgument(format!(
            "batch names workspace {} but --workspace is {ws}",
            batch.workspace_id
        ))),
        (BatchInput::Changes(tasks), Some(ws)) => Ok(BulkUpdate {
            workspace_id: ws.to_string(),
            tasks,
        }),
        (BatchInput::Changes(_), None) => Err(Error::InvalidArgument(
            "batch has no workspace_id (pass --workspace)".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::TaskStatus;

    #[test]
    fn bare_change_list_takes_workspace_flag() {
        let raw = r#"[{"id":"pl-a","status":"todo","position":1000}]"#;
        let batch = parse_batch(raw, Some("ws-1")).unwrap();
        assert_eq!(batch.workspace_id, "ws-1");
        assert_eq!(batch.tasks[0].status, TaskStatus::Todo);

        let err = parse_batch(raw, None).unwrap_err();
        assert!(err.to_string().contains("--workspace"));
    }

    #[test]
    fn workspace_flag_must_agree_with_batch() {
        let raw = r#"{"workspace_id":"ws-1","tasks":[{"id":"pl-a","status":"done","position":2000}]}"#;
        assert!(parse_batch(raw, None).is_ok());
        assert!(parse_batch(raw, Some("ws-1")).is_ok());
        assert!(parse_batch(raw, Some("ws-2")).is_err());
    }

    #[test]
    fn malformed_batch_is_a_user_error() {
        let err = parse_batch("{\"tasks\": 3}", None).unwrap_err();
        assert_eq!(err.exit_code(), crate::error::exit_codes::USER_ERROR);
    }
}
