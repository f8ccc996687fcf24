//! plank task command implementations.

use serde::Serialize;

use crate::board::parse_status;
use crate::cli::{parse_due, GlobalOptions};
use crate::error::{Error, Result};
use crate::events::EventKind;
use crate::output::{emit_success, HumanOutput};
use crate::task::{NewTask, TaskDetails, TaskEdit, TaskField, TaskFilter, TaskRecord};

pub struct NewOptions {
    pub title: String,
    pub workspace: String,
    pub description: Option<String>,
    pub status: Option<String>,
    pub project: Option<String>,
    pub assignee: Option<String>,
    pub due: Option<String>,
    pub globals: GlobalOptions,
}

pub struct ListOptions {
    pub workspace: Option<String>,
    pub project: Option<String>,
    pub status: Option<String>,
    pub assignee: Option<String>,
    pub search: Option<String>,
    pub due_before: Option<String>,
    pub globals: GlobalOptions,
}

pub struct KeyOptions {
    pub task: String,
    pub globals: GlobalOptions,
}

pub struct EditOptions {
    pub task: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub project: Option<String>,
    pub assignee: Option<String>,
    pub due: Option<String>,
    pub clear: Vec<String>,
    pub globals: GlobalOptions,
}

pub struct CommentOptions {
    pub task: String,
    pub text: String,
    pub globals: GlobalOptions,
}

#[derive(Serialize)]
struct TaskListOutput {
    total: usize,
    tasks: Vec<TaskRecord>,
}

#[derive(Serialize)]
struct TaskEditOutput {
    task: TaskRecord,
    changed: bool,
}

#[derive(Serialize)]
struct RebuildOutput {
    tasks: usize,
    projects: usize,
}

pub fn run_new(options: NewOptions) -> Result<()> {
    let status = options.status.as_deref().map(parse_status).transpose()?;
    let due_date = parse_due(options.due.as_deref())?;
    let mut session = options.globals.open()?;
    let task = session.ctx.tasks.create(
        NewTask {
            workspace: options.workspace,
            title: options.title,
            description: options.description,
            status,
            project: options.project,
            assignee: options.assignee,
            due_date,
        },
        &session.actor,
    )?;
    let warning = session.emit(EventKind::TaskCreated, &task);

    let mut human = HumanOutput::new("Task created");
    human.extend_warnings(warning);
    human.push_summary("ID", task.id.clone());
    human.push_summary("Status", task.status.to_string());
    human.push_summary("Position", task.position.to_string());
    if let Some(project) = task.project_id.as_deref() {
        human.push_summary("Project", project);
    }
    if let Some(assignee) = task.assignee.as_deref() {
        human.push_summary("Assignee", assignee);
    }

    emit_success(session.output(), "task new", &task, Some(&human))
}

pub fn run_list(options: ListOptions) -> Result<()> {
    let filter = TaskFilter {
        workspace: options.workspace,
        project: options.project,
        status: options.status.as_deref().map(parse_status).transpose()?,
        assignee: options.assignee,
        search: options.search,
        due_before: parse_due(options.due_before.as_deref())?,
    };
    let session = options.globals.open()?;
    let tasks = session.ctx.tasks.list(&filter, &session.actor)?;

    let mut human = HumanOutput::new("Tasks");
    human.push_summary("Total", tasks.len().to_string());
    for task in &tasks {
        human.push_detail(format_task_line(task));
    }
    if tasks.is_empty() && filter.workspace.is_none() {
        human.push_next_step("plank ws list");
    }

    let output = TaskListOutput {
        total: tasks.len(),
        tasks,
    };
    emit_success(session.output(), "task list", &output, Some(&human))
}

pub fn run_show(options: KeyOptions) -> Result<()> {
    let session = options.globals.open()?;
    let details = session.ctx.tasks.details(&options.task, &session.actor)?;
    let human = details_human(&details);
    emit_success(session.output(), "task show", &details, Some(&human))
}

pub fn run_edit(options: EditOptions) -> Result<()> {
    let clear = options
        .clear
        .iter()
        .map(|field| field.parse::<TaskField>().map_err(Error::InvalidArgument))
        .collect::<Result<Vec<_>>>()?;
    let edit = TaskEdit {
        title: options.title,
        description: options.description,
        project: options.project,
        assignee: options.assignee,
        due_date: parse_due(options.due.as_deref())?,
        clear,
    };
    let mut session = options.globals.open()?;
    let changed = session.ctx.tasks.edit(&options.task, edit, &session.actor)?;
    let task = session.ctx.tasks.get(&options.task)?;
    let warning = if changed {
        session.emit(EventKind::TaskEdited, &task)
    } else {
        None
    };

    let mut human = HumanOutput::new(if changed { "Task updated" } else { "Task unchanged" });
    human.extend_warnings(warning);
    human.push_summary("ID", task.id.clone());
    human.push_summary("Title", task.title.clone());

    let output = TaskEditOutput { task, changed };
    emit_success(session.output(), "task edit", &output, Some(&human))
}

pub fn run_comment(options: CommentOptions) -> Result<()> {
    let mut session = options.globals.open()?;
    let task = session
        .ctx
        .tasks
        .comment(&options.task, &options.text, &session.actor)?;
    let warning = session.emit(
        EventKind::TaskCommented,
        &serde_json::json!({ "id": task.id, "comment": options.text.trim() }),
    );

    let mut human = HumanOutput::new("Comment added");
    human.extend_warnings(warning);
    human.push_summary("Task", task.id.clone());
    human.push_summary("Comments", task.comments_count.to_string());

    emit_success(session.output(), "task comment", &task, Some(&human))
}

pub fn run_rm(options: KeyOptions) -> Result<()> {
    let mut session = options.globals.open()?;
    let task = session.ctx.tasks.delete(&options.task, &session.actor)?;
    let warning = session.emit(EventKind::TaskDeleted, &task);

    let mut human = HumanOutput::new("Task deleted");
    human.extend_warnings(warning);
    human.push_summary("ID", task.id.clone());
    human.push_summary("Title", task.title.clone());

    emit_success(session.output(), "task rm", &task, Some(&human))
}

pub fn run_rebuild(globals: GlobalOptions) -> Result<()> {
    let session = globals.open()?;
    let output = RebuildOutput {
        tasks: session.ctx.tasks.rebuild()?,
        projects: session.ctx.projects.rebuild()?,
    };

    let mut human = HumanOutput::new("Snapshots rebuilt");
    human.push_summary("Tasks", output.tasks.to_string());
    human.push_summary("Projects", output.projects.to_string());

    emit_success(session.output(), "task rebuild", &output, Some(&human))
}

pub(crate) fn format_task_line(task: &TaskRecord) -> String {
    let mut line = format!(
        "{}  [{} @{}]  {}",
        task.id, task.status, task.position, task.title
    );
    if let Some(assignee) = task.assignee.as_deref() {
        line.push_str(&format!("  @{assignee}"));
    }
    if let Some(due) = task.due_date {
        line.push_str(&format!("  due {due}"));
    }
    line
}

fn details_human(details: &TaskDetails) -> HumanOutput {
    let task = &details.task;
    let mut human = HumanOutput::new(format!("{}  {}", task.id, task.title));
    human.push_summary("Workspace", task.workspace_id.clone());
    human.push_summary("Status", task.status.to_string());
    human.push_summary("Position", task.position.to_string());
    if let Some(project) = task.project_id.as_deref() {
        human.push_summary("Project", project);
    }
    if let Some(assignee) = task.assignee.as_deref() {
        human.push_summary("Assignee", assignee);
    }
    if let Some(due) = task.due_date {
        human.push_summary("Due", due.to_string());
    }
    human.push_summary("Updated", task.updated_at.to_rfc3339());
    if let Some(description) = task.description.as_deref() {
        for line in description.lines() {
            human.push_detail(line);
        }
    }
    for comment in &details.comments {
        human.push_detail(format!(
            "{} {}: {}",
            comment.timestamp.format("%Y-%m-%d %H:%M"),
            comment.actor.as_deref().unwrap_or("unknown"),
            comment.comment
        ));
    }
    human
}
