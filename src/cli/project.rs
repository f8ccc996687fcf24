//! plank project command implementations.

use serde::Serialize;

use crate::cli::GlobalOptions;
use crate::error::{Error, Result};
use crate::events::EventKind;
use crate::output::{emit_success, HumanOutput};
use crate::project::ProjectRecord;

pub struct NewOptions {
    pub name: String,
    pub workspace: String,
    pub description: Option<String>,
    pub globals: GlobalOptions,
}

pub struct ListOptions {
    pub workspace: String,
    pub all: bool,
    pub globals: GlobalOptions,
}

pub struct KeyOptions {
    pub project: String,
    pub globals: GlobalOptions,
}

pub struct EditOptions {
    pub project: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub globals: GlobalOptions,
}

#[derive(Serialize)]
struct ProjectListOutput {
    total: usize,
    projects: Vec<ProjectRecord>,
}

#[derive(Serialize)]
struct ProjectChangeOutput {
    project: ProjectRecord,
    changed: bool,
}

pub fn run_new(options: NewOptions) -> Result<()> {
    let mut session = options.globals.open()?;
    let project = session.ctx.projects.create(
        &options.workspace,
        &options.name,
        options.description,
        &session.actor,
    )?;
    let warning = session.emit(EventKind::ProjectCreated, &project);

    let mut human = HumanOutput::new("Project created");
    human.extend_warnings(warning);
    human.push_summary("ID", project.id.clone());
    human.push_summary("Name", project.name.clone());
    human.push_summary("Workspace", project.workspace_id.clone());
    human.push_next_step(format!(
        "plank task new --workspace {} --project {} \"<title>\"",
        project.workspace_id, project.id
    ));

    emit_success(session.output(), "project new", &project, Some(&human))
}

pub fn run_list(options: ListOptions) -> Result<()> {
    let session = options.globals.open()?;
    let projects = session
        .ctx
        .projects
        .list(&options.workspace, &session.actor, options.all)?;

    let mut human = HumanOutput::new("Projects");
    human.push_summary("Total", projects.len().to_string());
    for project in &projects {
        let archived = if project.archived { " (archived)" } else { "" };
        human.push_detail(format!("{}  {}{archived}", project.id, project.name));
    }

    let output = ProjectListOutput {
        total: projects.len(),
        projects,
    };
    emit_success(session.output(), "project list", &output, Some(&human))
}

pub fn run_show(options: KeyOptions) -> Result<()> {
    let session = options.globals.open()?;
    let project = session
        .ctx
        .projects
        .get_for(&options.project, &session.actor)?;

    let mut human = HumanOutput::new(format!("Project {}", project.name));
    human.push_summary("ID", project.id.clone());
    human.push_summary("Workspace", project.workspace_id.clone());
    if let Some(description) = project.description.as_deref() {
        human.push_summary("Description", description);
    }
    human.push_summary("Archived", if project.archived { "yes" } else { "no" });
    human.push_summary("Updated", project.updated_at.to_rfc3339());

    emit_success(session.output(), "project show", &project, Some(&human))
}

pub fn run_edit(options: EditOptions) -> Result<()> {
    if options.name.is_none() && options.description.is_none() {
        return Err(Error::InvalidArgument(
            "nothing to edit (use --name or --description)".to_string(),
        ));
    }
    let mut session = options.globals.open()?;
    let changed = session.ctx.projects.edit(
        &options.project,
        options.name,
        options.description,
        &session.actor,
    )?;
    let project = session.ctx.projects.get(&options.project)?;
    let warning = if changed {
        session.emit(EventKind::ProjectEdited, &project)
    } else {
        None
    };

    let header = if changed {
        "Project updated"
    } else {
        "Project unchanged"
    };
    let mut human = HumanOutput::new(header);
    human.extend_warnings(warning);
    human.push_summary("ID", project.id.clone());
    human.push_summary("Name", project.name.clone());

    let output = ProjectChangeOutput { project, changed };
    emit_success(session.output(), "project edit", &output, Some(&human))
}

pub fn run_archive(options: KeyOptions, archived: bool) -> Result<()> {
    let mut session = options.globals.open()?;
    let changed = session
        .ctx
        .projects
        .set_archived(&options.project, archived, &session.actor)?;
    let project = session.ctx.projects.get(&options.project)?;
    let (kind, command, verb) = if archived {
        (EventKind::ProjectArchived, "project archive", "archived")
    } else {
        (EventKind::ProjectUnarchived, "project unarchive", "unarchived")
    };
    let warning = if changed {
        session.emit(kind, &project)
    } else {
        None
    };

    let header = if changed {
        format!("Project {verb}")
    } else {
        format!("Project already {verb}")
    };
    let mut human = HumanOutput::new(header);
    human.extend_warnings(warning);
    human.push_summary("ID", project.id.clone());

    let output = ProjectChangeOutput { project, changed };
    emit_success(session.output(), command, &output, Some(&human))
}
