//! plank note command implementations.

use serde::Serialize;

use crate::cli::GlobalOptions;
use crate::error::{Error, Result};
use crate::events::EventKind;
use crate::notes::Note;
use crate::output::{emit_success, HumanOutput};

pub struct NewOptions {
    pub title: String,
    pub workspace: String,
    pub body: String,
    pub globals: GlobalOptions,
}

pub struct ListOptions {
    pub workspace: String,
    pub globals: GlobalOptions,
}

pub struct KeyOptions {
    pub note: String,
    pub globals: GlobalOptions,
}

pub struct EditOptions {
    pub note: String,
    pub title: Option<String>,
    pub body: Option<String>,
    pub globals: GlobalOptions,
}

#[derive(Serialize)]
struct NoteListOutput {
    total: usize,
    notes: Vec<Note>,
}

#[derive(Serialize)]
struct NoteEditOutput {
    note: Note,
    changed: bool,
}

pub fn run_new(options: NewOptions) -> Result<()> {
    let mut session = options.globals.open()?;
    let note = session.ctx.notes.create(
        &options.workspace,
        &options.title,
        &options.body,
        &session.actor,
    )?;
    let warning = session.emit(EventKind::NoteCreated, &note);

    let mut human = HumanOutput::new("Note created");
    human.extend_warnings(warning);
    human.push_summary("ID", note.id.clone());
    human.push_summary("Title", note.title.clone());

    emit_success(session.output(), "note new", &note, Some(&human))
}

pub fn run_list(options: ListOptions) -> Result<()> {
    let session = options.globals.open()?;
    let notes = session.ctx.notes.list(&options.workspace, &session.actor)?;

    let mut human = HumanOutput::new("Notes");
    human.push_summary("Total", notes.len().to_string());
    for note in &notes {
        human.push_detail(format!(
            "{}  {}  (updated {} by {})",
            note.id,
            note.title,
            note.updated_at.format("%Y-%m-%d"),
            note.updated_by
        ));
    }

    let output = NoteListOutput {
        total: notes.len(),
        notes,
    };
    emit_success(session.output(), "note list", &output, Some(&human))
}

pub fn run_show(options: KeyOptions) -> Result<()> {
    let session = options.globals.open()?;
    let note = session.ctx.notes.get(&options.note, &session.actor)?;

    let mut human = HumanOutput::new(note.title.clone());
    human.push_summary("ID", note.id.clone());
    human.push_summary("Workspace", note.workspace_id.clone());
    human.push_summary("Updated", format!("{} by {}", note.updated_at.to_rfc3339(), note.updated_by));
    for line in note.body.lines() {
        human.push_detail(line);
    }

    emit_success(session.output(), "note show", &note, Some(&human))
}

pub fn run_edit(options: EditOptions) -> Result<()> {
    if options.title.is_none() && options.body.is_none() {
        return Err(Error::InvalidArgument(
            "nothing to edit (use --title or --body)".to_string(),
        ));
    }
    let mut session = options.globals.open()?;
    let (note, changed) =
        session
            .ctx
            .notes
            .edit(&options.note, options.title, options.body, &session.actor)?;
    let warning = if changed {
        session.emit(EventKind::NoteEdited, &note)
    } else {
        None
    };

    let mut human = HumanOutput::new(if changed { "Note updated" } else { "Note unchanged" });
    human.extend_warnings(warning);
    human.push_summary("ID", note.id.clone());

    let output = NoteEditOutput { note, changed };
    emit_success(session.output(), "note edit", &output, Some(&human))
}

pub fn run_rm(options: KeyOptions) -> Result<()> {
    let mut session = options.globals.open()?;
    let note = session.ctx.notes.delete(&options.note, &session.actor)?;
    let warning = session.emit(EventKind::NoteDeleted, &note);

    let mut human = HumanOutput::new("Note deleted");
    human.extend_warnings(warning);
    human.push_summary("ID", note.id.clone());
    human.push_summary("Title", note.title.clone());

    emit_success(session.output(), "note rm", &note, Some(&human))
}
