//! plank chat command implementations.

use std::io::Write;

use serde::Serialize;

use crate::cli::GlobalOptions;
use crate::discussion::{parse_since, Message};
use crate::error::Result;
use crate::events::EventKind;
use crate::output::{emit_success, HumanOutput};

pub struct PostOptions {
    pub body: String,
    pub workspace: String,
    pub reply_to: Option<String>,
    pub globals: GlobalOptions,
}

pub struct LogOptions {
    pub workspace: String,
    pub since: Option<String>,
    pub limit: Option<usize>,
    pub follow: bool,
    pub globals: GlobalOptions,
}

#[derive(Serialize)]
struct LogOutput {
    total: usize,
    messages: Vec<Message>,
}

pub fn run_post(options: PostOptions) -> Result<()> {
    let mut session = options.globals.open()?;
    let message = session.ctx.discussion.post(
        &options.workspace,
        &options.body,
        options.reply_to.as_deref(),
        &session.actor,
    )?;
    let warning = session.emit(EventKind::MessagePosted, &message);

    let mut human = HumanOutput::new("Message posted");
    human.extend_warnings(warning);
    human.push_summary("ID", message.id.clone());
    if let Some(parent) = message.reply_to.as_deref() {
        human.push_summary("Reply to", parent);
    }

    emit_success(session.output(), "chat post", &message, Some(&human))
}

pub fn run_log(options: LogOptions) -> Result<()> {
    let since = options.since.as_deref().map(parse_since).transpose()?;
    let session = options.globals.open()?;
    let messages = session.ctx.discussion.list(
        &options.workspace,
        &session.actor,
        since,
        options.limit,
    )?;

    if options.follow {
        let json = session.output().json;
        for message in &messages {
            print_message(message, json)?;
        }
        return session
            .ctx
            .discussion
            .follow(&options.workspace, &session.actor, |message| {
                print_message(message, json)?;
                Ok(true)
            });
    }

    let mut human = HumanOutput::new("Messages");
    human.push_summary("Total", messages.len().to_string());
    for message in &messages {
        human.push_detail(format_message(message));
    }

    let output = LogOutput {
        total: messages.len(),
        messages,
    };
    emit_success(session.output(), "chat log", &output, Some(&human))
}

fn format_message(message: &Message) -> String {
    let reply = message
        .reply_to
        .as_deref()
        .map(|id| format!(" (re {id})"))
        .unwrap_or_default();
    format!(
        "{} {}{reply}: {}",
        message.created_at.format("%Y-%m-%d %H:%M"),
        message.author,
        message.body
    )
}

/// Streamed output: one JSON object per line with --json, else one text line.
fn print_message(message: &Message, json: bool) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    if json {
        writeln!(stdout, "{}", serde_json::to_string(message)?)?;
    } else {
        writeln!(stdout, "{}", format_message(message))?;
    }
    stdout.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn message_line_marks_replies() {
        let message = Message {
            id: "msg-1".to_string(),
            workspace_id: "ws-1".to_string(),
            author: "alice".to_string(),
            body: "shipped".to_string(),
            reply_to: Some("msg-0".to_string()),
            created_at: Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap(),
        };
        assert_eq!(format_message(&message), "2026-03-01 09:30 alice (re msg-0): shipped");
    }
}
