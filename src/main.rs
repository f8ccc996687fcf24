//! plank - shared Kanban boards for small teams
//!
//! Workspaces with invite codes, projects, tasks on a five-column board,
//! notes and a discussion log, served from the CLI, a terminal board and an
//! HTTP API.

use clap::Parser;
use plank::cli::Cli;
use plank::output::{emit_error, infer_command_name_from_args};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() {
    let command = infer_command_name_from_args();

    // Tracing is opt-in via RUST_LOG, except for the server which logs
    // requests at info by default. Ignore invalid or huge filters.
    let fallback = if command == "serve" {
        "plank=info,tower_http=info"
    } else {
        "off"
    };
    let filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|raw| {
            let raw = raw.trim();
            if raw.is_empty() || raw.len() > 4096 {
                return None;
            }
            EnvFilter::try_new(raw).ok()
        })
        .unwrap_or_else(|| EnvFilter::new(fallback));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let cli = Cli::parse();
    let events_to_stdout = cli
        .events
        .as_deref()
        .map(|value| value.trim() == "-")
        .unwrap_or(false);
    let json = cli.json && !events_to_stdout;
    if let Err(err) = cli.run() {
        let _ = emit_error(&command, &err, json);
        std::process::exit(err.exit_code());
    }
}
