//! plank actor command implementation
//!
//! Provides actor identity helpers (set/show).

use std::path::PathBuf;

use crate::actor::{persist_actor, resolve_actor};
use crate::cli::GlobalOptions;
use crate::context::Context;
use crate::error::Result;
use crate::output::{emit_success, HumanOutput, OutputOptions};

/// Options for `plank actor set`
pub struct SetOptions {
    pub name: String,
    pub globals: GlobalOptions,
}

#[derive(serde::Serialize)]
struct ActorSetReport {
    actor: String,
    path: PathBuf,
}

#[derive(serde::Serialize)]
struct ActorShowReport {
    actor: String,
    source: &'static str,
}

pub fn run_set(options: SetOptions) -> Result<()> {
    let ctx = Context::open(options.globals.root.as_deref())?;
    let actor_name = persist_actor(&ctx.storage, &options.name)?;
    let actor_path = ctx.storage.actor_file();

    let report = ActorSetReport {
        actor: actor_name.clone(),
        path: actor_path.clone(),
    };

    let mut human = HumanOutput::new(format!("plank actor set: {actor_name}"));
    human.push_summary("actor", actor_name);
    human.push_summary("path", actor_path.display().to_string());
    if std::env::var(crate::actor::ACTOR_ENV).is_ok() {
        human.push_warning(format!(
            "{} is set and takes precedence over .plank/actor",
            crate::actor::ACTOR_ENV
        ));
    }
    human.push_next_step("plank ws list");

    emit_success(
        OutputOptions {
            json: options.globals.json,
            quiet: options.globals.quiet,
        },
        "actor set",
        &report,
        Some(&human),
    )
}

pub fn run_show(globals: GlobalOptions) -> Result<()> {
    let ctx = Context::open(globals.root.as_deref())?;
    let actor_name = resolve_actor(Some(&ctx.storage), globals.actor.as_deref())?;
    let non_empty = |value: Option<&str>| value.map(str::trim).is_some_and(|a| !a.is_empty());
    let env_actor = std::env::var(crate::actor::ACTOR_ENV).ok();
    let source = if non_empty(globals.actor.as_deref()) {
        "flag"
    } else if non_empty(env_actor.as_deref()) {
        "env"
    } else if ctx.storage.read_actor()?.is_some() {
        "file"
    } else {
        "default"
    };

    let report = ActorShowReport {
        actor: actor_name.clone(),
        source,
    };

    let unset = source == "default";
    let header = if unset {
        "plank actor: not set".to_string()
    } else {
        format!("plank actor: {actor_name}")
    };

    let mut human = HumanOutput::new(header);
    human.push_summary("actor", actor_name);
    human.push_summary("source", source);
    if unset {
        human.push_warning("actor not set; using default".to_string());
        human.push_next_step("plank actor set <name>");
    }

    emit_success(
        OutputOptions {
            json: globals.json,
            quiet: globals.quiet,
        },
        "actor show",
        &report,
        Some(&human),
    )
}
