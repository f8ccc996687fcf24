//! plank init command implementation
//!
//! Creates `.plank/` with empty logs and a default `.plank.toml`.

use std::path::{Path, PathBuf};

use crate::cli::GlobalOptions;
use crate::config::{Config, CONFIG_FILE};
use crate::error::Result;
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::storage::Storage;

#[derive(serde::Serialize)]
struct InitReport {
    root: PathBuf,
    created: InitCreated,
}

#[derive(serde::Serialize)]
struct InitCreated {
    config: bool,
    state_dir: bool,
}

pub fn run(globals: GlobalOptions) -> Result<()> {
    let root = match globals.root {
        Some(path) => path,
        None => std::env::current_dir()?,
    };
    std::fs::create_dir_all(&root)?;

    let storage = Storage::new(root.clone());
    let created_state_dir = storage.init()?;
    let created_config = ensure_config(&root)?;

    let report = InitReport {
        root: root.clone(),
        created: InitCreated {
            config: created_config,
            state_dir: created_state_dir,
        },
    };

    let header = if created_config || created_state_dir {
        format!("plank init: initialized {}", root.display())
    } else {
        format!("plank init: already initialized at {}", root.display())
    };
    let mut human = HumanOutput::new(header);
    human.push_summary("root", root.display().to_string());
    human.push_summary("config", created_label(created_config));
    human.push_summary(".plank/", created_label(created_state_dir));
    human.push_next_step("plank actor set <name>");
    human.push_next_step("plank ws new <name>");

    emit_success(
        OutputOptions {
            json: globals.json,
            quiet: globals.quiet,
        },
        "init",
        &report,
        Some(&human),
    )
}

fn ensure_config(root: &Path) -> Result<bool> {
    let path = root.join(CONFIG_FILE);
    if path.exists() {
        return Ok(false);
    }
    Config::default().save(&path)?;
    Ok(true)
}

fn created_label(created: bool) -> &'static str {
    if created {
        "created"
    } else {
        "exists"
    }
}
