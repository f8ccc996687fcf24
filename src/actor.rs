//! Actor identity management.
//!
//! Actor resolution order:
//! 1) CLI --actor (explicit)
//! 2) PLANK_ACTOR environment variable
//! 3) Persisted value in .plank/actor
//! 4) Config default (actor.default) or "unknown"

use crate::config::Config;
use crate::error::{Error, Result};
use crate::storage::Storage;

pub const ACTOR_ENV: &str = "PLANK_ACTOR";

/// Resolve the current actor using CLI, environment, persisted value, and config.
pub fn resolve_actor(storage: Option<&Storage>, cli_actor: Option<&str>) -> Result<String> {
    if let Some(actor) = non_empty(cli_actor) {
        return validate_actor(actor);
    }

    if let Ok(env_actor) = std::env::var(ACTOR_ENV) {
        if let Some(actor) = non_empty(Some(env_actor.as_str())) {
            return validate_actor(actor);
        }
    }

    if let Some(storage) = storage {
        if let Some(actor) = storage.read_actor()? {
            return Ok(actor);
        }

        let config = Config::load_from_root(storage.root())?;
        return Ok(config.actor.default);
    }

    Ok("unknown".to_string())
}

/// Persist the actor identity in `.plank/actor`.
pub fn persist_actor(storage: &Storage, actor: &str) -> Result<String> {
    let actor = non_empty(Some(actor))
        .ok_or_else(|| Error::InvalidArgument("actor name cannot be empty".to_string()))?;
    let actor = validate_actor(actor)?;
    storage.write_actor(&actor)?;
    Ok(actor)
}

/// Actor names are single tokens so they can appear in headers and logs.
pub fn validate_actor(actor: &str) -> Result<String> {
    let actor = actor.trim();
    if actor.is_empty() {
        return Err(Error::InvalidArgument(
            "actor name cannot be empty".to_string(),
        ));
    }
    if actor.len() > 64 || actor.chars().any(|ch| ch.is_whitespace() || ch.is_control()) {
        return Err(Error::InvalidArgument(format!(
            "invalid actor name '{actor}' (no whitespace, at most 64 bytes)"
        )));
    }
    Ok(actor.to_string())
}

fn non_empty(input: Option<&str>) -> Option<&str> {
    input.and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_actor_wins() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path().to_path_buf());
        storage.init().unwrap();
        storage.write_actor("persisted").unwrap();

        let actor = resolve_actor(Some(&storage), Some("  cli-user ")).unwrap();
        assert_eq!(actor, "cli-user");
    }

    #[test]
    fn persisted_actor_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path().to_path_buf());
        storage.init().unwrap();

        assert_eq!(persist_actor(&storage, " dana ").unwrap(), "dana");
        assert_eq!(storage.read_actor().unwrap(), Some("dana".to_string()));
    }

    #[test]
    fn actor_names_reject_whitespace() {
        assert!(validate_actor("two words").is_err());
        assert!(validate_actor("").is_err());
        assert_eq!(validate_actor("ok-name").unwrap(), "ok-name");
    }
}
