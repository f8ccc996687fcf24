//! `.plank.toml`, the per-board settings file.
//!
//! Every section is optional; missing keys take their defaults and the
//! result is validated before any command runs.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

use crate::board::TaskStatus;
use crate::error::{Error, Result};

/// Lives at the board root, next to `.plank/`.
pub const CONFIG_FILE: &str = ".plank.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub actor: ActorConfig,

    /// Task ids and the column new tasks land in
    #[serde(default)]
    pub tasks: TasksConfig,

    /// Board ordering and batch limits
    #[serde(default)]
    pub board: BoardConfig,

    /// HTTP API settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Discussion channel settings
    #[serde(default)]
    pub discussion: DiscussionConfig,
}

/// `[actor]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorConfig {
    /// Used when no flag, `PLANK_ACTOR` or `.plank/actor` names one
    #[serde(default = "default_actor")]
    pub default: String,
}

fn default_actor() -> String {
    "unknown".to_string()
}

impl Default for ActorConfig {
    fn default() -> Self {
        Self {
            default: default_actor(),
        }
    }
}

/// `[tasks]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TasksConfig {
    /// Board-wide task ID prefix
    #[serde(default = "default_task_id_prefix")]
    pub id_prefix: String,

    /// Minimum task ID suffix length
    #[serde(default = "default_task_id_min_len")]
    pub id_min_len: usize,

    /// Column for new tasks when none is given
    #[serde(default = "default_task_status")]
    pub default_status: String,
}

fn default_task_id_prefix() -> String {
    "pl".to_string()
}

fn default_task_id_min_len() -> usize {
    3
}

fn default_task_status() -> String {
    TaskStatus::Todo.as_str().to_string()
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            id_prefix: default_task_id_prefix(),
            id_min_len: default_task_id_min_len(),
            default_status: default_task_status(),
        }
    }
}

impl TasksConfig {
    /// The configured default column.
    pub fn default_status(&self) -> Result<TaskStatus> {
        self.default_status.trim().parse().map_err(|_| {
            Error::InvalidConfig(format!(
                "tasks.default_status '{}' is not a board column",
                self.default_status
            ))
        })
    }

    fn validate(&self) -> Result<()> {
        let prefix = self.id_prefix.trim();
        if prefix.is_empty() {
            return Err(Error::InvalidConfig(
                "tasks.id_prefix cannot be empty".to_string(),
            ));
        }
        if !prefix.chars().all(|ch| ch.is_ascii_alphanumeric()) {
            return Err(Error::InvalidConfig(
                "tasks.id_prefix must be alphanumeric".to_string(),
            ));
        }
        if self.id_min_len < 3 {
            return Err(Error::InvalidConfig(
                "tasks.id_min_len must be >= 3".to_string(),
            ));
        }
        if self.id_min_len > 16 {
            return Err(Error::InvalidConfig(
                "tasks.id_min_len must be <= 16".to_string(),
            ));
        }
        self.default_status()?;
        Ok(())
    }
}

/// Board configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardConfig {
    /// Maximum number of tasks in one bulk position update
    #[serde(default = "default_bulk_limit")]
    pub bulk_limit: usize,
}

fn default_bulk_limit() -> usize {
    100
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            bulk_limit: default_bulk_limit(),
        }
    }
}

/// HTTP API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address for `plank serve`
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Allow any origin (for a separately served frontend)
    #[serde(default)]
    pub permissive_cors: bool,
}

fn default_bind() -> String {
    "127.0.0.1:3170".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            permissive_cors: false,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.bind.trim().parse().map_err(|err| {
            Error::InvalidConfig(format!("server.bind '{}': {err}", self.bind))
        })
    }
}

/// Discussion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscussionConfig {
    /// Longest accepted message body, in characters
    #[serde(default = "default_max_message_len")]
    pub max_message_len: usize,
}

fn default_max_message_len() -> usize {
    4000
}

impl Default for DiscussionConfig {
    fn default() -> Self {
        Self {
            max_message_len: default_max_message_len(),
        }
    }
}

impl Config {
    /// Load configuration from a `.plank.toml` file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the board root; defaults when the file is missing.
    pub fn load_from_root(root: &Path) -> Result<Self> {
        let config_path = root.join(CONFIG_FILE);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Written by `plank init`.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        self.tasks.validate()?;
        if self.board.bulk_limit == 0 || self.board.bulk_limit > 1000 {
            return Err(Error::InvalidConfig(
                "board.bulk_limit must be between 1 and 1000".to_string(),
            ));
        }
        self.server.bind_addr()?;
        if self.discussion.max_message_len == 0 {
            return Err(Error::InvalidConfig(
                "discussion.max_message_len must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn defaults_are_expected() {
        let cfg = Config::default();
        assert_eq!(cfg.actor.default, "unknown");
        assert_eq!(cfg.tasks.id_prefix, "pl");
        assert_eq!(cfg.tasks.id_min_len, 3);
        assert_eq!(cfg.tasks.default_status().unwrap(), TaskStatus::Todo);
        assert_eq!(cfg.board.bulk_limit, 100);
        assert_eq!(cfg.server.bind, "127.0.0.1:3170");
        assert!(!cfg.server.permissive_cors);
        assert_eq!(cfg.discussion.max_message_len, 4000);
    }

    #[test]
    fn load_parses_overrides() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE);
        let content = r#"
[actor]
default = "alice"

[tasks]
id_prefix = "web"
id_min_len = 4
default_status = "backlog"

[board]
bulk_limit = 25

[server]
bind = "0.0.0.0:8080"
permissive_cors = true

[discussion]
max_message_len = 280
"#;
        fs::write(&path, content.trim()).expect("write config");

        let cfg = Config::load(&path).expect("load config");
        assert_eq!(cfg.actor.default, "alice");
        assert_eq!(cfg.tasks.id_prefix, "web");
        assert_eq!(cfg.tasks.id_min_len, 4);
        assert_eq!(cfg.tasks.default_status().unwrap(), TaskStatus::Backlog);
        assert_eq!(cfg.board.bulk_limit, 25);
        assert_eq!(cfg.server.bind_addr().unwrap().port(), 8080);
        assert!(cfg.server.permissive_cors);
        assert_eq!(cfg.discussion.max_message_len, 280);
    }

    #[test]
    fn unknown_default_status_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "[tasks]\ndefault_status = \"someday\"").expect("write config");

        let err = Config::load(&path).expect_err("invalid config");
        match err {
            Error::InvalidConfig(msg) => assert!(msg.contains("someday")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn invalid_task_prefix_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "[tasks]\nid_prefix = \"a-b\"").expect("write config");

        assert!(matches!(
            Config::load(&path),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn zero_bulk_limit_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "[board]\nbulk_limit = 0").expect("write config");

        assert!(matches!(
            Config::load(&path),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn bad_bind_address_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "[server]\nbind = \"localhost\"").expect("write config");

        assert!(matches!(
            Config::load(&path),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn load_from_root_defaults_when_missing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = Config::load_from_root(dir.path()).expect("defaults");
        assert_eq!(cfg.tasks.id_prefix, "pl");
    }

    #[test]
    fn save_round_trips_through_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE);
        let mut cfg = Config::default();
        cfg.actor.default = "bob".to_string();
        cfg.save(&path).expect("save config");

        let written = fs::read_to_string(&path).expect("read config");
        assert!(written.contains("default = \"bob\""));
        let loaded = Config::load(&path).expect("reload");
        assert_eq!(loaded.actor.default, "bob");
    }
}
