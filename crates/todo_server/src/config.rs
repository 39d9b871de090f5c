//! Server configuration.
//!
//! Values resolve in order: defaults, then the YAML file, then `TODO_*`
//! environment variables, then command-line flags (applied by `main`).
//!
//! ```yaml
//! listen_addr: "127.0.0.1:8080"
//! backend: sqlite
//! database_path: /var/lib/todo/todos.sqlite3
//! log_level: info
//! log_dir: /var/log/todo
//! ```

use serde::Deserialize;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use todo_core::default_log_level;

pub const ENV_LISTEN_ADDR: &str = "TODO_LISTEN_ADDR";
pub const ENV_BACKEND: &str = "TODO_BACKEND";
pub const ENV_SNAPSHOT_PATH: &str = "TODO_SNAPSHOT_PATH";
pub const ENV_DATABASE_PATH: &str = "TODO_DATABASE_PATH";
pub const ENV_LOG_LEVEL: &str = "TODO_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "TODO_LOG_DIR";

/// Which store implementation backs the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// JSON snapshot file rewritten on every change.
    Snapshot,
    /// SQLite database.
    Sqlite,
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "snapshot" => Ok(Self::Snapshot),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(format!("unknown backend `{other}`; expected snapshot|sqlite")),
        }
    }
}

impl Display for Backend {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Snapshot => write!(f, "snapshot"),
            Self::Sqlite => write!(f, "sqlite"),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Socket address the HTTP server binds to
    pub listen_addr: String,
    pub backend: Backend,
    /// Snapshot file used by the `snapshot` backend
    pub snapshot_path: PathBuf,
    /// Database file used by the `sqlite` backend
    pub database_path: PathBuf,
    pub log_level: String,
    /// Absolute directory for rolling log files; stderr when unset
    pub log_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
            backend: Backend::Snapshot,
            snapshot_path: PathBuf::from("todos.json"),
            database_path: PathBuf::from("todos.sqlite3"),
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl Config {
    /// Loads defaults overlaid with `config_path`, when given.
    ///
    /// An explicitly named file must exist.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = config_path else {
            return Ok(Self::default());
        };

        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(path.to_path_buf(), e))?;
        Self::from_yaml(&contents).map_err(|e| ConfigError::ParseError(path.to_path_buf(), e))
    }

    /// Parses YAML; missing keys keep their defaults.
    pub fn from_yaml(contents: &str) -> Result<Self, serde_yaml::Error> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(contents)
    }

    /// Applies `TODO_*` overrides read through `lookup`.
    ///
    /// Pass `|key| std::env::var(key).ok()` for the process environment.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(addr) = lookup(ENV_LISTEN_ADDR) {
            self.listen_addr = addr;
        }
        if let Some(backend) = lookup(ENV_BACKEND) {
            self.backend = backend.parse().map_err(|_| ConfigError::InvalidValue {
                key: ENV_BACKEND,
                value: backend,
            })?;
        }
        if let Some(path) = lookup(ENV_SNAPSHOT_PATH) {
            self.snapshot_path = PathBuf::from(path);
        }
        if let Some(path) = lookup(ENV_DATABASE_PATH) {
            self.database_path = PathBuf::from(path);
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.log_level = level;
        }
        if let Some(dir) = lookup(ENV_LOG_DIR) {
            self.log_dir = if dir.trim().is_empty() {
                None
            } else {
                Some(PathBuf::from(dir))
            };
        }
        Ok(())
    }
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
    InvalidValue { key: &'static str, value: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::InvalidValue { key, value } => {
                write!(f, "Invalid value '{value}' for {key}")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::ReadError(_, e) => Some(e),
            ConfigError::ParseError(_, e) => Some(e),
            ConfigError::InvalidValue { .. } => None,
        }
    }
}
