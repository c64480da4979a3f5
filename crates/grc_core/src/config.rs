//! Console configuration.
//!
//! # Responsibility
//! - Resolve data directory, log level, session id and feed capacity from
//!   defaults, environment variables or a JSON file.
//! - Validate values before any storage or logging is initialized.
//!
//! # Invariants
//! - `data_dir` is absolute after validation.
//! - `session_id` matches `^[A-Za-z0-9_-]{1,64}$`.

use crate::activity::DEFAULT_FEED_CAPACITY;
use crate::logging::default_log_level;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const ENV_DATA_DIR: &str = "GRC_CONSOLE_DATA_DIR";
pub const ENV_LOG_LEVEL: &str = "GRC_CONSOLE_LOG_LEVEL";
pub const ENV_SESSION: &str = "GRC_CONSOLE_SESSION";
pub const ENV_FEED_CAPACITY: &str = "GRC_CONSOLE_FEED_CAPACITY";

const DEFAULT_SESSION_ID: &str = "default";
const DATA_DIR_NAME: &str = ".grc_console";
const DB_FILE_NAME: &str = "grc_console.sqlite3";
const MAX_FEED_CAPACITY: usize = 500;
const KNOWN_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

static SESSION_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,64}$").expect("valid session id regex"));

#[derive(Debug)]
pub enum ConfigError {
    InvalidLogLevel(String),
    InvalidDataDir(String),
    InvalidSessionId(String),
    InvalidFeedCapacity(String),
    Io(std::io::Error),
    Parse(serde_json::Error),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidLogLevel(value) => write!(
                f,
                "unsupported log level `{value}`; expected trace|debug|info|warn|error"
            ),
            Self::InvalidDataDir(value) => {
                write!(f, "data dir must be a non-empty absolute path, got `{value}`")
            }
            Self::InvalidSessionId(value) => write!(
                f,
                "session id must be 1-64 characters of [A-Za-z0-9_-], got `{value}`"
            ),
            Self::InvalidFeedCapacity(value) => write!(
                f,
                "feed capacity must be between 1 and {MAX_FEED_CAPACITY}, got `{value}`"
            ),
            Self::Io(err) => write!(f, "failed to read config: {err}"),
            Self::Parse(err) => write!(f, "failed to parse config: {err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Parse(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

/// Runtime settings shared by the CLI and embedding callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub data_dir: PathBuf,
    pub log_level: String,
    pub session_id: String,
    pub feed_capacity: usize,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level().to_string(),
            session_id: DEFAULT_SESSION_ID.to_string(),
            feed_capacity: DEFAULT_FEED_CAPACITY,
        }
    }
}

impl ConsoleConfig {
    /// Builds a config from defaults overridden by `GRC_CONSOLE_*` variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(value) = lookup(ENV_DATA_DIR) {
            config.data_dir = PathBuf::from(value.trim());
        }
        if let Some(value) = lookup(ENV_LOG_LEVEL) {
            config.log_level = value;
        }
        if let Some(value) = lookup(ENV_SESSION) {
            config.session_id = value.trim().to_string();
        }
        if let Some(value) = lookup(ENV_FEED_CAPACITY) {
            config.feed_capacity = value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidFeedCapacity(value.clone()))?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Reads a JSON config file; missing fields take defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let mut config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every field and normalizes the log level to lowercase.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        let level = self.log_level.trim().to_ascii_lowercase();
        let level = if level == "warning" { "warn".to_string() } else { level };
        if !KNOWN_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(self.log_level.clone()));
        }
        self.log_level = level;

        if self.data_dir.as_os_str().is_empty() || !self.data_dir.is_absolute() {
            return Err(ConfigError::InvalidDataDir(
                self.data_dir.display().to_string(),
            ));
        }
        if !SESSION_ID_RE.is_match(&self.session_id) {
            return Err(ConfigError::InvalidSessionId(self.session_id.clone()));
        }
        if !(1..=MAX_FEED_CAPACITY).contains(&self.feed_capacity) {
            return Err(ConfigError::InvalidFeedCapacity(
                self.feed_capacity.to_string(),
            ));
        }
        Ok(())
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(DB_FILE_NAME)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }

    pub fn export_dir(&self) -> PathBuf {
        self.data_dir.join("exports")
    }
}

fn default_data_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .filter(|home| home.is_absolute())
        .unwrap_or_else(std::env::temp_dir)
        .join(DATA_DIR_NAME)
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, ConsoleConfig, ENV_DATA_DIR, ENV_FEED_CAPACITY, ENV_LOG_LEVEL};
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_are_valid() {
        let mut config = ConsoleConfig::default();
        config.validate().expect("defaults should validate");
        assert_eq!(config.session_id, "default");
        assert!(config.db_path().ends_with("grc_console.sqlite3"));
    }

    #[test]
    fn env_overrides_and_normalizes_level() {
        let dir = std::env::temp_dir().join("grc-config-test");
        let dir_str = dir.to_str().expect("temp dir should be valid UTF-8");
        let config = ConsoleConfig::from_lookup(lookup_from(&[
            (ENV_DATA_DIR, dir_str),
            (ENV_LOG_LEVEL, " Warning "),
            (ENV_FEED_CAPACITY, "20"),
        ]))
        .expect("overrides should validate");

        assert_eq!(config.data_dir, dir);
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.feed_capacity, 20);
    }

    #[test]
    fn rejects_relative_data_dir() {
        let err = ConsoleConfig::from_lookup(lookup_from(&[(ENV_DATA_DIR, "relative/dir")]))
            .expect_err("relative dir must be rejected");
        assert!(matches!(err, ConfigError::InvalidDataDir(_)));
    }

    #[test]
    fn rejects_non_numeric_and_out_of_range_capacity() {
        let err = ConsoleConfig::from_lookup(lookup_from(&[(ENV_FEED_CAPACITY, "lots")]))
            .expect_err("non-numeric capacity must be rejected");
        assert!(matches!(err, ConfigError::InvalidFeedCapacity(_)));

        let err = ConsoleConfig::from_lookup(lookup_from(&[(ENV_FEED_CAPACITY, "0")]))
            .expect_err("zero capacity must be rejected");
        assert!(matches!(err, ConfigError::InvalidFeedCapacity(_)));
    }

    #[test]
    fn rejects_bad_session_id() {
        let mut config = ConsoleConfig {
            session_id: "tab 1/../x".to_string(),
            ..ConsoleConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidSessionId(_))
        ));
    }
}
