//! Environment-driven configuration.
//!
//! # Responsibility
//! - Load `TEAMPLANNER_*` variables into a typed [`CoreConfig`].
//! - Apply defaults for everything except what must be site-specific.
//!
//! # Invariants
//! - Upload ceilings are strictly positive.
//! - `log_dir`, when present, is passed verbatim to [`crate::init_logging`],
//!   which enforces absoluteness.

use crate::logging::default_log_level;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Environment variable prefix for every configuration key.
pub const ENV_PREFIX: &str = "TEAMPLANNER_";

/// Avatar uploads above this size are rejected.
pub const DEFAULT_AVATAR_MAX_BYTES: u64 = 1_000_000;
/// Attachment uploads above this size are rejected.
pub const DEFAULT_ATTACHMENT_MAX_BYTES: u64 = 10 * 1024 * 1024;

/// Runtime configuration for the planner core.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CoreConfig {
    /// SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,
    /// One of `trace|debug|info|warn|error`.
    #[serde(default = "default_level")]
    pub log_level: String,
    /// Absolute directory for rolling log files. Logging stays off when unset.
    #[serde(default)]
    pub log_dir: Option<String>,
    #[serde(default = "default_avatar_max_bytes")]
    pub avatar_max_bytes: u64,
    #[serde(default = "default_attachment_max_bytes")]
    pub attachment_max_bytes: u64,
    /// Delete a group once its last active member leaves.
    #[serde(default = "default_delete_empty_groups")]
    pub delete_empty_groups: bool,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            log_level: default_level(),
            log_dir: None,
            avatar_max_bytes: DEFAULT_AVATAR_MAX_BYTES,
            attachment_max_bytes: DEFAULT_ATTACHMENT_MAX_BYTES,
            delete_empty_groups: true,
        }
    }
}

impl CoreConfig {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        envy::prefixed(ENV_PREFIX)
            .from_env::<Self>()
            .map_err(ConfigError::Env)?
            .checked()
    }

    /// Loads configuration from explicit `(KEY, value)` pairs.
    ///
    /// Keys carry the `TEAMPLANNER_` prefix, as in the real environment.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let pairs = pairs
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()));
        envy::prefixed(ENV_PREFIX)
            .from_iter::<_, Self>(pairs)
            .map_err(ConfigError::Env)?
            .checked()
    }

    fn checked(self) -> Result<Self, ConfigError> {
        if self.database_path.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "database_path",
                reason: "must not be blank",
            });
        }
        if self.avatar_max_bytes == 0 {
            return Err(ConfigError::Invalid {
                key: "avatar_max_bytes",
                reason: "must be greater than zero",
            });
        }
        if self.attachment_max_bytes == 0 {
            return Err(ConfigError::Invalid {
                key: "attachment_max_bytes",
                reason: "must be greater than zero",
            });
        }
        Ok(self)
    }
}

/// Configuration loading failure.
#[derive(Debug)]
pub enum ConfigError {
    /// Variable present but not deserializable.
    Env(envy::Error),
    /// Value parsed but outside its allowed range.
    Invalid {
        key: &'static str,
        reason: &'static str,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Env(err) => write!(f, "invalid environment configuration: {err}"),
            Self::Invalid { key, reason } => {
                write!(f, "invalid configuration `{ENV_PREFIX}{}`: {reason}", key.to_ascii_uppercase())
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Env(err) => Some(err),
            Self::Invalid { .. } => None,
        }
    }
}

fn default_database_path() -> String {
    "teamplanner.sqlite3".to_string()
}

fn default_level() -> String {
    default_log_level().to_string()
}

fn default_avatar_max_bytes() -> u64 {
    DEFAULT_AVATAR_MAX_BYTES
}

fn default_attachment_max_bytes() -> u64 {
    DEFAULT_ATTACHMENT_MAX_BYTES
}

fn default_delete_empty_groups() -> bool {
    true
}
