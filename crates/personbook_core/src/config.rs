//! Environment-driven store configuration.
//!
//! # Responsibility
//! - Load an optional `.env` file, then read `PERSONBOOK_*` variables.
//! - Validate values up front so startup fails before any I/O.
//!
//! # Invariants
//! - A missing `./.env` is not an error; a malformed one is.
//! - An env file named explicitly must exist.
//! - Parsing is pure over the lookup function passed to `from_lookup`.

use crate::db::DbTarget;
use crate::logging::{default_log_level, normalize_level, LogTarget};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub const DB_URI_VAR: &str = "PERSONBOOK_DB_URI";
pub const LOG_LEVEL_VAR: &str = "PERSONBOOK_LOG_LEVEL";
pub const LOG_DIR_VAR: &str = "PERSONBOOK_LOG_DIR";

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid { var: &'static str, reason: String },
    EnvFile(dotenvy::Error),
    EnvFileNotFound(PathBuf),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing(var) => write!(f, "environment variable `{var}` is not set"),
            Self::Invalid { var, reason } => write!(f, "invalid `{var}`: {reason}"),
            Self::EnvFile(err) => write!(f, "failed to load .env file: {err}"),
            Self::EnvFileNotFound(path) => write!(f, "env file `{}` not found", path.display()),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::EnvFile(err) => Some(err),
            _ => None,
        }
    }
}

impl From<dotenvy::Error> for ConfigError {
    fn from(value: dotenvy::Error) -> Self {
        Self::EnvFile(value)
    }
}

/// Resolved startup configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Connection string handed to `open_db_from_uri`.
    pub db_uri: String,
    pub log_level: &'static str,
    pub log_target: LogTarget,
}

impl StoreConfig {
    /// Config for a private in-memory database, logging to stderr.
    pub fn in_memory() -> Self {
        Self {
            db_uri: ":memory:".to_string(),
            log_level: default_log_level(),
            log_target: LogTarget::Stderr,
        }
    }

    /// Loads the env file, then reads the process environment.
    ///
    /// `db_override` takes the place of `PERSONBOOK_DB_URI` and is validated
    /// the same way.
    pub fn load(env_file: Option<&Path>, db_override: Option<&str>) -> Result<Self, ConfigError> {
        load_env_file(env_file)?;
        Self::from_lookup_with_override(|var| std::env::var(var).ok(), db_override)
    }

    /// `from_lookup` with an optional connection string that wins over
    /// the looked-up `PERSONBOOK_DB_URI`.
    pub fn from_lookup_with_override<F>(
        lookup: F,
        db_override: Option<&str>,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::from_lookup(|var: &str| match db_override {
            Some(uri) if var == DB_URI_VAR => Some(uri.to_string()),
            _ => lookup(var),
        })
    }

    /// Builds config from an arbitrary variable lookup.
    ///
    /// Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |var: &str| {
            lookup(var)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let db_uri = read(DB_URI_VAR).ok_or(ConfigError::Missing(DB_URI_VAR))?;
        DbTarget::from_uri(&db_uri).map_err(|err| ConfigError::Invalid {
            var: DB_URI_VAR,
            reason: err.to_string(),
        })?;

        let log_level = match read(LOG_LEVEL_VAR) {
            Some(level) => normalize_level(&level).map_err(|reason| ConfigError::Invalid {
                var: LOG_LEVEL_VAR,
                reason,
            })?,
            None => default_log_level(),
        };

        let log_target = match read(LOG_DIR_VAR) {
            Some(dir) => LogTarget::directory(&dir).map_err(|reason| ConfigError::Invalid {
                var: LOG_DIR_VAR,
                reason,
            })?,
            None => LogTarget::Stderr,
        };

        Ok(Self {
            db_uri,
            log_level,
            log_target,
        })
    }

    /// Replaces the connection string, keeping logging settings.
    pub fn with_db_uri(mut self, db_uri: impl Into<String>) -> Self {
        self.db_uri = db_uri.into();
        self
    }
}

/// Loads variables from `path`, or from `./.env` when `path` is `None`.
///
/// Returns whether a file was loaded. Variables already set in the process
/// environment win over file entries.
pub fn load_env_file(path: Option<&Path>) -> Result<bool, ConfigError> {
    match path {
        Some(path) => match dotenvy::from_path(path) {
            Ok(()) => Ok(true),
            Err(dotenvy::Error::Io(err)) if err.kind() == ErrorKind::NotFound => {
                Err(ConfigError::EnvFileNotFound(path.to_path_buf()))
            }
            Err(err) => Err(ConfigError::EnvFile(err)),
        },
        None => found_or_absent(dotenvy::dotenv()),
    }
}

fn found_or_absent<T>(loaded: Result<T, dotenvy::Error>) -> Result<bool, ConfigError> {
    match loaded {
        Ok(_) => Ok(true),
        Err(dotenvy::Error::Io(_)) => Ok(false),
        Err(err) => Err(ConfigError::EnvFile(err)),
    }
}
