//! Connection bootstrap utilities for SQLite.
//!
//! # Responsibility
//! - Turn a connection URI into a file or in-memory target.
//! - Configure connection pragmas and run migrations before handing out
//!   a connection.
//!
//! # Invariants
//! - Returned connections have `foreign_keys=ON`.
//! - Returned connections have migrations fully applied.

use super::migrations::apply_migrations;
use super::{DbError, DbResult};
use log::{error, info};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

const MEMORY_URIS: &[&str] = &[":memory:", "sqlite::memory:", "sqlite://:memory:"];
const FILE_URI_PREFIXES: &[&str] = &["sqlite://", "sqlite:", "file:"];

/// Where a connection URI points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbTarget {
    Memory,
    File(PathBuf),
}

impl DbTarget {
    /// Resolves a connection URI.
    ///
    /// Accepts `:memory:`, `sqlite::memory:`, `sqlite://<path>`,
    /// `sqlite:<path>`, `file:<path>` or a bare path. Query suffixes
    /// (`?mode=rwc`) are dropped.
    pub fn from_uri(uri: &str) -> DbResult<Self> {
        let trimmed = uri.trim();
        if trimmed.is_empty() {
            return Err(DbError::InvalidUri(uri.to_string()));
        }
        if MEMORY_URIS.contains(&trimmed) {
            return Ok(Self::Memory);
        }

        let mut rest = trimmed;
        for prefix in FILE_URI_PREFIXES {
            if let Some(stripped) = trimmed.strip_prefix(prefix) {
                rest = stripped;
                break;
            }
        }
        let path = rest.split('?').next().unwrap_or_default();
        if path.is_empty() {
            return Err(DbError::InvalidUri(uri.to_string()));
        }
        if path == ":memory:" {
            return Ok(Self::Memory);
        }
        Ok(Self::File(PathBuf::from(path)))
    }

    fn mode(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::File(_) => "file",
        }
    }
}

/// Opens the database a connection URI points at.
pub fn open_db_from_uri(uri: &str) -> DbResult<Connection> {
    match DbTarget::from_uri(uri) {
        Ok(DbTarget::Memory) => open_db_in_memory(),
        Ok(DbTarget::File(path)) => open_db(path),
        Err(err) => {
            error!("event=db_open module=db status=error error_code=db_uri_invalid");
            Err(err)
        }
    }
}

/// Opens a SQLite database file and applies all pending migrations.
///
/// # Side effects
/// - Creates the file when missing.
/// - Emits `db_open` logging events with duration and status.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    let target = DbTarget::File(path.as_ref().to_path_buf());
    open_target(&target, || Connection::open(path.as_ref()))
}

/// Opens an in-memory SQLite database and applies all pending migrations.
pub fn open_db_in_memory() -> DbResult<Connection> {
    open_target(&DbTarget::Memory, Connection::open_in_memory)
}

fn open_target<F>(target: &DbTarget, opener: F) -> DbResult<Connection>
where
    F: FnOnce() -> rusqlite::Result<Connection>,
{
    let started_at = Instant::now();
    let mode = target.mode();
    info!("event=db_open module=db status=start mode={mode}");

    let mut conn = match opener() {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={mode} duration_ms={} error_code=db_open_failed error={}",
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }
    };

    match bootstrap_connection(&mut conn) {
        Ok(()) => {
            info!(
                "event=db_open module=db status=ok mode={mode} duration_ms={}",
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={mode} duration_ms={} error_code=db_bootstrap_failed error={}",
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

fn bootstrap_connection(conn: &mut Connection) -> DbResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_secs(5))?;
    apply_migrations(conn)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::DbTarget;
    use crate::db::DbError;
    use std::path::PathBuf;

    #[test]
    fn memory_uris_resolve_to_memory() {
        for uri in [":memory:", "sqlite::memory:", " sqlite://:memory: "] {
            assert_eq!(DbTarget::from_uri(uri).unwrap(), DbTarget::Memory, "{uri}");
        }
    }

    #[test]
    fn prefixed_and_bare_paths_resolve_to_files() {
        assert_eq!(
            DbTarget::from_uri("sqlite:///var/lib/people.db").unwrap(),
            DbTarget::File(PathBuf::from("/var/lib/people.db"))
        );
        assert_eq!(
            DbTarget::from_uri("file:people.db?mode=rwc").unwrap(),
            DbTarget::File(PathBuf::from("people.db"))
        );
        assert_eq!(
            DbTarget::from_uri("data/people.db").unwrap(),
            DbTarget::File(PathBuf::from("data/people.db"))
        );
    }

    #[test]
    fn empty_uri_is_rejected() {
        assert!(matches!(DbTarget::from_uri("  "), Err(DbError::InvalidUri(_))));
        assert!(matches!(
            DbTarget::from_uri("sqlite://"),
            Err(DbError::InvalidUri(_))
        ));
    }
}
