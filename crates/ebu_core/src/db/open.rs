//! Connection opening and startup bootstrap.
//!
//! # Responsibility
//! - Open a SQLite file or an in-memory database.
//! - Run the startup sequence: pragmas, version guard, ledger migrations,
//!   legacy column fixes, default AI config row.
//!
//! # Invariants
//! - A connection is only handed out after the whole startup sequence
//!   succeeded. A failing migration yields an error and no connection.
//! - Handed-out connections have `foreign_keys=ON` and a busy timeout.
//! - Handed-out connections hold exactly one `ai_configs` row.

use super::legacy::ensure_question_columns;
use super::migrations::{MigrationInfo, Migrator};
use super::{DbError, DbResult};
use crate::repo::ai_config_repo::insert_default_if_absent;
use log::{error, info};
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

enum Location<'a> {
    File(&'a Path),
    Memory,
}

impl Location<'_> {
    fn mode(&self) -> &'static str {
        match self {
            Self::File(_) => "file",
            Self::Memory => "memory",
        }
    }

    fn connect(&self) -> rusqlite::Result<Connection> {
        match self {
            Self::File(path) => Connection::open(path),
            Self::Memory => Connection::open_in_memory(),
        }
    }
}

/// Opens (creating if needed) the database file at `path`, migrated to
/// the latest schema.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    open_db_with_report(path).map(|(conn, _)| conn)
}

/// Like [`open_db`], also returning the migrations this call applied.
pub fn open_db_with_report(
    path: impl AsRef<Path>,
) -> DbResult<(Connection, Vec<MigrationInfo>)> {
    open_at(Location::File(path.as_ref()))
}

/// Opens a private in-memory database with the latest schema.
pub fn open_db_in_memory() -> DbResult<Connection> {
    open_at(Location::Memory).map(|(conn, _)| conn)
}

fn open_at(location: Location<'_>) -> DbResult<(Connection, Vec<MigrationInfo>)> {
    let started_at = Instant::now();
    let mode = location.mode();
    info!("event=db_open module=db status=start mode={mode}");

    let result = location
        .connect()
        .map_err(DbError::from)
        .and_then(|mut conn| bootstrap(&mut conn).map(|applied| (conn, applied)));

    match &result {
        Ok((_, applied)) => info!(
            "event=db_open module=db status=ok mode={} migrations_applied={} duration_ms={}",
            mode,
            applied.len(),
            started_at.elapsed().as_millis()
        ),
        Err(err) => error!(
            "event=db_open module=db status=error mode={} duration_ms={} error_code={} error={}",
            mode,
            started_at.elapsed().as_millis(),
            error_code(err),
            err
        ),
    }
    result
}

fn bootstrap(conn: &mut Connection) -> DbResult<Vec<MigrationInfo>> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(BUSY_TIMEOUT)?;

    let migrator = Migrator::standard()?;
    let current = migrator.current_version(conn)?;
    if current > migrator.latest_version() {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current,
            latest_supported: migrator.latest_version(),
        });
    }

    let applied = migrator.apply_to_latest(conn)?;
    ensure_question_columns(conn)?;

    if insert_default_if_absent(conn)? {
        info!("event=ai_config_default module=db status=ok");
    }
    Ok(applied)
}

fn error_code(err: &DbError) -> &'static str {
    match err {
        DbError::Sqlite(_) => "db_open_failed",
        DbError::UnsupportedSchemaVersion { .. } => "schema_too_new",
        DbError::InvalidMigrationCatalog { .. } => "invalid_catalog",
        DbError::MigrationFailed { .. } => "migration_failed",
        DbError::MissingAiConfig => "missing_ai_config",
    }
}
