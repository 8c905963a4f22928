//! Storage layer: connection startup, migrations and the legacy safety net.
//!
//! # Responsibility
//! - Hand out SQLite connections whose schema is current.
//! - Own the migration ledger and the pre-ledger column fixes.
//!
//! # Invariants
//! - `schema_migrations` holds one row per applied version.
//! - `PRAGMA user_version` equals the highest ledger version.
//! - No question or config data is touched until migrations succeed.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod legacy;
pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory, open_db_with_report};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    /// Catalog versions must be positive and strictly ascending.
    InvalidMigrationCatalog {
        version: u32,
        previous: u32,
    },
    /// One upgrade body (or its ledger insert) failed and was rolled back.
    MigrationFailed {
        version: u32,
        name: &'static str,
        source: rusqlite::Error,
    },
    /// The singleton config row vanished after startup initialization.
    MissingAiConfig,
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::InvalidMigrationCatalog { version, previous } => write!(
                f,
                "migration catalog is not strictly ascending: version {version} follows {previous}"
            ),
            Self::MigrationFailed {
                version,
                name,
                source,
            } => write!(f, "migration {version} ({name}) failed: {source}"),
            Self::MissingAiConfig => write!(f, "ai config singleton row is missing"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::MigrationFailed { source, .. } => Some(source),
            Self::UnsupportedSchemaVersion { .. }
            | Self::InvalidMigrationCatalog { .. }
            | Self::MissingAiConfig => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

pub(crate) fn table_exists(conn: &rusqlite::Connection, table: &str) -> rusqlite::Result<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

pub(crate) fn table_has_column(
    conn: &rusqlite::Connection,
    table: &str,
    column: &str,
) -> rusqlite::Result<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let names = stmt.query_map([], |row| row.get::<_, String>("name"))?;
    for name in names {
        if name? == column {
            return Ok(true);
        }
    }
    Ok(false)
}
