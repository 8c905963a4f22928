//! Ledger-tracked SQLite migration registry and executor.
//!
//! # Responsibility
//! - Register schema migrations as `(version, name, upgrade)` steps.
//! - Report applied/pending state from the `schema_migrations` ledger.
//! - Apply pending steps one transaction per step.
//!
//! # Invariants
//! - Catalog versions are positive and strictly ascending; gaps are allowed.
//! - A version present in the ledger never runs its upgrade body again.
//! - Upgrade body and ledger row commit or roll back together.
//! - Upgrade bodies tolerate pre-ledger databases by checking the schema
//!   before destructive DDL.
//! - Highest applied version is mirrored to `PRAGMA user_version`.

use crate::db::{table_has_column, DbError, DbResult};
use log::{error, info};
use rusqlite::{params, Connection, TransactionBehavior};
use serde::Serialize;
use std::collections::BTreeSet;
use std::time::Instant;

/// Executable body of one migration. Runs inside the step transaction.
pub type UpgradeFn = fn(&Connection) -> rusqlite::Result<()>;

/// One versioned schema upgrade step.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: u32,
    pub name: &'static str,
    pub upgrade: UpgradeFn,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create questions and ai_configs tables",
        upgrade: create_base_tables,
    },
    Migration {
        version: 2,
        name: "ensure questions.learning_guide column",
        upgrade: ensure_learning_guide_column,
    },
    Migration {
        version: 3,
        name: "ensure ai_configs.config_data column",
        upgrade: ensure_config_data_column,
    },
    Migration {
        version: 4,
        name: "index questions by partition ordering",
        upgrade: create_partition_indexes,
    },
];

/// Version/name pair used for both ledger rows and pending entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationInfo {
    pub version: u32,
    pub name: String,
}

impl From<&Migration> for MigrationInfo {
    fn from(value: &Migration) -> Self {
        Self {
            version: value.version,
            name: value.name.to_string(),
        }
    }
}

/// Snapshot of ledger state against the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationStatus {
    pub db_path: String,
    /// Ledger rows ordered by version.
    pub applied: Vec<MigrationInfo>,
    /// Catalog entries absent from the ledger, ascending.
    pub pending: Vec<MigrationInfo>,
    /// Highest ledger version, 0 when empty.
    pub current: u32,
    /// Highest catalog version.
    pub latest: u32,
    pub pending_count: usize,
    pub applied_count: usize,
}

/// Result envelope for an on-demand apply call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    pub applied: Vec<MigrationInfo>,
    pub count: usize,
}

impl From<Vec<MigrationInfo>> for ApplyReport {
    fn from(applied: Vec<MigrationInfo>) -> Self {
        let count = applied.len();
        Self { applied, count }
    }
}

/// Migration engine over a validated catalog.
#[derive(Debug, Clone)]
pub struct Migrator {
    catalog: Vec<Migration>,
}

impl Migrator {
    /// Engine over the built-in catalog.
    pub fn standard() -> DbResult<Self> {
        Self::with_catalog(MIGRATIONS.to_vec())
    }

    /// Engine over a caller-supplied catalog.
    ///
    /// # Errors
    /// - `InvalidMigrationCatalog` for zero, duplicate or out-of-order versions.
    pub fn with_catalog(catalog: Vec<Migration>) -> DbResult<Self> {
        validate_catalog(&catalog)?;
        Ok(Self { catalog })
    }

    pub fn catalog(&self) -> &[Migration] {
        &self.catalog
    }

    pub fn latest_version(&self) -> u32 {
        self.catalog.last().map_or(0, |migration| migration.version)
    }

    /// Highest version recorded in the ledger (0 when empty).
    pub fn current_version(&self, conn: &Connection) -> DbResult<u32> {
        ensure_ledger(conn)?;
        let version = conn.query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations;",
            [],
            |row| row.get::<_, u32>(0),
        )?;
        Ok(version)
    }

    /// Catalog entries not yet recorded in the ledger, ascending.
    pub fn pending(&self, conn: &Connection) -> DbResult<Vec<MigrationInfo>> {
        let applied = applied_versions(conn)?;
        Ok(self
            .catalog
            .iter()
            .filter(|migration| !applied.contains(&migration.version))
            .map(MigrationInfo::from)
            .collect())
    }

    /// Reports ledger state for administrative callers.
    pub fn status(&self, conn: &Connection, db_path: &str) -> DbResult<MigrationStatus> {
        let applied = load_ledger(conn)?;
        let pending = self.pending(conn)?;
        let current = applied.iter().map(|row| row.version).max().unwrap_or(0);

        Ok(MigrationStatus {
            db_path: db_path.to_string(),
            pending_count: pending.len(),
            applied_count: applied.len(),
            applied,
            pending,
            current,
            latest: self.latest_version(),
        })
    }

    /// Applies every pending migration in ascending order.
    ///
    /// Returns the steps applied by this call; empty when already current.
    ///
    /// # Errors
    /// - `MigrationFailed` for the first failing step. Steps before it stay
    ///   committed; the failing step leaves neither schema nor ledger changes.
    pub fn apply_to_latest(&self, conn: &mut Connection) -> DbResult<Vec<MigrationInfo>> {
        let started_at = Instant::now();
        let applied = applied_versions(conn)?;
        let mut applied_now = Vec::new();

        for migration in &self.catalog {
            if applied.contains(&migration.version) {
                continue;
            }

            let step_started_at = Instant::now();
            match apply_step(conn, migration) {
                Ok(true) => {
                    info!(
                        "event=migration_apply module=db status=ok version={} duration_ms={}",
                        migration.version,
                        step_started_at.elapsed().as_millis()
                    );
                    applied_now.push(MigrationInfo::from(migration));
                }
                Ok(false) => {
                    info!(
                        "event=migration_apply module=db status=skipped version={} reason=already_recorded",
                        migration.version
                    );
                }
                Err(source) => {
                    error!(
                        "event=migration_apply module=db status=error version={} duration_ms={} error_code=migration_failed error={}",
                        migration.version,
                        step_started_at.elapsed().as_millis(),
                        source
                    );
                    return Err(DbError::MigrationFailed {
                        version: migration.version,
                        name: migration.name,
                        source,
                    });
                }
            }
        }

        info!(
            "event=migrations_apply module=db status=ok count={} duration_ms={}",
            applied_now.len(),
            started_at.elapsed().as_millis()
        );
        Ok(applied_now)
    }
}

/// Returns the latest migration version known by this binary.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Reports ledger state using the built-in catalog.
pub fn migration_status(conn: &Connection, db_path: &str) -> DbResult<MigrationStatus> {
    Migrator::standard()?.status(conn, db_path)
}

/// Applies all pending built-in migrations on the provided connection.
pub fn apply_migrations_to_latest(conn: &mut Connection) -> DbResult<Vec<MigrationInfo>> {
    Migrator::standard()?.apply_to_latest(conn)
}

/// Checks that versions are positive and strictly ascending.
pub fn validate_catalog(catalog: &[Migration]) -> DbResult<()> {
    let mut previous = 0;
    for migration in catalog {
        if migration.version <= previous {
            return Err(DbError::InvalidMigrationCatalog {
                version: migration.version,
                previous,
            });
        }
        previous = migration.version;
    }
    Ok(())
}

fn apply_step(conn: &mut Connection, migration: &Migration) -> rusqlite::Result<bool> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    // Another connection may have applied this step since the ledger was read.
    let recorded: i64 = tx.query_row(
        "SELECT EXISTS(SELECT 1 FROM schema_migrations WHERE version = ?1);",
        [migration.version],
        |row| row.get(0),
    )?;
    if recorded == 1 {
        return Ok(false);
    }

    (migration.upgrade)(&tx)?;
    tx.execute(
        "INSERT INTO schema_migrations (version, name) VALUES (?1, ?2);",
        params![migration.version, migration.name],
    )?;
    let highest: u32 = tx.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations;",
        [],
        |row| row.get(0),
    )?;
    tx.execute_batch(&format!("PRAGMA user_version = {highest};"))?;
    tx.commit()?;
    Ok(true)
}

fn ensure_ledger(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY NOT NULL,
            name TEXT NOT NULL
        );",
    )?;
    Ok(())
}

fn load_ledger(conn: &Connection) -> DbResult<Vec<MigrationInfo>> {
    ensure_ledger(conn)?;
    let mut stmt = conn.prepare("SELECT version, name FROM schema_migrations ORDER BY version ASC;")?;
    let mut rows = stmt.query([])?;
    let mut ledger = Vec::new();
    while let Some(row) = rows.next()? {
        ledger.push(MigrationInfo {
            version: row.get(0)?,
            name: row.get(1)?,
        });
    }
    Ok(ledger)
}

fn applied_versions(conn: &Connection) -> DbResult<BTreeSet<u32>> {
    Ok(load_ledger(conn)?
        .into_iter()
        .map(|row| row.version)
        .collect())
}

fn create_base_tables(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(include_str!("0001_base_tables.sql"))
}

fn ensure_learning_guide_column(conn: &Connection) -> rusqlite::Result<()> {
    if table_has_column(conn, "questions", "learning_guide")? {
        return Ok(());
    }
    conn.execute_batch(include_str!("0002_learning_guide.sql"))
}

fn ensure_config_data_column(conn: &Connection) -> rusqlite::Result<()> {
    if table_has_column(conn, "ai_configs", "config_data")? {
        return Ok(());
    }
    conn.execute_batch(include_str!("0003_config_data.sql"))
}

fn create_partition_indexes(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(include_str!("0004_partition_indexes.sql"))
}
