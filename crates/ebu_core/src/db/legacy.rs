//! Pre-ledger schema safety net.
//!
//! # Responsibility
//! - Add columns that databases created before `schema_migrations`
//!   existed may still be missing.
//!
//! # Invariants
//! - Runs after ledger migrations at startup; never writes the ledger.
//! - Every fix is guarded by a column-existence check, so repeated runs
//!   and databases already fixed by the ledger are no-ops.

use crate::db::{table_exists, table_has_column, DbResult};
use log::info;
use rusqlite::Connection;

struct LegacyColumn {
    table: &'static str,
    column: &'static str,
    ddl: &'static str,
}

const LEGACY_COLUMNS: &[LegacyColumn] = &[
    LegacyColumn {
        table: "questions",
        column: "learning_guide",
        ddl: "ALTER TABLE questions ADD COLUMN learning_guide TEXT NOT NULL DEFAULT ''",
    },
    LegacyColumn {
        table: "ai_configs",
        column: "config_data",
        ddl: "ALTER TABLE ai_configs ADD COLUMN config_data TEXT",
    },
];

/// Ensures every legacy-era column exists. Returns the columns it added.
pub fn ensure_question_columns(conn: &Connection) -> DbResult<Vec<&'static str>> {
    let mut added = Vec::new();
    for fix in LEGACY_COLUMNS {
        if !table_exists(conn, fix.table)? {
            continue;
        }
        if table_has_column(conn, fix.table, fix.column)? {
            continue;
        }
        conn.execute_batch(fix.ddl)?;
        info!(
            "event=legacy_columns module=db status=ok table={} column={}",
            fix.table, fix.column
        );
        added.push(fix.column);
    }
    Ok(added)
}
