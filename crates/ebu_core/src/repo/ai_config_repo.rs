//! AI config singleton repository.
//!
//! # Responsibility
//! - Read and upsert the single `ai_configs` row.
//! - Seed the default row during connection bootstrap.
//!
//! # Invariants
//! - The table never holds more than one row: the schema admits only
//!   `id = 1`, and writes always target the existing row when there is one.
//! - A missing row after bootstrap is store corruption, not an empty state.
//! - `save_config` leaves stored optional fields alone when the incoming
//!   value is `None`.

use crate::db::DbError;
use crate::model::ai_config::{AiConfig, AiProviderType};
use crate::repo::question_repo::{RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension};

const SINGLETON_ID: i64 = 1;

/// Repository interface for the AI config singleton.
pub trait AiConfigRepository {
    /// Returns the sole config row.
    fn get_config(&self) -> RepoResult<AiConfig>;
    /// Updates the existing row in place, or creates it when absent.
    fn save_config(&self, config: &AiConfig) -> RepoResult<()>;
}

/// SQLite-backed AI config repository.
pub struct SqliteAiConfigRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAiConfigRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl AiConfigRepository for SqliteAiConfigRepository<'_> {
    fn get_config(&self) -> RepoResult<AiConfig> {
        let config = self
            .conn
            .query_row(
                "SELECT type, api_key, base_url, model_name, system_prompt, config_data
                 FROM ai_configs
                 ORDER BY id ASC
                 LIMIT 1;",
                [],
                |row| {
                    let provider: String = row.get(0)?;
                    Ok(AiConfig {
                        provider: AiProviderType::parse(&provider),
                        api_key: row.get(1)?,
                        base_url: row.get(2)?,
                        model_name: row.get(3)?,
                        system_prompt: row.get(4)?,
                        config_data: row.get(5)?,
                    })
                },
            )
            .optional()?;

        config.ok_or(RepoError::Db(DbError::MissingAiConfig))
    }

    fn save_config(&self, config: &AiConfig) -> RepoResult<()> {
        let tx = self.conn.unchecked_transaction()?;

        let existing_id: Option<i64> = tx
            .query_row("SELECT MIN(id) FROM ai_configs;", [], |row| row.get(0))?;

        match existing_id {
            Some(id) => {
                tx.execute(
                    "UPDATE ai_configs
                     SET
                        type = ?2,
                        api_key = COALESCE(?3, api_key),
                        base_url = COALESCE(?4, base_url),
                        model_name = COALESCE(?5, model_name),
                        system_prompt = COALESCE(?6, system_prompt),
                        config_data = COALESCE(?7, config_data)
                     WHERE id = ?1;",
                    params![
                        id,
                        config.provider.as_str(),
                        config.api_key.as_deref(),
                        config.base_url.as_deref(),
                        config.model_name.as_deref(),
                        config.system_prompt.as_deref(),
                        config.config_data.as_deref(),
                    ],
                )?;
            }
            None => {
                tx.execute(
                    "INSERT INTO ai_configs (
                        id, type, api_key, base_url, model_name, system_prompt, config_data
                     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
                    params![
                        SINGLETON_ID,
                        config.provider.as_str(),
                        config.api_key.as_deref(),
                        config.base_url.as_deref(),
                        config.model_name.as_deref(),
                        config.system_prompt.as_deref(),
                        config.config_data.as_deref(),
                    ],
                )?;
            }
        }

        tx.commit()?;
        Ok(())
    }
}

/// Inserts the default-provider row when the table is empty.
///
/// Returns `true` when a row was created.
pub(crate) fn insert_default_if_absent(conn: &Connection) -> rusqlite::Result<bool> {
    let inserted = conn.execute(
        "INSERT INTO ai_configs (id, type)
         SELECT ?1, ?2
         WHERE NOT EXISTS (SELECT 1 FROM ai_configs);",
        params![SINGLETON_ID, AiProviderType::default().as_str()],
    )?;
    Ok(inserted == 1)
}
