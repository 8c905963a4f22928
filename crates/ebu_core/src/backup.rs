//! Whole-store JSON backup export and import.
//!
//! # Responsibility
//! - Export every question (both partitions) as one JSON document.
//! - Import a document by wiping the store and reloading it.
//!
//! # Invariants
//! - Import is all-or-nothing: one transaction deletes and reinserts.
//! - Imported records get freshly generated ids.

use crate::model::question::{now_epoch_ms, Question};
use crate::repo::question_repo::{QuestionRepository, RepoError, RepoResult};
use log::info;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub const BACKUP_FORMAT_VERSION: &str = "1.2.0";

/// Serialized backup document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupData {
    pub version: String,
    /// Unix epoch seconds.
    pub exported_at: i64,
    pub data: Vec<Question>,
}

#[derive(Debug)]
pub enum BackupError {
    Json(serde_json::Error),
    Repo(RepoError),
}

impl Display for BackupError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json(err) => write!(f, "invalid backup document: {err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for BackupError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Json(err) => Some(err),
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<serde_json::Error> for BackupError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<RepoError> for BackupError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Builds a backup document of the whole store.
pub fn export_backup<R: QuestionRepository>(repo: &R) -> RepoResult<BackupData> {
    Ok(BackupData {
        version: BACKUP_FORMAT_VERSION.to_string(),
        exported_at: now_epoch_ms() / 1000,
        data: repo.list_all()?,
    })
}

/// Replaces the whole store with the document's questions.
///
/// Returns the number of imported questions.
pub fn import_backup<R: QuestionRepository>(repo: &R, backup: BackupData) -> RepoResult<usize> {
    let questions = backup
        .data
        .into_iter()
        .map(|mut question| {
            question.id = Uuid::new_v4().to_string();
            question
        })
        .collect::<Vec<_>>();

    let count = repo.replace_all(&questions)?;
    info!(
        "event=backup_import module=backup status=ok count={} source_version={}",
        count, backup.version
    );
    Ok(count)
}

/// Parses and imports a JSON backup document.
pub fn import_backup_json<R: QuestionRepository>(
    repo: &R,
    json: &str,
) -> Result<usize, BackupError> {
    let backup: BackupData = serde_json::from_str(json)?;
    Ok(import_backup(repo, backup)?)
}
