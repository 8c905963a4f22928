//! Core storage logic for the E-Bu question bank.
//! This crate owns schema migrations, question queries and lifecycle rules.

pub mod backup;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use backup::{export_backup, import_backup, import_backup_json, BackupData, BackupError};
pub use db::migrations::{
    apply_migrations_to_latest, latest_version, migration_status, ApplyReport, Migration,
    MigrationInfo, MigrationStatus, Migrator,
};
pub use db::{open_db, open_db_in_memory, open_db_with_report, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status, LogLevel};
pub use model::ai_config::{AiConfig, AiConfigView, AiProviderType};
pub use model::question::{
    now_epoch_ms, Partition, Question, QuestionId, QuestionPatch, QuestionValidationError,
    Subject,
};
pub use repo::ai_config_repo::{AiConfigRepository, SqliteAiConfigRepository};
pub use repo::question_repo::{
    QuestionListQuery, QuestionPage, QuestionRepository, RepoError, RepoResult,
    SqliteQuestionRepository,
};
pub use service::question_service::{LifecycleAction, QuestionService};
