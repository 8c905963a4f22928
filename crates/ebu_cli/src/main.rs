//! Operator CLI over the E-Bu question store.
//!
//! # Responsibility
//! - Resolve configuration, open (and thereby migrate) the database.
//! - Expose migration status/apply, paging, lifecycle and backup commands.
//! - Print results as JSON on stdout.
//!
//! # Invariants
//! - `migrations` subcommands see the on-disk ledger as is; no startup
//!   migrations run before them.
//! - For every other command, a migration failure during open exits before
//!   the command runs.

mod args;

use args::{Cli, Command, ConfigCommand, ListArgs, MigrationsCommand};
use clap::Parser;
use ebu_core::{
    default_log_level, export_backup, import_backup_json, init_logging, migration_status,
    open_db_with_report, AiConfigRepository, ApplyReport, LifecycleAction, Migrator, Partition,
    QuestionListQuery, QuestionService, RepoError, SqliteAiConfigRepository,
    SqliteQuestionRepository, Subject,
};
use log::error;
use rusqlite::Connection;
use serde_json::Value;
use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

enum CliError {
    Startup(String),
    NotFound(String),
    Failed(String),
}

impl CliError {
    fn exit_code(&self) -> u8 {
        match self {
            Self::Failed(_) => 1,
            Self::NotFound(_) => 2,
            Self::Startup(_) => 3,
        }
    }

    fn message(&self) -> &str {
        match self {
            Self::Startup(message) | Self::NotFound(message) | Self::Failed(message) => message,
        }
    }
}

impl From<RepoError> for CliError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(_) => Self::NotFound(value.to_string()),
            other => Self::Failed(other.to_string()),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(output) => match serde_json::to_string_pretty(&output) {
            Ok(text) => {
                println!("{text}");
                ExitCode::SUCCESS
            }
            Err(err) => {
                eprintln!("error: {err}");
                ExitCode::FAILURE
            }
        },
        Err(err) => {
            eprintln!("error: {}", err.message());
            ExitCode::from(err.exit_code())
        }
    }
}

fn run(cli: Cli) -> Result<Value, CliError> {
    if let Some(log_dir) = cli.log_dir.as_deref() {
        let level = cli.log_level.as_deref().unwrap_or(default_log_level());
        init_logging(level, log_dir).map_err(CliError::Startup)?;
    }

    if let Some(parent) = cli.db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|err| {
                CliError::Startup(format!(
                    "failed to create database directory `{}`: {err}",
                    parent.display()
                ))
            })?;
        }
    }

    let db_path = cli.db_path.display().to_string();
    let mut conn = match &cli.command {
        Command::Migrations { .. } => open_without_bootstrap(&cli.db_path)?,
        _ => open_db_with_report(&cli.db_path)
            .map(|(conn, _)| conn)
            .map_err(|err| {
                error!(
                    "event=cli_start module=cli status=error error_code=db_open_failed error={err}"
                );
                CliError::Startup(err.to_string())
            })?,
    };

    match cli.command {
        Command::Migrations { action } => run_migrations(&mut conn, &db_path, action),
        Command::List(list_args) => run_list(&conn, list_args),
        Command::Delete { id } => lifecycle(&conn, &id, LifecycleAction::SoftDelete),
        Command::Restore { id } => lifecycle(&conn, &id, LifecycleAction::Restore),
        Command::Purge { id } => lifecycle(&conn, &id, LifecycleAction::HardDelete),
        Command::Config {
            action: ConfigCommand::Show,
        } => {
            let config = SqliteAiConfigRepository::new(&conn).get_config()?;
            to_json(&config.view())
        }
        Command::Export => {
            let repo = SqliteQuestionRepository::try_new(&conn)?;
            to_json(&export_backup(&repo)?)
        }
        Command::Import { file } => {
            let json = std::fs::read_to_string(&file).map_err(|err| {
                CliError::Failed(format!("failed to read `{}`: {err}", file.display()))
            })?;
            let repo = SqliteQuestionRepository::try_new(&conn)?;
            let count =
                import_backup_json(&repo, &json).map_err(|err| CliError::Failed(err.to_string()))?;
            Ok(serde_json::json!({ "count": count }))
        }
    }
}

/// Plain connection for the ledger commands: busy timeout and foreign keys,
/// nothing applied.
fn open_without_bootstrap(path: &Path) -> Result<Connection, CliError> {
    Connection::open(path)
        .and_then(|conn| {
            conn.busy_timeout(BUSY_TIMEOUT)?;
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
            Ok(conn)
        })
        .map_err(|err| {
            error!("event=cli_start module=cli status=error error_code=db_open_failed error={err}");
            CliError::Startup(format!("failed to open `{}`: {err}", path.display()))
        })
}

fn run_migrations(
    conn: &mut Connection,
    db_path: &str,
    action: MigrationsCommand,
) -> Result<Value, CliError> {
    let failed = |err: ebu_core::DbError| CliError::Failed(err.to_string());
    match action {
        MigrationsCommand::Status => to_json(&migration_status(conn, db_path).map_err(failed)?),
        MigrationsCommand::Apply => {
            let applied = Migrator::standard()
                .and_then(|migrator| migrator.apply_to_latest(conn))
                .map_err(failed)?;
            to_json(&ApplyReport::from(applied))
        }
    }
}

fn run_list(conn: &Connection, list_args: ListArgs) -> Result<Value, CliError> {
    let service = QuestionService::new(SqliteQuestionRepository::try_new(conn)?);
    let query = QuestionListQuery {
        partition: if list_args.trash {
            Partition::Trashed
        } else {
            Partition::Active
        },
        tag: list_args.tag,
        text: list_args.query,
        subject: list_args.subject.as_deref().map(Subject::parse_lenient),
        page: list_args.page,
        page_size: list_args.page_size,
    };
    to_json(&service.list_questions(&query)?)
}

fn lifecycle(conn: &Connection, id: &str, action: LifecycleAction) -> Result<Value, CliError> {
    let service = QuestionService::new(SqliteQuestionRepository::try_new(conn)?);
    service.apply(id, action)?;
    Ok(serde_json::json!({ "id": id, "action": action.as_str(), "status": "ok" }))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, CliError> {
    serde_json::to_value(value).map_err(|err| CliError::Failed(err.to_string()))
}
