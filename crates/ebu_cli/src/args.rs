//! Command-line and environment configuration.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "ebu", version, about = "Administer an E-Bu question store")]
pub struct Cli {
    /// SQLite database file. Parent directories are created when missing.
    #[arg(long, env = "DB_PATH", default_value = "ebu.db")]
    pub db_path: PathBuf,

    /// Absolute directory for rolling log files. Logging is off when unset.
    #[arg(long, env = "EBU_LOG_DIR")]
    pub log_dir: Option<String>,

    /// trace|debug|info|warn|error. Defaults by build mode.
    #[arg(long, env = "EBU_LOG_LEVEL")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Inspect or apply schema migrations.
    Migrations {
        #[command(subcommand)]
        action: MigrationsCommand,
    },
    /// List one page of questions.
    List(ListArgs),
    /// Move a question to the trash.
    Delete { id: String },
    /// Bring a question back from the trash.
    Restore { id: String },
    /// Permanently remove a question.
    Purge { id: String },
    /// Inspect the AI provider configuration.
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },
    /// Print a full JSON backup to stdout.
    Export,
    /// Replace every question with the contents of a JSON backup file.
    Import { file: PathBuf },
}

#[derive(Debug, Subcommand)]
pub enum MigrationsCommand {
    /// Show applied and pending migrations.
    Status,
    /// Apply every pending migration.
    Apply,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the caller-facing config view.
    Show,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// List the trash instead of active questions.
    #[arg(long)]
    pub trash: bool,

    /// Knowledge-point tag.
    #[arg(long)]
    pub tag: Option<String>,

    /// Substring searched across question text fields.
    #[arg(long)]
    pub query: Option<String>,

    /// Subject label, e.g. 数学. Unknown labels select 其他.
    #[arg(long)]
    pub subject: Option<String>,

    #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
    pub page: i64,

    #[arg(long, default_value_t = 20, allow_negative_numbers = true)]
    pub page_size: i64,
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command};
    use clap::{CommandFactory, Parser};

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn list_accepts_negative_page() {
        let cli = Cli::try_parse_from(["ebu", "list", "--page", "-3", "--tag", "基本不等式"]).unwrap();
        match cli.command {
            Command::List(args) => {
                assert_eq!(args.page, -3);
                assert_eq!(args.page_size, 20);
                assert_eq!(args.tag.as_deref(), Some("基本不等式"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
