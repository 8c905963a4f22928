//! Rolling file logs for the question store.
//!
//! # Responsibility
//! - Start the `flexi_logger` backend once per process.
//! - Route panics through the log before the default hook runs.
//!
//! # Invariants
//! - Events carry ids, versions, counts and durations. Question text,
//!   answers and API keys are never logged.
//! - A second `init_logging` call with the same level and directory is a
//!   no-op; any other second call is an error.
//! - Nothing in this module panics.

use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use log::{error, info};
use once_cell::sync::OnceCell;
use std::fmt::{Display, Formatter};
use std::panic::PanicHookInfo;
use std::path::{Path, PathBuf};

const LOG_BASENAME: &str = "ebu";
const ROTATE_AT_BYTES: u64 = 5 * 1024 * 1024;
const KEEP_ROTATED_FILES: usize = 7;
const PANIC_SUMMARY_CHARS: usize = 160;

static ACTIVE: OnceCell<ActiveLogger> = OnceCell::new();
static PANIC_HOOK: OnceCell<()> = OnceCell::new();

/// Verbosity accepted by [`init_logging`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// Case-insensitive; `warning` is accepted as `warn`.
    pub fn parse(value: &str) -> Result<Self, String> {
        match value.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(format!(
                "unsupported log level `{other}`; expected trace|debug|info|warn|error"
            )),
        }
    }

    /// `debug` for debug builds, `info` for release builds.
    pub fn for_build() -> Self {
        if cfg!(debug_assertions) {
            Self::Debug
        } else {
            Self::Info
        }
    }
}

impl Display for LogLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct LogTarget {
    level: LogLevel,
    dir: PathBuf,
}

impl LogTarget {
    fn parse(level: &str, log_dir: &str) -> Result<Self, String> {
        let level = LogLevel::parse(level)?;
        let trimmed = log_dir.trim();
        if trimmed.is_empty() {
            return Err("log_dir cannot be empty".to_string());
        }
        let dir = Path::new(trimmed);
        if !dir.is_absolute() {
            return Err(format!("log_dir must be an absolute path, got `{trimmed}`"));
        }
        Ok(Self {
            level,
            dir: dir.to_path_buf(),
        })
    }
}

struct ActiveLogger {
    target: LogTarget,
    _handle: LoggerHandle,
}

impl ActiveLogger {
    fn accept(&self, requested: &LogTarget) -> Result<(), String> {
        if &self.target == requested {
            return Ok(());
        }
        Err(format!(
            "logging already running with level `{}` at `{}`; refusing to switch to level `{}` at `{}`",
            self.target.level,
            self.target.dir.display(),
            requested.level,
            requested.dir.display()
        ))
    }
}

/// Starts file logging at `level` under the absolute directory `log_dir`.
///
/// # Errors
/// - Unknown level, blank or relative directory.
/// - Directory creation or backend startup failure.
/// - Logging already running with a different level or directory.
pub fn init_logging(level: &str, log_dir: &str) -> Result<(), String> {
    let target = LogTarget::parse(level, log_dir)?;
    ACTIVE
        .get_or_try_init(|| start(target.clone()))?
        .accept(&target)
}

/// Level and directory of the running logger, if any.
pub fn logging_status() -> Option<(&'static str, PathBuf)> {
    ACTIVE
        .get()
        .map(|active| (active.target.level.as_str(), active.target.dir.clone()))
}

/// Level name used when the caller does not pick one.
pub fn default_log_level() -> &'static str {
    LogLevel::for_build().as_str()
}

fn start(target: LogTarget) -> Result<ActiveLogger, String> {
    std::fs::create_dir_all(&target.dir).map_err(|err| {
        format!(
            "failed to create log directory `{}`: {err}",
            target.dir.display()
        )
    })?;

    let handle = Logger::try_with_str(target.level.as_str())
        .map_err(|err| format!("invalid log specification `{}`: {err}", target.level))?
        .log_to_file(
            FileSpec::default()
                .directory(target.dir.as_path())
                .basename(LOG_BASENAME),
        )
        .rotate(
            Criterion::Size(ROTATE_AT_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(KEEP_ROTATED_FILES),
        )
        .write_mode(WriteMode::BufferAndFlush)
        .append()
        .format_for_files(flexi_logger::opt_format)
        .start()
        .map_err(|err| format!("failed to start logger: {err}"))?;

    install_panic_hook();

    info!(
        "event=logging_init module=logging status=ok level={} log_dir={} version={} os={}",
        target.level,
        target.dir.display(),
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS
    );

    Ok(ActiveLogger {
        target,
        _handle: handle,
    })
}

fn install_panic_hook() {
    if PANIC_HOOK.set(()).is_err() {
        return;
    }

    let chained = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let location = info
            .location()
            .map_or_else(|| "unknown".to_string(), |loc| format!("{}:{}", loc.file(), loc.line()));
        error!(
            "event=panic module=logging status=error location={} payload={}",
            location,
            panic_summary(info)
        );
        chained(info);
    }));
}

// Payloads can quote question text, so keep them to one bounded line.
fn panic_summary(info: &PanicHookInfo<'_>) -> String {
    let payload = info
        .payload()
        .downcast_ref::<&str>()
        .map(|text| (*text).to_string())
        .or_else(|| info.payload().downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "<non-string payload>".to_string());
    single_line(&payload, PANIC_SUMMARY_CHARS)
}

fn single_line(text: &str, limit: usize) -> String {
    let flattened = text.replace(['\r', '\n'], " ");
    match flattened.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}...", &flattened[..cut]),
        None => flattened,
    }
}

#[cfg(test)]
mod tests {
    use super::{init_logging, logging_status, single_line, LogLevel, LogTarget};

    #[test]
    fn level_parse_is_case_insensitive() {
        assert_eq!(LogLevel::parse("INFO").unwrap(), LogLevel::Info);
        assert_eq!(LogLevel::parse(" warning ").unwrap(), LogLevel::Warn);
        assert!(LogLevel::parse("verbose").is_err());
    }

    #[test]
    fn target_requires_absolute_directory() {
        assert!(LogTarget::parse("info", "logs/dev")
            .unwrap_err()
            .contains("absolute"));
        assert!(LogTarget::parse("info", "   ").is_err());
    }

    #[test]
    fn single_line_flattens_and_truncates() {
        assert_eq!(single_line("数学\n物理\r化学 题目内容", 5), "数学 物理...");
        assert_eq!(single_line("短", 5), "短");
    }

    #[test]
    fn second_init_must_match_first() {
        let dir = tempfile::tempdir().unwrap();
        let dir_str = dir.path().to_str().unwrap().to_string();
        let other = tempfile::tempdir().unwrap();
        let other_str = other.path().to_str().unwrap().to_string();

        init_logging("info", &dir_str).unwrap();
        init_logging("INFO", &dir_str).unwrap();
        assert!(init_logging("debug", &dir_str)
            .unwrap_err()
            .contains("refusing to switch"));
        assert!(init_logging("info", &other_str)
            .unwrap_err()
            .contains("refusing to switch"));

        let (level, active_dir) = logging_status().unwrap();
        assert_eq!(level, "info");
        assert_eq!(active_dir, dir.path());
    }
}
