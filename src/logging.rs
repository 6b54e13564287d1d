//! Tracing setup shared by the evaluation binaries.
//!
//! Each tool logs to stdout and to its own `<tool>_<timestamp>.log` file under the
//! app's `logs` directory. Only the newest files of the same tool are kept.

use std::{
    fs::{self, File},
    path::{Path, PathBuf},
    sync::OnceLock,
    time::SystemTime,
};

use time::{OffsetDateTime, UtcOffset, format_description::FormatItem, macros::format_description};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*};

use crate::app_dirs::{self, AppDirError};

/// Log files kept per tool.
const MAX_LOG_FILES: usize = 10;

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("No log directory: {0}")]
    LogDir(#[from] AppDirError),
    #[error("Failed to read log directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to remove old log file {path}: {source}")]
    RemoveFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to create log file {path}: {source}")]
    CreateLogFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to format log file time: {0}")]
    FormatTime(time::error::Format),
    #[error("Failed to install global tracing subscriber: {0}")]
    SetGlobal(tracing::subscriber::SetGlobalDefaultError),
}

/// Log to stdout and to a fresh file named after `tool`.
///
/// Later calls are no-ops. On error nothing is installed, so the caller can still
/// fall back to [`init_stdout`].
pub fn init(tool: &str) -> Result<(), LoggingError> {
    if LOG_GUARD.get().is_some() {
        return Ok(());
    }
    let log_dir = app_dirs::logs_dir()?;
    let log_path = log_dir.join(log_file_name(tool, now_local_or_utc())?);
    let file = File::create(&log_path).map_err(|source| LoggingError::CreateLogFile {
        path: log_path.clone(),
        source,
    })?;
    prune_old_logs(&log_dir, tool, MAX_LOG_FILES)?;

    let (writer, guard) = tracing_appender::non_blocking(file);
    install(Some(writer))?;
    let _ = LOG_GUARD.set(guard);
    tracing::info!("Logging to {}", log_path.display());
    Ok(())
}

/// Log to stdout only.
pub fn init_stdout() -> Result<(), LoggingError> {
    install(None)
}

fn install(file_writer: Option<NonBlocking>) -> Result<(), LoggingError> {
    let timer = build_timer();
    let file_layer = file_writer.map(|writer| {
        fmt::layer()
            .with_ansi(false)
            .with_timer(timer.clone())
            .with_writer(writer)
    });
    let subscriber = Registry::default()
        .with(build_env_filter())
        .with(fmt::layer().with_timer(timer).with_writer(std::io::stdout))
        .with(file_layer);
    tracing::subscriber::set_global_default(subscriber).map_err(LoggingError::SetGlobal)
}

fn log_file_name(tool: &str, now: OffsetDateTime) -> Result<String, LoggingError> {
    const NAME_FORMAT: &[FormatItem<'_>] =
        format_description!("[year]-[month]-[day]_[hour]-[minute]-[second]");
    let stamp = now.format(NAME_FORMAT).map_err(LoggingError::FormatTime)?;
    Ok(format!("{tool}_{stamp}.log"))
}

/// Delete the oldest `<tool>_*.log` files until `keep` remain. Other tools' logs
/// are left alone.
fn prune_old_logs(dir: &Path, tool: &str, keep: usize) -> Result<(), LoggingError> {
    let prefix = format!("{tool}_");
    let mut logs: Vec<(SystemTime, PathBuf)> = fs::read_dir(dir)
        .map_err(|source| LoggingError::ReadDir {
            path: dir.to_path_buf(),
            source,
        })?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_tool_log(path, &prefix))
        .map(|path| {
            let modified = fs::metadata(&path)
                .and_then(|meta| meta.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            (modified, path)
        })
        .collect();
    if logs.len() <= keep {
        return Ok(());
    }
    logs.sort();
    let excess = logs.len() - keep;
    for (_, path) in logs.into_iter().take(excess) {
        fs::remove_file(&path).map_err(|source| LoggingError::RemoveFile { path, source })?;
    }
    Ok(())
}

fn is_tool_log(path: &Path, prefix: &str) -> bool {
    let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
        return false;
    };
    name.starts_with(prefix) && name.ends_with(".log")
}

fn build_timer() -> fmt::time::OffsetTime<time::format_description::BorrowedFormatItem<'static>> {
    const DISPLAY_FORMAT: &[FormatItem<'static>] =
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    fmt::time::OffsetTime::new(offset, DISPLAY_FORMAT.into())
}

fn now_local_or_utc() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

fn build_env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{thread, time::Duration};
    use tempfile::tempdir;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), "").unwrap();
        thread::sleep(Duration::from_millis(10));
    }

    #[test]
    fn file_name_carries_tool_and_timestamp() {
        let fixed = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        assert_eq!(
            log_file_name("sketcheval-divide", fixed).unwrap(),
            "sketcheval-divide_2023-11-14_22-13-20.log"
        );
    }

    #[test]
    fn prune_keeps_newest_logs_of_one_tool() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "sketcheval-divide_old.log");
        for idx in 0..5 {
            touch(dir.path(), &format!("sketcheval_{idx}.log"));
        }
        touch(dir.path(), "notes.txt");

        prune_old_logs(dir.path(), "sketcheval", 3).unwrap();
        for idx in 0..2 {
            assert!(!dir.path().join(format!("sketcheval_{idx}.log")).exists());
        }
        for idx in 2..5 {
            assert!(dir.path().join(format!("sketcheval_{idx}.log")).exists());
        }
        assert!(dir.path().join("sketcheval-divide_old.log").exists());
        assert!(dir.path().join("notes.txt").exists());
    }

    #[test]
    fn prune_below_limit_is_a_no_op() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "sketcheval_a.log");
        prune_old_logs(dir.path(), "sketcheval", 10).unwrap();
        assert!(dir.path().join("sketcheval_a.log").exists());
    }
}
