//! Tracing setup.
//!
//! The interactive browser owns the terminal, so it logs to a file through a
//! non-blocking appender. Batch subcommands log to stderr.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::error::{FennError, Result};

pub const LOG_FILE_NAME: &str = "fenn.log";

/// Build the filter from `FENN_LOG`, then `RUST_LOG`, then `default_level`.
pub fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_env("FENN_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new(crate::config::DEFAULT_LOG_LEVEL))
}

/// Log to `<directory>/fenn.log`. Keep the returned guard alive until exit or
/// buffered lines are lost.
pub fn init_file(directory: &Path, default_level: &str) -> Result<WorkerGuard> {
    std::fs::create_dir_all(directory)?;
    let appender = tracing_appender::rolling::never(directory, LOG_FILE_NAME);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_env_filter(env_filter(default_level))
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|e| FennError::Terminal(format!("cannot install logger: {}", e)))?;
    Ok(guard)
}

/// Log to stderr.
pub fn init_stderr(default_level: &str) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(default_level))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| FennError::Terminal(format!("cannot install logger: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_level_falls_back_to_default() {
        // Must not panic on a malformed directive.
        let filter = env_filter("not a [valid directive");
        let _ = filter.to_string();
    }

    #[test]
    fn file_logger_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let logs = dir.path().join("nested/logs");
        // A global subscriber may already be installed by another test; only
        // the directory side effect is checked.
        let _ = init_file(&logs, "debug");
        assert!(logs.is_dir());
    }
}
