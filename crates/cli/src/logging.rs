//! Tracing subscriber setup

use anyhow::Result;
use std::path::Path;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;

/// Log file name prefix inside the log directory
const LOG_FILE_PREFIX: &str = "survey-edit.log";

/// Install the global subscriber
///
/// Logs go to stderr, or to a daily-rotated file when `directory` is set.
/// The returned guard must be held until exit so buffered lines get flushed.
pub fn init(level: Level, directory: Option<&Path>) -> Result<Option<WorkerGuard>> {
    match directory {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_max_level(level)
                .with_ansi(false)
                .with_writer(writer)
                .try_init()
                .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::fmt()
                .with_max_level(level)
                .with_writer(std::io::stderr)
                .try_init()
                .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;
            Ok(None)
        }
    }
}

/// Effective level: `-v` flags win over the configured level
pub fn effective_level(configured: Level, verbose: u8) -> Level {
    match verbose {
        0 => configured,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}
