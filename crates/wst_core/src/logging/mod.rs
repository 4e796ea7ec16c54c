//! Logging infrastructure for workstation tools.
//!
//! This module provides:
//! - Global `tracing` subscriber setup (stderr, optional daily log file)
//! - Per-item loggers with a stderr tail buffer for failure reports
//!
//! # Example
//!
//! ```no_run
//! use wst_core::logging::{init_tracing, ItemLogger, LogLevel};
//!
//! init_tracing(LogLevel::Info);
//!
//! let logger = ItemLogger::new("movie.mkv", "/path/to/logs", 20).unwrap();
//! logger.command("ffmpeg -i movie.mkv ...");
//! logger.exit(0);
//! ```

mod item_logger;
mod types;

pub use item_logger::ItemLogger;
pub(crate) use item_logger::sanitize_filename;
pub use types::{LogLevel, MessagePrefix};

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// File name prefix for the daily application log.
const LOG_FILE_PREFIX: &str = "wst.log";

/// Initialize global tracing subscriber for application-wide logging.
///
/// This sets up a subscriber that:
/// - Respects RUST_LOG environment variable
/// - Falls back to the provided default level
/// - Outputs to stderr
///
/// Should be called once at application startup.
pub fn init_tracing(default_level: LogLevel) {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(env_filter(default_level))
        .init();
}

/// Initialize tracing with an additional daily-rolling log file.
///
/// Returns the appender guard; keep it alive until exit so buffered lines
/// are flushed. If the logs directory cannot be created, logging falls back
/// to stderr only and `None` is returned.
pub fn init_tracing_with_file(default_level: LogLevel, logs_dir: &Path) -> Option<WorkerGuard> {
    let (file_layer, guard) = match std::fs::create_dir_all(logs_dir) {
        Ok(()) => {
            let appender = tracing_appender::rolling::daily(logs_dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        Err(e) => {
            eprintln!(
                "Warning: cannot create logs folder {}: {}",
                logs_dir.display(),
                e
            );
            (None, None)
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(file_layer)
        .with(env_filter(default_level))
        .init();

    guard
}

fn env_filter(default_level: LogLevel) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_to_filter_str(default_level)))
}

/// Convert LogLevel to filter string.
fn level_to_filter_str(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Trace => "trace",
        LogLevel::Debug => "debug",
        LogLevel::Info => "info",
        LogLevel::Warn => "warn",
        LogLevel::Error => "error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_to_filter_works() {
        assert_eq!(level_to_filter_str(LogLevel::Debug), "debug");
        assert_eq!(level_to_filter_str(LogLevel::Warn), "warn");
    }
}
