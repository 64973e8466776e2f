//! Logging Infrastructure
//!
//! Structured logging setup: stdout by default, daily rolling file when a
//! log directory is configured.

use std::path::Path;

const LOG_FILE_PREFIX: &str = "inventory-server";

/// Initialize the logger with optional file output
///
/// Unknown level strings fall back to `info`. If `log_dir` cannot be created
/// the logger writes to stdout instead.
pub fn init_logger_with_file(log_level: Option<&str>, log_dir: Option<&str>) {
    let level = log_level.unwrap_or("info");

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level.parse().unwrap_or(tracing::Level::INFO))
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_target(true);

    if let Some(dir) = log_dir {
        let log_path = Path::new(dir);
        if std::fs::create_dir_all(log_path).is_ok() {
            let file_appender = tracing_appender::rolling::daily(log_path, LOG_FILE_PREFIX);
            subscriber.with_ansi(false).with_writer(file_appender).init();
            return;
        }
        eprintln!("log directory {dir} is not writable, logging to stdout");
    }

    subscriber.init();
}
