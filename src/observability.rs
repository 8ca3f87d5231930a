//! Logging and observability helpers.

use std::fs;
use std::path::PathBuf;

use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

use crate::config::config_dir;

const LOG_FILE_PREFIX: &str = "dbchat.log";
const DEFAULT_FILTER: &str = "dbchat=info,dbchat_lib=info,tauri=info";

/// Installs the global subscriber writing to a daily rolling file.
/// Safe to call more than once; later calls are ignored.
pub fn init_tracing() {
    let log_dir = log_directory();
    if let Err(e) = fs::create_dir_all(&log_dir) {
        eprintln!("dbchat: cannot create log directory {}: {}", log_dir.display(), e);
    }

    let file_appender: RollingFileAppender =
        tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(file_appender)
        .with_ansi(false)
        .with_span_events(FmtSpan::CLOSE)
        .try_init();
}

pub fn log_directory() -> PathBuf {
    config_dir().join("logs")
}
