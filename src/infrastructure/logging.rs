//! Logging initialization: console output with an env-filter, plus an
//! optional non-blocking file appender.

use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::Result;
use once_cell::sync::Lazy;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

use crate::infrastructure::config::LoggingConfig;

// Keeps the non-blocking writer alive for the life of the process.
static LOG_GUARDS: Lazy<Mutex<Vec<tracing_appender::non_blocking::WorkerGuard>>> =
    Lazy::new(|| Mutex::new(Vec::new()));

/// Log directory next to the data directory.
pub fn log_directory() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("trendsift")
        .join("logs")
}

/// Initialize the tracing subscriber. Safe to call once per process;
/// subsequent calls return an error from the registry, which we ignore so
/// tests can share a process.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("trendsift={},sqlx=warn", config.level)));

    let console_layer = config
        .console_output
        .then(|| fmt::layer().with_target(true).with_ansi(true));

    let file_layer = if config.file_output {
        let dir = log_directory();
        std::fs::create_dir_all(&dir)?;
        let appender = tracing_appender::rolling::daily(dir, "trendsift.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        LOG_GUARDS.lock().expect("log guard mutex").push(guard);
        Some(fmt::layer().with_writer(writer).with_ansi(false))
    } else {
        None
    };

    let _ = Registry::default()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();

    Ok(())
}
