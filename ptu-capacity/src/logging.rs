//! Tracing subscriber setup.
//!
//! Logs always go to stderr so stdout stays clean for command output. When a
//! log directory is configured, a daily rolling file is written as well.
//! `RUST_LOG` replaces the configured level entirely.

use std::path::PathBuf;

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Crates kept quiet unless `RUST_LOG` asks for them.
const QUIET_TARGETS: &[&str] = &["reqwest", "hyper", "hyper_util", "rustls", "h2"];

#[derive(Debug, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Default level or directive string (e.g. `info`, `ptu_capacity=debug`).
    pub level: String,
    pub directory: Option<PathBuf>,
    /// Log file name prefix; the date is appended.
    pub file_prefix: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
            file_prefix: "ptu-capacity.log".to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("failed to create log directory {path}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("a global subscriber is already installed: {0}")]
    AlreadyInitialized(String),
}

/// Filter directives for a configured level.
pub fn default_directives(level: &str) -> String {
    let level = if level.trim().is_empty() { "info" } else { level.trim() };
    QUIET_TARGETS
        .iter()
        .fold(level.to_string(), |directives, target| format!("{},{}=warn", directives, target))
}

fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(level)))
}

/// Installs the global subscriber.
///
/// Returns the file writer's guard when file logging is enabled; keep it
/// alive until exit so buffered lines are flushed.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>, LoggingError> {
    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(build_filter(&config.level));

    let (file, guard) = match &config.directory {
        Some(dir) => {
            std::fs::create_dir_all(dir).map_err(|source| LoggingError::Directory {
                path: dir.clone(),
                source,
            })?;
            let appender = tracing_appender::rolling::daily(dir, &config.file_prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(build_filter(&config.level));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file)
        .try_init()
        .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;

    if let Some(dir) = &config.directory {
        tracing::debug!(directory = %dir.display(), "File logging enabled");
    }
    Ok(guard)
}
