use std::path::PathBuf;
use std::sync::Once;

use anyhow::{anyhow, Context, Result};
use tracing_subscriber::EnvFilter;

use crate::config::LogLevel;

static INIT: Once = Once::new();

/// Logging configuration options
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Minimum log level when `RUST_LOG` is not set
    pub level: LogLevel,
    /// Whether to include source code locations
    pub source_location: bool,
    /// Log file path (None for stderr)
    pub file_path: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            source_location: false,
            file_path: None,
        }
    }
}

/// Initialize the global tracing subscriber.
///
/// Safe to call more than once; only the first call installs a
/// subscriber. `RUST_LOG` overrides the configured level.
pub fn setup_logging(config: &LogConfig) -> Result<()> {
    let mut result = Ok(());

    INIT.call_once(|| {
        result = setup_logging_internal(config);
    });

    result
}

fn setup_logging_internal(config: &LogConfig) -> Result<()> {
    let level: tracing::Level = config.level.into();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(config.source_location)
        .with_line_number(config.source_location);

    match &config.file_path {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create log directory {:?}", parent))?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {:?}", path))?;

            builder
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .try_init()
                .map_err(|e| anyhow!("failed to set global subscriber: {}", e))?;
        }
        None => {
            builder
                .try_init()
                .map_err(|e| anyhow!("failed to set global subscriber: {}", e))?;
        }
    }

    Ok(())
}
