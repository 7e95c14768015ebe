// Location: src/config.rs

use std::path::{Path, PathBuf};
use std::time::Duration;
use lazy_static::lazy_static;
use serde::{Serialize, Deserialize};

use crate::error::{ApmError, Result};

lazy_static! {
    /// Platform default for exported data and settings.
    ///
    /// `%LOCALAPPDATA%\APMLive` on Windows, `~/.apmlive` elsewhere,
    /// falling back to `./apmlive_data` when neither variable is set.
    pub static ref DEFAULT_DATA_DIR: PathBuf = default_data_dir();
}

#[cfg(target_os = "windows")]
fn default_data_dir() -> PathBuf {
    match std::env::var_os("LOCALAPPDATA") {
        Some(base) => PathBuf::from(base).join("APMLive"),
        None => PathBuf::from("apmlive_data"),
    }
}

#[cfg(not(target_os = "windows"))]
fn default_data_dir() -> PathBuf {
    match std::env::var_os("HOME") {
        Some(base) => PathBuf::from(base).join(".apmlive"),
        None => PathBuf::from("apmlive_data"),
    }
}

/// Top-level application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Input tracking parameters
    pub tracking: TrackingConfig,
    /// Export pipeline parameters
    pub export: ExportConfig,
    /// Polling and logging parameters
    pub monitoring: MonitoringConfig,
}

/// Input tracking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    /// Trailing duration of history kept for rolling-rate computation
    pub window: Duration,
}

/// Export pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Directory receiving exported artifacts
    pub directory: PathBuf,

    /// File name of the plain-text summary
    pub text_filename: String,

    /// File name of the JSON document
    pub json_filename: String,

    /// Capacity of the queue feeding the export worker
    pub queue_capacity: usize,

    /// Which fields appear in the text summary
    pub text_fields: TextFields,
}

/// Field toggles for the text summary line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextFields {
    /// Current rolling APM
    pub apm: bool,
    /// Session average APM
    pub avg_apm: bool,
    /// Actions over the last second
    pub actions_per_second: bool,
    /// Total actions this session
    pub total_actions: bool,
    /// Session time as HH:MM:SS
    pub session_time: bool,
    /// Unix timestamp of the export
    pub timestamp: bool,
}

/// Polling and logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    /// Interval between statistics publications
    pub poll_interval: Duration,

    /// Log level
    pub log_level: LogLevel,
}

/// Log verbosity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    /// Errors only
    Error,
    /// Errors and warnings
    Warn,
    /// Normal operation
    Info,
    /// Verbose
    Debug,
    /// Everything
    Trace,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

impl Default for TextFields {
    fn default() -> Self {
        Self {
            apm: true,
            avg_apm: false,
            actions_per_second: false,
            total_actions: true,
            session_time: true,
            timestamp: false,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            tracking: TrackingConfig {
                window: Duration::from_secs(60),
            },
            export: ExportConfig {
                directory: DEFAULT_DATA_DIR.clone(),
                text_filename: "apm_data.txt".to_string(),
                json_filename: "apm_data.json".to_string(),
                queue_capacity: 32,
                text_fields: TextFields::default(),
            },
            monitoring: MonitoringConfig {
                poll_interval: Duration::from_millis(100),
                log_level: LogLevel::Info,
            },
        }
    }
}

impl AppConfig {
    /// Check that every parameter is usable before the engine is built
    pub fn validate(&self) -> Result<()> {
        if self.tracking.window.is_zero() {
            return Err(ApmError::Configuration {
                message: "retention window must be greater than zero".to_string(),
                parameter: "tracking.window".to_string(),
            });
        }

        if self.monitoring.poll_interval.is_zero() {
            return Err(ApmError::Configuration {
                message: "poll interval must be greater than zero".to_string(),
                parameter: "monitoring.poll_interval".to_string(),
            });
        }

        if self.export.queue_capacity == 0 {
            return Err(ApmError::Configuration {
                message: "queue capacity must be greater than zero".to_string(),
                parameter: "export.queue_capacity".to_string(),
            });
        }

        if self.export.text_filename.is_empty() || self.export.json_filename.is_empty() {
            return Err(ApmError::Configuration {
                message: "export file names cannot be empty".to_string(),
                parameter: "export.text_filename".to_string(),
            });
        }

        Ok(())
    }

    /// Load configuration from a JSON settings file
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| ApmError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Self = serde_json::from_str(&raw).map_err(|e| ApmError::Configuration {
            message: format!("invalid settings file: {}", e),
            parameter: path.display().to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON settings file
    pub fn save(&self, path: &Path) -> Result<()> {
        let raw = serde_json::to_string_pretty(self).map_err(|e| ApmError::Configuration {
            message: format!("settings not serializable: {}", e),
            parameter: path.display().to_string(),
        })?;

        std::fs::write(path, raw).map_err(|source| ApmError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}
