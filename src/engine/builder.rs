use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;

use crate::{
    config::AppConfig,
    error::Result,
    export::Exporter,
    metrics::{ActionLedger, ApmCalculator, Statistics},
};

use super::engine::{ApmEngine, SessionState};

/// Builder for constructing an [`ApmEngine`] instance
pub struct EngineBuilder {
    config: AppConfig,
}

impl EngineBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
        }
    }

    /// Set the engine configuration
    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the retention window for the rolling rate
    pub fn with_window(mut self, window: Duration) -> Self {
        self.config.tracking.window = window;
        self
    }

    /// Set the interval between statistics publications
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.config.monitoring.poll_interval = interval;
        self
    }

    /// Set the directory receiving exported artifacts
    pub fn with_export_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.config.export.directory = directory.into();
        self
    }

    /// Build the engine instance.
    ///
    /// Validates the configuration, assembles the shared components,
    /// and spawns the export worker and the statistics poller.
    pub async fn build(self) -> Result<ApmEngine> {
        self.config.validate()?;

        let config = Arc::new(self.config);
        let ledger = Arc::new(ActionLedger::new(config.tracking.window));
        let calculator = ApmCalculator::new(config.tracking.window);
        let session = Arc::new(RwLock::new(SessionState::Idle));
        let accepting = Arc::new(AtomicBool::new(false));

        let (latest, _) = watch::channel(Statistics::zeroed(SystemTime::now()));
        let latest = Arc::new(latest);

        let exporter = Arc::new(Exporter::new(config.clone()));

        let (poller_shutdown, poller) = ApmEngine::spawn_poller(
            calculator,
            ledger.clone(),
            session.clone(),
            latest.clone(),
            config.monitoring.poll_interval,
        );

        Ok(ApmEngine {
            config,
            ledger,
            calculator,
            session,
            accepting,
            latest,
            exporter,
            poller_shutdown: Mutex::new(Some(poller_shutdown)),
            poller: Mutex::new(Some(poller)),
        })
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
