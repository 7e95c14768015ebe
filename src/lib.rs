//! APMLive - real-time input rate tracking for gamers
//!
//! This crate provides the concurrent core of an actions-per-minute
//! tracker: a lock-disciplined action ledger fed by the input-capture
//! thread, rolling-rate statistics computed from point-in-time
//! snapshots, a timer-driven live publication channel, and an export
//! pipeline that writes text and JSON artifacts off the hot path.
//!
//! The graphical shell and the operating-system input hook are
//! external collaborators: the hook calls [`CaptureHandle::record`]
//! once per detected event, and the presentation layer reads
//! [`Statistics`] values from [`ApmEngine::subscribe`].

#![warn(missing_docs)]

// Public modules
pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod metrics;

// Internal modules
mod utils;

/// Crate version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Re-exports for public API
pub use config::AppConfig;
pub use engine::{ApmEngine, CaptureHandle, EngineBuilder, EngineInfo, StatisticsSource};
pub use error::{ApmError, Result};
pub use export::{ExportFormat, ExportHandle, ExportOutcome, Exporter, ExportStats};
pub use metrics::{ActionLedger, ApmCalculator, LedgerSnapshot, Statistics};
pub use utils::{setup_logging, LogConfig};

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_version_number() {
        assert!(!VERSION.is_empty());
    }

    #[tokio::test]
    async fn test_end_to_end_session() {
        let dir = tempfile::tempdir().unwrap();
        let engine = EngineBuilder::new()
            .with_poll_interval(Duration::from_millis(20))
            .with_export_directory(dir.path())
            .build()
            .await
            .unwrap();

        engine.start().unwrap();
        let capture = engine.capture_handle();
        let producer = std::thread::spawn(move || {
            for _ in 0..200 {
                capture.record();
            }
        });
        producer.join().unwrap();

        let stats = engine.stop().unwrap();
        assert_eq!(stats.total_actions, 200);

        let outcome = engine
            .export(&[ExportFormat::Text, ExportFormat::Json])
            .unwrap()
            .wait()
            .await
            .unwrap();
        assert_eq!(outcome.written.len(), 2);

        let json = std::fs::read_to_string(dir.path().join("apm_data.json")).unwrap();
        let exported: Statistics = serde_json::from_str(&json).unwrap();
        assert_eq!(exported.total_actions, 200);

        engine.shutdown().await.unwrap();
    }
}
