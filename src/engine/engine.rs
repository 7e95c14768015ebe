use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use parking_lot::{Mutex, RwLock};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::{
    config::AppConfig,
    error::{ApmError, Result},
    export::{ExportFormat, ExportHandle, Exporter},
    metrics::{ActionLedger, ApmCalculator, Statistics},
};

use super::StatisticsSource;

/// Lifecycle of a recording session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum SessionState {
    Idle,
    Recording { started_at: Instant },
}

/// Main entry point for the tracking engine.
///
/// Owns the action ledger, the session state machine, the timer-driven
/// statistics publisher, and the export pipeline. Construct with
/// [`EngineBuilder`](super::EngineBuilder).
pub struct ApmEngine {
    pub(super) config: Arc<AppConfig>,
    pub(super) ledger: Arc<ActionLedger>,
    pub(super) calculator: ApmCalculator,
    pub(super) session: Arc<RwLock<SessionState>>,
    pub(super) accepting: Arc<AtomicBool>,
    pub(super) latest: Arc<watch::Sender<Statistics>>,
    pub(super) exporter: Arc<Exporter>,
    pub(super) poller_shutdown: Mutex<Option<oneshot::Sender<()>>>,
    pub(super) poller: Mutex<Option<JoinHandle<()>>>,
}

/// Cheap cloneable handle for the input-capture thread.
///
/// The capture collaborator calls [`record`](Self::record) once per
/// detected input event; events are silently discarded while no
/// session is recording.
#[derive(Clone)]
pub struct CaptureHandle {
    ledger: Arc<ActionLedger>,
    accepting: Arc<AtomicBool>,
}

impl CaptureHandle {
    /// Record one input event at the current instant
    pub fn record(&self) {
        self.record_at(Instant::now());
    }

    /// Record one input event at `at`
    pub fn record_at(&self, at: Instant) {
        if self.accepting.load(Ordering::Relaxed) {
            self.ledger.record(at);
        }
    }

    /// Whether events are currently being accepted
    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::Relaxed)
    }
}

/// Information about the engine's configuration and state
#[derive(Debug, Clone)]
pub struct EngineInfo {
    /// Whether a session is currently recording
    pub recording: bool,
    /// Retention window for the rolling rate
    pub window: Duration,
    /// Interval between statistics publications
    pub poll_interval: Duration,
    /// Directory receiving exported artifacts
    pub export_directory: PathBuf,
}

impl ApmEngine {
    /// Create a new engine builder
    pub fn builder() -> super::EngineBuilder {
        super::EngineBuilder::new()
    }

    /// Get information about the engine's configuration and state
    pub fn info(&self) -> EngineInfo {
        EngineInfo {
            recording: self.is_recording(),
            window: self.config.tracking.window,
            poll_interval: self.config.monitoring.poll_interval,
            export_directory: self.config.export.directory.clone(),
        }
    }

    /// Whether a session is currently recording
    pub fn is_recording(&self) -> bool {
        matches!(*self.session.read(), SessionState::Recording { .. })
    }

    /// Get a handle for the input-capture thread
    pub fn capture_handle(&self) -> CaptureHandle {
        CaptureHandle {
            ledger: self.ledger.clone(),
            accepting: self.accepting.clone(),
        }
    }

    /// Start a new recording session.
    ///
    /// Rejected while a session is already recording; use
    /// [`reset`](Self::reset) to restart in place.
    pub fn start(&self) -> Result<()> {
        let mut session = self.session.write();
        if matches!(*session, SessionState::Recording { .. }) {
            return Err(ApmError::Session {
                message: "session already recording; stop or reset first".to_string(),
            });
        }

        self.ledger.reset();
        self.latest
            .send_replace(Statistics::zeroed(SystemTime::now()));
        *session = SessionState::Recording {
            started_at: Instant::now(),
        };
        self.accepting.store(true, Ordering::SeqCst);
        info!("session started");
        Ok(())
    }

    /// Stop the current session.
    ///
    /// Capture stops accepting events immediately. The final
    /// statistics are computed, published, and returned, so exports
    /// issued after the stop still read the finished session's
    /// numbers. In-flight exports are unaffected.
    pub fn stop(&self) -> Result<Statistics> {
        let mut session = self.session.write();
        let started_at = match *session {
            SessionState::Recording { started_at } => started_at,
            SessionState::Idle => {
                return Err(ApmError::Session {
                    message: "no session recording".to_string(),
                })
            }
        };

        self.accepting.store(false, Ordering::SeqCst);
        let now = Instant::now();
        let stats = self
            .calculator
            .compute(&self.ledger.snapshot_at(now), started_at, now);
        self.latest.send_replace(stats.clone());
        *session = SessionState::Idle;
        info!(
            total_actions = stats.total_actions,
            "session stopped"
        );
        Ok(stats)
    }

    /// Clear all statistics.
    ///
    /// When recording, the session keeps running with a fresh start
    /// timestamp; when idle, the last session's numbers are discarded.
    pub fn reset(&self) {
        let mut session = self.session.write();
        self.ledger.reset();
        if let SessionState::Recording { ref mut started_at } = *session {
            *started_at = Instant::now();
        }
        self.latest
            .send_replace(Statistics::zeroed(SystemTime::now()));
        debug!("session reset");
    }

    /// Compute current statistics.
    ///
    /// While recording this derives fresh values from a ledger
    /// snapshot; while idle it returns the last published values, so
    /// displays and exports never blank out.
    pub fn statistics(&self) -> Statistics {
        let session = self.session.read();
        match *session {
            SessionState::Recording { started_at } => {
                let now = Instant::now();
                self.calculator
                    .compute(&self.ledger.snapshot_at(now), started_at, now)
            }
            SessionState::Idle => self.latest.borrow().clone(),
        }
    }

    /// Subscribe to the periodic statistics publications.
    ///
    /// The channel always holds the last published value; the polling
    /// task replaces it on every tick while a session is recording.
    pub fn subscribe(&self) -> watch::Receiver<Statistics> {
        self.latest.subscribe()
    }

    /// Export the latest statistics to the given formats.
    ///
    /// Non-blocking: the request is queued for the export worker and
    /// the returned handle resolves when the files are on disk.
    /// Allowed from either session state.
    pub fn export(&self, formats: &[ExportFormat]) -> Result<ExportHandle> {
        self.exporter.submit(self.statistics(), formats.to_vec())
    }

    /// Stop the polling task and drain the export queue
    pub async fn shutdown(&self) -> Result<()> {
        self.accepting.store(false, Ordering::SeqCst);

        if let Some(tx) = self.poller_shutdown.lock().take() {
            let _ = tx.send(());
        }
        let poller = self.poller.lock().take();
        if let Some(poller) = poller {
            let _ = poller.await;
        }

        self.exporter.shutdown().await
    }

    /// Spawn the timer-driven statistics publisher
    pub(super) fn spawn_poller(
        calculator: ApmCalculator,
        ledger: Arc<ActionLedger>,
        session: Arc<RwLock<SessionState>>,
        latest: Arc<watch::Sender<Statistics>>,
        poll_interval: Duration,
    ) -> (oneshot::Sender<()>, JoinHandle<()>) {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poll_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => {
                        debug!("statistics poller shutting down");
                        break;
                    }
                    _ = ticker.tick() => {
                        let started_at = match *session.read() {
                            SessionState::Recording { started_at } => Some(started_at),
                            SessionState::Idle => None,
                        };
                        if let Some(started_at) = started_at {
                            let now = Instant::now();
                            let stats = calculator
                                .compute(&ledger.snapshot_at(now), started_at, now);
                            latest.send_replace(stats);
                        }
                    }
                }
            }
        });

        (shutdown_tx, handle)
    }
}

#[async_trait::async_trait]
impl StatisticsSource for ApmEngine {
    fn latest(&self) -> Statistics {
        self.statistics()
    }

    async fn shutdown(&self) -> Result<()> {
        ApmEngine::shutdown(self).await
    }
}
