// Location: src/export/worker.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Mutex, RwLock};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::{
    config::AppConfig,
    error::{ApmError, ErrorExt, Result},
    metrics::Statistics,
};

use super::format::{render_json, render_text, ExportFormat};

/// A queued export request
struct ExportJob {
    statistics: Statistics,
    formats: Vec<ExportFormat>,
    enqueued_at: Instant,
    response_sender: oneshot::Sender<Result<ExportOutcome>>,
}

/// Serializes export requests through one long-lived worker.
///
/// Requests are queued on a bounded channel and written by a single
/// task, so rapid repeated exports can never pile up writers or
/// exhaust process resources. A full queue rejects the request with an
/// error instead of blocking the caller; disk failures are reported
/// through the request's handle and logged, never propagated into the
/// capture or compute paths.
pub struct Exporter {
    sender: mpsc::Sender<ExportJob>,
    capacity: usize,
    counters: Arc<RwLock<Counters>>,
    shutdown_signal: Mutex<Option<oneshot::Sender<()>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

#[derive(Debug, Default)]
struct Counters {
    submitted: u64,
    completed: u64,
    failed: u64,
    rejected: u64,
}

/// Counters describing the export pipeline's history
#[derive(Debug, Clone)]
pub struct ExportStats {
    /// Requests accepted onto the queue
    pub submitted: u64,
    /// Requests whose files all reached disk
    pub completed: u64,
    /// Requests that failed and were reported through their handle
    pub failed: u64,
    /// Requests rejected because the queue was full
    pub rejected: u64,
    /// Requests currently waiting in the queue
    pub queue_depth: usize,
}

/// Paths written by a completed export
#[derive(Debug, Clone)]
pub struct ExportOutcome {
    /// Destination of every artifact written, in request order
    pub written: Vec<PathBuf>,
}

/// Handle for awaiting one export request's completion
pub struct ExportHandle {
    receiver: oneshot::Receiver<Result<ExportOutcome>>,
}

impl ExportHandle {
    pub(crate) fn new(receiver: oneshot::Receiver<Result<ExportOutcome>>) -> Self {
        Self { receiver }
    }

    /// Wait for the files to reach disk or the failure to be reported
    pub async fn wait(self) -> Result<ExportOutcome> {
        self.receiver.await.map_err(|_| ApmError::Export {
            message: "export worker dropped the result".to_string(),
        })?
    }
}

impl Exporter {
    /// Create an exporter and spawn its worker task
    pub fn new(config: Arc<AppConfig>) -> Self {
        let capacity = config.export.queue_capacity;
        let (sender, receiver) = mpsc::channel(capacity);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let counters = Arc::new(RwLock::new(Counters::default()));

        let worker = Self::spawn_worker(config, receiver, shutdown_rx, counters.clone());

        Self {
            sender,
            capacity,
            counters,
            shutdown_signal: Mutex::new(Some(shutdown_tx)),
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Queue an export request.
    ///
    /// Never blocks: a full queue returns [`ApmError::QueueFull`] so
    /// the caller learns the request was not taken.
    pub fn submit(
        &self,
        statistics: Statistics,
        formats: Vec<ExportFormat>,
    ) -> Result<ExportHandle> {
        let (tx, rx) = oneshot::channel();
        let job = ExportJob {
            statistics,
            formats,
            enqueued_at: Instant::now(),
            response_sender: tx,
        };

        match self.sender.try_send(job) {
            Ok(()) => {
                self.counters.write().submitted += 1;
                Ok(ExportHandle::new(rx))
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.counters.write().rejected += 1;
                warn!(capacity = self.capacity, "export request rejected, queue full");
                Err(ApmError::QueueFull {
                    capacity: self.capacity,
                })
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(ApmError::Export {
                message: "export worker has stopped".to_string(),
            }),
        }
    }

    /// Current pipeline counters
    pub fn stats(&self) -> ExportStats {
        let counters = self.counters.read();
        ExportStats {
            submitted: counters.submitted,
            completed: counters.completed,
            failed: counters.failed,
            rejected: counters.rejected,
            queue_depth: self.capacity - self.sender.capacity(),
        }
    }

    /// Drain the queue and stop the worker.
    ///
    /// Requests already queued are still written; new submissions are
    /// rejected once the worker is gone.
    pub async fn shutdown(&self) -> Result<()> {
        if let Some(tx) = self.shutdown_signal.lock().take() {
            let _ = tx.send(());
        }

        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            worker.await.map_err(|e| ApmError::Export {
                message: format!("export worker did not stop cleanly: {}", e),
            })?;
        }
        Ok(())
    }

    /// Spawn the single consumer task
    fn spawn_worker(
        config: Arc<AppConfig>,
        mut receiver: mpsc::Receiver<ExportJob>,
        mut shutdown_rx: oneshot::Receiver<()>,
        counters: Arc<RwLock<Counters>>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => {
                        // Write out whatever was queued before the
                        // signal; a stop must not lose requested
                        // exports.
                        while let Ok(job) = receiver.try_recv() {
                            Self::process(&config, job, &counters).await;
                        }
                        debug!("export worker shutting down");
                        break;
                    }
                    job = receiver.recv() => match job {
                        Some(job) => Self::process(&config, job, &counters).await,
                        None => break,
                    }
                }
            }
        })
    }

    /// Handle one request end to end
    async fn process(config: &AppConfig, job: ExportJob, counters: &Arc<RwLock<Counters>>) {
        let wait = job.enqueued_at.elapsed();
        let result = Self::write_artifacts(config, &job.statistics, &job.formats).await;

        match &result {
            Ok(outcome) => {
                counters.write().completed += 1;
                debug!(
                    files = outcome.written.len(),
                    wait_ms = wait.as_millis() as u64,
                    "export complete"
                );
            }
            Err(e) => {
                counters.write().failed += 1;
                error!(error = %e, "export failed");
            }
        }

        // The requester may have stopped waiting; that is fine.
        let _ = job.response_sender.send(result);
    }

    /// Render and write every requested artifact
    async fn write_artifacts(
        config: &AppConfig,
        statistics: &Statistics,
        formats: &[ExportFormat],
    ) -> Result<ExportOutcome> {
        let export = &config.export;

        tokio::fs::create_dir_all(&export.directory)
            .await
            .map_err(|source| ApmError::Io {
                path: export.directory.clone(),
                source,
            })?;

        let mut writes = Vec::with_capacity(formats.len());
        for format in formats {
            let (path, content) = match format {
                ExportFormat::Text => (
                    export.directory.join(&export.text_filename),
                    render_text(statistics, &export.text_fields),
                ),
                ExportFormat::Json => (
                    export.directory.join(&export.json_filename),
                    render_json(statistics)?,
                ),
            };
            writes.push(Self::write_atomic(path, content));
        }

        let written = futures::future::try_join_all(writes).await?;
        Ok(ExportOutcome { written })
    }

    /// Replace `path` without a reader ever seeing a torn file.
    ///
    /// Content goes to a sibling temp file first and is renamed into
    /// place. Transient failures get one retry before being reported.
    async fn write_atomic(path: PathBuf, content: String) -> Result<PathBuf> {
        let mut tmp = path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        if let Err(first) = Self::try_write(&tmp, &path, &content).await {
            if !first.is_transient() {
                return Err(first);
            }
            warn!(error = %first, "export write failed, retrying once");
            Self::try_write(&tmp, &path, &content).await?;
        }
        Ok(path)
    }

    async fn try_write(tmp: &Path, path: &Path, content: &str) -> Result<()> {
        tokio::fs::write(tmp, content)
            .await
            .map_err(|source| ApmError::Io {
                path: tmp.to_path_buf(),
                source,
            })?;
        tokio::fs::rename(tmp, path)
            .await
            .map_err(|source| ApmError::Io {
                path: path.to_path_buf(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};

    fn sample_stats(total: u64) -> Statistics {
        Statistics {
            captured_at: SystemTime::UNIX_EPOCH + Duration::from_secs(1_722_803_000),
            current_apm: 90.0,
            average_apm: 84.5,
            actions_per_second: 1.5,
            total_actions: total,
            session_duration: Duration::from_secs(120),
        }
    }

    fn test_config(dir: &Path) -> Arc<AppConfig> {
        let mut config = AppConfig::default();
        config.export.directory = dir.to_path_buf();
        Arc::new(config)
    }

    #[tokio::test]
    async fn test_export_writes_both_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = Exporter::new(test_config(dir.path()));

        let outcome = exporter
            .submit(
                sample_stats(42),
                vec![ExportFormat::Text, ExportFormat::Json],
            )
            .unwrap()
            .wait()
            .await
            .unwrap();

        assert_eq!(outcome.written.len(), 2);

        let text = std::fs::read_to_string(dir.path().join("apm_data.txt")).unwrap();
        assert!(text.contains("APM: 90"));
        assert!(text.contains("Total: 42"));

        let json = std::fs::read_to_string(dir.path().join("apm_data.json")).unwrap();
        let parsed: Statistics = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, sample_stats(42));

        exporter.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_no_temp_files_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = Exporter::new(test_config(dir.path()));

        for total in 0..5u64 {
            exporter
                .submit(
                    sample_stats(total),
                    vec![ExportFormat::Text, ExportFormat::Json],
                )
                .unwrap()
                .wait()
                .await
                .unwrap();
        }

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert!(names.iter().all(|n| !n.ends_with(".tmp")), "{:?}", names);

        exporter.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_write_failure_is_surfaced_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        // Point the export directory at an existing file so directory
        // creation fails.
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"x").unwrap();

        let exporter = Exporter::new(test_config(&blocker));

        let result = exporter
            .submit(sample_stats(1), vec![ExportFormat::Json])
            .unwrap()
            .wait()
            .await;
        assert!(matches!(result, Err(ApmError::Io { .. })));

        // The worker survives a failed request.
        let result = exporter
            .submit(sample_stats(2), vec![ExportFormat::Json])
            .unwrap()
            .wait()
            .await;
        assert!(result.is_err());
        assert_eq!(exporter.stats().failed, 2);

        exporter.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_drains_queued_requests() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = Exporter::new(test_config(dir.path()));

        let handles: Vec<_> = (0..8u64)
            .filter_map(|total| {
                exporter
                    .submit(sample_stats(total), vec![ExportFormat::Json])
                    .ok()
            })
            .collect();
        assert!(!handles.is_empty());
        let accepted = handles.len() as u64;

        exporter.shutdown().await.unwrap();

        for handle in handles {
            handle.wait().await.unwrap();
        }
        assert_eq!(exporter.stats().completed, accepted);

        // New submissions are rejected once the worker is gone.
        assert!(matches!(
            exporter.submit(sample_stats(9), vec![ExportFormat::Json]),
            Err(ApmError::Export { .. })
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_export_storm_is_bounded_and_accounted() {
        const REQUESTS: usize = 1000;

        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.export.directory = dir.path().to_path_buf();
        config.export.queue_capacity = 8;
        let exporter = Exporter::new(Arc::new(config));

        let mut accepted = Vec::new();
        let mut rejected = 0u64;
        for total in 0..REQUESTS as u64 {
            match exporter.submit(sample_stats(total), vec![ExportFormat::Text]) {
                Ok(handle) => accepted.push(handle),
                Err(ApmError::QueueFull { capacity }) => {
                    assert_eq!(capacity, 8);
                    rejected += 1;
                }
                Err(e) => panic!("unexpected submit error: {}", e),
            }
        }

        // Every request was either taken or individually refused.
        assert_eq!(accepted.len() as u64 + rejected, REQUESTS as u64);

        exporter.shutdown().await.unwrap();

        let results = futures::future::join_all(
            accepted.into_iter().map(|handle| handle.wait()),
        )
        .await;
        assert!(results.iter().all(|r| r.is_ok()));

        let stats = exporter.stats();
        assert_eq!(stats.submitted, stats.completed);
        assert_eq!(stats.rejected, rejected);
        assert_eq!(stats.failed, 0);
        assert_eq!(stats.queue_depth, 0);

        // The text artifact holds the last completed request intact.
        let text = std::fs::read_to_string(dir.path().join("apm_data.txt")).unwrap();
        assert!(text.starts_with("APM: "));
    }
}
