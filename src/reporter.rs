//! Periodic progress reporting and sidecar persistence.
//!
//! The reporter runs as its own tokio task next to the streaming loop. On each
//! tick it samples the shared byte counter, hands throughput and ETA to a
//! [`ProgressSink`] when the total size is known, and rewrites the progress
//! sidecar whether or not the total is known.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::fs::File;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{trace, warn};

use crate::downloader::DownloadSummary;
use crate::error::DownloadError;
use crate::progress_store::ProgressStore;
use crate::state::DownloadState;

/// One sample of transfer progress.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProgressUpdate {
    pub downloaded: u64,
    pub total: u64,
    pub percent: f64,
    /// Throughput of this session only; bytes from earlier attempts are excluded.
    pub bytes_per_sec: f64,
    pub eta_secs: u64,
}

impl ProgressUpdate {
    /// `None` while the total size is unknown.
    pub fn compute(downloaded: u64, total: u64, resumed_at: u64, elapsed_millis: u64) -> Option<Self> {
        if total == 0 {
            return None;
        }

        let percent = downloaded as f64 / total as f64 * 100.0;
        let secs = elapsed_millis as f64 / 1000.0;
        let bytes_per_sec = if secs > 0.0 {
            downloaded.saturating_sub(resumed_at) as f64 / secs
        } else {
            0.0
        };
        let eta_secs = if bytes_per_sec > 0.0 {
            (total.saturating_sub(downloaded) as f64 / bytes_per_sec) as u64
        } else {
            0
        };

        Some(Self {
            downloaded,
            total,
            percent,
            bytes_per_sec,
            eta_secs,
        })
    }
}

/// Where the core sends everything meant for a human. Return values are
/// never consulted.
pub trait ProgressSink: Send + Sync {
    fn started(&self, url: &str, output: &Path);
    fn progress(&self, update: &ProgressUpdate);
    fn finished(&self, outcome: Result<&DownloadSummary, &DownloadError>);
}

struct Persistence {
    store: ProgressStore,
    /// Second handle on the output file, synced before each sidecar write so
    /// the sidecar never claims bytes that are not on disk yet.
    output: File,
}

impl Persistence {
    async fn persist(&mut self, downloaded: u64) -> std::io::Result<()> {
        self.output.sync_data().await?;
        self.store.write(downloaded).await
    }
}

pub struct ProgressReporter {
    state: Arc<DownloadState>,
    sink: Arc<dyn ProgressSink>,
    interval: Duration,
    persistence: Option<Persistence>,
}

impl ProgressReporter {
    pub fn new(state: Arc<DownloadState>, sink: Arc<dyn ProgressSink>, interval: Duration) -> Self {
        Self {
            state,
            sink,
            interval: interval.max(Duration::from_millis(1)),
            persistence: None,
        }
    }

    /// Rewrite `store` on every tick, after syncing `output`.
    pub fn with_persistence(mut self, store: ProgressStore, output: File) -> Self {
        self.persistence = Some(Persistence { store, output });
        self
    }

    /// Starts ticking. The first tick fires one interval from now.
    pub fn spawn(self) -> ReporterHandle {
        let (stop_tx, stop_rx) = oneshot::channel();
        let task = tokio::spawn(self.run(stop_rx));
        ReporterHandle {
            stop: Some(stop_tx),
            task: Some(task),
        }
    }

    async fn run(mut self, mut stop: oneshot::Receiver<()>) -> Option<ProgressStore> {
        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = &mut stop => break,
                _ = ticker.tick() => self.tick().await,
            }
        }

        self.persistence.map(|p| p.store)
    }

    async fn tick(&mut self) {
        let tick_millis = u64::try_from(self.interval.as_millis()).unwrap_or(u64::MAX);
        let elapsed = self.state.add_elapsed(tick_millis);
        let downloaded = self.state.bytes_downloaded();

        if let Some(update) = ProgressUpdate::compute(
            downloaded,
            self.state.total_size(),
            self.state.bytes_at_resume(),
            elapsed,
        ) {
            self.sink.progress(&update);
        }

        if let Some(persistence) = &mut self.persistence {
            match persistence.persist(downloaded).await {
                Ok(()) => trace!(downloaded, "progress persisted"),
                Err(e) => warn!(
                    path = %persistence.store.path().display(),
                    error = %e,
                    "failed to persist progress"
                ),
            }
        }
    }
}

/// Handle to a running reporter.
///
/// Dropping it without calling [`ReporterHandle::stop`] aborts the task.
pub struct ReporterHandle {
    stop: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<Option<ProgressStore>>>,
}

impl ReporterHandle {
    /// Signals the reporter and waits for it to finish any tick in flight.
    /// Hands back the sidecar store, if any, once nothing else can write it.
    pub async fn stop(mut self) -> Option<ProgressStore> {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        let task = self.task.take()?;
        match task.await {
            Ok(store) => store,
            Err(e) => {
                warn!(error = %e, "progress reporter ended abnormally");
                None
            }
        }
    }
}

impl Drop for ReporterHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
