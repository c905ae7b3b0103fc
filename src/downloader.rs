use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::{Client, Response};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncSeekExt, SeekFrom};
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::config::DownloadConfig;
use crate::error::{DownloadError, TransferError};
use crate::format::NullSink;
use crate::progress_store::ProgressStore;
use crate::reporter::{ProgressReporter, ProgressSink};
use crate::request::{build_request, total_size, validate_response};
use crate::state::DownloadState;
use crate::transfer::{body_reader, TransferEngine};

/// Outcome of a completed download.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadSummary {
    pub bytes_downloaded: u64,
    /// 0 when the server never declared a length.
    pub total_size: u64,
    /// Offset the transfer resumed from; 0 for a fresh download.
    pub resumed_from: u64,
    pub elapsed: Duration,
}

pub struct Downloader {
    client: Client,
    config: DownloadConfig,
    engine: TransferEngine,
    sink: Arc<dyn ProgressSink>,
}

impl Downloader {
    pub fn new(config: DownloadConfig) -> Result<Self, DownloadError> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(DownloadError::Client)?;

        Ok(Self {
            client,
            engine: TransferEngine::new(&config),
            config,
            sink: Arc::new(NullSink),
        })
    }

    pub fn with_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Downloads `url` into `output`, resuming from `<output>.progress` when
    /// it holds prior progress.
    ///
    /// The sidecar is deleted only when the whole body arrived without error;
    /// on every other outcome it is left in place for the next attempt.
    #[instrument(skip(self, output), fields(output = %output.as_ref().display()))]
    pub async fn download(&self, url: &str, output: impl AsRef<Path>) -> Result<DownloadSummary, DownloadError> {
        let started = Instant::now();
        let outcome = self.run(url, output.as_ref(), started).await;
        match &outcome {
            Ok(summary) => info!(
                bytes = summary.bytes_downloaded,
                resumed_from = summary.resumed_from,
                elapsed_ms = u64::try_from(summary.elapsed.as_millis()).unwrap_or(u64::MAX),
                "download completed"
            ),
            Err(e) => debug!(error = %e, "download failed"),
        }
        self.sink.finished(outcome.as_ref());
        outcome
    }

    async fn run(&self, url: &str, output: &Path, started: Instant) -> Result<DownloadSummary, DownloadError> {
        Url::parse(url).map_err(|source| DownloadError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;
        let state = Arc::new(DownloadState::new(url, output, self.config.use_progress_file));

        let baseline = if state.use_progress_file() {
            resume_baseline(&state).await
        } else {
            0
        };
        let request = build_request(&self.client, &state, baseline);
        let offset = state.bytes_downloaded();
        debug!(phase = "request_built", offset);

        let response = request
            .send()
            .await
            .map_err(|e| DownloadError::transport(url, e))?;
        validate_response(url, response.status(), offset, state.progress_path())?;
        state.set_total_size(total_size(offset, response.content_length()));
        debug!(
            phase = "response_validated",
            status = %response.status(),
            total_size = state.total_size(),
        );

        self.stream(&state, response).await?;

        Ok(DownloadSummary {
            bytes_downloaded: state.bytes_downloaded(),
            total_size: state.total_size(),
            resumed_from: offset,
            elapsed: started.elapsed(),
        })
    }

    async fn stream(&self, state: &Arc<DownloadState>, response: Response) -> Result<(), DownloadError> {
        let output_path = state.output_path();
        let mut output = open_output(output_path, state.bytes_downloaded()).await?;

        let mut reporter = ProgressReporter::new(state.clone(), self.sink.clone(), self.config.tick_interval);
        if state.use_progress_file() {
            let store = ProgressStore::open(state.progress_path())
                .await
                .map_err(|e| DownloadError::io(state.progress_path(), e))?;
            let sync_handle = output
                .try_clone()
                .await
                .map_err(|e| DownloadError::io(output_path, e))?;
            reporter = reporter.with_persistence(store, sync_handle);
        }
        let reporter = reporter.spawn();

        debug!(phase = "streaming", offset = state.bytes_downloaded());
        self.sink.started(state.source_url(), output_path);

        let result = self
            .engine
            .stream_body(body_reader(response), &mut output, state.downloaded_counter())
            .await;

        // The sidecar handle is closed here, after the reporter's last tick.
        drop(reporter.stop().await);

        match result {
            Ok(moved) => {
                debug!(moved, "stream finished");
                output
                    .sync_all()
                    .await
                    .map_err(|e| DownloadError::io(output_path, e))?;
                drop(output);
                if state.use_progress_file() {
                    ProgressStore::remove(state.progress_path())
                        .await
                        .map_err(|e| DownloadError::io(state.progress_path(), e))?;
                }
                Ok(())
            }
            Err(TransferError::Read(source)) => Err(DownloadError::Stream {
                url: state.source_url().to_string(),
                source,
            }),
            Err(TransferError::Write(source)) => Err(DownloadError::io(output_path, source)),
        }
    }
}

/// Persisted offset, clamped to what the output file actually holds.
async fn resume_baseline(state: &DownloadState) -> u64 {
    let persisted = ProgressStore::read(state.progress_path()).await;
    if persisted == 0 {
        return 0;
    }

    let on_disk = fs::metadata(state.output_path())
        .await
        .map(|m| m.len())
        .unwrap_or(0);
    if persisted > on_disk {
        warn!(
            persisted,
            on_disk,
            path = %state.progress_path().display(),
            "progress file ahead of output file, resuming from output length"
        );
        on_disk
    } else {
        persisted
    }
}

/// Opens the output positioned at `offset`, dropping anything past it.
async fn open_output(path: &Path, offset: u64) -> Result<File, DownloadError> {
    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .open(path)
        .await
        .map_err(|e| DownloadError::io(path, e))?;
    file.set_len(offset)
        .await
        .map_err(|e| DownloadError::io(path, e))?;
    file.seek(SeekFrom::Start(offset))
        .await
        .map_err(|e| DownloadError::io(path, e))?;
    Ok(file)
}
