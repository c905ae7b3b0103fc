use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::progress_store::ProgressStore;

/// Shared state of one transfer.
///
/// The streaming loop is the only writer of `bytes_downloaded`; the reporter
/// reads it on every tick and is the only writer of `elapsed_millis`.
#[derive(Debug)]
pub struct DownloadState {
    source_url: String,
    output_path: PathBuf,
    progress_path: PathBuf,
    use_progress_file: bool,

    bytes_downloaded: AtomicU64,
    bytes_at_resume: AtomicU64,
    total_size: AtomicU64,
    elapsed_millis: AtomicU64,
}

impl DownloadState {
    pub fn new(source_url: impl Into<String>, output_path: impl Into<PathBuf>, use_progress_file: bool) -> Self {
        let output_path = output_path.into();
        let progress_path = ProgressStore::path_for(&output_path);
        Self {
            source_url: source_url.into(),
            output_path,
            progress_path,
            use_progress_file,
            bytes_downloaded: AtomicU64::new(0),
            bytes_at_resume: AtomicU64::new(0),
            total_size: AtomicU64::new(0),
            elapsed_millis: AtomicU64::new(0),
        }
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn progress_path(&self) -> &Path {
        &self.progress_path
    }

    pub fn use_progress_file(&self) -> bool {
        self.use_progress_file
    }

    /// Sets both the throughput baseline and the starting counter.
    pub fn resume_from(&self, offset: u64) {
        self.bytes_at_resume.store(offset, Ordering::SeqCst);
        self.bytes_downloaded.store(offset, Ordering::SeqCst);
    }

    pub fn bytes_downloaded(&self) -> u64 {
        self.bytes_downloaded.load(Ordering::SeqCst)
    }

    /// The counter the streaming loop adds to.
    pub fn downloaded_counter(&self) -> &AtomicU64 {
        &self.bytes_downloaded
    }

    pub fn bytes_at_resume(&self) -> u64 {
        self.bytes_at_resume.load(Ordering::SeqCst)
    }

    /// 0 means the size is unknown.
    pub fn total_size(&self) -> u64 {
        self.total_size.load(Ordering::SeqCst)
    }

    pub fn set_total_size(&self, total: u64) {
        self.total_size.store(total, Ordering::SeqCst);
    }

    pub fn elapsed_millis(&self) -> u64 {
        self.elapsed_millis.load(Ordering::SeqCst)
    }

    /// Advances the reporter clock and returns the new value.
    pub fn add_elapsed(&self, millis: u64) -> u64 {
        self.elapsed_millis.fetch_add(millis, Ordering::SeqCst) + millis
    }
}
