//! Resumable single-file HTTP downloader.
//!
//! Progress is persisted to a `<output>.progress` sidecar while the body
//! streams to disk, so an interrupted transfer picks up from the last
//! confirmed byte with a `Range` request.

pub mod config;
pub mod downloader;
pub mod error;
pub mod format;
pub mod progress_store;
pub mod reporter;
pub mod request;
pub mod state;
pub mod transfer;

pub use config::DownloadConfig;
pub use downloader::{DownloadSummary, Downloader};
pub use error::{DownloadError, TransferError};
pub use format::{ConsoleSink, NullSink};
pub use progress_store::ProgressStore;
pub use reporter::{ProgressReporter, ProgressSink, ProgressUpdate, ReporterHandle};
pub use state::DownloadState;
pub use transfer::TransferEngine;
