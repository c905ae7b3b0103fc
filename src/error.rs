//! Error types for a download attempt.
//!
//! Every variant is fatal: the orchestrator stops the reporter, releases its
//! file handles and hands the error back to the caller without retrying.

use std::io;
use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DownloadError {
    /// The source URL could not be parsed.
    #[error("invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// The request could not be sent or no response head arrived.
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with something other than 200 or 206.
    #[error("bad HTTP status {status} from {url}")]
    BadStatus { url: String, status: StatusCode },

    /// A range request was sent but the server replied with the full content.
    #[error(
        "server does not support partial downloads (asked to resume at byte {offset}), \
         if you want to continue please remove file: {}",
        .progress_path.display()
    )]
    ResumeRejected { progress_path: PathBuf, offset: u64 },

    /// The response body failed mid-stream.
    #[error("error reading response body from {url}: {source}")]
    Stream {
        url: String,
        #[source]
        source: io::Error,
    },

    /// Opening, seeking or writing a local file failed.
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl DownloadError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn transport(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Transport {
            url: url.into(),
            source,
        }
    }
}

/// Failure inside the streaming loop, split by which side of the copy broke.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("read failed: {0}")]
    Read(#[source] io::Error),
    #[error("write failed: {0}")]
    Write(#[source] io::Error),
}
