use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncSeekExt, AsyncWriteExt, SeekFrom};
use tracing::debug;

const PROGRESS_SUFFIX: &str = ".progress";

/// The `.progress` sidecar holding the decimal count of bytes already
/// durably written to the output file.
#[derive(Debug)]
pub struct ProgressStore {
    path: PathBuf,
    file: File,
}

impl ProgressStore {
    /// `<output>.progress`, next to the output file.
    pub fn path_for(output: &Path) -> PathBuf {
        let mut name = OsString::from(output.as_os_str());
        name.push(PROGRESS_SUFFIX);
        PathBuf::from(name)
    }

    /// Last persisted offset. Missing, unreadable or malformed content all
    /// read as 0 so the caller falls back to a fresh download.
    pub async fn read(path: &Path) -> u64 {
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) => {
                if e.kind() != io::ErrorKind::NotFound {
                    debug!(path = %path.display(), error = %e, "progress file unreadable, starting fresh");
                }
                return 0;
            }
        };

        match content.trim().parse::<u64>() {
            Ok(offset) => offset,
            Err(_) => {
                debug!(path = %path.display(), content = %content.trim(), "malformed progress file, starting fresh");
                0
            }
        }
    }

    /// Opens or creates the sidecar without touching its current content.
    pub async fn open(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(&path)
            .await?;
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replaces the whole content with `offset` and syncs it to disk.
    pub async fn write(&mut self, offset: u64) -> io::Result<()> {
        self.file.seek(SeekFrom::Start(0)).await?;
        self.file.set_len(0).await?;
        self.file.write_all(offset.to_string().as_bytes()).await?;
        self.file.flush().await?;
        self.file.sync_all().await
    }

    /// Deletes the sidecar. A sidecar that is already gone is not an error.
    pub async fn remove(path: &Path) -> io::Result<()> {
        match fs::remove_file(path).await {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}
