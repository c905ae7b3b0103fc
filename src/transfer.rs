use std::io;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::TryStreamExt;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::Response;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::io::StreamReader;
use tracing::{debug, trace};

use crate::config::DownloadConfig;
use crate::error::TransferError;

type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Copies a response body into the output one buffer at a time, bumping the
/// shared counter after every successful write.
#[derive(Clone, Debug)]
pub struct TransferEngine {
    buffer_size: usize,
    max_bytes_per_sec: Option<NonZeroU32>,
}

impl TransferEngine {
    pub fn new(config: &DownloadConfig) -> Self {
        Self {
            buffer_size: config.buffer_size.max(1),
            max_bytes_per_sec: config.max_bytes_per_sec,
        }
    }

    /// Streams `body` into `output` until EOF and returns the bytes moved in
    /// this call.
    ///
    /// `output` must already be positioned at the counter's current value.
    /// Any read or write error ends the copy immediately; only the in-flight
    /// chunk is ever buffered.
    pub async fn stream_body<R, W>(
        &self,
        mut body: R,
        output: &mut W,
        downloaded: &AtomicU64,
    ) -> Result<u64, TransferError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut buf = vec![0u8; self.buffer_size];
        let limiter = self.limiter();
        let mut moved: u64 = 0;

        loop {
            let n = match body.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(TransferError::Read(e)),
            };

            output.write_all(&buf[..n]).await.map_err(TransferError::Write)?;
            output.flush().await.map_err(TransferError::Write)?;

            downloaded.fetch_add(n as u64, Ordering::SeqCst);
            moved += n as u64;
            trace!(chunk = n, moved, "chunk written");

            if let Some(limiter) = &limiter {
                throttle(limiter, n).await;
            }
        }

        debug!(moved, "response body exhausted");
        Ok(moved)
    }

    /// GCRA limiter started at the beginning of the stream. Its burst is one
    /// buffer, so a chunk can never exceed its capacity and the average rate
    /// stays within the cap plus at most one chunk.
    fn limiter(&self) -> Option<Limiter> {
        let rate = self.max_bytes_per_sec?;
        let burst = u32::try_from(self.buffer_size)
            .ok()
            .and_then(NonZeroU32::new)
            .unwrap_or(NonZeroU32::MAX);
        Some(RateLimiter::direct(Quota::per_second(rate).allow_burst(burst)))
    }
}

async fn throttle(limiter: &Limiter, chunk: usize) {
    let Some(cells) = u32::try_from(chunk).ok().and_then(NonZeroU32::new) else {
        return;
    };
    if let Err(e) = limiter.until_n_ready(cells).await {
        debug!(chunk, error = %e, "chunk larger than limiter burst, not throttled");
    }
}

/// Adapts a response body to `AsyncRead` so the engine controls chunk size.
pub fn body_reader(response: Response) -> impl AsyncRead + Unpin {
    let stream = response
        .bytes_stream()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e));
    StreamReader::new(Box::pin(stream))
}
