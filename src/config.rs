use std::num::NonZeroU32;
use std::time::Duration;

/// Size of the chunk moved from the response body to the output file per iteration.
pub const DEFAULT_BUFFER_SIZE: usize = 32 * 1024;

/// Cadence of the progress reporter.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(1000);

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Knobs for a single download. Every default is usable as-is; tests shrink
/// the buffer and the tick interval to hit chunk boundaries and cadence quickly.
#[derive(Clone, Debug)]
pub struct DownloadConfig {
    pub buffer_size: usize,
    pub tick_interval: Duration,
    /// Average-rate cap in bytes per second. `None` streams as fast as possible.
    pub max_bytes_per_sec: Option<NonZeroU32>,
    /// When false nothing is read from or written to the `.progress` sidecar.
    pub use_progress_file: bool,
    pub connect_timeout: Duration,
    pub user_agent: String,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            tick_interval: DEFAULT_TICK_INTERVAL,
            max_bytes_per_sec: None,
            use_progress_file: true,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            user_agent: format!("rdl/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl DownloadConfig {
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size.max(1);
        self
    }

    pub fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    pub fn with_rate_limit(mut self, max_bytes_per_sec: Option<NonZeroU32>) -> Self {
        self.max_bytes_per_sec = max_bytes_per_sec;
        self
    }

    pub fn with_progress_file(mut self, use_progress_file: bool) -> Self {
        self.use_progress_file = use_progress_file;
        self
    }
}
