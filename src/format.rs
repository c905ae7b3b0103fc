use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};

use crate::downloader::DownloadSummary;
use crate::error::DownloadError;
use crate::reporter::{ProgressSink, ProgressUpdate};

/// `HH:MM:SS`; hours are not wrapped.
pub fn format_eta(secs: u64) -> String {
    let h = secs / 3600;
    let m = (secs % 3600) / 60;
    let s = secs % 60;
    format!("{:02}:{:02}:{:02}", h, m, s)
}

/// Decimal units, two decimals.
pub fn format_speed(bytes_per_sec: f64) -> String {
    if bytes_per_sec > 1_000_000.0 {
        format!("{:.2} MB/s", bytes_per_sec / 1_000_000.0)
    } else if bytes_per_sec > 1_000.0 {
        format!("{:.2} KB/s", bytes_per_sec / 1_000.0)
    } else {
        format!("{:.2} B/s", bytes_per_sec)
    }
}

pub fn format_status(update: &ProgressUpdate) -> String {
    format!(
        "Progress: {:.2}% {}/{} MB  DS: {} ETA: {}",
        update.percent,
        update.downloaded / 1_000_000,
        update.total / 1_000_000,
        format_speed(update.bytes_per_sec),
        format_eta(update.eta_secs),
    )
}

/// The single line a failed run ends with.
pub fn failure_line(err: &DownloadError) -> String {
    format!("Download failed: {}", err)
}

/// Terminal output: a bar advanced only by reporter ticks, plus start and end lines.
pub struct ConsoleSink {
    bar: ProgressBar,
}

impl ConsoleSink {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-");
        bar.set_style(style);
        Self { bar }
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for ConsoleSink {
    fn started(&self, url: &str, output: &Path) {
        self.bar.println(format!("Downloading from: {}", url));
        self.bar.println(format!("Downloading to: {}", output.display()));
    }

    fn progress(&self, update: &ProgressUpdate) {
        self.bar.set_length(update.total);
        self.bar.set_position(update.downloaded);
        self.bar.set_message(format_status(update));
    }

    fn finished(&self, outcome: Result<&DownloadSummary, &DownloadError>) {
        match outcome {
            Ok(_) => self.bar.finish_with_message("Download completed."),
            // The caller prints the error itself; the bar only stops drawing.
            Err(_) => self.bar.abandon(),
        }
    }
}

/// Discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn started(&self, _url: &str, _output: &Path) {}
    fn progress(&self, _update: &ProgressUpdate) {}
    fn finished(&self, _outcome: Result<&DownloadSummary, &DownloadError>) {}
}
