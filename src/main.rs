use std::num::NonZeroU32;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use rdl_resume::config::DEFAULT_BUFFER_SIZE;
use rdl_resume::format::failure_line;
use rdl_resume::{ConsoleSink, DownloadConfig, Downloader};
use tracing::debug;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// URL to download
    #[arg(index = 1)]
    url: String,

    /// Destination file; progress is kept next to it in <OUTPUT>.progress
    #[arg(index = 2)]
    output: PathBuf,

    /// Rate limit in bytes per second (e.g., 1048576 for 1MB/s)
    #[arg(short = 'r', long)]
    rate_limit: Option<NonZeroU32>,

    /// Size of the chunk moved from network to disk per read
    #[arg(long, default_value_t = DEFAULT_BUFFER_SIZE)]
    buffer_size: usize,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short = 'q', long, conflicts_with = "verbose")]
    quiet: bool,
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // RUST_LOG wins over -v/-q.
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        }
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    debug!(?args, "CLI arguments parsed");

    let config = DownloadConfig::default()
        .with_buffer_size(args.buffer_size)
        .with_rate_limit(args.rate_limit);
    let downloader = Downloader::new(config)?.with_sink(Arc::new(ConsoleSink::new()));

    let rt = tokio::runtime::Runtime::new()?;
    match rt.block_on(downloader.download(&args.url, &args.output)) {
        Ok(_) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            eprintln!("{}", failure_line(&e));
            Ok(ExitCode::FAILURE)
        }
    }
}
