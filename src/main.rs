use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use upscale_watcher::config::{
    DEFAULT_API_URL, DEFAULT_MAX_CONCURRENT_JOBS, DEFAULT_MAX_PASSES, DEFAULT_MAX_WIDTH,
    DEFAULT_WATCH_DELAY_MS,
};
use upscale_watcher::{StabilityMode, WatcherConfig};

/// Folder-watching image upscaler: drop a `.jpg` or `.png` into the input
/// directory and an optimized PNG at the target width appears in the output
/// directory.
#[derive(Parser, Debug)]
#[command(name = "upwatch")]
#[command(about = "Watch a folder and upscale new images via a remote service")]
#[command(
    long_about = "Watch a directory for newly created images and repeatedly request 2x upscales
from a remote service until each image reaches the target width, then write an
optimized PNG to the output directory. Set RUST_LOG to control verbosity."
)]
struct Args {
    /// Directory to watch for new images
    #[arg(short, long, default_value = "./input", help = "Directory watched for new .jpg/.png files")]
    input_dir: PathBuf,

    /// Directory receiving the optimized PNG output
    #[arg(short, long, default_value = "./output", help = "Directory receiving <name>.png results")]
    output_dir: PathBuf,

    /// Width at which upscaling stops
    #[arg(short = 'w', long, default_value_t = DEFAULT_MAX_WIDTH,
          help = "Stop upscaling once the image is at least this wide (pixels)")]
    max_width: u32,

    /// Remote upscale endpoint
    #[arg(long, default_value = DEFAULT_API_URL, help = "URL of the upscale service")]
    api_url: String,

    /// Debounce delay after a file appears
    #[arg(short = 'd', long, default_value_t = DEFAULT_WATCH_DELAY_MS,
          help = "Milliseconds to wait after a create event before reading the file")]
    delay_ms: u64,

    /// Upscale pass budget per file
    #[arg(long, default_value_t = DEFAULT_MAX_PASSES,
          help = "Give up on a file after this many upscale passes")]
    max_passes: u32,

    /// Concurrent file pipelines
    #[arg(short = 'j', long, default_value_t = DEFAULT_MAX_CONCURRENT_JOBS,
          help = "How many files may be processed at the same time")]
    jobs: usize,

    /// File readiness strategy
    #[arg(long, default_value = "fixed",
          help = "How to wait for a new file to finish writing: fixed (delay) or size-stable (poll until size stops changing)")]
    stability: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let stability = parse_stability(&args.stability)?;

    let config = WatcherConfig {
        input_dir: args.input_dir,
        output_dir: args.output_dir,
        max_width: args.max_width,
        api_url: args.api_url,
        watch_delay_ms: args.delay_ms,
        max_passes: args.max_passes,
        max_concurrent_jobs: args.jobs,
        stability,
    };

    config.validate().map_err(anyhow::Error::msg)?;
    upscale_watcher::run_watcher(config).await
}

/// Parse the stability flag into a policy selector.
fn parse_stability(value: &str) -> Result<StabilityMode> {
    match value {
        "fixed" => Ok(StabilityMode::FixedDelay),
        "size-stable" => Ok(StabilityMode::SizeStable),
        other => Err(anyhow::anyhow!(
            "Invalid stability mode '{}'. Use: fixed, size-stable",
            other
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_stability() {
        assert_eq!(parse_stability("fixed").unwrap(), StabilityMode::FixedDelay);
        assert_eq!(
            parse_stability("size-stable").unwrap(),
            StabilityMode::SizeStable
        );
        assert!(parse_stability("eventually").is_err());
    }
}
