//! # Configuration Module
//!
//! Configuration for the watch-and-upscale pipeline. One immutable
//! [`WatcherConfig`] value is built at startup (from CLI flags or defaults)
//! and handed to every component; nothing reads ambient global state.
//!
//! ## Configuration Parameters
//!
//! | Parameter | Default | Description |
//! |-----------|---------|-------------|
//! | `input_dir` | `./input` | Directory watched for new images |
//! | `output_dir` | `./output` | Directory receiving optimized PNGs |
//! | `max_width` | `4000` | Width at which upscaling stops |
//! | `api_url` | pixelcut endpoint | Remote upscale service |
//! | `watch_delay_ms` | `1000` | Debounce delay after a create event |
//! | `max_passes` | `16` | Upscale pass budget per file |
//! | `max_concurrent_jobs` | `4` | Worker pool size |
//! | `stability` | fixed delay | How to wait for a file to finish writing |

use std::path::PathBuf;

/// Width at which upscaling stops.
pub const DEFAULT_MAX_WIDTH: u32 = 4000;

/// Remote upscaling endpoint.
pub const DEFAULT_API_URL: &str = "https://api2.pixelcut.app/image/upscale/v1";

/// Delay to ensure a newly created file is fully written.
pub const DEFAULT_WATCH_DELAY_MS: u64 = 1000;

/// Upscale pass budget. A 1px-wide image reaches 4000px in 12 doublings,
/// so any loop that runs longer than this is not converging.
pub const DEFAULT_MAX_PASSES: u32 = 16;

/// Concurrent per-file pipelines.
pub const DEFAULT_MAX_CONCURRENT_JOBS: usize = 4;

/// Strategy for deciding that a newly created file is safe to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StabilityMode {
    /// Wait a fixed delay after the create event. This is a heuristic, not a
    /// completion guarantee.
    #[default]
    FixedDelay,
    /// Poll size and mtime until two consecutive observations match.
    SizeStable,
}

/// Immutable configuration for one watcher process.
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Directory watched for new images.
    pub input_dir: PathBuf,

    /// Directory receiving optimized PNG output.
    pub output_dir: PathBuf,

    /// Width threshold at which the upscale loop stops. The final width may
    /// overshoot up to just under twice this value.
    pub max_width: u32,

    /// URL of the remote upscale endpoint.
    pub api_url: String,

    /// Debounce delay in milliseconds between a create event and the first
    /// read of the file.
    pub watch_delay_ms: u64,

    /// Maximum upscale passes per file before the loop is declared
    /// non-converging.
    pub max_passes: u32,

    /// Maximum number of files processed concurrently.
    pub max_concurrent_jobs: usize,

    /// How to wait for a newly created file to finish writing.
    pub stability: StabilityMode,
}

impl Default for WatcherConfig {
    /// Default configuration reproducing the stock behavior: watch `./input`,
    /// write to `./output`, upscale to 4000px with a one second debounce.
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("./input"),
            output_dir: PathBuf::from("./output"),
            max_width: DEFAULT_MAX_WIDTH,
            api_url: DEFAULT_API_URL.to_string(),
            watch_delay_ms: DEFAULT_WATCH_DELAY_MS,
            max_passes: DEFAULT_MAX_PASSES,
            max_concurrent_jobs: DEFAULT_MAX_CONCURRENT_JOBS,
            stability: StabilityMode::FixedDelay,
        }
    }
}

impl WatcherConfig {
    /// Validates the configuration parameters.
    ///
    /// Time complexity: O(1) - Performs constant-time checks on each field.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_width == 0 {
            return Err("Max width must be greater than 0".to_string());
        }
        if self.max_passes == 0 {
            return Err("Max passes must be greater than 0".to_string());
        }
        if self.max_concurrent_jobs == 0 {
            return Err("Concurrent jobs must be greater than 0".to_string());
        }
        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            return Err(format!("API URL must be http(s): {}", self.api_url));
        }
        Ok(())
    }
}
