//! # Upscale Watcher Library
//!
//! Watches a directory for newly created images and drives each one through a
//! remote upscaling service until it reaches a target width, then writes an
//! optimized PNG to an output directory.
//!
//! ## Architecture
//!
//! The library is organized into several key modules:
//! - `watch`: filesystem event source over the `notify` backend
//! - `session`: dispatch loop with bounded per-file workers
//! - `pipeline`: per-file processing and the upscale-until-threshold loop
//! - `client`: HTTP client for the remote upscale endpoint
//! - `image`: thin decode/width/encode wrapper around one image buffer
//! - `config`: immutable configuration passed into every component
//! - `error`: classified pipeline error types
//!
//! ## Example
//!
//! ```rust,no_run
//! use upscale_watcher::{WatcherConfig, run_watcher};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = WatcherConfig::default();
//! run_watcher(config).await?;
//! # Ok(())
//! # }
//! ```

use anyhow::{Context, Result};

pub mod client;
pub mod config;
pub mod error;
pub mod image;
pub mod pipeline;
pub mod session;
pub mod watch;

/// Re-export the types most callers need.
pub use client::{HttpUpscaleClient, UpscaleService};
pub use config::{StabilityMode, WatcherConfig};
pub use error::{PipelineError, PipelineResult};
pub use image::ImageHandle;
pub use session::{WatchSession, WatchSessionBuilder};
pub use watch::{NotifyWatchSource, WatchEvent, WatchEventKind, WatchSource};

/// Run the watcher with the given configuration until shutdown.
///
/// Creates the input and output directories if they are missing, establishes
/// the filesystem watch, and runs the dispatch session. Either setup step
/// failing is fatal: without the directories and the watch the process has no
/// purpose.
pub async fn run_watcher(config: WatcherConfig) -> Result<()> {
    tokio::fs::create_dir_all(&config.input_dir)
        .await
        .with_context(|| format!("creating input dir {}", config.input_dir.display()))?;
    tokio::fs::create_dir_all(&config.output_dir)
        .await
        .with_context(|| format!("creating output dir {}", config.output_dir.display()))?;

    let source = NotifyWatchSource::new(&config.input_dir)
        .with_context(|| format!("watching {}", config.input_dir.display()))?;

    WatchSession::builder()
        .with_config(config)
        .with_source(source)
        .build()?
        .run()
        .await
}
