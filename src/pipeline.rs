//! # Per-File Processing Pipeline
//!
//! Everything that happens to one watched file: wait for the writer to finish
//! flushing it, load it, upscale it until the width threshold is reached, and
//! persist the optimized PNG. The steps run strictly sequentially within a
//! file; the session layer decides how many files run at once.
//!
//! ## Architecture
//!
//! 1. **StabilityPolicy trait**: pluggable wait-for-file-readiness strategies
//! 2. **upscale_to_width**: the upscale-until-threshold control loop
//! 3. **process_image**: end-to-end pipeline for one file
//!
//! ## Control Loop
//!
//! The loop asks the remote service for a 2x upscale and replaces the working
//! image with the result until the width meets the configured threshold.
//! Termination is overshoot-permitted: the final width lands in
//! `[max_width, 2 * max_width)`. Correctness depends on the service actually
//! growing the image, so a pass that fails to increase the width, or a loop
//! that exhausts its pass budget, fails with `DidNotConverge` instead of
//! spinning forever.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, info};

use crate::client::UpscaleService;
use crate::config::WatcherConfig;
use crate::error::PipelineError;
use crate::image::ImageHandle;

/// Strategy for waiting until a newly created file is safe to read.
///
/// The create notification fires when the file appears, not when the writer
/// is done with it. Implementations trade simplicity against confidence that
/// the bytes on disk are complete.
#[async_trait]
pub trait StabilityPolicy: Send + Sync {
    /// Wait until `path` is considered safe to read.
    async fn wait_until_stable(&self, path: &Path) -> Result<()>;
}

/// Waits a fixed delay after the create event.
///
/// A heuristic, not a completion guarantee. This is the default policy.
pub struct FixedDelay {
    delay: Duration,
}

impl FixedDelay {
    /// Create a fixed-delay policy.
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl StabilityPolicy for FixedDelay {
    async fn wait_until_stable(&self, _path: &Path) -> Result<()> {
        tokio::time::sleep(self.delay).await;
        Ok(())
    }
}

/// Polls size and mtime until two consecutive observations match.
///
/// Stronger than [`FixedDelay`] for slow writers, but still a heuristic: a
/// writer that pauses longer than one poll interval looks finished. Gives up
/// waiting (and lets the decoder be the judge) after `max_checks` polls.
pub struct SizeStable {
    poll_interval: Duration,
    max_checks: u32,
}

impl SizeStable {
    /// Create a size-stability policy polling at the given interval.
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            poll_interval,
            max_checks: 40,
        }
    }
}

impl Default for SizeStable {
    fn default() -> Self {
        Self::new(Duration::from_millis(250))
    }
}

#[async_trait]
impl StabilityPolicy for SizeStable {
    async fn wait_until_stable(&self, path: &Path) -> Result<()> {
        let observe = |path: PathBuf| async move {
            let meta = fs::metadata(&path)
                .await
                .map_err(|e| PipelineError::io(&path, e))?;
            Ok::<_, PipelineError>((meta.len(), meta.modified().ok()))
        };

        let mut previous = observe(path.to_path_buf()).await?;
        for _ in 0..self.max_checks {
            tokio::time::sleep(self.poll_interval).await;
            let current = observe(path.to_path_buf()).await?;
            if current == previous {
                return Ok(());
            }
            previous = current;
        }
        debug!(path = %path.display(), "file never stabilized, reading anyway");
        Ok(())
    }
}

/// Upscale `handle` through `service` until its width reaches `max_width`.
///
/// Performs zero service calls when the input already meets the threshold.
/// With a service that doubles the width each call, an image of width `w`
/// takes exactly `ceil(log2(max_width / w))` calls and lands in
/// `[max_width, 2 * max_width)`.
///
/// # Errors
///
/// Propagates service failures immediately, and fails with
/// [`PipelineError::DidNotConverge`] when a pass does not increase the width
/// or the pass budget runs out below the threshold.
pub async fn upscale_to_width(
    mut handle: ImageHandle,
    service: &dyn UpscaleService,
    max_width: u32,
    max_passes: u32,
) -> Result<ImageHandle> {
    let mut passes = 0u32;

    while handle.width() < max_width {
        if passes >= max_passes {
            return Err(PipelineError::did_not_converge(handle.width(), max_width, passes).into());
        }

        debug!(
            target_width = handle.width().saturating_mul(2),
            "requesting 2x upscale"
        );
        let upscaled = service.upscale(handle.as_bytes()).await?;
        let next = ImageHandle::from_bytes(upscaled)?;
        passes += 1;

        if next.width() <= handle.width() {
            return Err(PipelineError::did_not_converge(next.width(), max_width, passes).into());
        }

        info!(width = next.width(), "new image width");
        handle = next;
    }

    Ok(handle)
}

/// Run the full pipeline for one watched file.
///
/// Debounce, load, upscale to the configured width, encode to optimized PNG,
/// and write `<basename>.png` into the output directory, silently overwriting
/// any previous file of that name.
pub async fn process_image(
    path: &Path,
    config: &WatcherConfig,
    service: &dyn UpscaleService,
    policy: &dyn StabilityPolicy,
) -> Result<()> {
    policy.wait_until_stable(path).await?;

    let bytes = fs::read(path)
        .await
        .map_err(|e| PipelineError::io(path, e))?;
    let handle = ImageHandle::from_bytes(bytes)?;
    info!(width = handle.width(), "original image width");

    let handle = upscale_to_width(handle, service, config.max_width, config.max_passes).await?;

    let optimized = handle.encode_png()?;
    let output_path = output_path_for(&config.output_dir, path);
    fs::write(&output_path, &optimized)
        .await
        .map_err(|e| PipelineError::io(&output_path, e))?;

    info!(
        path = %output_path.display(),
        width = handle.width(),
        "processed and saved"
    );
    Ok(())
}

/// Output location for an input file: same basename, `.png` extension.
///
/// Only the final extension is stripped, so `photo.raw.jpg` becomes
/// `photo.raw.png`.
fn output_path_for(output_dir: &Path, input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("image"));
    let mut name = stem;
    name.push(".png");
    output_dir.join(name)
}
