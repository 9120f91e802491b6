//! # Pipeline Error Types
//!
//! Error handling for the watch-and-upscale pipeline. Every failure that can
//! occur while processing a single file maps onto one of the variants here, so
//! the dispatcher can log a uniform, classified error without tearing down the
//! watch loop.
//!
//! ## Error Classification
//!
//! - `Decode`: the input file could not be parsed as an image (corrupt or
//!   partially written file). Not retryable.
//! - `UpscaleRequest`: the upscale POST came back with a non-success status.
//!   Transient from the pipeline's point of view.
//! - `UpscaleDownload`: the result download came back with a non-success
//!   status. Transient.
//! - `DidNotConverge`: the service stopped growing the image, or the pass
//!   budget ran out before the target width was reached. Not retryable.
//! - `Io`: directory creation, file read, or file write failed.

use std::{error::Error as StdError, fmt, io, path::PathBuf};

/// Convenience alias for pipeline results.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors produced while processing one watched file.
#[derive(Debug)]
pub enum PipelineError {
    /// The input buffer could not be decoded as an image.
    Decode {
        /// Decoder diagnostic for the failed buffer.
        reason: String,
    },

    /// The upscale POST returned a non-success HTTP status.
    UpscaleRequest {
        /// Status line of the failed response, e.g. `500 Internal Server Error`.
        status: String,
    },

    /// The result download returned a non-success HTTP status.
    UpscaleDownload {
        /// Status line of the failed response.
        status: String,
    },

    /// The upscale loop could not reach the target width.
    DidNotConverge {
        /// Width of the image when the loop gave up.
        width: u32,
        /// Target width the loop was trying to reach.
        max_width: u32,
        /// Number of upscale passes performed.
        passes: u32,
    },

    /// Filesystem operation failed.
    Io {
        /// Path involved in the failed operation, when known.
        path: Option<PathBuf>,
        source: io::Error,
    },
}

impl PipelineError {
    /// Create a decode error from any decoder diagnostic.
    pub fn decode(reason: impl fmt::Display) -> Self {
        Self::Decode {
            reason: reason.to_string(),
        }
    }

    /// Create an upscale request error from a status line.
    pub fn upscale_request(status: impl fmt::Display) -> Self {
        Self::UpscaleRequest {
            status: status.to_string(),
        }
    }

    /// Create a download error from a status line.
    pub fn upscale_download(status: impl fmt::Display) -> Self {
        Self::UpscaleDownload {
            status: status.to_string(),
        }
    }

    /// Create a convergence error for a loop that gave up.
    pub fn did_not_converge(width: u32, max_width: u32, passes: u32) -> Self {
        Self::DidNotConverge {
            width,
            max_width,
            passes,
        }
    }

    /// Create an I/O error tagged with the path it touched.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: Some(path.into()),
            source,
        }
    }

    /// Whether retrying the same file later could plausibly succeed.
    ///
    /// Service-side failures are transient; a corrupt file or a
    /// non-converging service will fail the same way every time.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::UpscaleRequest { .. } | Self::UpscaleDownload { .. } | Self::Io { .. }
        )
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decode { reason } => write!(f, "failed to decode image: {reason}"),
            Self::UpscaleRequest { status } => write!(f, "upscaling failed: {status}"),
            Self::UpscaleDownload { status } => {
                write!(f, "failed to download upscaled image: {status}")
            }
            Self::DidNotConverge {
                width,
                max_width,
                passes,
            } => write!(
                f,
                "upscale loop did not converge: width {width}px after {passes} passes, target {max_width}px"
            ),
            Self::Io { path, source } => match path {
                Some(path) => write!(f, "io error at {}: {source}", path.display()),
                None => write!(f, "io error: {source}"),
            },
        }
    }
}

impl StdError for PipelineError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<io::Error> for PipelineError {
    fn from(source: io::Error) -> Self {
        Self::Io { path: None, source }
    }
}
