//! # Image Handle
//!
//! Thin wrapper around one in-memory image. A handle owns the encoded bytes
//! it was built from together with their decoded form, so the pipeline can
//! query the width, forward the original bytes to the upscaling service, and
//! produce the final optimized PNG without re-reading anything from disk.
//!
//! Handles are immutable: every upscale pass builds a fresh handle from the
//! downloaded buffer, which is what keeps the width in sync with the pixels.

use image::DynamicImage;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};

use crate::error::{PipelineError, PipelineResult};

/// One decoded image plus the encoded buffer it came from.
#[derive(Debug)]
pub struct ImageHandle {
    bytes: Vec<u8>,
    decoded: DynamicImage,
}

impl ImageHandle {
    /// Decode an encoded image buffer (PNG or JPEG) into a handle.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Decode`] when the buffer is not a readable
    /// image, which is what a partially written or corrupt file looks like.
    pub fn from_bytes(bytes: Vec<u8>) -> PipelineResult<Self> {
        let decoded = image::load_from_memory(&bytes).map_err(PipelineError::decode)?;
        Ok(Self { bytes, decoded })
    }

    /// Pixel width of the decoded image.
    pub fn width(&self) -> u32 {
        self.decoded.width()
    }

    /// Pixel height of the decoded image.
    pub fn height(&self) -> u32 {
        self.decoded.height()
    }

    /// The encoded buffer this handle was built from, verbatim.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Re-encode the image as an optimized PNG.
    ///
    /// PNG is lossless, so optimization here means maximal compression
    /// effort with adaptive filtering. Encoding the same handle twice
    /// produces byte-identical output.
    pub fn encode_png(&self) -> PipelineResult<Vec<u8>> {
        let mut buffer = Vec::new();
        let encoder = PngEncoder::new_with_quality(
            &mut buffer,
            CompressionType::Best,
            FilterType::Adaptive,
        );
        self.decoded
            .write_with_encoder(encoder)
            .map_err(PipelineError::decode)?;
        Ok(buffer)
    }
}
