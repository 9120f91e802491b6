//! Common test utilities and helpers for the upscale watcher tests.
//!
//! Provides encoded test images, a deterministic in-process upscale service,
//! and a channel-fed watch source so session tests can run without touching
//! the real filesystem notification backend.

/// Encoded test image construction.
pub mod images {
    use image::{DynamicImage, Rgba, RgbaImage};

    /// Encode a solid-color PNG with the given dimensions.
    pub fn png_of_width(width: u32, height: u32) -> Vec<u8> {
        let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            width,
            height,
            Rgba([64, 128, 192, 255]),
        ));
        let mut buffer = std::io::Cursor::new(Vec::new());
        image
            .write_to(&mut buffer, image::ImageFormat::Png)
            .unwrap();
        buffer.into_inner()
    }

    /// Width of an encoded image buffer.
    pub fn width_of(bytes: &[u8]) -> u32 {
        image::load_from_memory(bytes).unwrap().width()
    }
}

/// Mock upscale service for testing without a network.
pub mod mock_service {
    use anyhow::Result;
    use async_trait::async_trait;
    use image::imageops::FilterType;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use upscale_watcher::UpscaleService;

    /// Upscale service that deterministically doubles both dimensions and
    /// counts how often it was called.
    pub struct DoublingService {
        calls: AtomicUsize,
    }

    impl DoublingService {
        pub fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }

        /// Number of upscale calls served so far.
        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl UpscaleService for DoublingService {
        async fn upscale(&self, image: &[u8]) -> Result<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let decoded = image::load_from_memory(image)?;
            let doubled = decoded.resize_exact(
                decoded.width() * 2,
                decoded.height() * 2,
                FilterType::Nearest,
            );
            let mut buffer = std::io::Cursor::new(Vec::new());
            doubled.write_to(&mut buffer, image::ImageFormat::Png)?;
            Ok(buffer.into_inner())
        }
    }
}

/// Channel-fed watch source for deterministic session tests.
pub mod mock_watch {
    use anyhow::Result;
    use async_trait::async_trait;
    use tokio::sync::mpsc;
    use upscale_watcher::{WatchEvent, WatchSource};

    /// Watch source that replays whatever the test sends down a channel.
    /// Dropping the sender ends the event stream, which makes the session
    /// drain its workers and return.
    pub struct ChannelWatchSource {
        rx: mpsc::UnboundedReceiver<WatchEvent>,
    }

    impl ChannelWatchSource {
        pub fn new() -> (mpsc::UnboundedSender<WatchEvent>, Self) {
            let (tx, rx) = mpsc::unbounded_channel();
            (tx, Self { rx })
        }
    }

    #[async_trait]
    impl WatchSource for ChannelWatchSource {
        async fn next_event(&mut self) -> Result<Option<WatchEvent>> {
            Ok(self.rx.recv().await)
        }
    }
}
