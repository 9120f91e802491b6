//! # Filesystem Watch Source
//!
//! Bridges the platform filesystem notification backend into an async stream
//! of [`WatchEvent`]s. The [`WatchSource`] trait is the seam between the
//! session loop and the OS: production uses [`NotifyWatchSource`] (backed by
//! the `notify` crate), tests drive the session with a channel-fed source.
//!
//! Only creation events matter downstream; everything else is surfaced as
//! [`WatchEventKind::Other`] and ignored by the dispatcher.

use std::collections::VecDeque;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use anyhow::Result;
use async_trait::async_trait;
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::warn;

/// Kind of filesystem notification, reduced to what the pipeline cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchEventKind {
    /// A file was created.
    Create,
    /// Anything else (writes, renames, removals, metadata changes).
    Other,
}

/// One filesystem notification for one path.
#[derive(Debug, Clone)]
pub struct WatchEvent {
    pub kind: WatchEventKind,
    pub path: PathBuf,
}

/// Abstract source of filesystem events.
///
/// An infinite sequence: `next_event` returning `None` means the source shut
/// down and the session should drain and exit.
#[async_trait]
pub trait WatchSource: Send {
    /// Wait for the next filesystem event.
    async fn next_event(&mut self) -> Result<Option<WatchEvent>>;
}

/// Production watch source backed by the `notify` crate.
///
/// The notify backend delivers batched events on its own thread; they are
/// forwarded through an unbounded channel and flattened to one event per
/// path. The watcher handle lives inside the source, so dropping the source
/// closes the watch.
pub struct NotifyWatchSource {
    // Held for its Drop; the watch stops when this goes away.
    _watcher: RecommendedWatcher,
    rx: mpsc::UnboundedReceiver<notify::Result<notify::Event>>,
    pending: VecDeque<WatchEvent>,
}

impl NotifyWatchSource {
    /// Start watching `dir` (non-recursively) for filesystem events.
    ///
    /// # Errors
    ///
    /// Fails when the watch cannot be established, e.g. the directory does
    /// not exist or the platform watcher cannot be created. This is a
    /// startup-fatal condition for the process.
    pub fn new(dir: &Path) -> Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut watcher =
            notify::recommended_watcher(move |event: notify::Result<notify::Event>| {
                // Receiver dropped means the session is shutting down.
                let _ = tx.send(event);
            })?;
        watcher.watch(dir, RecursiveMode::NonRecursive)?;

        Ok(Self {
            _watcher: watcher,
            rx,
            pending: VecDeque::new(),
        })
    }
}

#[async_trait]
impl WatchSource for NotifyWatchSource {
    async fn next_event(&mut self) -> Result<Option<WatchEvent>> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Ok(Some(event));
            }

            match self.rx.recv().await {
                None => return Ok(None),
                Some(Err(error)) => {
                    // Backend hiccup; the watch itself is still alive.
                    warn!("filesystem watch error: {error}");
                }
                Some(Ok(event)) => {
                    let kind = match event.kind {
                        EventKind::Create(_) => WatchEventKind::Create,
                        _ => WatchEventKind::Other,
                    };
                    self.pending
                        .extend(event.paths.into_iter().map(|path| WatchEvent { kind, path }));
                }
            }
        }
    }
}

/// Whether a path has one of the accepted image extensions.
///
/// The match is lowercase-only and case-sensitive: `photo.JPG` is rejected.
pub fn has_supported_extension(path: &Path) -> bool {
    matches!(
        path.extension().and_then(OsStr::to_str),
        Some("jpg" | "png")
    )
}
