//! # Watch Session Management
//!
//! High-level orchestration of the watch loop: consume filesystem events,
//! filter them down to newly created images, and fan each qualifying file out
//! to its own processing task. Provides a builder API so tests can swap in
//! mock event sources and upscale services.
//!
//! ## Architecture
//!
//! 1. **WatchSource trait**: abstract interface for event delivery
//! 2. **WatchSession**: the long-lived dispatch loop
//! 3. **WatchSessionBuilder**: fluent configuration of a session
//!
//! ## Failure Isolation
//!
//! A failure inside one file's pipeline is logged and swallowed; it never
//! terminates the watch loop or affects other in-flight files. Only startup
//! failures (missing directories, watch registration) abort the process.
//!
//! ## Bounded Concurrency
//!
//! Worker tasks are admitted through a semaphore and tracked in a `JoinSet`,
//! so a burst of file creations cannot grow an unbounded task pile, and
//! shutdown can drain in-flight work before returning.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, anyhow};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::client::{HttpUpscaleClient, UpscaleService};
use crate::config::{StabilityMode, WatcherConfig};
use crate::pipeline::{FixedDelay, SizeStable, StabilityPolicy, process_image};
use crate::watch::{WatchEventKind, WatchSource, has_supported_extension};

/// Long-lived session that dispatches watch events to processing workers.
pub struct WatchSession {
    config: Arc<WatcherConfig>,
    source: Box<dyn WatchSource>,
    service: Arc<dyn UpscaleService>,
    policy: Arc<dyn StabilityPolicy>,
}

impl WatchSession {
    /// Create a new session using the builder pattern.
    pub fn builder() -> WatchSessionBuilder {
        WatchSessionBuilder::new()
    }

    /// Run the session until the event source ends or ctrl-c arrives.
    ///
    /// This is the main dispatch loop: filter events, admit one worker per
    /// qualifying file through the semaphore, and keep going regardless of
    /// what happens inside any single worker. Outstanding workers are joined
    /// before returning.
    pub async fn run(mut self) -> Result<()> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_jobs));
        let mut workers: JoinSet<()> = JoinSet::new();

        info!(
            "watching for new images in {}",
            self.config.input_dir.display()
        );

        loop {
            let event = tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("shutdown requested, draining in-flight work");
                    break;
                }
                event = self.source.next_event() => event?,
            };
            let Some(event) = event else {
                break;
            };

            if event.kind != WatchEventKind::Create || !has_supported_extension(&event.path) {
                continue;
            }
            info!(path = %event.path.display(), "new image detected");

            let permit = semaphore.clone().acquire_owned().await?;
            let config = Arc::clone(&self.config);
            let service = Arc::clone(&self.service);
            let policy = Arc::clone(&self.policy);
            workers.spawn(async move {
                let _permit = permit;
                if let Err(error) =
                    process_image(&event.path, &config, service.as_ref(), policy.as_ref()).await
                {
                    error!(path = %event.path.display(), "error processing image: {error:#}");
                }
            });

            // Reap finished workers so the set does not accumulate results.
            while let Some(joined) = workers.try_join_next() {
                if let Err(error) = joined {
                    error!("worker task failed: {error}");
                }
            }
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(error) = joined {
                error!("worker task failed: {error}");
            }
        }
        Ok(())
    }
}

/// Builder for watch sessions with a fluent API.
pub struct WatchSessionBuilder {
    config: Option<WatcherConfig>,
    source: Option<Box<dyn WatchSource>>,
    service: Option<Arc<dyn UpscaleService>>,
    policy: Option<Arc<dyn StabilityPolicy>>,
}

impl WatchSessionBuilder {
    /// Create a new session builder.
    pub fn new() -> Self {
        Self {
            config: None,
            source: None,
            service: None,
            policy: None,
        }
    }

    /// Set the configuration for the session. Required.
    pub fn with_config(mut self, config: WatcherConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the event source for the session. Required.
    pub fn with_source<S: WatchSource + 'static>(mut self, source: S) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Override the upscale service. Defaults to the HTTP client aimed at the
    /// configured endpoint.
    pub fn with_service(mut self, service: Arc<dyn UpscaleService>) -> Self {
        self.service = Some(service);
        self
    }

    /// Override the file stability policy. Defaults to the policy selected in
    /// the configuration.
    pub fn with_policy(mut self, policy: Arc<dyn StabilityPolicy>) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Build the session with the configured components.
    pub fn build(self) -> Result<WatchSession> {
        let config = self
            .config
            .ok_or_else(|| anyhow!("No configuration specified"))?;
        let source = self
            .source
            .ok_or_else(|| anyhow!("No watch source specified"))?;

        let service = self
            .service
            .unwrap_or_else(|| Arc::new(HttpUpscaleClient::new(config.api_url.clone())));
        let policy = self.policy.unwrap_or_else(|| match config.stability {
            StabilityMode::FixedDelay => {
                Arc::new(FixedDelay::new(Duration::from_millis(config.watch_delay_ms)))
            }
            StabilityMode::SizeStable => Arc::new(SizeStable::default()),
        });

        Ok(WatchSession {
            config: Arc::new(config),
            source,
            service,
            policy,
        })
    }
}

impl Default for WatchSessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watch::WatchEvent;
    use async_trait::async_trait;

    struct EmptySource;

    #[async_trait]
    impl WatchSource for EmptySource {
        async fn next_event(&mut self) -> Result<Option<WatchEvent>> {
            Ok(None)
        }
    }

    #[test]
    fn test_build_requires_config_and_source() {
        assert!(WatchSession::builder().build().is_err());
        assert!(
            WatchSession::builder()
                .with_config(WatcherConfig::default())
                .build()
                .is_err()
        );
        assert!(
            WatchSession::builder()
                .with_config(WatcherConfig::default())
                .with_source(EmptySource)
                .build()
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_run_returns_when_source_ends() {
        let session = WatchSession::builder()
            .with_config(WatcherConfig::default())
            .with_source(EmptySource)
            .build()
            .unwrap();
        session.run().await.unwrap();
    }
}
