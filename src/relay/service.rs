//! Relay service
//!
//! Wires the pieces together: one [`StreamServer`] owning the subscriber
//! registry, one [`UpstreamReader`] feeding a [`Broadcaster`] over that same
//! registry, and an optional stats logger. All of them share a single
//! cancellation token, so stopping the relay closes the upstream connection,
//! ends the reconnect loop and disconnects every subscriber.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::broadcaster::Broadcaster;
use super::config::RelayConfig;
use super::source::{HttpSource, UpstreamSource};
use super::upstream::UpstreamReader;
use crate::error::Result;
use crate::registry::SubscriberRegistry;
use crate::server::{ServerConfig, StreamServer};
use crate::session::ReaderState;
use crate::stats::{RelayStats, RelayStatsSnapshot};

/// Relay builder
#[derive(Debug, Clone, Default)]
pub struct RelayService {
    config: RelayConfig,
    server_config: ServerConfig,
}

impl RelayService {
    /// Create a relay from upstream and server configuration
    pub fn new(config: RelayConfig, server_config: ServerConfig) -> Self {
        Self {
            config,
            server_config,
        }
    }

    /// Upstream configuration
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Stream server configuration
    pub fn server_config(&self) -> &ServerConfig {
        &self.server_config
    }

    /// Bind the stream server and start reading from the configured URL
    pub async fn start(self) -> Result<RelayHandle> {
        let source = HttpSource::new(self.config.upstream_url.clone())?;
        self.start_with_source(source).await
    }

    /// Bind the stream server and start reading from `source`
    pub async fn start_with_source<S: UpstreamSource>(self, source: S) -> Result<RelayHandle> {
        let shutdown = CancellationToken::new();
        let stats = Arc::new(RelayStats::new());

        let server = StreamServer::bind(self.server_config.clone()).await?;
        let local_addr = server.local_addr();
        let registry = Arc::clone(server.registry());

        let broadcaster = Broadcaster::new(Arc::clone(&registry), Arc::clone(&stats));
        let reader = Arc::new(
            UpstreamReader::new(source, broadcaster, Arc::clone(&stats), &self.config)
                .with_cancellation(shutdown.clone()),
        );
        let state = reader.subscribe_state();

        let mut tasks = Vec::with_capacity(3);

        let server_shutdown = shutdown.clone();
        tasks.push(tokio::spawn(async move {
            if let Err(e) = server.run_until(server_shutdown).await {
                tracing::error!(error = %e, "Stream server failed");
            }
        }));

        if let Some(reader_task) = reader.start() {
            tasks.push(reader_task);
        }

        if !self.config.stats_interval.is_zero() {
            tasks.push(spawn_stats_logger(
                self.config.stats_interval,
                Arc::clone(&stats),
                Arc::clone(&registry),
                shutdown.clone(),
            ));
        }

        tracing::info!(
            upstream = %self.config.upstream_url,
            stream_addr = %local_addr,
            frame_interval_ms = self.config.frame_interval.as_millis() as u64,
            "Relay started"
        );

        Ok(RelayHandle {
            shutdown,
            local_addr,
            registry,
            stats,
            state,
            tasks,
        })
    }

    /// Run the relay until `shutdown` completes
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let handle = self.start().await?;
        shutdown.await;
        tracing::info!("Shutdown signal received");
        handle.stop().await;
        Ok(())
    }
}

/// Running relay
pub struct RelayHandle {
    shutdown: CancellationToken,
    local_addr: SocketAddr,
    registry: Arc<SubscriberRegistry>,
    stats: Arc<RelayStats>,
    state: watch::Receiver<ReaderState>,
    tasks: Vec<JoinHandle<()>>,
}

impl RelayHandle {
    /// Address subscribers connect to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Subscriber registry
    pub fn registry(&self) -> &Arc<SubscriberRegistry> {
        &self.registry
    }

    /// Current upstream reader state
    pub fn state(&self) -> ReaderState {
        *self.state.borrow()
    }

    /// Watch upstream reader state transitions
    pub fn subscribe_state(&self) -> watch::Receiver<ReaderState> {
        self.state.clone()
    }

    /// Current counters
    pub fn stats(&self) -> RelayStatsSnapshot {
        self.stats.snapshot()
    }

    /// Stop the relay and wait for its tasks to finish
    ///
    /// Frames already queued to subscribers are not flushed.
    pub async fn stop(self) {
        self.shutdown.cancel();
        for task in self.tasks {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Relay task panicked");
            }
        }
        tracing::info!("Relay stopped");
    }
}

fn spawn_stats_logger(
    interval: std::time::Duration,
    stats: Arc<RelayStats>,
    registry: Arc<SubscriberRegistry>,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    let snapshot = stats.snapshot();
                    let subscribers = registry.len().await;
                    tracing::info!(
                        subscribers,
                        sessions = snapshot.sessions,
                        failures = snapshot.failures,
                        frames_extracted = snapshot.frames_extracted,
                        frames_admitted = snapshot.frames_admitted,
                        frames_throttled = snapshot.frames_throttled,
                        frames_delivered = snapshot.frames_delivered,
                        send_failures = snapshot.send_failures,
                        buffer_resets = snapshot.buffer_resets,
                        bitrate = snapshot.bitrate(),
                        "Relay stats"
                    );
                }
            }
        }
    })
}
