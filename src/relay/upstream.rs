//! Upstream reader
//!
//! Owns the reconnect loop. Each successful connection becomes a
//! [`StreamSession`]; every chunk it yields is extracted, throttled and
//! broadcast before the next chunk is read. Failures and clean ends are
//! absorbed here and turned into reconnect delays, so the loop only exits on
//! an explicit stop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::backoff::ReconnectPolicy;
use super::broadcaster::Broadcaster;
use super::config::RelayConfig;
use super::source::{ChunkStream, UpstreamSource};
use crate::error::{Error, Result};
use crate::session::{ReaderState, StreamSession};
use crate::stats::RelayStats;

/// Reconnecting upstream reader
pub struct UpstreamReader<S: UpstreamSource> {
    source: S,
    broadcaster: Broadcaster,
    stats: Arc<RelayStats>,
    frame_interval: Duration,
    connect_timeout: Duration,
    policy: ReconnectPolicy,
    state_tx: watch::Sender<ReaderState>,
    cancel: CancellationToken,
    started: AtomicBool,
}

impl<S: UpstreamSource> UpstreamReader<S> {
    /// Create an idle reader
    pub fn new(
        source: S,
        broadcaster: Broadcaster,
        stats: Arc<RelayStats>,
        config: &RelayConfig,
    ) -> Self {
        let (state_tx, _) = watch::channel(ReaderState::Idle);

        Self {
            source,
            broadcaster,
            stats,
            frame_interval: config.frame_interval,
            connect_timeout: config.connect_timeout,
            policy: config.reconnect.clone(),
            state_tx,
            cancel: CancellationToken::new(),
            started: AtomicBool::new(false),
        }
    }

    /// Use an existing token so the reader stops with its owner
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Current state
    pub fn state(&self) -> ReaderState {
        *self.state_tx.borrow()
    }

    /// Watch state transitions
    pub fn subscribe_state(&self) -> watch::Receiver<ReaderState> {
        self.state_tx.subscribe()
    }

    /// Spawn the reconnect loop
    ///
    /// Returns `None` if the reader was already started or has been stopped.
    pub fn start(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        if self.cancel.is_cancelled()
            || self.state().is_terminal()
            || self.started.swap(true, Ordering::AcqRel)
        {
            return None;
        }

        let reader = Arc::clone(self);
        Some(tokio::spawn(async move { reader.run().await }))
    }

    /// Request a stop
    ///
    /// The active connection is dropped at its next suspension point and no
    /// reconnect is scheduled.
    pub fn stop(&self) {
        self.cancel.cancel();
        if !self.started.load(Ordering::Acquire) {
            self.set_state(ReaderState::Stopped);
        }
    }

    fn set_state(&self, state: ReaderState) {
        let previous = self.state_tx.send_replace(state);
        if previous != state {
            tracing::trace!(from = %previous, to = %state, "Reader state changed");
        }
    }

    async fn run(&self) {
        // Counts every attempt for the reader's lifetime; never reset
        let mut attempt: u32 = 0;
        let mut sessions: u64 = 0;

        while !self.cancel.is_cancelled() {
            attempt = attempt.saturating_add(1);
            self.stats.record_connect_attempt();
            self.set_state(ReaderState::Connecting);
            tracing::info!(
                upstream = self.source.describe(),
                attempt = attempt,
                "Connecting to upstream"
            );

            let result = tokio::select! {
                _ = self.cancel.cancelled() => break,
                result = self.stream_once(&mut sessions) => result,
            };

            let delay = match result {
                Ok(()) => {
                    self.stats.record_clean_end();
                    self.set_state(ReaderState::Ended);
                    let delay = self.policy.after_end();
                    tracing::warn!(
                        delay_ms = delay.as_millis() as u64,
                        "Upstream stream ended, reconnecting"
                    );
                    delay
                }
                Err(e) => {
                    self.stats.record_failure();
                    self.set_state(ReaderState::Failed);
                    let delay = self.policy.after_failure(attempt);
                    let stage = if e.is_connect() { "connect" } else { "read" };
                    tracing::error!(
                        error = %e,
                        stage,
                        attempt = attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Upstream connect/read failed"
                    );
                    delay
                }
            };

            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        self.set_state(ReaderState::Stopped);
        tracing::info!(attempts = attempt, "Upstream reader stopped");
    }

    /// Connect once and pump chunks until the stream ends or fails
    async fn stream_once(&self, sessions: &mut u64) -> Result<()> {
        let mut stream = tokio::time::timeout(self.connect_timeout, self.source.connect())
            .await
            .map_err(|_| Error::ConnectTimeout(self.connect_timeout))??;

        *sessions += 1;
        let mut session = StreamSession::new(*sessions, self.frame_interval);
        self.stats.record_session();
        self.set_state(ReaderState::Streaming);
        tracing::info!(session = session.id, "Connected to upstream");

        let result = loop {
            match stream.next_chunk().await {
                Ok(Some(chunk)) => self.handle_chunk(&mut session, &chunk).await,
                Ok(None) => break Ok(()),
                Err(e) => break Err(e),
            }
        };

        let extractor = session.extractor_stats();
        tracing::debug!(
            session = session.id,
            duration_ms = session.duration().as_millis() as u64,
            chunks = session.chunks,
            bytes = session.bytes_received,
            frames = extractor.frames,
            partial_resets = extractor.partial_resets,
            garbage_resets = extractor.garbage_resets,
            "Upstream session finished"
        );

        result
    }

    async fn handle_chunk(&self, session: &mut StreamSession, chunk: &[u8]) {
        self.stats.record_chunk(chunk.len());

        let outcome = session.process(chunk, Instant::now());
        if outcome.reset.is_some() {
            self.stats.record_buffer_reset();
        }
        if outcome.extracted {
            self.stats.record_frame(outcome.frame.is_some());
        }

        if let Some(frame) = outcome.frame {
            self.broadcaster.broadcast(&frame).await;
        }
    }
}
