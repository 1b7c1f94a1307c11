//! Frame fan-out
//!
//! Takes a registry snapshot and queues the frame to every open subscriber.
//! Sends never wait: a full queue drops the frame for that subscriber only.
//! Failed sends are logged and counted but never remove a subscriber; that
//! is left to the transport's disconnect hook.

use std::sync::Arc;

use crate::media::jpeg::JpegFrame;
use crate::registry::{SendError, SubscriberRegistry};
use crate::stats::RelayStats;

/// Result of one broadcast
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastOutcome {
    /// Subscribers the frame was queued for
    pub delivered: usize,
    /// Subscribers whose queue was full
    pub dropped: usize,
    /// Subscribers that closed between the snapshot and the send
    pub closed: usize,
}

impl BroadcastOutcome {
    /// Number of failed sends
    pub fn failed(&self) -> usize {
        self.dropped + self.closed
    }
}

/// Pushes frames to the subscriber registry
#[derive(Clone)]
pub struct Broadcaster {
    registry: Arc<SubscriberRegistry>,
    stats: Arc<RelayStats>,
}

impl Broadcaster {
    /// Create a broadcaster over `registry`
    pub fn new(registry: Arc<SubscriberRegistry>, stats: Arc<RelayStats>) -> Self {
        Self { registry, stats }
    }

    /// The registry frames are sent to
    pub fn registry(&self) -> &Arc<SubscriberRegistry> {
        &self.registry
    }

    /// Send a frame to every subscriber open at call time
    pub async fn broadcast(&self, frame: &JpegFrame) -> BroadcastOutcome {
        let mut outcome = BroadcastOutcome::default();

        for subscriber in self.registry.snapshot().await {
            match subscriber.try_send(frame) {
                Ok(()) => outcome.delivered += 1,
                Err(e) => {
                    match e {
                        SendError::Full(_) => outcome.dropped += 1,
                        SendError::Closed(_) | SendError::Disconnected(_) => outcome.closed += 1,
                    }
                    tracing::debug!(
                        subscriber = subscriber.id(),
                        peer = %subscriber.peer_addr(),
                        error = %e,
                        "Frame not delivered"
                    );
                }
            }
        }

        self.stats.record_delivery(outcome.delivered, outcome.failed());
        outcome
    }
}
