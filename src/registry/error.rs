//! Subscriber send errors
//!
//! These never leave the broadcaster: a failed send is logged and the
//! broadcast continues with the next subscriber.

use super::entry::SubscriberId;

/// Why a frame was not queued for a subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    /// Subscriber is marked closed
    #[error("subscriber {0} is closed")]
    Closed(SubscriberId),
    /// Subscriber queue is full; the frame was dropped
    #[error("subscriber {0} queue full, frame dropped")]
    Full(SubscriberId),
    /// The connection task that drains the queue is gone
    #[error("subscriber {0} disconnected")]
    Disconnected(SubscriberId),
}
