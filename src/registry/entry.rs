//! Subscriber entity
//!
//! A subscriber is one connected push client. The transport layer creates it
//! when the handshake completes and marks it closed on disconnect; the
//! broadcaster only reads the state and queues frames.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::time::Instant;

use bytes::Bytes;
use tokio::sync::mpsc;

use super::error::SendError;
use crate::media::jpeg::JpegFrame;

/// Subscriber identity (unique per registry)
pub type SubscriberId = u64;

/// Liveness of a subscriber connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SubscriberState {
    /// Connected and accepting frames
    Open = 0,
    /// Disconnected or shutting down
    Closed = 1,
}

impl SubscriberState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => SubscriberState::Open,
            _ => SubscriberState::Closed,
        }
    }
}

/// A connected push client
#[derive(Debug)]
pub struct Subscriber {
    id: SubscriberId,
    peer_addr: SocketAddr,
    connected_at: Instant,
    state: AtomicU8,
    tx: mpsc::Sender<Bytes>,
    delivered: AtomicU64,
    dropped: AtomicU64,
}

impl Subscriber {
    /// Create an open subscriber that queues frames on `tx`
    pub fn new(id: SubscriberId, peer_addr: SocketAddr, tx: mpsc::Sender<Bytes>) -> Self {
        Self {
            id,
            peer_addr,
            connected_at: Instant::now(),
            state: AtomicU8::new(SubscriberState::Open as u8),
            tx,
            delivered: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    /// Create an open subscriber together with its bounded frame queue
    pub fn channel(
        id: SubscriberId,
        peer_addr: SocketAddr,
        capacity: usize,
    ) -> (Self, mpsc::Receiver<Bytes>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(id, peer_addr, tx), rx)
    }

    /// Subscriber ID
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Remote peer address
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// How long the subscriber has been connected
    pub fn connected_for(&self) -> std::time::Duration {
        self.connected_at.elapsed()
    }

    /// Current liveness state
    pub fn state(&self) -> SubscriberState {
        SubscriberState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Whether the subscriber accepts frames
    pub fn is_open(&self) -> bool {
        self.state() == SubscriberState::Open
    }

    /// Disconnect hook: stop accepting frames
    pub fn mark_closed(&self) {
        self.state.store(SubscriberState::Closed as u8, Ordering::Release);
    }

    /// Queue a frame without waiting
    ///
    /// Drops the frame if the queue is full.
    pub fn try_send(&self, frame: &JpegFrame) -> Result<(), SendError> {
        if !self.is_open() {
            return Err(SendError::Closed(self.id));
        }

        match self.tx.try_send(frame.data().clone()) {
            Ok(()) => {
                self.delivered.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                Err(SendError::Full(self.id))
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                Err(SendError::Disconnected(self.id))
            }
        }
    }

    /// Frames queued for this subscriber
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Frames dropped for this subscriber
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
