//! Subscriber registry
//!
//! Tracks the push clients currently connected to the stream server.
//!
//! # Architecture
//!
//! ```text
//!   StreamServer (transport)            UpstreamReader
//!   accept ─► add(subscriber)           frame admitted
//!   close  ─► remove(id)                      │
//!                  │                          ▼
//!                  ▼                   Broadcaster::broadcast()
//!        Arc<SubscriberRegistry> ◄──────── snapshot()
//!                  │                          │
//!                  │           try_send() per open subscriber
//!                  ▼                          ▼
//!      Subscriber { state, mpsc::Sender<Bytes> } ──► writer task ──► WebSocket
//! ```
//!
//! Frames are `bytes::Bytes`, so every subscriber queue shares the same
//! allocation.

pub mod entry;
pub mod error;
pub mod store;

pub use entry::{Subscriber, SubscriberId, SubscriberState};
pub use error::SendError;
pub use store::SubscriberRegistry;
