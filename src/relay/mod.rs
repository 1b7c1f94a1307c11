//! Upstream-to-subscriber relay
//!
//! ```text
//!   UpstreamSource ──chunks──► UpstreamReader
//!                                   │ StreamSession
//!                                   │   FrameExtractor ─► Throttler
//!                                   ▼
//!                              Broadcaster ──► SubscriberRegistry ──► subscribers
//! ```
//!
//! The reader processes one chunk at a time: extraction, throttling and the
//! broadcast all finish before the next chunk is read.

pub mod backoff;
pub mod broadcaster;
pub mod config;
pub mod service;
pub mod source;
pub mod throttle;
pub mod upstream;

pub use backoff::ReconnectPolicy;
pub use broadcaster::{BroadcastOutcome, Broadcaster};
pub use config::RelayConfig;
pub use service::{RelayHandle, RelayService};
pub use source::{ChunkStream, HttpChunkStream, HttpSource, UpstreamSource};
pub use throttle::Throttler;
pub use upstream::UpstreamReader;
