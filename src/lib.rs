//! MJPEG camera relay
//!
//! Reads a continuous MJPEG byte stream from a single upstream camera,
//! extracts JPEG images using only their embedded SOI/EOI markers, throttles
//! them, and pushes each admitted image to every connected WebSocket
//! subscriber.
//!
//! The upstream connection is kept alive indefinitely: clean closes and
//! failures both lead to a delayed reconnect, and only an explicit stop ends
//! the relay.
//!
//! # Example
//! ```no_run
//! use mjpeg_relay::{RelayConfig, RelayService, ServerConfig};
//!
//! # async fn example() -> mjpeg_relay::Result<()> {
//! let config = RelayConfig::with_url("http://192.168.0.109:81/stream");
//! let relay = RelayService::new(config, ServerConfig::default());
//!
//! relay
//!     .run_until(async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod media;
pub mod registry;
pub mod relay;
pub mod server;
pub mod session;
pub mod stats;

pub use error::{Error, Result};
pub use media::{FrameExtractor, JpegFrame};
pub use registry::{Subscriber, SubscriberRegistry};
pub use relay::{RelayConfig, RelayHandle, RelayService};
pub use server::{ServerConfig, StreamServer};
pub use session::ReaderState;
