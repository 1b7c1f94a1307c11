//! Subscriber-facing stream server
//!
//! Admitted frames are pushed to WebSocket clients as binary messages, one
//! message per JPEG image with no envelope. Browsers that open the port
//! directly get a small viewer page.

pub mod config;
pub mod listener;
pub mod viewer;

pub use config::ServerConfig;
pub use listener::StreamServer;
