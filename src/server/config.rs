//! Stream server configuration

use std::net::SocketAddr;
use std::time::Duration;

/// Default fan-out port, separate from any control-plane port
pub const DEFAULT_STREAM_PORT: u16 = 3001;

/// Stream server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Maximum concurrent subscribers (0 = unlimited)
    pub max_subscribers: usize,

    /// Frames queued per subscriber before new frames are dropped
    pub subscriber_queue: usize,

    /// WebSocket handshake must complete within this time
    pub handshake_timeout: Duration,

    /// A single frame write must complete within this time
    pub write_timeout: Duration,

    /// Enable TCP_NODELAY (disable Nagle's algorithm)
    pub tcp_nodelay: bool,

    /// Answer plain HTTP requests with the browser viewer page
    pub viewer: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_STREAM_PORT)),
            max_subscribers: 0, // Unlimited
            subscriber_queue: 4,
            handshake_timeout: Duration::from_secs(10),
            write_timeout: Duration::from_secs(10),
            tcp_nodelay: true, // Frames are latency sensitive
            viewer: true,
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set maximum subscribers
    pub fn max_subscribers(mut self, max: usize) -> Self {
        self.max_subscribers = max;
        self
    }

    /// Set the per-subscriber queue length (at least 1)
    pub fn subscriber_queue(mut self, frames: usize) -> Self {
        self.subscriber_queue = frames.max(1);
        self
    }

    /// Set handshake timeout
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Set the per-frame write timeout
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Enable or disable the viewer page
    pub fn viewer(mut self, enabled: bool) -> Self {
        self.viewer = enabled;
        self
    }
}
