//! Relay configuration

use std::time::Duration;

use super::backoff::ReconnectPolicy;

/// Default upstream camera stream
pub const DEFAULT_UPSTREAM_URL: &str = "http://192.168.0.109:81/stream";

/// Default minimum spacing between forwarded frames (10 frames per second)
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(100);

/// Upstream side configuration
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// MJPEG source URL
    pub upstream_url: String,

    /// Minimum spacing between forwarded frames (zero disables throttling)
    pub frame_interval: Duration,

    /// Time allowed for the upstream to answer a connection attempt
    pub connect_timeout: Duration,

    /// Reconnect delays
    pub reconnect: ReconnectPolicy,

    /// Periodic stats log interval (zero disables)
    pub stats_interval: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            upstream_url: DEFAULT_UPSTREAM_URL.to_string(),
            frame_interval: DEFAULT_FRAME_INTERVAL,
            connect_timeout: Duration::from_secs(10),
            reconnect: ReconnectPolicy::default(),
            stats_interval: Duration::from_secs(30),
        }
    }
}

impl RelayConfig {
    /// Create a config for the given upstream URL
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            upstream_url: url.into(),
            ..Default::default()
        }
    }

    /// Set the upstream URL
    pub fn upstream_url(mut self, url: impl Into<String>) -> Self {
        self.upstream_url = url.into();
        self
    }

    /// Set the minimum frame spacing
    pub fn frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }

    /// Set the maximum forwarded frame rate (zero disables throttling)
    pub fn max_fps(mut self, fps: u32) -> Self {
        self.frame_interval = if fps == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs(1) / fps
        };
        self
    }

    /// Set the connect timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the reconnect policy
    pub fn reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }

    /// Set the stats log interval
    pub fn stats_interval(mut self, interval: Duration) -> Self {
        self.stats_interval = interval;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RelayConfig::default();

        assert_eq!(config.upstream_url, DEFAULT_UPSTREAM_URL);
        assert_eq!(config.frame_interval, Duration::from_millis(100));
        assert_eq!(config.frame_interval, RelayConfig::default().max_fps(10).frame_interval);
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.reconnect, ReconnectPolicy::default());
    }

    #[test]
    fn test_with_url() {
        let config = RelayConfig::with_url("http://10.0.0.5:81/stream");

        assert_eq!(config.upstream_url, "http://10.0.0.5:81/stream");
        assert_eq!(config.frame_interval, DEFAULT_FRAME_INTERVAL);
    }

    #[test]
    fn test_builder_max_fps() {
        assert_eq!(
            RelayConfig::default().max_fps(10).frame_interval,
            Duration::from_millis(100)
        );
        assert_eq!(RelayConfig::default().max_fps(0).frame_interval, Duration::ZERO);
    }

    #[test]
    fn test_builder_chaining() {
        let config = RelayConfig::default()
            .upstream_url("http://cam.local/mjpeg")
            .frame_interval(Duration::from_millis(50))
            .connect_timeout(Duration::from_secs(3))
            .stats_interval(Duration::ZERO);

        assert_eq!(config.upstream_url, "http://cam.local/mjpeg");
        assert_eq!(config.frame_interval, Duration::from_millis(50));
        assert_eq!(config.connect_timeout, Duration::from_secs(3));
        assert_eq!(config.stats_interval, Duration::ZERO);
    }
}
