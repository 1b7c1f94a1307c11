//! MJPEG relay server
//!
//! Run with: mjpeg-relay [OPTIONS]
//!
//! Every option can also be set through the environment:
//!   ESP32_MJPEG_URL         upstream stream URL
//!   CAMERA_THROTTLE_MS      minimum milliseconds between forwarded frames
//!   STREAM_BIND_ADDR        WebSocket fan-out address (default 0.0.0.0:3001)
//!   STREAM_MAX_SUBSCRIBERS  subscriber limit (0 = unlimited)
//!
//! Log verbosity follows RUST_LOG (default `mjpeg_relay=info`).

use std::net::SocketAddr;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use mjpeg_relay::relay::config::{DEFAULT_FRAME_INTERVAL, DEFAULT_UPSTREAM_URL};
use mjpeg_relay::{RelayConfig, RelayService, ServerConfig};

/// Relay a camera's MJPEG stream to WebSocket subscribers
#[derive(Debug, Parser)]
#[command(name = "mjpeg-relay", version, about)]
struct Args {
    /// Upstream MJPEG stream URL
    #[arg(long, env = "ESP32_MJPEG_URL", default_value = DEFAULT_UPSTREAM_URL)]
    upstream_url: String,

    /// Minimum milliseconds between forwarded frames (0 means the default)
    #[arg(long, env = "CAMERA_THROTTLE_MS", default_value_t = 100)]
    throttle_ms: u64,

    /// Address for WebSocket subscribers
    #[arg(long, env = "STREAM_BIND_ADDR", default_value = "0.0.0.0:3001")]
    bind: SocketAddr,

    /// Maximum concurrent subscribers (0 = unlimited)
    #[arg(long, env = "STREAM_MAX_SUBSCRIBERS", default_value_t = 0)]
    max_subscribers: usize,

    /// Frames queued per subscriber before dropping
    #[arg(long, default_value_t = 4)]
    subscriber_queue: usize,

    /// Seconds between stats log lines (0 disables)
    #[arg(long, default_value_t = 30)]
    stats_interval: u64,
}

impl Args {
    fn frame_interval(&self) -> Duration {
        match self.throttle_ms {
            0 => DEFAULT_FRAME_INTERVAL,
            ms => Duration::from_millis(ms),
        }
    }

    fn relay_config(&self) -> RelayConfig {
        RelayConfig::with_url(self.upstream_url.clone())
            .frame_interval(self.frame_interval())
            .stats_interval(Duration::from_secs(self.stats_interval))
    }

    fn server_config(&self) -> ServerConfig {
        ServerConfig::with_addr(self.bind)
            .max_subscribers(self.max_subscribers)
            .subscriber_queue(self.subscriber_queue)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mjpeg_relay=info")),
        )
        .init();

    let args = Args::parse();
    let relay = RelayService::new(args.relay_config(), args.server_config());

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    match relay.run_until(shutdown).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Relay failed to start");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["mjpeg-relay"]).unwrap();
        let relay = args.relay_config();
        let server = args.server_config();

        assert_eq!(relay.frame_interval, Duration::from_millis(100));
        assert_eq!(server.bind_addr.port(), 3001);
        assert_eq!(server.max_subscribers, 0);
    }

    #[test]
    fn test_flags() {
        let args = Args::try_parse_from([
            "mjpeg-relay",
            "--upstream-url",
            "http://10.0.0.7:81/stream",
            "--throttle-ms",
            "100",
            "--bind",
            "127.0.0.1:4000",
        ])
        .unwrap();

        assert_eq!(args.relay_config().upstream_url, "http://10.0.0.7:81/stream");
        assert_eq!(args.relay_config().frame_interval, Duration::from_millis(100));
        assert_eq!(args.server_config().bind_addr.port(), 4000);
    }

    #[test]
    fn test_zero_throttle_uses_default() {
        let args = Args::try_parse_from(["mjpeg-relay", "--throttle-ms", "0"]).unwrap();

        assert_eq!(args.relay_config().frame_interval, DEFAULT_FRAME_INTERVAL);
    }
}
