//! Error types
//!
//! Every failure the relay can observe maps onto one of these variants.
//! None of them terminate the relay: the upstream reader logs them and
//! schedules a reconnect.

use std::time::Duration;

/// Boxed error used as the source of connect and read failures
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Relay error
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Upstream connection could not be established
    #[error("upstream connect failed: {0}")]
    Connect(#[source] BoxError),

    /// Upstream did not answer within the connect timeout
    #[error("upstream connect timed out after {0:?}")]
    ConnectTimeout(Duration),

    /// Upstream answered with a non-success HTTP status
    #[error("upstream returned HTTP {0}")]
    UpstreamStatus(u16),

    /// Mid-stream read failure
    #[error("upstream read failed: {0}")]
    StreamRead(#[source] BoxError),

    /// Local socket error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Subscriber transport error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// HTTP client construction error
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Wrap any error as a connect failure
    pub fn connect(err: impl Into<BoxError>) -> Self {
        Error::Connect(err.into())
    }

    /// Wrap any error as a mid-stream read failure
    pub fn stream_read(err: impl Into<BoxError>) -> Self {
        Error::StreamRead(err.into())
    }

    /// Whether the failure happened before the stream was established
    pub fn is_connect(&self) -> bool {
        matches!(
            self,
            Error::Connect(_) | Error::ConnectTimeout(_) | Error::UpstreamStatus(_)
        )
    }
}
