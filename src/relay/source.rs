//! Upstream byte sources
//!
//! The reader only needs two operations: open a connection, then pull chunks
//! until the upstream closes. [`HttpSource`] implements them over a plain
//! HTTP GET; tests substitute scripted sources.

use std::future::Future;

use bytes::Bytes;

use crate::error::{Error, Result};

/// An open upstream connection yielding arbitrarily sized chunks
pub trait ChunkStream: Send {
    /// Read the next chunk
    ///
    /// Returns `Ok(None)` when the upstream closed the stream cleanly.
    fn next_chunk(&mut self) -> impl Future<Output = Result<Option<Bytes>>> + Send;
}

/// Something the reader can connect to
pub trait UpstreamSource: Send + Sync + 'static {
    /// Connection type produced by [`UpstreamSource::connect`]
    type Stream: ChunkStream;

    /// Open a new connection
    fn connect(&self) -> impl Future<Output = Result<Self::Stream>> + Send;

    /// Human-readable location for logs
    fn describe(&self) -> &str;
}

/// MJPEG source reached with an HTTP GET
///
/// Only the response body is used; multipart boundaries and part headers are
/// left to the frame extractor to skip over.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::Client,
    url: String,
}

impl HttpSource {
    /// Create a source for `url`
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self::with_client(client, url))
    }

    /// Create a source that reuses an existing client
    pub fn with_client(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    /// Upstream URL
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl UpstreamSource for HttpSource {
    type Stream = HttpChunkStream;

    async fn connect(&self) -> Result<HttpChunkStream> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(Error::connect)?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::UpstreamStatus(status.as_u16()));
        }

        tracing::debug!(
            url = %self.url,
            status = status.as_u16(),
            content_type = ?response.headers().get(reqwest::header::CONTENT_TYPE),
            "Upstream response headers received"
        );

        Ok(HttpChunkStream { response })
    }

    fn describe(&self) -> &str {
        &self.url
    }
}

/// Response body of an [`HttpSource`] connection
#[derive(Debug)]
pub struct HttpChunkStream {
    response: reqwest::Response,
}

impl ChunkStream for HttpChunkStream {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        self.response.chunk().await.map_err(Error::stream_read)
    }
}
