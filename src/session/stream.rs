//! Upstream stream session
//!
//! One session per successful upstream connection. It owns the frame
//! accumulator and the throttle window, so a reconnect always starts from an
//! empty buffer and admits its first frame immediately.

use std::time::Duration;

use tokio::time::Instant;

use crate::media::jpeg::{BufferReset, ExtractorStats, FrameExtractor, JpegFrame};
use crate::relay::throttle::Throttler;

/// Result of feeding one chunk through a session
#[derive(Debug, Default)]
pub struct ChunkOutcome {
    /// Frame that passed the throttle
    pub frame: Option<JpegFrame>,
    /// Whether a complete frame was found (admitted or not)
    pub extracted: bool,
    /// Accumulator reset performed while scanning this chunk
    pub reset: Option<BufferReset>,
}

/// State for one upstream connection
#[derive(Debug)]
pub struct StreamSession {
    /// Session number (1 for the first successful connection)
    pub id: u64,

    /// When the connection was established
    pub started_at: Instant,

    /// Chunks received
    pub chunks: u64,

    /// Bytes received
    pub bytes_received: u64,

    extractor: FrameExtractor,
    throttler: Throttler,
}

impl StreamSession {
    /// Create a session with an empty accumulator
    pub fn new(id: u64, frame_interval: Duration) -> Self {
        Self {
            id,
            started_at: Instant::now(),
            chunks: 0,
            bytes_received: 0,
            extractor: FrameExtractor::new(),
            throttler: Throttler::new(frame_interval),
        }
    }

    /// Extract and throttle
    ///
    /// `now` is the arrival time used for the throttle decision.
    pub fn process(&mut self, chunk: &[u8], now: Instant) -> ChunkOutcome {
        self.chunks += 1;
        self.bytes_received += chunk.len() as u64;

        let extracted = self.extractor.ingest(chunk);
        let reset = self.extractor.last_reset();

        match extracted {
            Some(frame) => ChunkOutcome {
                frame: self.throttler.admit(now).then_some(frame),
                extracted: true,
                reset,
            },
            None => ChunkOutcome {
                frame: None,
                extracted: false,
                reset,
            },
        }
    }

    /// Bytes waiting in the accumulator
    pub fn buffered(&self) -> usize {
        self.extractor.buffered()
    }

    /// Extractor counters for this session
    pub fn extractor_stats(&self) -> ExtractorStats {
        self.extractor.stats()
    }

    /// Session duration
    pub fn duration(&self) -> Duration {
        self.started_at.elapsed()
    }
}
