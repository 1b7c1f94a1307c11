//! JPEG frame extraction from an unframed byte stream
//!
//! MJPEG cameras push a continuous sequence of JPEG images. The only framing
//! used here is the pair of markers embedded in every image:
//!
//! ```text
//! ... garbage ... | FF D8 | ... image data ... | FF D9 | ... next image ...
//!                   SOI                          EOI
//! ```
//!
//! The extractor accumulates chunks as they arrive and resolves at most one
//! frame per call to [`FrameExtractor::ingest`]. Both markers are searched
//! from the beginning of the accumulator, so an end marker that precedes the
//! start marker does not resolve a frame; the bytes before the start marker
//! are then dropped and the scan waits for more data.
//!
//! Memory is bounded by two limits. A partial frame (start marker seen, no
//! end marker yet) larger than [`MAX_PARTIAL_FRAME`] and a markerless buffer
//! larger than [`MAX_GARBAGE`] are both discarded entirely.

use bytes::{Buf, Bytes, BytesMut};

/// Start of image marker
pub const SOI_MARKER: [u8; 2] = [0xFF, 0xD8];

/// End of image marker
pub const EOI_MARKER: [u8; 2] = [0xFF, 0xD9];

/// Upper bound for an unterminated frame (500 KiB)
pub const MAX_PARTIAL_FRAME: usize = 500 * 1024;

/// Upper bound for data without any start marker (100 KiB)
pub const MAX_GARBAGE: usize = 100 * 1024;

/// A complete JPEG image, SOI through EOI inclusive
///
/// Cheap to clone: the bytes are reference counted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JpegFrame {
    data: Bytes,
}

impl JpegFrame {
    /// Wrap raw JPEG bytes
    pub fn new(data: Bytes) -> Self {
        Self { data }
    }

    /// Frame bytes
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Consume the frame, returning its bytes
    pub fn into_bytes(self) -> Bytes {
        self.data
    }

    /// Frame size in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the frame holds no bytes
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Why the accumulator was discarded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferReset {
    /// Start marker seen but the partial frame grew past [`MAX_PARTIAL_FRAME`]
    PartialFrameTooLarge,
    /// No start marker and the buffer grew past [`MAX_GARBAGE`]
    NoMarkers,
}

/// Counters kept by a single extractor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractorStats {
    /// Frames emitted
    pub frames: u64,
    /// Resets caused by an oversized partial frame
    pub partial_resets: u64,
    /// Resets caused by an oversized markerless buffer
    pub garbage_resets: u64,
}

/// Stateful SOI/EOI scanner
#[derive(Debug, Default)]
pub struct FrameExtractor {
    buffer: BytesMut,
    stats: ExtractorStats,
    last_reset: Option<BufferReset>,
}

impl FrameExtractor {
    /// Create an extractor with an empty accumulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and resolve at most one frame
    ///
    /// The returned `Option` is the zero-or-one sequence of frames produced
    /// by this chunk. Frames left complete in the accumulator are resolved
    /// by subsequent calls.
    pub fn ingest(&mut self, chunk: &[u8]) -> Option<JpegFrame> {
        self.last_reset = None;
        self.buffer.extend_from_slice(chunk);

        let start = find_marker(&self.buffer, SOI_MARKER);
        let end = find_marker(&self.buffer, EOI_MARKER);

        match (start, end) {
            (Some(start), Some(end)) if end > start => {
                self.buffer.advance(start);
                let frame = self.buffer.split_to(end - start + EOI_MARKER.len()).freeze();
                self.stats.frames += 1;
                Some(JpegFrame::new(frame))
            }
            (Some(start), _) => {
                self.buffer.advance(start);
                if self.buffer.len() > MAX_PARTIAL_FRAME {
                    self.reset(BufferReset::PartialFrameTooLarge);
                }
                None
            }
            (None, _) => {
                if self.buffer.len() > MAX_GARBAGE {
                    self.reset(BufferReset::NoMarkers);
                }
                None
            }
        }
    }

    /// Bytes currently held in the accumulator
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Reset performed by the most recent `ingest` call, if any
    pub fn last_reset(&self) -> Option<BufferReset> {
        self.last_reset
    }

    /// Counters since creation
    pub fn stats(&self) -> ExtractorStats {
        self.stats
    }

    fn reset(&mut self, reason: BufferReset) {
        tracing::debug!(
            reason = ?reason,
            discarded = self.buffer.len(),
            "Reset frame buffer"
        );
        self.buffer.clear();
        self.last_reset = Some(reason);
        match reason {
            BufferReset::PartialFrameTooLarge => self.stats.partial_resets += 1,
            BufferReset::NoMarkers => self.stats.garbage_resets += 1,
        }
    }
}

fn find_marker(haystack: &[u8], marker: [u8; 2]) -> Option<usize> {
    haystack.windows(2).position(|w| w == marker)
}
