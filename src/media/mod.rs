//! Media handling
//!
//! JPEG frame extraction from unframed MJPEG byte streams.

pub mod jpeg;

pub use jpeg::{BufferReset, FrameExtractor, JpegFrame, EOI_MARKER, SOI_MARKER};
