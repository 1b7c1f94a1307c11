//! Upstream session state
//!
//! [`ReaderState`] tracks the reconnect loop; [`StreamSession`] holds the
//! per-connection scanning and throttling state.

pub mod state;
pub mod stream;

pub use state::ReaderState;
pub use stream::{ChunkOutcome, StreamSession};
