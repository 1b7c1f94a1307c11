//! Upstream reader state machine
//!
//! ```text
//!   Idle ──start──► Connecting ──ok──► Streaming ──clean close──► Ended
//!                     │  ▲                 │                       │
//!                     │  │               error                  2 s delay
//!                   error│                 ▼                       │
//!                     └──┼──────────────► Failed                   │
//!                        │                 │ min(5 s + n·1 s, 30 s)│
//!                        └─────────────────┴───────────────────────┘
//!
//!   any state ──stop──► Stopped (terminal)
//! ```

use std::fmt;

/// Reader lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    /// Created, not started
    Idle,
    /// Connection attempt in progress
    Connecting,
    /// Connected, chunks flowing through the pipeline
    Streaming,
    /// Upstream closed cleanly, waiting to reconnect
    Ended,
    /// Connect or read error, waiting to reconnect
    Failed,
    /// Stop requested; no further reconnects
    Stopped,
}

impl ReaderState {
    /// Whether the reader will never leave this state
    pub fn is_terminal(&self) -> bool {
        *self == ReaderState::Stopped
    }
}

impl fmt::Display for ReaderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReaderState::Idle => "idle",
            ReaderState::Connecting => "connecting",
            ReaderState::Streaming => "streaming",
            ReaderState::Ended => "ended",
            ReaderState::Failed => "failed",
            ReaderState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}
