//! Statistics for the relay pipeline

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Relay-wide counters
///
/// Updated from the reader task and the broadcaster; read with
/// [`RelayStats::snapshot`].
#[derive(Debug)]
pub struct RelayStats {
    started_at: Instant,
    connect_attempts: AtomicU64,
    sessions: AtomicU64,
    clean_ends: AtomicU64,
    failures: AtomicU64,
    chunks_received: AtomicU64,
    bytes_received: AtomicU64,
    frames_extracted: AtomicU64,
    frames_admitted: AtomicU64,
    frames_throttled: AtomicU64,
    frames_delivered: AtomicU64,
    send_failures: AtomicU64,
    buffer_resets: AtomicU64,
}

/// Point-in-time copy of [`RelayStats`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayStatsSnapshot {
    /// Time since the stats were created
    pub uptime: Duration,
    /// Upstream connection attempts
    pub connect_attempts: u64,
    /// Successful upstream connections
    pub sessions: u64,
    /// Sessions the upstream closed cleanly
    pub clean_ends: u64,
    /// Connect or read failures
    pub failures: u64,
    /// Chunks read from the upstream
    pub chunks_received: u64,
    /// Bytes read from the upstream
    pub bytes_received: u64,
    /// Complete frames found in the stream
    pub frames_extracted: u64,
    /// Frames that passed the throttle
    pub frames_admitted: u64,
    /// Frames dropped by the throttle
    pub frames_throttled: u64,
    /// Frames queued to subscribers (one per subscriber per frame)
    pub frames_delivered: u64,
    /// Per-subscriber send failures
    pub send_failures: u64,
    /// Accumulator resets (oversized partial or markerless data)
    pub buffer_resets: u64,
}

impl RelayStats {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            connect_attempts: AtomicU64::new(0),
            sessions: AtomicU64::new(0),
            clean_ends: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            chunks_received: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            frames_extracted: AtomicU64::new(0),
            frames_admitted: AtomicU64::new(0),
            frames_throttled: AtomicU64::new(0),
            frames_delivered: AtomicU64::new(0),
            send_failures: AtomicU64::new(0),
            buffer_resets: AtomicU64::new(0),
        }
    }

    pub fn record_connect_attempt(&self) {
        self.connect_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_session(&self) {
        self.sessions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_clean_end(&self) {
        self.clean_ends.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_chunk(&self, len: usize) {
        self.chunks_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(len as u64, Ordering::Relaxed);
    }

    pub fn record_frame(&self, admitted: bool) {
        self.frames_extracted.fetch_add(1, Ordering::Relaxed);
        if admitted {
            self.frames_admitted.fetch_add(1, Ordering::Relaxed);
        } else {
            self.frames_throttled.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_delivery(&self, delivered: usize, failed: usize) {
        self.frames_delivered.fetch_add(delivered as u64, Ordering::Relaxed);
        self.send_failures.fetch_add(failed as u64, Ordering::Relaxed);
    }

    pub fn record_buffer_reset(&self) {
        self.buffer_resets.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the current counters
    pub fn snapshot(&self) -> RelayStatsSnapshot {
        RelayStatsSnapshot {
            uptime: self.started_at.elapsed(),
            connect_attempts: self.connect_attempts.load(Ordering::Relaxed),
            sessions: self.sessions.load(Ordering::Relaxed),
            clean_ends: self.clean_ends.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            chunks_received: self.chunks_received.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            frames_extracted: self.frames_extracted.load(Ordering::Relaxed),
            frames_admitted: self.frames_admitted.load(Ordering::Relaxed),
            frames_throttled: self.frames_throttled.load(Ordering::Relaxed),
            frames_delivered: self.frames_delivered.load(Ordering::Relaxed),
            send_failures: self.send_failures.load(Ordering::Relaxed),
            buffer_resets: self.buffer_resets.load(Ordering::Relaxed),
        }
    }
}

impl Default for RelayStats {
    fn default() -> Self {
        Self::new()
    }
}

impl RelayStatsSnapshot {
    /// Average upstream throughput in bits per second
    pub fn bitrate(&self) -> u64 {
        let secs = self.uptime.as_secs();
        if secs > 0 {
            (self.bytes_received * 8) / secs
        } else {
            0
        }
    }

    /// Average admitted frame rate
    pub fn admitted_fps(&self) -> f64 {
        let secs = self.uptime.as_secs_f64();
        if secs > 0.0 {
            self.frames_admitted as f64 / secs
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_stats() {
        let snapshot = RelayStats::new().snapshot();
        assert_eq!(snapshot.connect_attempts, 0);
        assert_eq!(snapshot.frames_extracted, 0);
        assert_eq!(snapshot.send_failures, 0);
    }

    #[test]
    fn test_frame_counters() {
        let stats = RelayStats::new();
        stats.record_frame(true);
        stats.record_frame(false);
        stats.record_frame(false);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.frames_extracted, 3);
        assert_eq!(snapshot.frames_admitted, 1);
        assert_eq!(snapshot.frames_throttled, 2);
    }

    #[test]
    fn test_chunk_and_delivery_counters() {
        let stats = RelayStats::new();
        stats.record_chunk(1024);
        stats.record_chunk(512);
        stats.record_delivery(3, 1);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.chunks_received, 2);
        assert_eq!(snapshot.bytes_received, 1536);
        assert_eq!(snapshot.frames_delivered, 3);
        assert_eq!(snapshot.send_failures, 1);
    }

    #[test]
    fn test_bitrate() {
        let snapshot = RelayStatsSnapshot {
            uptime: Duration::from_secs(10),
            bytes_received: 1_000_000,
            ..Default::default()
        };

        // 1,000,000 bytes * 8 bits / 10 seconds
        assert_eq!(snapshot.bitrate(), 800_000);
    }

    #[test]
    fn test_bitrate_zero_uptime() {
        let snapshot = RelayStatsSnapshot {
            bytes_received: 1_000_000,
            ..Default::default()
        };

        assert_eq!(snapshot.bitrate(), 0);
        assert_eq!(snapshot.admitted_fps(), 0.0);
    }
}
