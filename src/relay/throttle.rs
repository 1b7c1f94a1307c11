//! Latest-wins frame rate limiter
//!
//! A frame passes only when at least `min_interval` has elapsed since the
//! last admitted frame. Rejected frames are dropped for good; nothing is
//! queued or replayed.

use std::time::Duration;

use tokio::time::Instant;

/// Frame admission gate
#[derive(Debug, Clone)]
pub struct Throttler {
    min_interval: Duration,
    last_admitted: Option<Instant>,
}

impl Throttler {
    /// Create a gate that has never admitted a frame
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_admitted: None,
        }
    }

    /// Decide whether a frame observed at `now` may pass
    pub fn admit(&mut self, now: Instant) -> bool {
        let allowed = match self.last_admitted {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.min_interval,
        };

        if allowed {
            self.last_admitted = Some(now);
        }
        allowed
    }

    /// Minimum spacing between admitted frames
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// When the last frame was admitted
    pub fn last_admitted(&self) -> Option<Instant> {
        self.last_admitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admission_sequence() {
        let base = Instant::now();
        let mut throttler = Throttler::new(Duration::from_millis(300));

        let admitted: Vec<u64> = [0u64, 100, 250, 400, 700]
            .into_iter()
            .filter(|ms| throttler.admit(base + Duration::from_millis(*ms)))
            .collect();

        assert_eq!(admitted, vec![0, 400, 700]);
    }

    #[test]
    fn test_first_frame_always_admitted() {
        let mut throttler = Throttler::new(Duration::from_secs(3600));
        assert!(throttler.last_admitted().is_none());

        let now = Instant::now();
        assert!(throttler.admit(now));
        assert_eq!(throttler.last_admitted(), Some(now));
        assert!(!throttler.admit(now + Duration::from_secs(1)));
    }

    #[test]
    fn test_rejected_frame_does_not_move_window() {
        let base = Instant::now();
        let mut throttler = Throttler::new(Duration::from_millis(100));

        assert!(throttler.admit(base));
        assert!(!throttler.admit(base + Duration::from_millis(99)));
        assert_eq!(throttler.last_admitted(), Some(base));
        assert!(throttler.admit(base + Duration::from_millis(100)));
    }

    #[test]
    fn test_zero_interval_admits_everything() {
        let now = Instant::now();
        let mut throttler = Throttler::new(Duration::ZERO);

        assert!(throttler.admit(now));
        assert!(throttler.admit(now));
        assert!(throttler.admit(now));
    }
}
