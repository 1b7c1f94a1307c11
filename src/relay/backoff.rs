//! Reconnect delays
//!
//! Two schedules apply after a session ends:
//! - clean end of stream: a fixed short delay
//! - connect or read failure: `min(base + attempt * step, max)`
//!
//! The attempt number is the count of connection attempts made by the
//! reader so far. It is not reset after a successful connection, so the
//! failure delay drifts toward the cap over the reader's lifetime.

use std::time::Duration;

/// Reconnect delay schedule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Delay after the upstream closed the stream cleanly
    pub end_delay: Duration,

    /// Base delay after a failure
    pub failure_base: Duration,

    /// Added per attempt after a failure
    pub failure_step: Duration,

    /// Upper bound for the failure delay
    pub failure_max: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            end_delay: Duration::from_secs(2),
            failure_base: Duration::from_secs(5),
            failure_step: Duration::from_secs(1),
            failure_max: Duration::from_secs(30),
        }
    }
}

impl ReconnectPolicy {
    /// Delay before reconnecting after the stream ended without error
    pub fn after_end(&self) -> Duration {
        self.end_delay
    }

    /// Delay before reconnecting after failed attempt number `attempt`
    pub fn after_failure(&self, attempt: u32) -> Duration {
        self.failure_step
            .checked_mul(attempt)
            .and_then(|step| self.failure_base.checked_add(step))
            .map_or(self.failure_max, |delay| delay.min(self.failure_max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_delays() {
        let policy = ReconnectPolicy::default();

        assert_eq!(policy.after_end(), Duration::from_secs(2));
        assert_eq!(policy.after_failure(0), Duration::from_secs(5));
        assert_eq!(policy.after_failure(1), Duration::from_secs(6));
        assert_eq!(policy.after_failure(3), Duration::from_secs(8));
    }

    #[test]
    fn test_failure_delay_capped() {
        let policy = ReconnectPolicy::default();

        assert_eq!(policy.after_failure(25), Duration::from_secs(30));
        assert_eq!(policy.after_failure(26), Duration::from_secs(30));
        assert_eq!(policy.after_failure(u32::MAX), Duration::from_secs(30));
    }

    #[test]
    fn test_failure_delay_non_decreasing() {
        let policy = ReconnectPolicy::default();

        let delays: Vec<Duration> = (0..40).map(|n| policy.after_failure(n)).collect();
        assert!(delays.windows(2).all(|w| w[0] <= w[1]));
    }
}
