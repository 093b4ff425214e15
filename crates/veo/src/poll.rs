//! Poll policy for long-running operations.
//!
//! The driver waits [`PollPolicy::interval`] before each status query,
//! growing the wait by [`PollPolicy::multiplier`] up to
//! [`PollPolicy::max_interval`]. Polling gives up once either the attempt
//! cap or the deadline is reached; with both unset it waits for as long as
//! the service takes.

use std::time::Duration;

/// Default delay between status queries.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default upper bound on the total time spent polling.
pub const DEFAULT_POLL_DEADLINE: Duration = Duration::from_secs(30 * 60);

/// Tunable parameters for operation polling.
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    /// Delay before the first status query.
    pub interval: Duration,
    /// Upper bound on the delay between queries.
    pub max_interval: Duration,
    /// Factor by which the delay grows after each query. `1.0` keeps it fixed.
    pub multiplier: f64,
    /// Give up after this many status queries.
    pub max_attempts: Option<u32>,
    /// Give up once this much time has passed since submission.
    pub deadline: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_interval: DEFAULT_POLL_INTERVAL,
            multiplier: 1.0,
            max_attempts: None,
            deadline: Some(DEFAULT_POLL_DEADLINE),
        }
    }
}

impl PollPolicy {
    /// Fixed interval, no attempt cap, no deadline.
    pub fn unbounded(interval: Duration) -> Self {
        Self {
            interval,
            max_interval: interval,
            multiplier: 1.0,
            max_attempts: None,
            deadline: None,
        }
    }

    /// Returns `true` once `attempts` queries over `elapsed` time have used
    /// up the policy.
    pub fn is_exhausted(&self, attempts: u32, elapsed: Duration) -> bool {
        self.max_attempts.is_some_and(|max| attempts >= max)
            || self.deadline.is_some_and(|deadline| elapsed >= deadline)
    }

    /// Time left before the deadline, or `None` without one.
    pub fn remaining(&self, elapsed: Duration) -> Option<Duration> {
        self.deadline.map(|deadline| deadline.saturating_sub(elapsed))
    }
}

/// Calculate the next delay from the current delay and policy.
///
/// The result is clamped to [`PollPolicy::max_interval`].
pub fn next_delay(current: Duration, policy: &PollPolicy) -> Duration {
    let next_ms = (current.as_millis() as f64 * policy.multiplier) as u64;
    Duration::from_millis(next_ms).min(policy.max_interval)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_fixed_five_seconds() {
        let policy = PollPolicy::default();
        assert_eq!(policy.interval, Duration::from_secs(5));
        assert_eq!(next_delay(policy.interval, &policy), Duration::from_secs(5));
    }

    #[test]
    fn next_delay_grows_with_multiplier() {
        let policy = PollPolicy {
            interval: Duration::from_secs(2),
            max_interval: Duration::from_secs(60),
            multiplier: 2.0,
            ..Default::default()
        };
        assert_eq!(next_delay(Duration::from_secs(2), &policy), Duration::from_secs(4));
    }

    #[test]
    fn next_delay_clamps_at_max() {
        let policy = PollPolicy {
            max_interval: Duration::from_secs(10),
            multiplier: 2.0,
            ..Default::default()
        };
        assert_eq!(next_delay(Duration::from_secs(8), &policy), Duration::from_secs(10));
    }

    #[test]
    fn backoff_sequence() {
        let policy = PollPolicy {
            interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(20),
            multiplier: 2.0,
            ..Default::default()
        };
        let mut delay = policy.interval;
        let expected = [1, 2, 4, 8, 16, 20, 20];

        for &expected_secs in &expected {
            assert_eq!(delay.as_secs(), expected_secs);
            delay = next_delay(delay, &policy);
        }
    }

    #[test]
    fn unbounded_never_exhausts() {
        let policy = PollPolicy::unbounded(Duration::from_secs(5));
        assert!(!policy.is_exhausted(u32::MAX, Duration::from_secs(u64::MAX / 2)));
    }

    #[test]
    fn attempt_cap_exhausts() {
        let policy = PollPolicy {
            max_attempts: Some(3),
            deadline: None,
            ..Default::default()
        };
        assert!(!policy.is_exhausted(2, Duration::ZERO));
        assert!(policy.is_exhausted(3, Duration::ZERO));
    }

    #[test]
    fn deadline_exhausts() {
        let policy = PollPolicy::default();
        assert!(!policy.is_exhausted(1, Duration::from_secs(60)));
        assert!(policy.is_exhausted(1, DEFAULT_POLL_DEADLINE));
    }

    #[test]
    fn remaining_counts_down_to_zero() {
        let policy = PollPolicy {
            deadline: Some(Duration::from_secs(7)),
            ..Default::default()
        };
        assert_eq!(policy.remaining(Duration::from_secs(5)), Some(Duration::from_secs(2)));
        assert_eq!(policy.remaining(Duration::from_secs(9)), Some(Duration::ZERO));
        assert_eq!(PollPolicy::unbounded(Duration::from_secs(5)).remaining(Duration::ZERO), None);
    }
}
