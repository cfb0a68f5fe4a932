use crate::types::constants::{BACKOFF_INTERVALS, DEFAULT_RETRY_DELAY};
use rand::Rng;
use std::time::Duration;

/// How long to wait before re-running the establish sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryPolicy {
    /// Same delay after every failure
    Fixed(Duration),
    /// Walk an interval table, staying on the last entry once exhausted
    Backoff { intervals: Vec<u64>, jitter: bool },
}

impl RetryPolicy {
    pub fn fixed_millis(millis: u64) -> Self {
        Self::Fixed(Duration::from_millis(millis))
    }

    pub fn backoff() -> Self {
        Self::Backoff {
            intervals: BACKOFF_INTERVALS.to_vec(),
            jitter: true,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed_millis(DEFAULT_RETRY_DELAY)
    }
}

/// Counts consecutive failed attempts and turns them into delays.
#[derive(Debug)]
pub struct RetryTimer {
    attempts: u32,
    policy: RetryPolicy,
}

impl RetryTimer {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            attempts: 0,
            policy,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Get the next delay duration and count the attempt
    pub fn next_delay(&mut self) -> Duration {
        let delay = match &self.policy {
            RetryPolicy::Fixed(delay) => *delay,
            RetryPolicy::Backoff { intervals, jitter } => {
                let millis = intervals
                    .get(self.attempts as usize)
                    .or_else(|| intervals.last())
                    .copied()
                    .unwrap_or(DEFAULT_RETRY_DELAY);
                let base = Duration::from_millis(millis);
                if *jitter { with_jitter(base) } else { base }
            }
        };

        self.attempts = self.attempts.saturating_add(1);
        delay
    }

    /// Reset after a successful subscribe
    pub fn reset(&mut self) {
        self.attempts = 0;
    }
}

impl Default for RetryTimer {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

/// Spreads a delay over [75%, 100%] of `base`.
fn with_jitter(base: Duration) -> Duration {
    let quarter = base.as_millis() as u64 / 4;
    if quarter == 0 {
        return base;
    }
    let mut rng = rand::rng();
    base - Duration::from_millis(rng.random_range(0..=quarter))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_policy_never_escalates() {
        let mut timer = RetryTimer::default();
        for _ in 0..10 {
            assert_eq!(timer.next_delay(), Duration::from_millis(500));
        }
        assert_eq!(timer.attempts(), 10);
        timer.reset();
        assert_eq!(timer.attempts(), 0);
    }

    #[test]
    fn test_backoff_policy_caps_at_last_interval() {
        let mut timer = RetryTimer::new(RetryPolicy::Backoff {
            intervals: vec![10, 20, 40],
            jitter: false,
        });
        let delays: Vec<u64> = (0..5)
            .map(|_| timer.next_delay().as_millis() as u64)
            .collect();
        assert_eq!(delays, vec![10, 20, 40, 40, 40]);
    }

    #[test]
    fn test_jitter_stays_in_range() {
        let mut timer = RetryTimer::new(RetryPolicy::Backoff {
            intervals: vec![1000],
            jitter: true,
        });
        for _ in 0..50 {
            let delay = timer.next_delay();
            assert!(delay >= Duration::from_millis(750));
            assert!(delay <= Duration::from_millis(1000));
        }
    }
}
