//! # Reconnect policy for the entity event stream.
//!
//! [`ReconnectPolicy`] controls how a dropped stream is re-established:
//! - the delay before attempt `n` is `n × step` (attempt `0` is immediate);
//! - once the cumulative retry count exceeds [`ReconnectPolicy::max_retries`] the
//!   stream is declared dead.
//!
//! The retry count is **cumulative over the listener's lifetime**: a successful
//! reconnect does not reset it.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use loadvisor::ReconnectPolicy;
//!
//! let policy = ReconnectPolicy::default();
//!
//! assert_eq!(policy.delay(0), Duration::ZERO);
//! assert_eq!(policy.delay(3), Duration::from_secs(3));
//! assert!(!policy.is_exhausted(5));
//! assert!(policy.is_exhausted(6));
//! ```

use std::time::Duration;

/// Linear, bounded reconnect policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Highest retry count still allowed to attempt a reconnect.
    pub max_retries: u32,
    /// Delay added per accumulated retry.
    pub step: Duration,
}

impl Default for ReconnectPolicy {
    /// Returns a policy with:
    /// - `max_retries = 5`;
    /// - `step = 1s`.
    fn default() -> Self {
        Self {
            max_retries: 5,
            step: Duration::from_secs(1),
        }
    }
}

impl ReconnectPolicy {
    /// Delay to wait before the attempt made with `retries` accumulated failures.
    pub fn delay(&self, retries: u32) -> Duration {
        self.step.saturating_mul(retries)
    }

    /// True once `retries` failures exceed the allowed maximum.
    pub fn is_exhausted(&self, retries: u32) -> bool {
        retries > self.max_retries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_retry_is_immediate() {
        assert_eq!(ReconnectPolicy::default().delay(0), Duration::ZERO);
    }

    #[test]
    fn test_linear_growth() {
        let policy = ReconnectPolicy {
            max_retries: 10,
            step: Duration::from_millis(250),
        };
        for n in 0..10 {
            assert_eq!(policy.delay(n), Duration::from_millis(250 * u64::from(n)));
        }
    }

    #[test]
    fn test_exhaustion_boundary() {
        let policy = ReconnectPolicy::default();
        assert!((0..=5).all(|n| !policy.is_exhausted(n)));
        assert!(policy.is_exhausted(6));
    }

    #[test]
    fn test_huge_retry_count_saturates() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.delay(u32::MAX), Duration::from_secs(u64::from(u32::MAX)));
    }
}
