//! # Action pacing: phase alignment and jittered re-arm.
//!
//! [`Pacing`] decides when an entity fires its actions.
//!
//! - [`Pacing::first_delay`] places the first action at a random phase inside the
//!   current `rate` interval. Intervals are anchored at the UNIX epoch, so entities
//!   started at different moments still spread uniformly over the interval grid.
//! - [`Pacing::next_delay`] re-arms after each action with
//!   `rate + U(-variance/2, +variance/2)` so entities sharing a rate drift apart.
//!
//! ```text
//! epoch ─┬──────────┬──────────┬──────────┬──► wall clock
//!        │  rate    │  rate    │    now   │
//!                   └──── interval_start ─┘
//!                         start = interval_start + U[0, rate)
//!                         start < now  ⇒  start += rate
//! ```
//!
//! # Example
//! ```rust
//! use std::time::{Duration, SystemTime};
//! use rand::{SeedableRng, rngs::StdRng};
//! use loadvisor::Pacing;
//!
//! let pacing = Pacing::new(Duration::from_secs(10), Duration::from_secs(2));
//! let mut rng = StdRng::seed_from_u64(3);
//!
//! assert!(pacing.first_delay(SystemTime::now(), &mut rng) <= Duration::from_secs(10));
//!
//! let gap = pacing.next_delay(&mut rng);
//! assert!(gap >= Duration::from_secs(9) && gap <= Duration::from_secs(11));
//! ```

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rand::Rng;

/// Timing policy for one entity's actions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pacing {
    /// Nominal interval between consecutive actions.
    pub rate: Duration,
    /// Width of the symmetric jitter window applied on re-arm (`0` = no jitter).
    pub max_variance: Duration,
}

impl Pacing {
    /// Creates a pacing policy.
    pub fn new(rate: Duration, max_variance: Duration) -> Self {
        Self { rate, max_variance }
    }

    /// Delay until the first action, measured from `now`.
    ///
    /// Always in `[0, rate]`. A zero `rate` fires immediately.
    pub fn first_delay<R: Rng + ?Sized>(&self, now: SystemTime, rng: &mut R) -> Duration {
        let rate_ns = self.rate.as_nanos();
        if rate_ns == 0 {
            return Duration::ZERO;
        }

        let now_ns = now
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let interval_start = now_ns - now_ns % rate_ns;
        let offset = ((rng.random::<f64>() * rate_ns as f64) as u128).min(rate_ns - 1);

        let mut start = interval_start + offset;
        if start < now_ns {
            start += rate_ns;
        }
        Duration::from_nanos(u64::try_from(start - now_ns).unwrap_or(u64::MAX))
    }

    /// Delay between the end of one action and the next one.
    ///
    /// Lies in `[rate - variance/2, rate + variance/2]`, saturating at zero.
    pub fn next_delay<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let variance_ns = u64::try_from(self.max_variance.as_nanos()).unwrap_or(u64::MAX);
        if variance_ns == 0 {
            return self.rate;
        }

        let offset = ((rng.random::<f64>() * variance_ns as f64) as u64).min(variance_ns);
        (self.rate + Duration::from_nanos(offset)).saturating_sub(Duration::from_nanos(variance_ns / 2))
    }
}
