//! Per-call jitter source for backoff delays.

use crate::retry::policy::RetryPolicy;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Draws backoff delays. One instance per `execute` call; never shared.
#[derive(Debug)]
pub struct Jitter {
    rng: StdRng,
}

impl Jitter {
    /// Seed from the wall clock's nanoseconds so concurrent callers diverge.
    pub fn from_clock() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        Self::seeded(nanos)
    }

    /// Deterministic sequence, for tests and reproducible runs.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Delay before retry `retry` (1-based), uniform in `[0, policy.delay_bound(retry))`
    /// at millisecond granularity.
    pub fn delay(&mut self, policy: &RetryPolicy, retry: u32) -> Duration {
        let bound_ms = u64::try_from(policy.delay_bound(retry).as_millis()).unwrap_or(u64::MAX);
        if bound_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(self.rng.gen_range(0..bound_ms))
    }
}
