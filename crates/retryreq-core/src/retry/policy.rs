use crate::retry::classify::Markers;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// High-level classification of an attempt outcome for retry purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The executor could not complete the call (network, serialization, ...).
    Transport,
    /// Any 5xx; the service documents these as transient.
    Http5xx(u16),
    /// 400 carrying the throughput-exceeded marker.
    ThroughputExceeded,
    /// 400 carrying the unrecognized-client marker.
    UnrecognizedClient,
    /// 400 carrying the generic throttling marker.
    Throttling,
    /// 400 with no known marker: the request itself is wrong.
    BadRequest,
    /// Success, or any status not listed above. Never retried.
    Other,
}

impl ErrorKind {
    /// True for the 400 kinds that signal service backpressure.
    pub fn is_throttle(self) -> bool {
        matches!(
            self,
            ErrorKind::ThroughputExceeded | ErrorKind::UnrecognizedClient | ErrorKind::Throttling
        )
    }
}

/// Which attempt is being classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    /// The initial attempt.
    First,
    /// Any attempt after a backoff sleep.
    Retry,
}

/// Which 400 markers still count as retryable after the first attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RetryPassMarkers {
    /// Only throughput-exceeded keeps the loop going.
    #[default]
    ThroughputOnly,
    /// All three markers keep the loop going, same as the first attempt.
    All,
}

/// Jittered exponential backoff with a bounded number of attempts.
///
/// The delay before retry `i` (1-based) is drawn uniformly from
/// `[0, base_delay * growth_factor^i)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first). Values below 1 are
    /// treated as 1; see [`RetryPolicy::attempt_ceiling`].
    pub max_attempts: u32,
    /// Multiplied by `growth_factor^i` to form the delay upper bound.
    pub base_delay: Duration,
    pub growth_factor: u32,
    pub markers: Markers,
    pub retry_pass_markers: RetryPassMarkers,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 7,
            base_delay: Duration::from_millis(100),
            growth_factor: 4,
            markers: Markers::default(),
            retry_pass_markers: RetryPassMarkers::default(),
        }
    }
}

impl RetryPolicy {
    /// Whether an outcome of this kind should be retried on the given pass.
    pub fn should_retry(&self, kind: ErrorKind, pass: Pass) -> bool {
        match kind {
            ErrorKind::Transport | ErrorKind::Http5xx(_) | ErrorKind::ThroughputExceeded => true,
            ErrorKind::UnrecognizedClient | ErrorKind::Throttling => match pass {
                Pass::First => true,
                Pass::Retry => self.retry_pass_markers == RetryPassMarkers::All,
            },
            ErrorKind::BadRequest | ErrorKind::Other => false,
        }
    }

    /// Attempts one `execute` may make, including the first. The first attempt
    /// always runs, so a `max_attempts` of 0 behaves like 1.
    pub fn attempt_ceiling(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Exclusive upper bound of the delay before retry `retry` (1-based).
    pub fn delay_bound(&self, retry: u32) -> Duration {
        let base_ms = u64::try_from(self.base_delay.as_millis()).unwrap_or(u64::MAX);
        let factor = u64::from(self.growth_factor).saturating_pow(retry);
        Duration::from_millis(base_ms.saturating_mul(factor))
    }
}
