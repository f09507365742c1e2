//! Delivery settings for the [`Dispatcher`][crate::Dispatcher].

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Sharding, timeout, and retry settings.
///
/// ```json
/// { "shards": 4, "queue_capacity": 10000, "max_attempts": 5, "initial_backoff_ms": 50 }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    /// Delivery threads.  A vehicle always maps to the same shard.
    pub shards:             usize,
    /// Pending writes per shard.  A write that finds its queue full is
    /// dropped.
    pub queue_capacity:     usize,
    /// Attempts per write, first try included.
    pub max_attempts:       u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms:     u64,
    /// Per-attempt timeout handed to the sink.
    pub write_timeout_ms:   u64,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            shards:             4,
            queue_capacity:     10_000,
            max_attempts:       5,
            initial_backoff_ms: 50,
            max_backoff_ms:     2_000,
            write_timeout_ms:   5_000,
        }
    }
}

impl SinkConfig {
    /// Delay before retry number `attempt` (1-based): doubles from
    /// `initial_backoff_ms` and is capped at `max_backoff_ms`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt.saturating_sub(1)).unwrap_or(u64::MAX);
        let ms = self.initial_backoff_ms.saturating_mul(factor).min(self.max_backoff_ms);
        Duration::from_millis(ms)
    }

    #[inline]
    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }
}
