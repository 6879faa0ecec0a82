//! Retry policy configuration for the image queue.

use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retry and backoff settings.
///
/// A failed attempt with `retry_count < max_retries` is retried after
/// `min(base_delay_ms * 2^retry_count, max_delay_ms)`.
///
/// # Example
///
/// ```toml
/// [queue]
/// max_retries = 3
/// base_delay_ms = 1000
/// max_delay_ms = 8000
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct QueueConfig {
    /// Retries after the first attempt before a scene is marked `error`
    #[serde(default = "default_max_retries")]
    max_retries: u32,

    /// Delay before the first retry
    #[serde(default = "default_base_delay_ms")]
    base_delay_ms: u64,

    /// Upper bound for any single delay
    #[serde(default = "default_max_delay_ms")]
    max_delay_ms: u64,
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    8000
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl QueueConfig {
    /// Create a retry policy.
    pub fn new(max_retries: u32, base_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            max_retries,
            base_delay_ms,
            max_delay_ms,
        }
    }

    /// Delay to wait before re-enqueuing a job that has failed `retry_count` times before.
    pub fn backoff_delay(&self, retry_count: u32) -> Duration {
        let factor = 1u64.checked_shl(retry_count).unwrap_or(u64::MAX);
        Duration::from_millis(
            self.base_delay_ms
                .saturating_mul(factor)
                .min(self.max_delay_ms),
        )
    }

    /// Whether a job that has already been retried `retry_count` times gets another attempt.
    pub fn should_retry(&self, retry_count: u32) -> bool {
        retry_count < self.max_retries
    }
}
