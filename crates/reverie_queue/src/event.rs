//! Queue lifecycle events.

use reverie_core::JobKey;
use std::time::Duration;

/// Something that happened to an image job.
///
/// Published on a broadcast channel; see [`crate::ImageQueue::subscribe`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueEvent {
    /// Job accepted into the pending set
    Enqueued(JobKey),
    /// Submission ignored because the scene already has an outstanding job
    Duplicate(JobKey),
    /// Generation call issued
    Started {
        /// Job
        key: JobKey,
        /// 1-based attempt number
        attempt: u32,
    },
    /// Image produced and applied
    Succeeded {
        /// Job
        key: JobKey,
        /// Asset reference
        url: String,
    },
    /// Attempt failed; the job waits before going back into the pending set
    RetryScheduled {
        /// Job
        key: JobKey,
        /// Retry count the job will carry on its next attempt
        retry_count: u32,
        /// Backoff delay
        delay: Duration,
    },
    /// Retries exhausted; the scene is marked `error`
    Exhausted {
        /// Job
        key: JobKey,
        /// Attempts made
        attempts: u32,
    },
    /// Best-effort persistence of a produced image failed
    PersistFailed(JobKey),
    /// Job dropped because its scene was deleted
    Discarded(JobKey),
}
