//! Playback configuration.

use derive_getters::Getters;
use serde::{Deserialize, Serialize};

/// Autoplay behavior.
///
/// # Example
///
/// ```toml
/// [playback]
/// pause_on_end = true
/// prefetch = true
/// continue_story = false
/// default_duration_s = 5.0
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters)]
pub struct PlaybackConfig {
    /// Fixed dwell time for every scene, ignoring scene durations
    #[serde(default)]
    duration_override_ms: Option<u64>,

    /// Stop and show end-of-content when the last scene has played
    #[serde(default)]
    pause_on_end: bool,

    /// Queue images for the displayed and following scene
    #[serde(default = "default_prefetch")]
    prefetch: bool,

    /// Ask for the next scene when the last one has played
    #[serde(default)]
    continue_story: bool,

    /// Dwell time for scenes without a usable duration
    #[serde(default = "default_duration_s")]
    default_duration_s: f64,
}

fn default_prefetch() -> bool {
    true
}

fn default_duration_s() -> f64 {
    5.0
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            duration_override_ms: None,
            pause_on_end: false,
            prefetch: default_prefetch(),
            continue_story: false,
            default_duration_s: default_duration_s(),
        }
    }
}

impl PlaybackConfig {
    /// Builder method to use one dwell time for every scene.
    pub fn with_duration_override_ms(mut self, ms: u64) -> Self {
        self.duration_override_ms = Some(ms);
        self
    }

    /// Builder method to stop at the end of the content.
    pub fn with_pause_on_end(mut self, pause_on_end: bool) -> Self {
        self.pause_on_end = pause_on_end;
        self
    }

    /// Builder method to enable or disable prefetching.
    pub fn with_prefetch(mut self, prefetch: bool) -> Self {
        self.prefetch = prefetch;
        self
    }

    /// Builder method to keep the story going past the last scene.
    pub fn with_continue_story(mut self, continue_story: bool) -> Self {
        self.continue_story = continue_story;
        self
    }

    /// Builder method to set the fallback dwell time.
    pub fn with_default_duration_s(mut self, seconds: f64) -> Self {
        self.default_duration_s = seconds;
        self
    }
}
