//! Playback controller for Reverie.
//!
//! [`PlaybackController`] is the timed, user-facing view of the active
//! chapter. It holds its own copy of the scene list, advances on a per-scene
//! timer, prefetches upcoming images through the queue and follows the story
//! across chapter boundaries.
//!
//! The copy is kept consistent with the orchestrator's canonical list only
//! through index-keyed [`reverie_interface::SceneUpdate`]s; each update
//! re-checks whether the view is still entered when it is applied.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod controller;
mod state;

pub use config::PlaybackConfig;
pub use controller::PlaybackController;
pub use state::PlaybackState;
