//! Core data types for the Reverie story orchestration library.
//!
//! This crate provides the data model shared by the image queue, the
//! scene/chapter orchestrator and the playback controller.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod generation;
mod job;
mod scene;
mod session;

pub use generation::{
    ChapterContinuation, ChapterStart, GenerationParams, GenerationParamsBuilder, ImageOutcome,
    NextScene, StoryHints,
};
pub use job::{ImageJob, JobKey};
pub use scene::{PlaybackScene, Scene, SceneDraft, SceneDraftBuilder, SceneStatus};
pub use session::{ChapterSession, SessionId, StoryBible};
