//! Scene and chapter orchestration for Reverie.
//!
//! [`StoryOrchestrator`] owns the canonical scene list of the active chapter.
//! It asks the story service for scenes one at a time, feeds their images to
//! the [`reverie_queue::ImageQueue`], and bridges chapter boundaries by
//! starting the next chapter as soon as the service ends the current one.
//!
//! # Example
//!
//! ```no_run
//! use reverie_core::StoryHints;
//! use reverie_interface::mock::{ScriptedImageDriver, ScriptedStoryDriver};
//! use reverie_queue::ImageQueue;
//! use reverie_story::StoryOrchestrator;
//! use std::sync::Arc;
//!
//! # async fn run() -> reverie_error::ReverieResult<()> {
//! let story = Arc::new(ScriptedStoryDriver::new(4));
//! let queue = ImageQueue::builder(Arc::new(ScriptedImageDriver::new()), story.clone()).spawn();
//! let orchestrator = StoryOrchestrator::new(story, queue);
//!
//! let session_id = orchestrator.start_story("a lighthouse keeper", &StoryHints::default()).await?;
//! orchestrator.request_next_scene(&session_id).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod ledger;
mod orchestrator;
mod phase;

pub use ledger::ChapterView;
pub use orchestrator::StoryOrchestrator;
pub use phase::{ChapterPhase, SceneAdvance};
