//! Trait definitions for the external generation collaborators.

use async_trait::async_trait;
use reverie_core::{
    ChapterContinuation, ChapterStart, GenerationParams, ImageOutcome, NextScene, SessionId,
    StoryHints,
};
use reverie_error::ReverieResult;

/// The narrative service that writes chapters scene by scene.
///
/// Every call is a single request/response. Implementations must not retry
/// internally: scene generation failures are surfaced to the user as-is.
#[async_trait]
pub trait StoryDriver: Send + Sync {
    /// Start a story and open its first chapter.
    async fn start_chapter(&self, premise: &str, hints: &StoryHints)
        -> ReverieResult<ChapterStart>;

    /// Produce the next scene of a chapter, or report that it is complete.
    async fn next_scene(&self, session_id: &SessionId) -> ReverieResult<NextScene>;

    /// Open the chapter following `previous`.
    async fn continue_chapter(
        &self,
        previous: &SessionId,
        hint: Option<&str>,
    ) -> ReverieResult<ChapterContinuation>;

    /// Store the generated asset of a scene. Best-effort from the caller's view.
    async fn persist_scene_image(
        &self,
        session_id: &SessionId,
        scene_idx: usize,
        asset_url: &str,
    ) -> ReverieResult<()>;

    /// Delete a scene on the service side.
    async fn delete_scene(&self, session_id: &SessionId, scene_idx: usize) -> ReverieResult<()>;
}

/// The image service that renders scene prompts.
#[async_trait]
pub trait ImageDriver: Send + Sync {
    /// Render one prompt.
    ///
    /// `Ok(ImageOutcome::NoResult)` and `Err(_)` are both retryable from the
    /// queue's point of view.
    async fn generate_image(
        &self,
        prompt: &str,
        negative_prompt: &str,
        params: &GenerationParams,
    ) -> ReverieResult<ImageOutcome>;

    /// Provider name for logging.
    fn provider_name(&self) -> &'static str;
}
