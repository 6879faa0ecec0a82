//! Shared harness for playback tests.

#![allow(dead_code)]

use reverie_core::SessionId;
use reverie_interface::mock::{ScriptedImageDriver, ScriptedStoryDriver};
use reverie_playback::{PlaybackConfig, PlaybackController};
use reverie_queue::ImageQueue;
use reverie_story::StoryOrchestrator;
use std::sync::Arc;
use std::time::Duration;

pub struct Harness {
    pub story: Arc<ScriptedStoryDriver>,
    pub images: Arc<ScriptedImageDriver>,
    pub queue: ImageQueue,
    pub orchestrator: StoryOrchestrator,
    pub playback: PlaybackController,
}

/// Playback over scripted drivers; sessions are named `tale-ch<N>`.
pub fn harness(
    story: ScriptedStoryDriver,
    images: ScriptedImageDriver,
    config: PlaybackConfig,
) -> Harness {
    let story = Arc::new(story.with_story_id("tale"));
    let images = Arc::new(images);
    let queue = ImageQueue::builder(images.clone(), story.clone()).spawn();
    let orchestrator = StoryOrchestrator::new(story.clone(), queue.clone());
    let playback = PlaybackController::new(orchestrator.clone(), config);
    Harness {
        story,
        images,
        queue,
        orchestrator,
        playback,
    }
}

impl Harness {
    /// Start a story and request `n` scenes of its first chapter.
    pub async fn story_with_scenes(&self, n: usize) -> SessionId {
        let session_id = self
            .orchestrator
            .start_story("a lighthouse keeper", &Default::default())
            .await
            .unwrap();
        for _ in 0..n {
            self.orchestrator
                .request_next_scene(&session_id)
                .await
                .unwrap();
        }
        session_id
    }

    pub fn prompts(&self) -> Vec<String> {
        self.playback
            .state()
            .scenes
            .into_iter()
            .map(|s| s.scene.image_prompt)
            .collect()
    }
}

pub async fn advance_ms(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}
