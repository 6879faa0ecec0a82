//! Shared harness for orchestrator tests.

#![allow(dead_code)]

use parking_lot::Mutex;
use reverie_core::SessionId;
use reverie_interface::mock::{ScriptedImageDriver, ScriptedStoryDriver};
use reverie_interface::{SceneObserver, SceneUpdate};
use reverie_queue::ImageQueue;
use reverie_story::StoryOrchestrator;
use std::sync::Arc;

/// Observer that records every update it receives.
#[derive(Default)]
pub struct Recorder {
    updates: Mutex<Vec<(SessionId, SceneUpdate)>>,
}

impl Recorder {
    pub fn updates(&self) -> Vec<(SessionId, SceneUpdate)> {
        self.updates.lock().clone()
    }
}

impl SceneObserver for Recorder {
    fn apply(&self, session_id: &SessionId, update: &SceneUpdate) {
        self.updates.lock().push((session_id.clone(), update.clone()));
    }
}

pub struct Harness {
    pub story: Arc<ScriptedStoryDriver>,
    pub images: Arc<ScriptedImageDriver>,
    pub queue: ImageQueue,
    pub orchestrator: StoryOrchestrator,
    pub recorder: Arc<Recorder>,
}

/// Orchestrator over scripted drivers; sessions are named `tale-ch<N>`.
pub fn harness(story: ScriptedStoryDriver, images: ScriptedImageDriver) -> Harness {
    let story = Arc::new(story.with_story_id("tale"));
    let images = Arc::new(images);
    let queue = ImageQueue::builder(images.clone(), story.clone()).spawn();
    let orchestrator = StoryOrchestrator::new(story.clone(), queue.clone());
    let recorder = Arc::new(Recorder::default());
    orchestrator.observers().register(recorder.clone());
    Harness {
        story,
        images,
        queue,
        orchestrator,
        recorder,
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
        self.orchestrator
            .scenes()
            .into_iter()
            .map(|s| s.image_prompt)
            .collect()
    }
}
