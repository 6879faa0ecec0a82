//! Shared helpers for image queue tests.

#![allow(dead_code)]

use parking_lot::Mutex;
use reverie_core::{Scene, SceneDraft, SessionId};
use reverie_interface::{SceneObserver, SceneUpdate};

/// Observer that records every update it receives.
#[derive(Default)]
pub struct Recorder {
    updates: Mutex<Vec<(SessionId, SceneUpdate)>>,
}

impl Recorder {
    pub fn updates(&self) -> Vec<SceneUpdate> {
        self.updates.lock().iter().map(|(_, u)| u.clone()).collect()
    }

    pub fn ready_urls(&self) -> Vec<(usize, String)> {
        self.updates
            .lock()
            .iter()
            .filter_map(|(_, u)| match u {
                SceneUpdate::ImageReady { scene_idx, url } => Some((*scene_idx, url.clone())),
                _ => None,
            })
            .collect()
    }
}

impl SceneObserver for Recorder {
    fn apply(&self, session_id: &SessionId, update: &SceneUpdate) {
        self.updates.lock().push((session_id.clone(), update.clone()));
    }
}

/// Scene at `idx` whose image prompt is `prompt`.
pub fn scene(idx: usize, prompt: &str) -> Scene {
    Scene::from_draft(
        idx,
        SceneDraft {
            narration: format!("narration for {prompt}"),
            image_prompt: prompt.to_string(),
            negative_prompt: String::new(),
            duration_s: 5.0,
        },
    )
}
