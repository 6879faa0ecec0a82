//! Image job types.

use crate::{Scene, SessionId};
use serde::{Deserialize, Serialize};

/// Identity of an image job: one scene of one chapter.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, derive_more::Display,
)]
#[display("{}#{}", session_id, scene_idx)]
pub struct JobKey {
    /// Chapter session the scene belongs to
    pub session_id: SessionId,
    /// Scene index within the chapter
    pub scene_idx: usize,
}

impl JobKey {
    /// Key for a scene of a session.
    pub fn new(session_id: SessionId, scene_idx: usize) -> Self {
        Self {
            session_id,
            scene_idx,
        }
    }
}

/// A queued request to generate the image for one scene.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageJob {
    /// Chapter session the scene belongs to
    pub session_id: SessionId,
    /// Scene index within the chapter
    pub scene_idx: usize,
    /// Prompt sent to the image service
    pub image_prompt: String,
    /// Negative prompt sent to the image service
    pub negative_prompt: String,
    /// Failed attempts so far
    pub retry_count: u32,
}

impl ImageJob {
    /// Fresh job for a scene.
    pub fn for_scene(session_id: SessionId, scene: &Scene) -> Self {
        Self {
            session_id,
            scene_idx: scene.idx,
            image_prompt: scene.image_prompt.clone(),
            negative_prompt: scene.negative_prompt.clone(),
            retry_count: 0,
        }
    }

    /// Dedup key of this job.
    pub fn key(&self) -> JobKey {
        JobKey::new(self.session_id.clone(), self.scene_idx)
    }

    /// The same job after one more failed attempt.
    pub fn retried(mut self) -> Self {
        self.retry_count += 1;
        self
    }
}
