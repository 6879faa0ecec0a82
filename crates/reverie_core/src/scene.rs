//! Scene types.

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// Display duration used when a scene arrives without a usable one.
pub(crate) const DEFAULT_SCENE_DURATION_S: f64 = 5.0;

fn default_duration() -> f64 {
    DEFAULT_SCENE_DURATION_S
}

/// A scene as produced by the story service, before it has a place in a chapter.
///
/// The orchestrator assigns the index when it appends the draft, so the
/// service never decides where a scene lands.
///
/// # Examples
///
/// ```
/// use reverie_core::SceneDraft;
///
/// let draft = SceneDraft::builder()
///     .narration("The lighthouse keeper wakes.")
///     .image_prompt("lighthouse at dawn, oil painting")
///     .build()
///     .unwrap();
///
/// assert_eq!(draft.duration_s, 5.0);
/// assert!(draft.negative_prompt.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
#[builder(setter(into))]
pub struct SceneDraft {
    /// Narration text shown with the scene
    pub narration: String,
    /// Prompt sent to the image service
    pub image_prompt: String,
    /// Negative prompt sent to the image service
    #[builder(default)]
    #[serde(default)]
    pub negative_prompt: String,
    /// How long the scene stays on screen during autoplay
    #[builder(default = "5.0")]
    #[serde(default = "default_duration")]
    pub duration_s: f64,
}

impl SceneDraft {
    /// Creates a new scene draft builder.
    pub fn builder() -> SceneDraftBuilder {
        SceneDraftBuilder::default()
    }
}

/// One beat of a chapter: narration plus the image that illustrates it.
///
/// # Examples
///
/// ```
/// use reverie_core::{Scene, SceneDraft};
///
/// let draft = SceneDraft::builder()
///     .narration("Rain on the harbour.")
///     .image_prompt("harbour in the rain")
///     .build()
///     .unwrap();
///
/// let scene = Scene::from_draft(3, draft);
/// assert_eq!(scene.idx, 3);
/// assert!(scene.needs_image());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    /// Position within the chapter, contiguous from 0
    pub idx: usize,
    /// Narration text shown with the scene
    pub narration: String,
    /// Prompt sent to the image service
    pub image_prompt: String,
    /// Negative prompt sent to the image service
    pub negative_prompt: String,
    /// How long the scene stays on screen during autoplay
    pub duration_s: f64,
    /// Generated asset, once the image service has produced one
    pub image_url: Option<String>,
}

impl Scene {
    /// Place a draft at the given index.
    pub fn from_draft(idx: usize, draft: SceneDraft) -> Self {
        Self {
            idx,
            narration: draft.narration,
            image_prompt: draft.image_prompt,
            negative_prompt: draft.negative_prompt,
            duration_s: draft.duration_s,
            image_url: None,
        }
    }

    /// Whether the scene still lacks an image.
    pub fn needs_image(&self) -> bool {
        self.image_url.is_none()
    }
}

/// Image state of a scene as shown by the playback view.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SceneStatus {
    /// No image yet and nothing queued
    Pending,
    /// Image job queued, in flight or waiting out a backoff
    Generating,
    /// Image available
    Ready,
    /// Retries exhausted
    Error,
}

impl SceneStatus {
    /// Initial status for a scene entering the playback view.
    pub fn for_scene(scene: &Scene) -> Self {
        if scene.needs_image() {
            SceneStatus::Pending
        } else {
            SceneStatus::Ready
        }
    }
}

/// A scene copy annotated with its image status, held by the playback view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackScene {
    /// Denormalized copy of the canonical scene
    pub scene: Scene,
    /// Image status
    pub status: SceneStatus,
}

impl From<Scene> for PlaybackScene {
    fn from(scene: Scene) -> Self {
        let status = SceneStatus::for_scene(&scene);
        Self { scene, status }
    }
}
