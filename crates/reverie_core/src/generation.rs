//! Request and response types exchanged with the generation services.

use crate::{SceneDraft, SessionId, StoryBible};
use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// Parameters forwarded to the image service with every prompt.
///
/// # Examples
///
/// ```
/// use reverie_core::GenerationParams;
///
/// let params = GenerationParams::builder().width(1024u32).seed(7u64).build().unwrap();
/// assert_eq!(params.width, 1024);
/// assert_eq!(params.height, 512);
/// assert_eq!(params.seed, Some(7));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
#[builder(setter(into))]
pub struct GenerationParams {
    /// Output width in pixels
    #[builder(default = "768")]
    #[serde(default = "default_width")]
    pub width: u32,
    /// Output height in pixels
    #[builder(default = "512")]
    #[serde(default = "default_height")]
    pub height: u32,
    /// Sampler steps
    #[builder(default = "30")]
    #[serde(default = "default_steps")]
    pub steps: u32,
    /// Classifier-free guidance scale
    #[builder(default = "7.0")]
    #[serde(default = "default_guidance_scale")]
    pub guidance_scale: f32,
    /// Fixed seed, random when absent
    #[builder(default, setter(strip_option))]
    #[serde(default)]
    pub seed: Option<u64>,
    /// Image model override
    #[builder(default, setter(strip_option))]
    #[serde(default)]
    pub model: Option<String>,
}

fn default_width() -> u32 {
    768
}

fn default_height() -> u32 {
    512
}

fn default_steps() -> u32 {
    30
}

fn default_guidance_scale() -> f32 {
    7.0
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            steps: default_steps(),
            guidance_scale: default_guidance_scale(),
            seed: None,
            model: None,
        }
    }
}

impl GenerationParams {
    /// Creates a new parameter builder.
    pub fn builder() -> GenerationParamsBuilder {
        GenerationParamsBuilder::default()
    }
}

/// Steering hints supplied when a story starts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoryHints {
    /// Genre, e.g. "gothic mystery"
    #[serde(default)]
    pub genre: Option<String>,
    /// Narrative tone
    #[serde(default)]
    pub tone: Option<String>,
    /// Art direction for the images
    #[serde(default)]
    pub art_style: Option<String>,
    /// Free-form notes
    #[serde(default)]
    pub notes: Vec<String>,
}

/// Result of starting a story.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapterStart {
    /// First chapter's session
    pub session_id: SessionId,
    /// Story title
    pub title: String,
    /// Consistency rules
    pub bible: StoryBible,
}

/// Result of continuing a story into its next chapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapterContinuation {
    /// New chapter's session
    pub session_id: SessionId,
    /// 1-based number of the new chapter
    pub chapter_number: u32,
    /// Chapter title, if the service names chapters
    #[serde(default)]
    pub title: Option<String>,
    /// Consistency rules carried into the new chapter
    pub bible: StoryBible,
}

/// What the story service produced when asked for the next scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum NextScene {
    /// Another scene for the current chapter
    NewScene(SceneDraft),
    /// The chapter has no more scenes
    ChapterComplete,
}

/// What the image service produced for a prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "url", rename_all = "snake_case")]
pub enum ImageOutcome {
    /// A generated asset
    Asset(String),
    /// The service succeeded but returned no assets
    NoResult,
}
