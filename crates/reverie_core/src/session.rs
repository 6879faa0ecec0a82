//! Chapter session types.

use crate::{Scene, SceneDraft};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque chapter session identifier issued by the story service.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::From,
)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Wrap an identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Narrative-consistency rules shared by every scene of a chapter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoryBible {
    /// Visual style applied to all image prompts
    #[serde(default)]
    pub style: Option<String>,
    /// Recurring characters and how they look
    #[serde(default)]
    pub characters: Vec<String>,
    /// Continuity rules the story service must respect
    #[serde(default)]
    pub rules: Vec<String>,
}

/// A bounded run of scenes sharing one bible.
///
/// Scene indices are kept contiguous from 0: appending assigns the next
/// index, removing shifts every later scene down by one.
///
/// # Examples
///
/// ```
/// use reverie_core::{ChapterSession, SceneDraft, StoryBible};
///
/// let mut session = ChapterSession::new("s-1", "The Lighthouse", 1, StoryBible::default());
/// for text in ["one", "two", "three"] {
///     let draft = SceneDraft::builder().narration(text).image_prompt(text).build().unwrap();
///     session.push_draft(draft);
/// }
///
/// session.remove_scene(1);
/// let indices: Vec<usize> = session.scenes().iter().map(|s| s.idx).collect();
/// assert_eq!(indices, vec![0, 1]);
/// assert_eq!(session.scenes()[1].narration, "three");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_getters::Getters)]
pub struct ChapterSession {
    /// Session identifier
    id: SessionId,
    /// Chapter title
    title: String,
    /// 1-based chapter number within the story
    chapter_number: u32,
    /// Consistency rules
    bible: StoryBible,
    /// When the session was created
    created_at: DateTime<Utc>,
    /// Ordered scenes
    #[getter(skip)]
    scenes: Vec<Scene>,
}

impl ChapterSession {
    /// Create an empty chapter session.
    pub fn new(
        id: impl Into<SessionId>,
        title: impl Into<String>,
        chapter_number: u32,
        bible: StoryBible,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            chapter_number,
            bible,
            created_at: Utc::now(),
            scenes: Vec::new(),
        }
    }

    /// Scenes in index order.
    pub fn scenes(&self) -> &[Scene] {
        &self.scenes
    }

    /// Scene at the given index.
    pub fn scene(&self, idx: usize) -> Option<&Scene> {
        self.scenes.get(idx)
    }

    /// Number of scenes.
    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    /// Whether the chapter has no scenes yet.
    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    /// Append a draft at the next index and return the placed scene.
    pub fn push_draft(&mut self, draft: SceneDraft) -> &Scene {
        let idx = self.scenes.len();
        self.scenes.push(Scene::from_draft(idx, draft));
        &self.scenes[idx]
    }

    /// Remove a scene and re-index everything after it.
    pub fn remove_scene(&mut self, idx: usize) -> Option<Scene> {
        if idx >= self.scenes.len() {
            return None;
        }
        let removed = self.scenes.remove(idx);
        for scene in &mut self.scenes[idx..] {
            scene.idx -= 1;
        }
        Some(removed)
    }

    /// Record the generated asset for a scene. Returns `false` if the index is gone.
    pub fn set_image_url(&mut self, idx: usize, url: impl Into<String>) -> bool {
        match self.scenes.get_mut(idx) {
            Some(scene) => {
                scene.image_url = Some(url.into());
                true
            }
            None => false,
        }
    }

    /// Whether `idx` values are exactly `0..len`.
    pub fn is_contiguous(&self) -> bool {
        self.scenes.iter().enumerate().all(|(i, s)| s.idx == i)
    }
}
