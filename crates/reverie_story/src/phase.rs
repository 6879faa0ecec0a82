//! Chapter lifecycle states and scene request outcomes.

use reverie_core::SessionId;
use serde::{Deserialize, Serialize};

/// Where the active chapter is in its lifecycle.
///
/// `AwaitingFirstScene -> GeneratingScenes -> ChapterComplete`, after which an
/// automatic (or manual) continuation installs the next chapter directly in
/// `GeneratingScenes`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ChapterPhase {
    /// Chapter created, no scene yet
    #[default]
    AwaitingFirstScene,
    /// Scenes are being produced
    GeneratingScenes,
    /// The story service ended the chapter and no successor is installed
    ChapterComplete,
}

/// What a scene request did to the active chapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneAdvance {
    /// A scene was appended and is now displayed
    NewScene {
        /// Index of the appended scene
        scene_idx: usize,
    },
    /// The chapter ended and its successor was installed with one scene
    ChapterContinued {
        /// Session of the new chapter
        session_id: SessionId,
        /// Its chapter number
        chapter_number: u32,
    },
    /// The chapter ended and no successor could be started
    ChapterComplete,
}
