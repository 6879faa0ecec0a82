//! Playback view state.

use reverie_core::{PlaybackScene, SessionId};

/// The playback view's working copy of a chapter plus transport state.
///
/// This is not the source of truth: it is only changed through index-keyed
/// updates from the image queue and the orchestrator, and by the controller's
/// own transport operations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaybackState {
    /// Whether the view is entered
    pub active: bool,
    /// Chapter the working copy belongs to
    pub session_id: Option<SessionId>,
    /// Displayed scene
    pub current_index: usize,
    /// Working copy of the chapter's scenes
    pub scenes: Vec<PlaybackScene>,
    /// Whether autoplay is running
    pub is_playing: bool,
    /// The story service has no further chapter for now
    pub chapter_complete: bool,
    /// Autoplay stopped on the last scene
    pub ended: bool,
    /// A scene request is outstanding on behalf of the view
    pub awaiting_content: bool,
    /// Last scene request failure
    pub last_error: Option<String>,
    /// Bumped whenever the displayed scene or the view changes
    pub epoch: u64,
    /// Autoplay ran out of scenes and waits for the next one to arrive
    pub(crate) holding: bool,
}

impl PlaybackState {
    /// Displayed scene.
    pub fn current_scene(&self) -> Option<&PlaybackScene> {
        self.scenes.get(self.current_index)
    }

    /// Whether the displayed scene is the last one.
    pub fn is_last(&self) -> bool {
        self.current_index + 1 >= self.scenes.len()
    }
}
