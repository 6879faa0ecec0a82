//! Scene and chapter orchestration error types.

/// Specific error conditions for story orchestration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum StoryErrorKind {
    /// No chapter session has been started
    #[display("No active chapter session")]
    NoActiveSession,
    /// Another scene request is still outstanding
    #[display("A scene request is already in progress for session {}", _0)]
    GenerationInProgress(String),
    /// The session changed while a request was outstanding
    #[display("Session {} was superseded before its result arrived", _0)]
    StaleSession(String),
    /// Scene index does not exist in the active chapter
    #[display("Scene {} is out of range (chapter has {} scenes)", idx, len)]
    SceneOutOfRange {
        /// Requested index
        idx: usize,
        /// Number of scenes in the chapter
        len: usize,
    },
    /// Scene already has an image or is still being generated
    #[display("Scene {} does not need a new image", _0)]
    ImageNotRetryable(usize),
    /// A manual chapter start was requested while the chapter is still running
    #[display("Chapter {} is not complete", _0)]
    ChapterNotComplete(u32),
}

/// Error type for story orchestration.
///
/// # Examples
///
/// ```
/// use reverie_error::{StoryError, StoryErrorKind};
///
/// let err = StoryError::new(StoryErrorKind::NoActiveSession);
/// assert!(format!("{}", err).contains("No active chapter"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Story Error: {} at line {} in {}", kind, line, file)]
pub struct StoryError {
    /// The specific error condition
    pub kind: StoryErrorKind,
    /// Line number where the error occurred
    pub line: u32,
    /// Source file where the error occurred
    pub file: &'static str,
}

impl StoryError {
    /// Create a new StoryError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: StoryErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
