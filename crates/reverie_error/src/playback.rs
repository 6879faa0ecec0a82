//! Playback controller error types.

/// Specific error conditions for playback.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum PlaybackErrorKind {
    /// Playback was entered without a chapter to show
    #[display("No chapter session to play")]
    NothingToPlay,
    /// Playback view is not active
    #[display("Playback is not active")]
    Inactive,
    /// Seek target is outside the working copy
    #[display("Cannot seek to scene {} (view has {} scenes)", idx, len)]
    SeekOutOfRange {
        /// Requested index
        idx: usize,
        /// Number of scenes in the view
        len: usize,
    },
}

/// Error type for playback operations.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Playback Error: {} at line {} in {}", kind, line, file)]
pub struct PlaybackError {
    /// The specific error condition
    pub kind: PlaybackErrorKind,
    /// Line number where the error occurred
    pub line: u32,
    /// Source file where the error occurred
    pub file: &'static str,
}

impl PlaybackError {
    /// Create a new PlaybackError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: PlaybackErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
