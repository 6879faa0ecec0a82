//! Top-level error wrapper types.

use crate::{ConfigError, GenerationError, PlaybackError, QueueError, StoryError};

/// All error conditions the Reverie crates can report.
///
/// # Examples
///
/// ```
/// use reverie_error::{GenerationError, ReverieError};
///
/// let err: ReverieError = GenerationError::transport("connection reset").into();
/// assert!(format!("{}", err).contains("Transport failure"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum ReverieErrorKind {
    /// Story or image collaborator failure
    #[from(GenerationError)]
    Generation(GenerationError),
    /// Scene/chapter orchestration error
    #[from(StoryError)]
    Story(StoryError),
    /// Playback controller error
    #[from(PlaybackError)]
    Playback(PlaybackError),
    /// Image queue error
    #[from(QueueError)]
    Queue(QueueError),
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
}

/// Reverie error with kind discrimination.
///
/// # Examples
///
/// ```
/// use reverie_error::{ConfigError, ReverieResult};
///
/// fn might_fail() -> ReverieResult<()> {
///     Err(ConfigError::new("Missing field"))?
/// }
///
/// assert!(might_fail().is_err());
/// ```
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Reverie Error: {}", _0)]
pub struct ReverieError(Box<ReverieErrorKind>);

impl ReverieError {
    /// Create a new error from a kind.
    pub fn new(kind: ReverieErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &ReverieErrorKind {
        &self.0
    }

    /// Story error condition, if this is one.
    pub fn story_kind(&self) -> Option<&crate::StoryErrorKind> {
        match self.kind() {
            ReverieErrorKind::Story(e) => Some(&e.kind),
            _ => None,
        }
    }
}

// Generic From implementation for any type that converts to ReverieErrorKind
impl<T> From<T> for ReverieError
where
    T: Into<ReverieErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Reverie operations.
pub type ReverieResult<T> = std::result::Result<T, ReverieError>;
