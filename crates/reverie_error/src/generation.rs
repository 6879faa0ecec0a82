//! Errors raised by the external story and image generation services.

/// Failure conditions reported by a generation collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum GenerationErrorKind {
    /// The request never reached the service or the connection dropped
    #[display("Transport failure: {}", _0)]
    Transport(String),
    /// The service answered with an error status
    #[display("Service returned {}: {}", status_code, message)]
    Service {
        /// Status code reported by the service
        status_code: u16,
        /// Error message
        message: String,
    },
    /// The service answered but produced no usable payload
    #[display("Service returned an empty result")]
    EmptyResult,
    /// The response could not be interpreted
    #[display("Malformed response: {}", _0)]
    MalformedResponse(String),
}

/// Generation collaborator error with source location tracking.
///
/// # Examples
///
/// ```
/// use reverie_error::{GenerationError, GenerationErrorKind};
///
/// let err = GenerationError::new(GenerationErrorKind::EmptyResult);
/// assert!(format!("{}", err).contains("empty result"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Generation Error: {} at line {} in {}", kind, line, file)]
pub struct GenerationError {
    /// The kind of error that occurred
    pub kind: GenerationErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl GenerationError {
    /// Create a new GenerationError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: GenerationErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Shorthand for a transport failure.
    #[track_caller]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(GenerationErrorKind::Transport(message.into()))
    }
}
