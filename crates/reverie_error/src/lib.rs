//! Error types for the Reverie library.
//!
//! This crate provides the foundation error types used throughout the Reverie workspace.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All constructors use `#[track_caller]` for automatic location capture
//!
//! # Examples
//!
//! ```
//! use reverie_error::{ReverieResult, StoryError, StoryErrorKind};
//!
//! fn active_session() -> ReverieResult<String> {
//!     Err(StoryError::new(StoryErrorKind::NoActiveSession))?
//! }
//!
//! assert!(active_session().is_err());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod generation;
mod playback;
mod queue;
mod story;

pub use config::ConfigError;
pub use error::{ReverieError, ReverieErrorKind, ReverieResult};
pub use generation::{GenerationError, GenerationErrorKind};
pub use playback::{PlaybackError, PlaybackErrorKind};
pub use queue::QueueError;
pub use story::{StoryError, StoryErrorKind};
