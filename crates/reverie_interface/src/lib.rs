//! Collaborator traits and synchronization seams for Reverie.
//!
//! - [`StoryDriver`] and [`ImageDriver`] describe the external narrative and
//!   image services at their request/response boundary.
//! - [`SceneObserver`] and [`ObserverSet`] carry index-keyed scene updates
//!   from the orchestrator and the image queue to every view of a chapter.
//! - [`mock`] provides scripted in-memory drivers.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod mock;
mod observer;
mod traits;

pub use observer::{ObserverSet, SceneObserver, SceneUpdate};
pub use traits::{ImageDriver, StoryDriver};
