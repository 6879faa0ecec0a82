//! Reverie - visual novel orchestration.
//!
//! Reverie drives an auto-advancing story made of chapters of illustrated
//! scenes. Narrative text and images come from slow external services; this
//! workspace schedules those requests and keeps the timeline moving:
//!
//! - **Image queue**: one image call in flight, deduplicated jobs,
//!   exponential backoff with re-queueing at the back
//! - **Orchestrator**: canonical scene list, automatic chapter continuation,
//!   index-stable deletion
//! - **Playback**: timed autoplay over its own copy of the scenes, prefetch,
//!   seamless chapter changes
//!
//! # Architecture
//!
//! - `reverie_error` - Error types
//! - `reverie_core` - Data model
//! - `reverie_interface` - Service traits, scene observers, scripted drivers
//! - `reverie_queue` - Image generation queue
//! - `reverie_story` - Scene and chapter orchestrator
//! - `reverie_playback` - Playback controller
//!
//! This crate re-exports everything and adds configuration loading, tracing
//! setup and the [`Engine`] that wires the parts together.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod engine;
mod telemetry;

pub use config::ReverieConfig;
pub use engine::Engine;
pub use telemetry::init_tracing;

pub use reverie_core::*;
pub use reverie_error::*;
pub use reverie_interface::*;
pub use reverie_playback::*;
pub use reverie_queue::*;
pub use reverie_story::*;
