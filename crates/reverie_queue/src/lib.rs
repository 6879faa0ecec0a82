//! Image generation queue for Reverie.
//!
//! Scenes are submitted as [`reverie_core::ImageJob`]s and rendered one at a
//! time by a single worker. Results flow back as
//! [`reverie_interface::SceneUpdate`]s to every registered observer:
//!
//! - at most one generation call is in flight,
//! - a scene never has two outstanding jobs,
//! - failures are retried with exponential backoff and re-appended to the
//!   back of the queue.
//!
//! # Example
//!
//! ```no_run
//! use reverie_interface::mock::{ScriptedImageDriver, ScriptedStoryDriver};
//! use reverie_queue::{ImageQueue, QueueConfig};
//! use std::sync::Arc;
//!
//! # async fn run() {
//! let queue = ImageQueue::builder(
//!     Arc::new(ScriptedImageDriver::new()),
//!     Arc::new(ScriptedStoryDriver::new(3)),
//! )
//! .config(QueueConfig::new(3, 1000, 8000))
//! .spawn();
//!
//! queue.wait_idle().await;
//! queue.shutdown().await;
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod event;
mod queue;

pub use config::QueueConfig;
pub use event::QueueEvent;
pub use queue::{ImageQueue, ImageQueueBuilder, QueueSnapshot};
