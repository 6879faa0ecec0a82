//! Wiring of queue, orchestrator and playback.

use crate::ReverieConfig;
use reverie_interface::{ImageDriver, StoryDriver};
use reverie_playback::PlaybackController;
use reverie_queue::ImageQueue;
use reverie_story::StoryOrchestrator;
use std::sync::Arc;
use tracing::info;

/// A complete Reverie instance over one pair of services.
///
/// The queue, the orchestrator's canonical ledger and the playback view share
/// one observer set, registered in that order.
///
/// ```no_run
/// use reverie::{Engine, ReverieConfig};
/// use reverie_interface::mock::{ScriptedImageDriver, ScriptedStoryDriver};
/// use std::sync::Arc;
///
/// # async fn run() -> reverie_error::ReverieResult<()> {
/// let engine = Engine::new(
///     Arc::new(ScriptedStoryDriver::new(4)),
///     Arc::new(ScriptedImageDriver::new()),
///     &ReverieConfig::default(),
/// );
/// let session_id = engine
///     .orchestrator()
///     .start_story("a lighthouse keeper", &Default::default())
///     .await?;
/// engine.orchestrator().request_next_scene(&session_id).await?;
/// engine.playback().enter()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Engine {
    queue: ImageQueue,
    orchestrator: StoryOrchestrator,
    playback: PlaybackController,
}

impl Engine {
    /// Build and start an engine. Must be called inside a tokio runtime.
    pub fn new(
        story: Arc<dyn StoryDriver>,
        images: Arc<dyn ImageDriver>,
        config: &ReverieConfig,
    ) -> Self {
        let queue = ImageQueue::builder(images, story.clone())
            .config(config.queue.clone())
            .params(config.generation.clone())
            .spawn();
        let orchestrator = StoryOrchestrator::new(story, queue.clone());
        let playback = PlaybackController::new(orchestrator.clone(), config.playback.clone());
        info!("Engine ready");
        Self {
            queue,
            orchestrator,
            playback,
        }
    }

    /// Image queue.
    pub fn queue(&self) -> &ImageQueue {
        &self.queue
    }

    /// Scene and chapter orchestrator.
    pub fn orchestrator(&self) -> &StoryOrchestrator {
        &self.orchestrator
    }

    /// Playback view.
    pub fn playback(&self) -> &PlaybackController {
        &self.playback
    }

    /// Leave playback and stop the image worker.
    pub async fn shutdown(&self) {
        self.playback.exit();
        self.queue.shutdown().await;
    }
}
