//! `reverie simulate`: a full story over scripted services.

use crate::cli::SimulateArgs;
use reverie::{Engine, QueueEvent, ReverieConfig, ReverieResult, SceneStatus, StoryHints};
use reverie_interface::mock::{ScriptedImageDriver, ScriptedStoryDriver};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, instrument, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Run a story to its end with playback active and print a summary.
#[instrument(skip(args, config), fields(premise = %args.premise))]
pub async fn run_simulation(args: &SimulateArgs, mut config: ReverieConfig) -> ReverieResult<()> {
    let story = ScriptedStoryDriver::new(args.scenes_per_chapter)
        .with_max_chapters(args.chapters)
        .with_scene_duration(args.scene_duration)
        .with_latency(Duration::from_millis(args.story_latency_ms));
    let images = ScriptedImageDriver::new()
        .with_fail_every(args.fail_every)
        .with_latency(Duration::from_millis(args.image_latency_ms));

    config.playback = config.playback.with_continue_story(true).with_pause_on_end(false);
    let engine = Engine::new(Arc::new(story), Arc::new(images), &config);
    let events = tokio::spawn(log_queue_events(engine.queue().subscribe()));

    let orchestrator = engine.orchestrator();
    let session_id = orchestrator
        .start_story(&args.premise, &StoryHints::default())
        .await?;
    orchestrator.request_next_scene(&session_id).await?;
    engine.playback().enter()?;

    let deadline = tokio::time::Instant::now() + Duration::from_secs(args.timeout_secs);
    let mut shown = None;
    loop {
        let state = engine.playback().state();
        let displayed = (state.session_id.clone(), state.current_index);
        if shown.as_ref() != Some(&displayed) {
            if let Some(scene) = state.current_scene() {
                info!(
                    session_id = ?state.session_id,
                    scene_idx = state.current_index,
                    status = %scene.status,
                    narration = %scene.scene.narration,
                    "Now showing"
                );
            }
            shown = Some(displayed);
        }
        if state.chapter_complete || state.last_error.is_some() || !state.is_playing {
            break;
        }
        if tokio::time::Instant::now() >= deadline {
            warn!(timeout_secs = args.timeout_secs, "Simulation timed out");
            break;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }

    engine.queue().wait_idle().await;
    let state = engine.playback().state();
    let history = orchestrator.history();
    engine.shutdown().await;
    events.abort();

    let ready = state
        .scenes
        .iter()
        .filter(|s| s.status == SceneStatus::Ready)
        .count();
    let failed = state
        .scenes
        .iter()
        .filter(|s| s.status == SceneStatus::Error)
        .count();

    println!("Story: {}", args.premise);
    println!("Chapters played: {}", history.len() + 1);
    for chapter in &history {
        println!("  {} ({} scenes)", chapter.title(), chapter.len());
    }
    if let Some(session) = orchestrator.session() {
        println!("  {} ({} scenes)", session.title(), session.len());
    }
    println!("Final chapter images: {} ready, {} failed", ready, failed);
    if let Some(error) = state.last_error {
        println!("Stopped on error: {}", error);
    } else if state.chapter_complete {
        println!("Story complete");
    }
    Ok(())
}

async fn log_queue_events(mut events: tokio::sync::broadcast::Receiver<QueueEvent>) {
    loop {
        match events.recv().await {
            Ok(QueueEvent::RetryScheduled {
                key,
                retry_count,
                delay,
            }) => {
                info!(%key, retry_count, delay_ms = delay.as_millis() as u64, "Image retry scheduled");
            }
            Ok(QueueEvent::Exhausted { key, attempts }) => {
                warn!(%key, attempts, "Image gave up");
            }
            Ok(QueueEvent::Succeeded { key, url }) => info!(%key, %url, "Image ready"),
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => warn!(skipped, "Queue event log lagged"),
            Err(RecvError::Closed) => break,
        }
    }
}
