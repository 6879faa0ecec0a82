//! Playback across chapter boundaries.

mod test_utils;

use reverie_core::SceneStatus;
use reverie_interface::mock::{ScriptedImageDriver, ScriptedStoryDriver};
use reverie_playback::PlaybackConfig;
use test_utils::{advance_ms, harness};

fn continuing() -> PlaybackConfig {
    PlaybackConfig::default()
        .with_duration_override_ms(1000)
        .with_continue_story(true)
}

#[tokio::test(start_paused = true)]
async fn test_playback_rolls_into_next_chapter() {
    let h = harness(
        ScriptedStoryDriver::new(2),
        ScriptedImageDriver::new(),
        continuing(),
    );
    h.story_with_scenes(2).await;
    h.playback.enter().unwrap();

    advance_ms(1500).await;
    assert_eq!(h.playback.state().current_index, 1);

    // Last scene played: the chapter ends and the next one begins.
    advance_ms(1000).await;
    let state = h.playback.state();
    assert_eq!(state.session_id, Some(h.story.session_for(2)));
    assert_eq!(state.current_index, 0);
    assert_eq!(state.scenes.len(), 1);
    assert!(state.is_playing);
    assert!(!state.awaiting_content);
    assert!(!state.chapter_complete);
    assert_eq!(h.orchestrator.session_id(), Some(h.story.session_for(2)));

    // Within the new chapter the next scene is requested and shown.
    advance_ms(1000).await;
    let state = h.playback.state();
    assert_eq!(state.scenes.len(), 2);
    assert_eq!(state.current_index, 1);
    assert_eq!(h.prompts(), vec!["ch2-s0", "ch2-s1"]);

    h.queue.wait_idle().await;
    assert!(
        h.playback
            .state()
            .scenes
            .iter()
            .all(|s| s.status == SceneStatus::Ready)
    );
}

#[tokio::test(start_paused = true)]
async fn test_story_end_stops_playback() {
    let h = harness(
        ScriptedStoryDriver::new(1).with_max_chapters(1),
        ScriptedImageDriver::new(),
        continuing(),
    );
    h.story_with_scenes(1).await;
    h.playback.enter().unwrap();

    advance_ms(1500).await;
    let state = h.playback.state();
    assert!(state.chapter_complete);
    assert!(!state.is_playing);
    assert!(!state.awaiting_content);
    assert_eq!(state.session_id, Some(h.story.session_for(1)));
}

#[tokio::test(start_paused = true)]
async fn test_scene_failure_is_recorded() {
    let h = harness(
        ScriptedStoryDriver::new(5),
        ScriptedImageDriver::new(),
        continuing(),
    );
    h.story_with_scenes(1).await;
    h.story.fail_next_scenes(1);
    h.playback.enter().unwrap();

    advance_ms(1500).await;
    let state = h.playback.state();
    assert!(state.last_error.is_some());
    assert!(!state.is_playing);
    assert_eq!(state.scenes.len(), 1);

    // Resuming tries again.
    h.playback.play().unwrap();
    advance_ms(1100).await;
    assert_eq!(h.playback.state().current_index, 1);
}

#[tokio::test(start_paused = true)]
async fn test_entering_empty_chapter_requests_content() {
    let h = harness(
        ScriptedStoryDriver::new(3),
        ScriptedImageDriver::new(),
        continuing(),
    );
    h.story_with_scenes(0).await;
    h.playback.enter().unwrap();
    assert!(h.playback.state().awaiting_content);

    advance_ms(10).await;
    let state = h.playback.state();
    assert_eq!(state.scenes.len(), 1);
    assert!(!state.awaiting_content);
}

#[tokio::test(start_paused = true)]
async fn test_exit_during_request_leaves_view_alone() {
    let h = harness(
        ScriptedStoryDriver::new(3).with_latency(std::time::Duration::from_millis(500)),
        ScriptedImageDriver::new(),
        continuing(),
    );
    h.story_with_scenes(1).await;
    h.playback.enter().unwrap();

    advance_ms(1100).await;
    assert!(h.playback.state().awaiting_content);
    h.playback.exit();

    advance_ms(1000).await;
    let state = h.playback.state();
    assert!(!state.active);
    assert_eq!(state.scenes.len(), 1);
    assert_eq!(h.orchestrator.scenes().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_busy_chapter_waits_for_the_running_request() {
    let h = harness(
        ScriptedStoryDriver::new(5).with_latency(std::time::Duration::from_millis(500)),
        ScriptedImageDriver::new(),
        PlaybackConfig::default()
            .with_duration_override_ms(100)
            .with_continue_story(true),
    );
    let session_id = h.story_with_scenes(1).await;
    h.playback.enter().unwrap();

    let orchestrator = h.orchestrator.clone();
    let user_request = tokio::spawn(async move {
        orchestrator.request_next_scene(&session_id).await
    });

    // The autoplay request collides with the running one.
    advance_ms(200).await;
    let state = h.playback.state();
    assert!(state.is_playing);
    assert!(state.last_error.is_none());
    assert_eq!(state.current_index, 0);

    advance_ms(350).await;
    assert!(user_request.await.unwrap().is_ok());
    let state = h.playback.state();
    assert_eq!(state.scenes.len(), 2);
    assert_eq!(state.current_index, 1);
    assert!(state.is_playing);
    assert!(state.last_error.is_none());
}
