//! Entering, autoplay timing and transport controls.

mod test_utils;

use reverie_core::SceneStatus;
use reverie_error::{PlaybackErrorKind, ReverieErrorKind};
use reverie_interface::mock::{ScriptedImageDriver, ScriptedStoryDriver};
use reverie_playback::PlaybackConfig;
use std::time::Duration;
use test_utils::{advance_ms, harness};

fn playback_kind(err: &reverie_error::ReverieError) -> Option<&PlaybackErrorKind> {
    match err.kind() {
        ReverieErrorKind::Playback(e) => Some(&e.kind),
        _ => None,
    }
}

#[tokio::test(start_paused = true)]
async fn test_enter_needs_a_chapter() {
    let h = harness(
        ScriptedStoryDriver::new(5),
        ScriptedImageDriver::new(),
        PlaybackConfig::default(),
    );
    let err = h.playback.enter().unwrap_err();
    assert_eq!(playback_kind(&err), Some(&PlaybackErrorKind::NothingToPlay));
    assert!(!h.playback.is_active());

    let err = h.playback.next().unwrap_err();
    assert_eq!(playback_kind(&err), Some(&PlaybackErrorKind::Inactive));
}

#[tokio::test(start_paused = true)]
async fn test_enter_copies_scenes_with_status() {
    let h = harness(
        ScriptedStoryDriver::new(5),
        ScriptedImageDriver::new().with_latency(Duration::from_millis(500)),
        PlaybackConfig::default(),
    );
    h.story_with_scenes(3).await;
    advance_ms(600).await;

    h.playback.enter().unwrap();
    let state = h.playback.state();
    assert!(state.active);
    assert!(state.is_playing);
    assert_eq!(state.current_index, 0);
    assert_eq!(state.session_id, Some(h.story.session_for(1)));
    let statuses: Vec<SceneStatus> = state.scenes.iter().map(|s| s.status).collect();
    assert_eq!(
        statuses,
        vec![SceneStatus::Ready, SceneStatus::Generating, SceneStatus::Generating]
    );

    h.queue.wait_idle().await;
    assert!(
        h.playback
            .state()
            .scenes
            .iter()
            .all(|s| s.status == SceneStatus::Ready && s.scene.image_url.is_some())
    );
    assert_eq!(h.images.calls().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_autoplay_follows_scene_durations() {
    let h = harness(
        ScriptedStoryDriver::new(5).with_scene_duration(2.0),
        ScriptedImageDriver::new(),
        PlaybackConfig::default(),
    );
    h.story_with_scenes(3).await;
    h.playback.enter().unwrap();

    advance_ms(2001).await;
    assert_eq!(h.playback.state().current_index, 1);
    advance_ms(2000).await;
    assert_eq!(h.playback.state().current_index, 2);

    // Without pause-on-end the last scene stays up.
    advance_ms(5000).await;
    let state = h.playback.state();
    assert_eq!(state.current_index, 2);
    assert!(state.is_playing);
    assert!(!state.ended);
}

#[tokio::test(start_paused = true)]
async fn test_unusable_durations_fall_back() {
    let h = harness(
        ScriptedStoryDriver::new(5).with_scene_duration(0.0),
        ScriptedImageDriver::new(),
        PlaybackConfig::default().with_default_duration_s(3.0),
    );
    h.story_with_scenes(2).await;
    h.playback.enter().unwrap();

    advance_ms(2900).await;
    assert_eq!(h.playback.state().current_index, 0);
    advance_ms(200).await;
    assert_eq!(h.playback.state().current_index, 1);
}

#[tokio::test(start_paused = true)]
async fn test_pause_on_end() {
    let h = harness(
        ScriptedStoryDriver::new(5),
        ScriptedImageDriver::new(),
        PlaybackConfig::default()
            .with_duration_override_ms(100)
            .with_pause_on_end(true),
    );
    h.story_with_scenes(2).await;
    h.playback.enter().unwrap();

    advance_ms(250).await;
    let state = h.playback.state();
    assert_eq!(state.current_index, 1);
    assert!(state.ended);
    assert!(!state.is_playing);

    assert!(h.playback.toggle().unwrap());
    assert!(!h.playback.state().ended);
}

#[tokio::test(start_paused = true)]
async fn test_seek_rearms_timer() {
    let h = harness(
        ScriptedStoryDriver::new(5),
        ScriptedImageDriver::new(),
        PlaybackConfig::default().with_duration_override_ms(1000),
    );
    h.story_with_scenes(4).await;
    h.playback.enter().unwrap();

    advance_ms(600).await;
    h.playback.seek(2).unwrap();
    advance_ms(600).await;
    assert_eq!(h.playback.state().current_index, 2);
    advance_ms(500).await;
    assert_eq!(h.playback.state().current_index, 3);

    let err = h.playback.seek(9).unwrap_err();
    assert_eq!(
        playback_kind(&err),
        Some(&PlaybackErrorKind::SeekOutOfRange { idx: 9, len: 4 })
    );
}

#[tokio::test(start_paused = true)]
async fn test_pause_stops_autoplay() {
    let h = harness(
        ScriptedStoryDriver::new(5),
        ScriptedImageDriver::new(),
        PlaybackConfig::default().with_duration_override_ms(1000),
    );
    h.story_with_scenes(3).await;
    h.playback.enter().unwrap();

    assert!(!h.playback.toggle().unwrap());
    advance_ms(3000).await;
    assert_eq!(h.playback.state().current_index, 0);

    assert!(h.playback.next().unwrap());
    assert!(h.playback.next().unwrap());
    assert!(!h.playback.next().unwrap());
    assert!(h.playback.previous().unwrap());
    assert_eq!(h.playback.state().current_index, 1);
    assert!(!h.playback.state().is_playing);
}

#[tokio::test(start_paused = true)]
async fn test_deleting_displayed_scene_updates_copy() {
    let h = harness(
        ScriptedStoryDriver::new(10),
        ScriptedImageDriver::new(),
        PlaybackConfig::default().with_duration_override_ms(10_000),
    );
    h.story_with_scenes(5).await;
    h.playback.enter().unwrap();
    h.playback.seek(2).unwrap();

    h.orchestrator.delete_scene(2).await.unwrap();

    let state = h.playback.state();
    assert_eq!(state.current_index, 1);
    let indices: Vec<usize> = state.scenes.iter().map(|s| s.scene.idx).collect();
    assert_eq!(indices, vec![0, 1, 2, 3]);
    assert_eq!(h.prompts(), vec!["ch1-s0", "ch1-s1", "ch1-s3", "ch1-s4"]);
}

#[tokio::test(start_paused = true)]
async fn test_new_scene_resumes_held_playback() {
    let h = harness(
        ScriptedStoryDriver::new(10),
        ScriptedImageDriver::new(),
        PlaybackConfig::default().with_duration_override_ms(100),
    );
    let session_id = h.story_with_scenes(1).await;
    h.playback.enter().unwrap();
    advance_ms(150).await;
    assert_eq!(h.playback.state().current_index, 0);

    h.orchestrator.request_next_scene(&session_id).await.unwrap();
    let state = h.playback.state();
    assert_eq!(state.scenes.len(), 2);
    assert_eq!(state.current_index, 1);
}

#[tokio::test(start_paused = true)]
async fn test_reentered_copy_receives_pending_image() {
    let h = harness(
        ScriptedStoryDriver::new(5),
        ScriptedImageDriver::new().with_latency(Duration::from_millis(1000)),
        PlaybackConfig::default(),
    );
    h.story_with_scenes(1).await;
    advance_ms(10).await;

    h.playback.enter().unwrap();
    h.playback.exit();
    h.playback.enter().unwrap();
    assert_eq!(h.playback.state().scenes[0].status, SceneStatus::Generating);

    h.queue.wait_idle().await;
    let state = h.playback.state();
    assert_eq!(state.scenes[0].status, SceneStatus::Ready);
    assert_eq!(
        state.scenes[0].scene.image_url.as_deref(),
        Some("mock://ch1-s0/1")
    );
    assert_eq!(h.images.calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_exited_copy_ignores_updates() {
    let h = harness(
        ScriptedStoryDriver::new(5),
        ScriptedImageDriver::new().with_latency(Duration::from_millis(1000)),
        PlaybackConfig::default(),
    );
    h.story_with_scenes(1).await;
    advance_ms(10).await;

    h.playback.enter().unwrap();
    h.playback.exit();
    h.queue.wait_idle().await;

    let state = h.playback.state();
    assert!(!state.active);
    assert_eq!(state.scenes[0].status, SceneStatus::Generating);

    // The canonical list kept the result; entering again picks it up.
    h.playback.enter().unwrap();
    assert_eq!(h.playback.state().scenes[0].status, SceneStatus::Ready);
}

#[tokio::test(start_paused = true)]
async fn test_empty_chapter_starts_playing_on_first_scene() {
    let h = harness(
        ScriptedStoryDriver::new(5),
        ScriptedImageDriver::new(),
        PlaybackConfig::default().with_duration_override_ms(100),
    );
    let session_id = h.story_with_scenes(0).await;
    h.playback.enter().unwrap();
    let state = h.playback.state();
    assert!(state.scenes.is_empty());
    assert!(state.is_playing);

    for _ in 0..3 {
        h.orchestrator
            .request_next_scene(&session_id)
            .await
            .unwrap();
    }
    advance_ms(1000).await;
    let state = h.playback.state();
    assert_eq!(state.scenes.len(), 3);
    assert_eq!(state.current_index, 2);
    assert!(state.is_playing);
}

#[tokio::test(start_paused = true)]
async fn test_restarted_story_resumes_autoplay() {
    let h = harness(
        ScriptedStoryDriver::new(5),
        ScriptedImageDriver::new(),
        PlaybackConfig::default().with_duration_override_ms(100),
    );
    h.story_with_scenes(2).await;
    h.playback.enter().unwrap();

    let session_id = h
        .orchestrator
        .start_story("a second premise", &Default::default())
        .await
        .unwrap();
    let state = h.playback.state();
    assert!(state.scenes.is_empty());
    assert_eq!(state.current_index, 0);

    for _ in 0..2 {
        h.orchestrator
            .request_next_scene(&session_id)
            .await
            .unwrap();
    }
    advance_ms(150).await;
    let state = h.playback.state();
    assert_eq!(state.scenes.len(), 2);
    assert_eq!(state.current_index, 1);
    assert!(state.is_playing);
}
