//! Scene requests, deletion and image retries on the active chapter.

mod test_utils;

use reverie_core::SessionId;
use reverie_error::StoryErrorKind;
use reverie_interface::mock::{ImageScript, ScriptedImageDriver, ScriptedStoryDriver, StoryCall};
use reverie_queue::QueueEvent;
use reverie_story::{ChapterPhase, SceneAdvance};
use std::time::Duration;
use test_utils::harness;

#[tokio::test(start_paused = true)]
async fn test_scenes_are_appended_and_illustrated() {
    let h = harness(ScriptedStoryDriver::new(10), ScriptedImageDriver::new());
    let session_id = h
        .orchestrator
        .start_story("a lighthouse keeper", &Default::default())
        .await
        .unwrap();
    assert_eq!(h.orchestrator.phase(), Some(ChapterPhase::AwaitingFirstScene));
    assert_eq!(h.orchestrator.premise().as_deref(), Some("a lighthouse keeper"));

    for k in 0..5 {
        let advance = h.orchestrator.request_next_scene(&session_id).await.unwrap();
        assert_eq!(advance, SceneAdvance::NewScene { scene_idx: k });
        assert_eq!(h.orchestrator.current_index(), k);
    }
    assert_eq!(h.orchestrator.phase(), Some(ChapterPhase::GeneratingScenes));

    h.queue.wait_idle().await;
    let scenes = h.orchestrator.scenes();
    assert_eq!(scenes.len(), 5);
    for (k, scene) in scenes.iter().enumerate() {
        assert_eq!(scene.idx, k);
        assert_eq!(
            scene.image_url.as_deref(),
            Some(format!("mock://ch1-s{k}/{}", k + 1).as_str())
        );
    }
}

#[tokio::test(start_paused = true)]
async fn test_deleting_displayed_scene() {
    let h = harness(ScriptedStoryDriver::new(10), ScriptedImageDriver::new());
    let session_id = h.story_with_scenes(5).await;
    h.orchestrator.select_scene(2).unwrap();

    h.orchestrator.delete_scene(2).await.unwrap();

    assert_eq!(h.orchestrator.current_index(), 1);
    let indices: Vec<usize> = h.orchestrator.scenes().iter().map(|s| s.idx).collect();
    assert_eq!(indices, vec![0, 1, 2, 3]);
    assert_eq!(h.prompts(), vec!["ch1-s0", "ch1-s1", "ch1-s3", "ch1-s4"]);
    assert!(h.story.calls().contains(&StoryCall::DeleteScene {
        session_id,
        scene_idx: 2,
    }));
}

#[tokio::test(start_paused = true)]
async fn test_deleting_after_displayed_scene_keeps_index() {
    let h = harness(ScriptedStoryDriver::new(10), ScriptedImageDriver::new());
    h.story_with_scenes(4).await;
    h.orchestrator.select_scene(1).unwrap();

    h.orchestrator.delete_scene(3).await.unwrap();
    assert_eq!(h.orchestrator.current_index(), 1);

    h.orchestrator.delete_scene(0).await.unwrap();
    assert_eq!(h.orchestrator.current_index(), 0);
    h.orchestrator.delete_scene(0).await.unwrap();
    assert_eq!(h.orchestrator.current_index(), 0);
    assert_eq!(h.prompts(), vec!["ch1-s2"]);
}

#[tokio::test(start_paused = true)]
async fn test_refused_deletion_changes_nothing() {
    let h = harness(ScriptedStoryDriver::new(10), ScriptedImageDriver::new());
    h.story_with_scenes(3).await;
    h.story.set_delete_fails(true);

    assert!(h.orchestrator.delete_scene(1).await.is_err());
    assert_eq!(h.orchestrator.scenes().len(), 3);
    assert_eq!(h.orchestrator.current_index(), 2);

    let err = h.orchestrator.delete_scene(7).await.unwrap_err();
    assert_eq!(
        err.story_kind(),
        Some(&StoryErrorKind::SceneOutOfRange { idx: 7, len: 3 })
    );
}

#[tokio::test(start_paused = true)]
async fn test_deletion_repoints_queued_images() {
    let h = harness(
        ScriptedStoryDriver::new(10),
        ScriptedImageDriver::new().with_latency(Duration::from_millis(100)),
    );
    h.story_with_scenes(3).await;

    h.orchestrator.delete_scene(1).await.unwrap();
    h.queue.wait_idle().await;

    let scenes = h.orchestrator.scenes();
    assert!(scenes[0].image_url.as_deref().unwrap().starts_with("mock://ch1-s0/"));
    assert!(scenes[1].image_url.as_deref().unwrap().starts_with("mock://ch1-s2/"));
}

#[tokio::test(start_paused = true)]
async fn test_image_lands_before_a_following_deletion() {
    let h = harness(
        ScriptedStoryDriver::new(10),
        ScriptedImageDriver::new().with_latency(Duration::from_millis(100)),
    );
    let mut events = h.queue.subscribe();
    h.story_with_scenes(3).await;

    loop {
        if let QueueEvent::Succeeded { key, .. } = events.recv().await.unwrap() {
            assert_eq!(key.scene_idx, 0);
            break;
        }
    }
    h.orchestrator.delete_scene(0).await.unwrap();
    h.queue.wait_idle().await;

    let scenes = h.orchestrator.scenes();
    assert_eq!(scenes.len(), 2);
    assert!(scenes[0].image_url.as_deref().unwrap().starts_with("mock://ch1-s1/"));
    assert!(scenes[1].image_url.as_deref().unwrap().starts_with("mock://ch1-s2/"));
}

#[tokio::test(start_paused = true)]
async fn test_scene_failure_is_surfaced_without_retry() {
    let h = harness(ScriptedStoryDriver::new(10), ScriptedImageDriver::new());
    let session_id = h.story_with_scenes(2).await;
    h.story.fail_next_scenes(1);

    assert!(h.orchestrator.request_next_scene(&session_id).await.is_err());
    assert_eq!(h.orchestrator.scenes().len(), 2);
    assert_eq!(h.orchestrator.current_index(), 1);
    assert_eq!(h.story.next_scene_calls(), 3);

    let advance = h.orchestrator.request_next_scene(&session_id).await.unwrap();
    assert_eq!(advance, SceneAdvance::NewScene { scene_idx: 2 });
}

#[tokio::test(start_paused = true)]
async fn test_overlapping_requests_are_rejected() {
    let h = harness(
        ScriptedStoryDriver::new(10).with_latency(Duration::from_millis(100)),
        ScriptedImageDriver::new(),
    );
    let session_id = h.story_with_scenes(0).await;

    let (first, second) = tokio::join!(
        h.orchestrator.request_next_scene(&session_id),
        h.orchestrator.request_next_scene(&session_id),
    );
    assert!(first.is_ok());
    assert!(matches!(
        second.unwrap_err().story_kind(),
        Some(StoryErrorKind::GenerationInProgress(_))
    ));
    assert!(!h.orchestrator.is_busy());
}

#[tokio::test(start_paused = true)]
async fn test_requests_need_the_active_session() {
    let h = harness(ScriptedStoryDriver::new(10), ScriptedImageDriver::new());
    let err = h
        .orchestrator
        .request_next_scene(&SessionId::new("tale-ch1"))
        .await
        .unwrap_err();
    assert_eq!(err.story_kind(), Some(&StoryErrorKind::NoActiveSession));

    h.story_with_scenes(1).await;
    let err = h
        .orchestrator
        .request_next_scene(&SessionId::new("elsewhere"))
        .await
        .unwrap_err();
    assert!(matches!(
        err.story_kind(),
        Some(StoryErrorKind::StaleSession(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_failed_image_can_be_retried() {
    let images = ScriptedImageDriver::new();
    images.script("ch1-s0", std::iter::repeat_n(ImageScript::Fail, 4));
    let h = harness(ScriptedStoryDriver::new(10), images);
    h.story_with_scenes(1).await;
    h.queue.wait_idle().await;

    let view = h.orchestrator.view().unwrap();
    assert!(view.failed.contains(&0));
    assert!(view.scenes[0].image_url.is_none());

    h.orchestrator.retry_image(0).unwrap();
    assert!(h.orchestrator.view().unwrap().failed.is_empty());
    h.queue.wait_idle().await;

    assert_eq!(
        h.orchestrator.scenes()[0].image_url.as_deref(),
        Some("mock://ch1-s0/5")
    );
    let err = h.orchestrator.retry_image(0).unwrap_err();
    assert_eq!(err.story_kind(), Some(&StoryErrorKind::ImageNotRetryable(0)));
}
