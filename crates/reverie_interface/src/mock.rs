//! Scripted in-memory collaborators.
//!
//! These drivers stand in for the story and image services in tests and in
//! the `reverie simulate` command. They are deterministic: session ids,
//! prompts and asset urls are derived from counters, and every call is
//! recorded with the tokio clock so backoff timing can be asserted under a
//! paused runtime.

use crate::{ImageDriver, StoryDriver};
use async_trait::async_trait;
use parking_lot::Mutex;
use reverie_core::{
    ChapterContinuation, ChapterStart, GenerationParams, ImageOutcome, NextScene, SceneDraft,
    SessionId, StoryBible, StoryHints,
};
use reverie_error::{GenerationError, GenerationErrorKind, ReverieResult};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::Instant;

/// A call received by [`ScriptedStoryDriver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoryCall {
    /// `start_chapter`
    StartChapter {
        /// Story premise
        premise: String,
    },
    /// `next_scene`
    NextScene(SessionId),
    /// `continue_chapter`
    ContinueChapter {
        /// Session being continued
        previous: SessionId,
        /// Optional steering hint
        hint: Option<String>,
    },
    /// `persist_scene_image`
    PersistSceneImage {
        /// Session
        session_id: SessionId,
        /// Scene index
        scene_idx: usize,
        /// Asset reference
        asset_url: String,
    },
    /// `delete_scene`
    DeleteScene {
        /// Session
        session_id: SessionId,
        /// Scene index
        scene_idx: usize,
    },
}

#[derive(Debug, Clone, Copy)]
struct ChapterProgress {
    number: u32,
    produced: usize,
}

/// Story service double producing a fixed number of scenes per chapter.
///
/// Sessions are named `<story>-ch<N>` and scene prompts `ch<N>-s<K>`, with
/// `K` counting from 0 in production order.
pub struct ScriptedStoryDriver {
    story_id: String,
    scenes_per_chapter: usize,
    max_chapters: Option<u32>,
    scene_duration_s: f64,
    latency: Duration,
    chapters: Mutex<HashMap<SessionId, ChapterProgress>>,
    calls: Mutex<Vec<StoryCall>>,
    failing_scene_requests: AtomicUsize,
    continuation_fails: AtomicBool,
    persist_fails: AtomicBool,
    delete_fails: AtomicBool,
}

impl ScriptedStoryDriver {
    /// Driver whose chapters end after `scenes_per_chapter` scenes.
    pub fn new(scenes_per_chapter: usize) -> Self {
        Self {
            story_id: uuid::Uuid::new_v4().simple().to_string(),
            scenes_per_chapter,
            max_chapters: None,
            scene_duration_s: 5.0,
            latency: Duration::ZERO,
            chapters: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            failing_scene_requests: AtomicUsize::new(0),
            continuation_fails: AtomicBool::new(false),
            persist_fails: AtomicBool::new(false),
            delete_fails: AtomicBool::new(false),
        }
    }

    /// Builder method to fix the story id used in session names.
    pub fn with_story_id(mut self, story_id: impl Into<String>) -> Self {
        self.story_id = story_id.into();
        self
    }

    /// Builder method to refuse continuations past the given chapter.
    pub fn with_max_chapters(mut self, max_chapters: u32) -> Self {
        self.max_chapters = Some(max_chapters);
        self
    }

    /// Builder method to set the duration of produced scenes.
    pub fn with_scene_duration(mut self, duration_s: f64) -> Self {
        self.scene_duration_s = duration_s;
        self
    }

    /// Builder method to delay every call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Session id of the given chapter.
    pub fn session_for(&self, chapter_number: u32) -> SessionId {
        SessionId::new(format!("{}-ch{}", self.story_id, chapter_number))
    }

    /// Make the next `n` `next_scene` calls fail.
    pub fn fail_next_scenes(&self, n: usize) {
        self.failing_scene_requests.store(n, Ordering::SeqCst);
    }

    /// Make `continue_chapter` fail (or succeed again).
    pub fn set_continuation_fails(&self, fails: bool) {
        self.continuation_fails.store(fails, Ordering::SeqCst);
    }

    /// Make `persist_scene_image` fail (or succeed again).
    pub fn set_persist_fails(&self, fails: bool) {
        self.persist_fails.store(fails, Ordering::SeqCst);
    }

    /// Make `delete_scene` fail (or succeed again).
    pub fn set_delete_fails(&self, fails: bool) {
        self.delete_fails.store(fails, Ordering::SeqCst);
    }

    /// Every call received so far.
    pub fn calls(&self) -> Vec<StoryCall> {
        self.calls.lock().clone()
    }

    /// Number of `next_scene` calls received so far.
    pub fn next_scene_calls(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| matches!(c, StoryCall::NextScene(_)))
            .count()
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    fn open_chapter(&self, number: u32) -> SessionId {
        let session_id = self.session_for(number);
        self.chapters.lock().insert(
            session_id.clone(),
            ChapterProgress {
                number,
                produced: 0,
            },
        );
        session_id
    }
}

#[async_trait]
impl StoryDriver for ScriptedStoryDriver {
    async fn start_chapter(
        &self,
        premise: &str,
        _hints: &StoryHints,
    ) -> ReverieResult<ChapterStart> {
        self.calls.lock().push(StoryCall::StartChapter {
            premise: premise.to_string(),
        });
        self.simulate_latency().await;
        let session_id = self.open_chapter(1);
        Ok(ChapterStart {
            session_id,
            title: premise.to_string(),
            bible: StoryBible {
                style: Some("watercolour".to_string()),
                ..StoryBible::default()
            },
        })
    }

    async fn next_scene(&self, session_id: &SessionId) -> ReverieResult<NextScene> {
        self.calls.lock().push(StoryCall::NextScene(session_id.clone()));
        self.simulate_latency().await;

        let failing = self
            .failing_scene_requests
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(GenerationError::transport("scripted scene failure").into());
        }

        let mut chapters = self.chapters.lock();
        let progress = chapters.get_mut(session_id).ok_or_else(|| {
            GenerationError::new(GenerationErrorKind::Service {
                status_code: 404,
                message: format!("unknown session {session_id}"),
            })
        })?;
        if progress.produced >= self.scenes_per_chapter {
            return Ok(NextScene::ChapterComplete);
        }
        let k = progress.produced;
        progress.produced += 1;
        Ok(NextScene::NewScene(SceneDraft {
            narration: format!("Chapter {}, scene {}", progress.number, k),
            image_prompt: format!("ch{}-s{}", progress.number, k),
            negative_prompt: "blurry".to_string(),
            duration_s: self.scene_duration_s,
        }))
    }

    async fn continue_chapter(
        &self,
        previous: &SessionId,
        hint: Option<&str>,
    ) -> ReverieResult<ChapterContinuation> {
        self.calls.lock().push(StoryCall::ContinueChapter {
            previous: previous.clone(),
            hint: hint.map(str::to_string),
        });
        self.simulate_latency().await;

        if self.continuation_fails.load(Ordering::SeqCst) {
            return Err(GenerationError::transport("scripted continuation failure").into());
        }
        let number = self
            .chapters
            .lock()
            .get(previous)
            .map(|p| p.number + 1)
            .ok_or_else(|| {
                GenerationError::new(GenerationErrorKind::Service {
                    status_code: 404,
                    message: format!("unknown session {previous}"),
                })
            })?;
        if self.max_chapters.is_some_and(|max| number > max) {
            return Err(GenerationError::new(GenerationErrorKind::Service {
                status_code: 409,
                message: "story is finished".to_string(),
            })
            .into());
        }
        let session_id = self.open_chapter(number);
        Ok(ChapterContinuation {
            session_id,
            chapter_number: number,
            title: Some(format!("Chapter {number}")),
            bible: StoryBible::default(),
        })
    }

    async fn persist_scene_image(
        &self,
        session_id: &SessionId,
        scene_idx: usize,
        asset_url: &str,
    ) -> ReverieResult<()> {
        self.calls.lock().push(StoryCall::PersistSceneImage {
            session_id: session_id.clone(),
            scene_idx,
            asset_url: asset_url.to_string(),
        });
        if self.persist_fails.load(Ordering::SeqCst) {
            return Err(GenerationError::transport("scripted persistence failure").into());
        }
        Ok(())
    }

    async fn delete_scene(&self, session_id: &SessionId, scene_idx: usize) -> ReverieResult<()> {
        self.calls.lock().push(StoryCall::DeleteScene {
            session_id: session_id.clone(),
            scene_idx,
        });
        self.simulate_latency().await;
        if self.delete_fails.load(Ordering::SeqCst) {
            return Err(GenerationError::transport("scripted delete failure").into());
        }
        Ok(())
    }
}

/// Scripted result of one image call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageScript {
    /// Return this asset url
    Asset(String),
    /// Succeed with no assets
    NoResult,
    /// Fail with a transport error
    Fail,
}

/// An image call received by [`ScriptedImageDriver`].
#[derive(Debug, Clone)]
pub struct ImageCall {
    /// Prompt
    pub prompt: String,
    /// Negative prompt
    pub negative_prompt: String,
    /// When the call started
    pub at: Instant,
}

/// Image service double with per-prompt scripts.
///
/// Prompts without a script succeed with `mock://<prompt>/<n>`.
#[derive(Default)]
pub struct ScriptedImageDriver {
    latency: Duration,
    fail_every: Option<usize>,
    scripts: Mutex<HashMap<String, VecDeque<ImageScript>>>,
    calls: Mutex<Vec<ImageCall>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedImageDriver {
    /// Driver that answers immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to delay every call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Builder method to fail every `n`-th unscripted call (1-based).
    pub fn with_fail_every(mut self, n: usize) -> Self {
        self.fail_every = (n > 0).then_some(n);
        self
    }

    /// Queue outcomes for a prompt; consumed one per call.
    pub fn script(&self, prompt: impl Into<String>, outcomes: impl IntoIterator<Item = ImageScript>) {
        self.scripts
            .lock()
            .entry(prompt.into())
            .or_default()
            .extend(outcomes);
    }

    /// Every call received so far.
    pub fn calls(&self) -> Vec<ImageCall> {
        self.calls.lock().clone()
    }

    /// Start instants of the calls made for one prompt.
    pub fn attempts_for(&self, prompt: &str) -> Vec<Instant> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.prompt == prompt)
            .map(|c| c.at)
            .collect()
    }

    /// Highest number of calls that were running at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn next_outcome(&self, prompt: &str, call_number: usize) -> ImageScript {
        if let Some(scripted) = self
            .scripts
            .lock()
            .get_mut(prompt)
            .and_then(VecDeque::pop_front)
        {
            return scripted;
        }
        match self.fail_every {
            Some(n) if call_number % n == 0 => ImageScript::Fail,
            _ => ImageScript::Asset(format!("mock://{prompt}/{call_number}")),
        }
    }
}

#[async_trait]
impl ImageDriver for ScriptedImageDriver {
    async fn generate_image(
        &self,
        prompt: &str,
        negative_prompt: &str,
        _params: &GenerationParams,
    ) -> ReverieResult<ImageOutcome> {
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);
        let call_number = {
            let mut calls = self.calls.lock();
            calls.push(ImageCall {
                prompt: prompt.to_string(),
                negative_prompt: negative_prompt.to_string(),
                at: Instant::now(),
            });
            calls.len()
        };

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.next_outcome(prompt, call_number) {
            ImageScript::Asset(url) => Ok(ImageOutcome::Asset(url)),
            ImageScript::NoResult => Ok(ImageOutcome::NoResult),
            ImageScript::Fail => Err(GenerationError::transport("scripted image failure").into()),
        }
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }
}
