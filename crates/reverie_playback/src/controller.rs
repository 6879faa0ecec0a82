//! Timed autoplay over a working copy of the active chapter.

use crate::{PlaybackConfig, PlaybackState};
use parking_lot::Mutex;
use reverie_core::{PlaybackScene, Scene, SceneStatus, SessionId};
use reverie_error::{PlaybackError, PlaybackErrorKind, ReverieResult, StoryErrorKind};
use reverie_interface::{SceneObserver, SceneUpdate};
use reverie_story::{SceneAdvance, StoryOrchestrator};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, info, instrument, trace, warn};

/// Work decided under the view lock and carried out after releasing it.
#[derive(Default)]
struct Effects {
    timer: Option<(u64, Duration)>,
    prefetch: Vec<(SessionId, Scene)>,
    continuation: Option<SessionId>,
}

struct ControllerInner {
    view: Mutex<PlaybackState>,
    orchestrator: StoryOrchestrator,
    config: PlaybackConfig,
}

/// Forwards scene updates to a controller without keeping it alive.
struct ViewObserver(Weak<ControllerInner>);

impl SceneObserver for ViewObserver {
    fn apply(&self, session_id: &SessionId, update: &SceneUpdate) {
        if let Some(inner) = self.0.upgrade() {
            inner.apply(session_id, update);
        }
    }
}

/// The "TV" presentation of a chapter.
///
/// [`enter`](Self::enter) copies the orchestrator's scenes into a working
/// copy and starts autoplay: each scene stays on screen for its duration,
/// then the next one is shown. Images for the displayed and the following
/// scene are requested ahead of time, and when the chapter ends the view
/// moves on to the next chapter's first scene.
///
/// The working copy follows the canonical list through [`SceneUpdate`]s.
/// Updates received while the view is not entered are ignored; entering
/// again takes a fresh copy.
///
/// Must be created inside a tokio runtime.
#[derive(Clone)]
pub struct PlaybackController {
    inner: Arc<ControllerInner>,
}

impl PlaybackController {
    /// Create a controller and register it for the orchestrator's updates.
    pub fn new(orchestrator: StoryOrchestrator, config: PlaybackConfig) -> Self {
        let inner = Arc::new(ControllerInner {
            view: Mutex::new(PlaybackState::default()),
            orchestrator,
            config,
        });
        inner
            .orchestrator
            .observers()
            .register(Arc::new(ViewObserver(Arc::downgrade(&inner))));
        Self { inner }
    }

    /// Configuration in use.
    pub fn config(&self) -> &PlaybackConfig {
        &self.inner.config
    }

    /// Copy of the current view state.
    pub fn state(&self) -> PlaybackState {
        self.inner.view.lock().clone()
    }

    /// Whether the view is entered.
    pub fn is_active(&self) -> bool {
        self.inner.view.lock().active
    }

    /// Enter playback from the active chapter, starting at its first scene.
    #[instrument(skip(self))]
    pub fn enter(&self) -> ReverieResult<()> {
        let mut effects = Effects::default();
        {
            let mut state = self.inner.view.lock();
            let view = self
                .inner
                .orchestrator
                .view()
                .ok_or_else(|| PlaybackError::new(PlaybackErrorKind::NothingToPlay))?;
            let queue = self.inner.orchestrator.queue();
            let scenes = view
                .scenes
                .into_iter()
                .map(|scene| {
                    let status = if !scene.needs_image() {
                        SceneStatus::Ready
                    } else if view.failed.contains(&scene.idx) {
                        SceneStatus::Error
                    } else if queue.is_outstanding(&view.session_id, scene.idx) {
                        SceneStatus::Generating
                    } else {
                        SceneStatus::Pending
                    };
                    PlaybackScene { scene, status }
                })
                .collect();

            *state = PlaybackState {
                active: true,
                session_id: Some(view.session_id.clone()),
                scenes,
                is_playing: true,
                epoch: state.epoch,
                ..PlaybackState::default()
            };
            info!(session_id = %view.session_id, scenes = state.scenes.len(), "Playback entered");
            self.inner.refresh(&mut state, &mut effects);
            if state.scenes.is_empty() && *self.inner.config.continue_story() {
                self.inner.request_more(&mut state, &mut effects);
            }
        }
        self.inner.run(effects);
        Ok(())
    }

    /// Leave playback. Queued image jobs keep running.
    #[instrument(skip(self))]
    pub fn exit(&self) {
        let mut state = self.inner.view.lock();
        state.active = false;
        state.is_playing = false;
        state.awaiting_content = false;
        state.holding = false;
        state.epoch += 1;
        info!("Playback exited");
    }

    /// Resume autoplay on the displayed scene.
    pub fn play(&self) -> ReverieResult<()> {
        self.inner.transport(|inner, state, effects| {
            state.is_playing = true;
            state.ended = false;
            inner.refresh(state, effects);
        })
    }

    /// Stop autoplay on the displayed scene.
    pub fn pause(&self) -> ReverieResult<()> {
        self.inner.transport(|_, state, _| {
            state.is_playing = false;
            state.holding = false;
            state.epoch += 1;
        })
    }

    /// Switch between playing and paused; returns whether autoplay now runs.
    pub fn toggle(&self) -> ReverieResult<bool> {
        if self.inner.view.lock().is_playing {
            self.pause()?;
            Ok(false)
        } else {
            self.play()?;
            Ok(true)
        }
    }

    /// Show the following scene. Returns `false` on the last scene.
    pub fn next(&self) -> ReverieResult<bool> {
        let mut moved = false;
        self.inner.transport(|inner, state, effects| {
            if !state.is_last() {
                state.current_index += 1;
                state.ended = false;
                inner.refresh(state, effects);
                moved = true;
            }
        })?;
        Ok(moved)
    }

    /// Show the preceding scene. Returns `false` on the first scene.
    pub fn previous(&self) -> ReverieResult<bool> {
        let mut moved = false;
        self.inner.transport(|inner, state, effects| {
            if state.current_index > 0 {
                state.current_index -= 1;
                state.ended = false;
                inner.refresh(state, effects);
                moved = true;
            }
        })?;
        Ok(moved)
    }

    /// Show a specific scene.
    pub fn seek(&self, scene_idx: usize) -> ReverieResult<()> {
        let mut result = Ok(());
        self.inner.transport(|inner, state, effects| {
            if scene_idx >= state.scenes.len() {
                result = Err(PlaybackError::new(PlaybackErrorKind::SeekOutOfRange {
                    idx: scene_idx,
                    len: state.scenes.len(),
                }));
                return;
            }
            state.current_index = scene_idx;
            state.ended = false;
            inner.refresh(state, effects);
        })?;
        Ok(result?)
    }
}

impl std::fmt::Debug for PlaybackController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.view.lock();
        f.debug_struct("PlaybackController")
            .field("active", &state.active)
            .field("current_index", &state.current_index)
            .field("is_playing", &state.is_playing)
            .finish()
    }
}

impl ControllerInner {
    fn transport(
        self: &Arc<Self>,
        op: impl FnOnce(&Self, &mut PlaybackState, &mut Effects),
    ) -> ReverieResult<()> {
        let mut effects = Effects::default();
        {
            let mut state = self.view.lock();
            if !state.active {
                return Err(PlaybackError::new(PlaybackErrorKind::Inactive).into());
            }
            op(self.as_ref(), &mut *state, &mut effects);
        }
        self.run(effects);
        Ok(())
    }

    /// Invalidate running timers, then re-arm and prefetch for the displayed scene.
    fn refresh(&self, state: &mut PlaybackState, effects: &mut Effects) {
        state.epoch += 1;
        state.holding = false;
        let Some(current) = state.current_scene() else {
            // Nothing to show yet; the first appended scene resumes autoplay.
            state.holding = state.is_playing;
            return;
        };
        if state.is_playing {
            effects.timer = Some((state.epoch, self.dwell(&current.scene)));
        }
        if let Some(session_id) = state.session_id.clone().filter(|_| *self.config.prefetch()) {
            effects.prefetch = state.scenes[state.current_index..]
                .iter()
                .take(2)
                .filter(|s| s.status == SceneStatus::Pending && s.scene.needs_image())
                .map(|s| (session_id.clone(), s.scene.clone()))
                .collect();
        }
        trace!(
            epoch = state.epoch,
            current_index = state.current_index,
            "Displayed scene changed"
        );
    }

    fn dwell(&self, scene: &Scene) -> Duration {
        if let Some(ms) = self.config.duration_override_ms() {
            return Duration::from_millis(*ms);
        }
        let seconds = if scene.duration_s.is_finite() && scene.duration_s > 0.0 {
            scene.duration_s
        } else {
            *self.config.default_duration_s()
        };
        Duration::try_from_secs_f64(seconds).unwrap_or(Duration::from_secs(5))
    }

    fn request_more(&self, state: &mut PlaybackState, effects: &mut Effects) {
        if state.awaiting_content {
            return;
        }
        if state.chapter_complete {
            state.is_playing = false;
            return;
        }
        state.awaiting_content = true;
        effects.continuation = state.session_id.clone();
    }

    fn run(self: &Arc<Self>, effects: Effects) {
        if let Some((epoch, delay)) = effects.timer {
            let weak = Arc::downgrade(self);
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                if let Some(inner) = weak.upgrade() {
                    inner.on_timer(epoch);
                }
            });
        }

        let queue = self.orchestrator.queue();
        for (session_id, scene) in effects.prefetch {
            match queue.enqueue(&session_id, &scene) {
                Ok(true) => debug!(scene_idx = scene.idx, "Prefetching scene image"),
                Ok(false) => {}
                Err(e) => warn!(scene_idx = scene.idx, error = %e, "Prefetch failed"),
            }
        }

        if let Some(session_id) = effects.continuation {
            let inner = Arc::clone(self);
            tokio::spawn(async move {
                let result = inner.orchestrator.request_next_scene(&session_id).await;
                inner.on_continuation(&session_id, result);
            });
        }
    }

    fn on_timer(self: &Arc<Self>, epoch: u64) {
        let mut effects = Effects::default();
        {
            let mut state = self.view.lock();
            if !state.active || !state.is_playing || state.epoch != epoch {
                trace!(epoch, current = state.epoch, "Stale autoplay timer");
                return;
            }
            if !state.is_last() {
                state.current_index += 1;
                debug!(current_index = state.current_index, "Autoplay advanced");
                self.refresh(&mut state, &mut effects);
            } else if *self.config.pause_on_end() {
                state.is_playing = false;
                state.ended = true;
                state.epoch += 1;
                info!("Reached end of content");
            } else if *self.config.continue_story() {
                debug!("Last scene played; requesting more");
                self.request_more(&mut state, &mut effects);
            } else {
                debug!("Holding on last scene");
                state.holding = true;
            }
        }
        self.run(effects);
    }

    fn on_continuation(
        self: &Arc<Self>,
        requested: &SessionId,
        result: ReverieResult<SceneAdvance>,
    ) {
        let mut effects = Effects::default();
        {
            let mut state = self.view.lock();
            if !state.active {
                return;
            }
            state.awaiting_content = false;
            match result {
                Ok(SceneAdvance::NewScene { scene_idx }) => {
                    let same_chapter = state.session_id.as_ref() == Some(requested);
                    if same_chapter && state.is_playing && scene_idx < state.scenes.len() {
                        state.current_index = scene_idx;
                        self.refresh(&mut state, &mut effects);
                    }
                }
                Ok(SceneAdvance::ChapterContinued { chapter_number, .. }) => {
                    debug!(chapter_number, "Playback moved to the next chapter");
                }
                Ok(SceneAdvance::ChapterComplete) => {
                    info!("Chapter complete; playback stopped");
                    state.chapter_complete = true;
                    state.is_playing = false;
                    state.epoch += 1;
                }
                Err(e)
                    if matches!(
                        e.story_kind(),
                        Some(StoryErrorKind::GenerationInProgress(_))
                    ) =>
                {
                    // Another request owns the chapter; its scene arrives as an update.
                    debug!("Scene request already running; waiting for its scene");
                    if state.is_playing && !state.is_last() {
                        state.current_index += 1;
                        self.refresh(&mut state, &mut effects);
                    } else {
                        state.holding = state.is_playing;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Could not continue playback");
                    state.last_error = Some(e.to_string());
                    state.is_playing = false;
                    state.epoch += 1;
                }
            }
        }
        self.run(effects);
    }

    fn apply(self: &Arc<Self>, session_id: &SessionId, update: &SceneUpdate) {
        let mut effects = Effects::default();
        {
            let mut state = self.view.lock();
            if !state.active {
                return;
            }
            if let SceneUpdate::ChapterStarted(session) = update {
                info!(session_id = %session.id(), "Playback switched chapter");
                state.session_id = Some(session.id().clone());
                state.scenes = session
                    .scenes()
                    .iter()
                    .cloned()
                    .map(PlaybackScene::from)
                    .collect();
                state.current_index = 0;
                state.chapter_complete = false;
                state.ended = false;
                self.refresh(&mut state, &mut effects);
            } else if state.session_id.as_ref() == Some(session_id) {
                self.apply_to_copy(&mut state, update, &mut effects);
            } else {
                trace!(%session_id, "Ignoring update for another chapter");
            }
        }
        self.run(effects);
    }

    fn apply_to_copy(&self, state: &mut PlaybackState, update: &SceneUpdate, effects: &mut Effects) {
        match update {
            SceneUpdate::ImageQueued { scene_idx } => {
                if let Some(s) = state.scenes.get_mut(*scene_idx) {
                    if s.status != SceneStatus::Ready {
                        s.status = SceneStatus::Generating;
                    }
                }
            }
            SceneUpdate::ImageReady { scene_idx, url } => {
                if let Some(s) = state.scenes.get_mut(*scene_idx) {
                    s.scene.image_url = Some(url.clone());
                    s.status = SceneStatus::Ready;
                }
            }
            SceneUpdate::ImageFailed { scene_idx } => {
                if let Some(s) = state.scenes.get_mut(*scene_idx) {
                    if s.status != SceneStatus::Ready {
                        s.status = SceneStatus::Error;
                    }
                }
            }
            SceneUpdate::SceneAppended(scene) => {
                if scene.idx != state.scenes.len() {
                    debug!(scene_idx = scene.idx, "Appended scene already in the copy");
                    return;
                }
                state.scenes.push(PlaybackScene::from(scene.clone()));
                if state.holding && state.is_playing {
                    state.current_index = scene.idx;
                    self.refresh(state, effects);
                }
            }
            SceneUpdate::SceneRemoved { scene_idx } => {
                let scene_idx = *scene_idx;
                if scene_idx >= state.scenes.len() {
                    return;
                }
                state.scenes.remove(scene_idx);
                for s in &mut state.scenes[scene_idx..] {
                    s.scene.idx -= 1;
                }
                if scene_idx <= state.current_index {
                    state.current_index = state.current_index.saturating_sub(1);
                    self.refresh(state, effects);
                }
            }
            SceneUpdate::ChapterStarted(_) => {}
        }
    }
}
