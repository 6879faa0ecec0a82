//! Scene and chapter orchestration.

use crate::ledger::CanonicalLedger;
use crate::{ChapterPhase, ChapterView, SceneAdvance};
use reverie_core::{ChapterSession, Scene, SceneDraft, SessionId, StoryHints};
use reverie_error::{GenerationError, GenerationErrorKind, ReverieResult, StoryError, StoryErrorKind};
use reverie_interface::{ObserverSet, SceneUpdate, StoryDriver};
use reverie_queue::ImageQueue;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, instrument, warn};

struct OrchestratorInner {
    story: Arc<dyn StoryDriver>,
    queue: ImageQueue,
    ledger: Arc<CanonicalLedger>,
    observers: ObserverSet,
    busy: AtomicBool,
}

/// Releases the request slot when dropped.
struct RequestSlot<'a>(&'a AtomicBool);

impl Drop for RequestSlot<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Owner of the active chapter's canonical scene list.
///
/// The orchestrator requests scenes from the [`StoryDriver`], appends them to
/// the chapter, submits their images to the [`ImageQueue`] and starts the next
/// chapter when the story service ends the current one. Every structural
/// change is broadcast to the queue's observers as a [`SceneUpdate`].
///
/// Only one story request (start, next scene or chapter continuation) runs at
/// a time; overlapping calls fail with
/// [`StoryErrorKind::GenerationInProgress`].
#[derive(Clone)]
pub struct StoryOrchestrator {
    inner: Arc<OrchestratorInner>,
}

impl StoryOrchestrator {
    /// Create an orchestrator that broadcasts on the queue's observer set.
    ///
    /// The canonical ledger registers itself there so it sees image results
    /// before any view registered later.
    pub fn new(story: Arc<dyn StoryDriver>, queue: ImageQueue) -> Self {
        let ledger = Arc::new(CanonicalLedger::default());
        let observers = queue.observers().clone();
        observers.register(ledger.clone());
        Self {
            inner: Arc::new(OrchestratorInner {
                story,
                queue,
                ledger,
                observers,
                busy: AtomicBool::new(false),
            }),
        }
    }

    /// Observers notified of every scene change.
    pub fn observers(&self) -> &ObserverSet {
        &self.inner.observers
    }

    /// Image queue fed by this orchestrator.
    pub fn queue(&self) -> &ImageQueue {
        &self.inner.queue
    }

    /// Begin a story with its first chapter.
    ///
    /// The chapter starts empty in [`ChapterPhase::AwaitingFirstScene`]; call
    /// [`request_next_scene`](Self::request_next_scene) to fill it.
    #[instrument(skip(self, premise, hints))]
    pub async fn start_story(&self, premise: &str, hints: &StoryHints) -> ReverieResult<SessionId> {
        let _slot = self.inner.claim()?;
        let start = self.inner.story.start_chapter(premise, hints).await?;
        let session = ChapterSession::new(start.session_id.clone(), start.title, 1, start.bible);

        {
            let mut state = self.inner.ledger.lock();
            state.premise = Some(premise.to_string());
            state.install(session.clone(), ChapterPhase::AwaitingFirstScene);
        }
        info!(session_id = %start.session_id, title = %session.title(), "Story started");
        self.inner
            .observers
            .notify(&start.session_id, &SceneUpdate::ChapterStarted(session));
        Ok(start.session_id)
    }

    /// Ask the story service for the next scene of the active chapter.
    ///
    /// A new scene is appended, queued for its image and displayed. If the
    /// service ends the chapter, the next chapter is started automatically
    /// with its first scene; if that fails the chapter stays in
    /// [`ChapterPhase::ChapterComplete`] until
    /// [`start_next_chapter`](Self::start_next_chapter) is called.
    ///
    /// Scene generation errors are returned as-is and leave the chapter
    /// unchanged.
    #[instrument(skip(self), fields(session_id = %session_id))]
    pub async fn request_next_scene(&self, session_id: &SessionId) -> ReverieResult<SceneAdvance> {
        let _slot = self.inner.claim()?;
        {
            let state = self.inner.ledger.lock();
            if state.session.is_none() {
                return Err(StoryError::new(StoryErrorKind::NoActiveSession).into());
            }
            if !state.is_active(session_id) {
                return Err(
                    StoryError::new(StoryErrorKind::StaleSession(session_id.to_string())).into(),
                );
            }
            if state.phase == ChapterPhase::ChapterComplete {
                debug!("Chapter already complete; waiting for an explicit continuation");
                return Ok(SceneAdvance::ChapterComplete);
            }
        }

        match self.inner.story.next_scene(session_id).await? {
            reverie_core::NextScene::NewScene(draft) => self.inner.append(session_id, draft),
            reverie_core::NextScene::ChapterComplete => {
                self.inner.mark_complete(session_id)?;
                match self.inner.continue_story(session_id, None).await {
                    Ok(advance) => Ok(advance),
                    Err(e) => {
                        warn!(error = %e, "Automatic chapter continuation failed; manual action required");
                        Ok(SceneAdvance::ChapterComplete)
                    }
                }
            }
        }
    }

    /// Start the next chapter from a stable [`ChapterPhase::ChapterComplete`].
    ///
    /// Unlike the automatic continuation, failures are returned.
    #[instrument(skip(self))]
    pub async fn start_next_chapter(&self, hint: Option<&str>) -> ReverieResult<SceneAdvance> {
        let _slot = self.inner.claim()?;
        let previous = {
            let state = self.inner.ledger.lock();
            let session = state
                .session
                .as_ref()
                .ok_or_else(|| StoryError::new(StoryErrorKind::NoActiveSession))?;
            if state.phase != ChapterPhase::ChapterComplete {
                return Err(StoryError::new(StoryErrorKind::ChapterNotComplete(
                    *session.chapter_number(),
                ))
                .into());
            }
            session.id().clone()
        };
        self.inner.continue_story(&previous, hint).await
    }

    /// Delete a scene from the active chapter.
    ///
    /// The story service is told first; if it refuses, nothing changes
    /// locally. Later scenes shift down one index, the displayed index follows
    /// when the removed scene was at or before it, and outstanding image jobs
    /// are re-pointed.
    #[instrument(skip(self))]
    pub async fn delete_scene(&self, scene_idx: usize) -> ReverieResult<()> {
        let session_id = {
            let state = self.inner.ledger.lock();
            let session = state
                .session
                .as_ref()
                .ok_or_else(|| StoryError::new(StoryErrorKind::NoActiveSession))?;
            if scene_idx >= session.len() {
                return Err(StoryError::new(StoryErrorKind::SceneOutOfRange {
                    idx: scene_idx,
                    len: session.len(),
                })
                .into());
            }
            session.id().clone()
        };

        self.inner.story.delete_scene(&session_id, scene_idx).await?;

        {
            let mut state = self.inner.ledger.lock();
            if !state.is_active(&session_id) {
                return Err(
                    StoryError::new(StoryErrorKind::StaleSession(session_id.to_string())).into(),
                );
            }
            let len = state.session.as_ref().map_or(0, ChapterSession::len);
            let removed = state
                .session
                .as_mut()
                .and_then(|s| s.remove_scene(scene_idx));
            if removed.is_none() {
                return Err(StoryError::new(StoryErrorKind::SceneOutOfRange {
                    idx: scene_idx,
                    len,
                })
                .into());
            }
            if scene_idx <= state.current_index {
                state.current_index = state.current_index.saturating_sub(1);
            }
            state.shift_failures(scene_idx);
            self.inner.queue.scene_removed(&session_id, scene_idx);
            debug!(current_index = state.current_index, "Scene removed");
        }

        self.inner
            .observers
            .notify(&session_id, &SceneUpdate::SceneRemoved { scene_idx });
        Ok(())
    }

    /// Display a different scene.
    pub fn select_scene(&self, scene_idx: usize) -> ReverieResult<()> {
        let mut state = self.inner.ledger.lock();
        let len = state
            .session
            .as_ref()
            .ok_or_else(|| StoryError::new(StoryErrorKind::NoActiveSession))?
            .len();
        if scene_idx >= len {
            return Err(StoryError::new(StoryErrorKind::SceneOutOfRange {
                idx: scene_idx,
                len,
            })
            .into());
        }
        state.current_index = scene_idx;
        Ok(())
    }

    /// Queue a fresh image job for a scene whose image gave up.
    #[instrument(skip(self))]
    pub fn retry_image(&self, scene_idx: usize) -> ReverieResult<()> {
        let (session_id, scene) = {
            let mut state = self.inner.ledger.lock();
            let session = state
                .session
                .as_ref()
                .ok_or_else(|| StoryError::new(StoryErrorKind::NoActiveSession))?;
            let scene = session.scene(scene_idx).cloned().ok_or_else(|| {
                StoryError::new(StoryErrorKind::SceneOutOfRange {
                    idx: scene_idx,
                    len: session.len(),
                })
            })?;
            let session_id = session.id().clone();
            if !scene.needs_image() || !state.failed.remove(&scene_idx) {
                return Err(StoryError::new(StoryErrorKind::ImageNotRetryable(scene_idx)).into());
            }
            (session_id, scene)
        };

        info!(%session_id, "Retrying scene image");
        self.inner.queue.enqueue(&session_id, &scene)?;
        Ok(())
    }

    /// Session of the active chapter.
    pub fn session_id(&self) -> Option<SessionId> {
        self.inner
            .ledger
            .lock()
            .session
            .as_ref()
            .map(|s| s.id().clone())
    }

    /// Copy of the active chapter session.
    pub fn session(&self) -> Option<ChapterSession> {
        self.inner.ledger.lock().session.clone()
    }

    /// Scenes of the active chapter.
    pub fn scenes(&self) -> Vec<Scene> {
        self.inner
            .ledger
            .lock()
            .session
            .as_ref()
            .map(|s| s.scenes().to_vec())
            .unwrap_or_default()
    }

    /// Displayed scene index.
    pub fn current_index(&self) -> usize {
        self.inner.ledger.lock().current_index
    }

    /// Lifecycle state of the active chapter.
    pub fn phase(&self) -> Option<ChapterPhase> {
        let state = self.inner.ledger.lock();
        state.session.as_ref().map(|_| state.phase)
    }

    /// Premise the story was started with.
    pub fn premise(&self) -> Option<String> {
        self.inner.ledger.lock().premise.clone()
    }

    /// Superseded chapters, oldest first.
    pub fn history(&self) -> Vec<ChapterSession> {
        self.inner.ledger.lock().history.clone()
    }

    /// Point-in-time copy of the active chapter.
    pub fn view(&self) -> Option<ChapterView> {
        self.inner.ledger.lock().view()
    }

    /// Whether a story request is running.
    pub fn is_busy(&self) -> bool {
        self.inner.busy.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for StoryOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.ledger.lock();
        f.debug_struct("StoryOrchestrator")
            .field("session_id", &state.session.as_ref().map(|s| s.id().clone()))
            .field("phase", &state.phase)
            .field("current_index", &state.current_index)
            .finish()
    }
}

impl OrchestratorInner {
    fn claim(&self) -> ReverieResult<RequestSlot<'_>> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            let session = self
                .ledger
                .lock()
                .session
                .as_ref()
                .map(|s| s.id().to_string())
                .unwrap_or_default();
            return Err(StoryError::new(StoryErrorKind::GenerationInProgress(session)).into());
        }
        Ok(RequestSlot(&self.busy))
    }

    fn append(&self, session_id: &SessionId, draft: SceneDraft) -> ReverieResult<SceneAdvance> {
        let scene = {
            let mut state = self.ledger.lock();
            if !state.is_active(session_id) {
                return Err(
                    StoryError::new(StoryErrorKind::StaleSession(session_id.to_string())).into(),
                );
            }
            let scene = match state.session.as_mut() {
                Some(session) => session.push_draft(draft).clone(),
                None => return Err(StoryError::new(StoryErrorKind::NoActiveSession).into()),
            };
            state.current_index = scene.idx;
            state.phase = ChapterPhase::GeneratingScenes;
            scene
        };

        info!(scene_idx = scene.idx, "Scene appended");
        self.observers
            .notify(session_id, &SceneUpdate::SceneAppended(scene.clone()));
        self.submit(session_id, &scene);
        Ok(SceneAdvance::NewScene {
            scene_idx: scene.idx,
        })
    }

    fn mark_complete(&self, session_id: &SessionId) -> ReverieResult<()> {
        let mut state = self.ledger.lock();
        if !state.is_active(session_id) {
            return Err(StoryError::new(StoryErrorKind::StaleSession(session_id.to_string())).into());
        }
        state.phase = ChapterPhase::ChapterComplete;
        info!(%session_id, scenes = state.session.as_ref().map_or(0, ChapterSession::len), "Chapter complete");
        Ok(())
    }

    /// Create the successor of `previous` and install it once its first scene exists.
    async fn continue_story(
        &self,
        previous: &SessionId,
        hint: Option<&str>,
    ) -> ReverieResult<SceneAdvance> {
        let continuation = self.story.continue_chapter(previous, hint).await?;
        let draft = match self.story.next_scene(&continuation.session_id).await? {
            reverie_core::NextScene::NewScene(draft) => draft,
            reverie_core::NextScene::ChapterComplete => {
                return Err(GenerationError::new(GenerationErrorKind::EmptyResult).into());
            }
        };

        let title = continuation
            .title
            .unwrap_or_else(|| format!("Chapter {}", continuation.chapter_number));
        let mut session = ChapterSession::new(
            continuation.session_id.clone(),
            title,
            continuation.chapter_number,
            continuation.bible,
        );
        let scene = session.push_draft(draft).clone();

        {
            let mut state = self.ledger.lock();
            if !state.is_active(previous) {
                return Err(
                    StoryError::new(StoryErrorKind::StaleSession(previous.to_string())).into(),
                );
            }
            state.install(session.clone(), ChapterPhase::GeneratingScenes);
        }

        let session_id = continuation.session_id;
        info!(
            %session_id,
            chapter_number = continuation.chapter_number,
            "Next chapter started"
        );
        self.observers
            .notify(&session_id, &SceneUpdate::ChapterStarted(session));
        self.submit(&session_id, &scene);
        Ok(SceneAdvance::ChapterContinued {
            session_id,
            chapter_number: continuation.chapter_number,
        })
    }

    fn submit(&self, session_id: &SessionId, scene: &Scene) {
        if let Err(e) = self.queue.enqueue(session_id, scene) {
            warn!(scene_idx = scene.idx, error = %e, "Could not queue scene image");
        }
    }
}
