//! Canonical scene list of the active chapter.

use crate::ChapterPhase;
use parking_lot::{Mutex, MutexGuard};
use reverie_core::{ChapterSession, Scene, SessionId};
use reverie_interface::{SceneObserver, SceneUpdate};
use std::collections::BTreeSet;
use tracing::{debug, trace};

/// Point-in-time copy of the active chapter.
#[derive(Debug, Clone, PartialEq)]
pub struct ChapterView {
    /// Session of the chapter
    pub session_id: SessionId,
    /// Chapter number
    pub chapter_number: u32,
    /// Scenes in index order
    pub scenes: Vec<Scene>,
    /// Indices whose image job gave up
    pub failed: BTreeSet<usize>,
    /// Displayed index
    pub current_index: usize,
    /// Lifecycle state
    pub phase: ChapterPhase,
}

#[derive(Debug, Default)]
pub(crate) struct LedgerState {
    pub(crate) premise: Option<String>,
    pub(crate) session: Option<ChapterSession>,
    pub(crate) current_index: usize,
    pub(crate) phase: ChapterPhase,
    pub(crate) failed: BTreeSet<usize>,
    pub(crate) history: Vec<ChapterSession>,
}

impl LedgerState {
    pub(crate) fn is_active(&self, session_id: &SessionId) -> bool {
        self.session.as_ref().is_some_and(|s| s.id() == session_id)
    }

    pub(crate) fn view(&self) -> Option<ChapterView> {
        self.session.as_ref().map(|session| ChapterView {
            session_id: session.id().clone(),
            chapter_number: *session.chapter_number(),
            scenes: session.scenes().to_vec(),
            failed: self.failed.clone(),
            current_index: self.current_index,
            phase: self.phase,
        })
    }

    /// Replace the active chapter, moving the old one to history.
    pub(crate) fn install(&mut self, session: ChapterSession, phase: ChapterPhase) {
        if let Some(previous) = self.session.replace(session) {
            self.history.push(previous);
        }
        self.current_index = 0;
        self.phase = phase;
        self.failed.clear();
    }

    /// Drop a failure mark and close the gap left by a removed scene.
    pub(crate) fn shift_failures(&mut self, removed: usize) {
        self.failed = std::mem::take(&mut self.failed)
            .into_iter()
            .filter(|&idx| idx != removed)
            .map(|idx| if idx > removed { idx - 1 } else { idx })
            .collect();
    }
}

/// The orchestrator's source of truth, kept current with image results.
#[derive(Debug, Default)]
pub(crate) struct CanonicalLedger {
    state: Mutex<LedgerState>,
}

impl CanonicalLedger {
    pub(crate) fn lock(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock()
    }
}

impl SceneObserver for CanonicalLedger {
    fn apply(&self, session_id: &SessionId, update: &SceneUpdate) {
        let mut state = self.state.lock();
        if !state.is_active(session_id) {
            trace!(%session_id, "Ignoring update for inactive session");
            return;
        }
        match update {
            SceneUpdate::ImageQueued { scene_idx } => {
                state.failed.remove(scene_idx);
            }
            SceneUpdate::ImageReady { scene_idx, url } => {
                let applied = state
                    .session
                    .as_mut()
                    .is_some_and(|s| s.set_image_url(*scene_idx, url.clone()));
                if applied {
                    state.failed.remove(scene_idx);
                } else {
                    debug!(scene_idx, "Image arrived for a scene that no longer exists");
                }
            }
            SceneUpdate::ImageFailed { scene_idx } => {
                state.failed.insert(*scene_idx);
            }
            // Structural changes originate here.
            SceneUpdate::SceneAppended(_)
            | SceneUpdate::SceneRemoved { .. }
            | SceneUpdate::ChapterStarted(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reverie_core::{SceneDraft, StoryBible};

    fn ledger_with(n: usize) -> CanonicalLedger {
        let mut session = ChapterSession::new("s1", "t", 1, StoryBible::default());
        for k in 0..n {
            session.push_draft(SceneDraft {
                narration: format!("n{k}"),
                image_prompt: format!("p{k}"),
                negative_prompt: String::new(),
                duration_s: 5.0,
            });
        }
        let ledger = CanonicalLedger::default();
        ledger
            .lock()
            .install(session, ChapterPhase::GeneratingScenes);
        ledger
    }

    #[test]
    fn test_image_results_apply_to_active_session_only() {
        let ledger = ledger_with(2);
        let ready = SceneUpdate::ImageReady {
            scene_idx: 1,
            url: "u".to_string(),
        };
        ledger.apply(&SessionId::new("old"), &ready);
        assert!(ledger.lock().view().unwrap().scenes[1].image_url.is_none());

        ledger.apply(&SessionId::new("s1"), &ready);
        assert_eq!(
            ledger.lock().view().unwrap().scenes[1].image_url.as_deref(),
            Some("u")
        );
    }

    #[test]
    fn test_failures_tracked_and_shifted() {
        let ledger = ledger_with(4);
        let s1 = SessionId::new("s1");
        ledger.apply(&s1, &SceneUpdate::ImageFailed { scene_idx: 1 });
        ledger.apply(&s1, &SceneUpdate::ImageFailed { scene_idx: 3 });

        let mut state = ledger.lock();
        state.shift_failures(1);
        assert_eq!(state.failed.iter().copied().collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn test_requeue_clears_failure() {
        let ledger = ledger_with(1);
        let s1 = SessionId::new("s1");
        ledger.apply(&s1, &SceneUpdate::ImageFailed { scene_idx: 0 });
        ledger.apply(&s1, &SceneUpdate::ImageQueued { scene_idx: 0 });
        assert!(ledger.lock().failed.is_empty());
    }

    #[test]
    fn test_install_moves_previous_chapter_to_history() {
        let ledger = ledger_with(1);
        let next = ChapterSession::new("s2", "t2", 2, StoryBible::default());
        let mut state = ledger.lock();
        state.install(next, ChapterPhase::GeneratingScenes);
        assert_eq!(state.history.len(), 1);
        assert_eq!(state.history[0].id().as_str(), "s1");
        assert!(state.is_active(&SessionId::new("s2")));
    }
}
