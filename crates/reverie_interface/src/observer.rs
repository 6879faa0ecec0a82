//! Index-keyed change notifications between the canonical scene list and its views.
//!
//! The orchestrator and the image queue never hand out references into their
//! state. Instead every mutation is described as a [`SceneUpdate`] addressed
//! by session and scene index, and each registered [`SceneObserver`] decides
//! at delivery time whether it still cares.

use parking_lot::RwLock;
use reverie_core::{ChapterSession, Scene, SessionId};
use std::sync::Arc;

/// A single change to a chapter's scene list.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneUpdate {
    /// An image job was accepted for the scene
    ImageQueued {
        /// Scene index
        scene_idx: usize,
    },
    /// The scene's image is available
    ImageReady {
        /// Scene index
        scene_idx: usize,
        /// Asset reference
        url: String,
    },
    /// The scene's image job gave up
    ImageFailed {
        /// Scene index
        scene_idx: usize,
    },
    /// A scene was appended to the chapter
    SceneAppended(Scene),
    /// A scene was removed and later scenes shifted down
    SceneRemoved {
        /// Index the removed scene had
        scene_idx: usize,
    },
    /// A new chapter replaced the current one
    ChapterStarted(ChapterSession),
}

/// Receiver of scene updates.
///
/// Implementations must be cheap and must not block: they are called from
/// the queue worker and from orchestrator operations.
pub trait SceneObserver: Send + Sync {
    /// Apply an update for the given session.
    fn apply(&self, session_id: &SessionId, update: &SceneUpdate);
}

/// Registry of observers shared by everything that mutates scenes.
#[derive(Clone, Default)]
pub struct ObserverSet {
    observers: Arc<RwLock<Vec<Arc<dyn SceneObserver>>>>,
}

impl ObserverSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an observer. Observers are notified in registration order.
    pub fn register(&self, observer: Arc<dyn SceneObserver>) {
        self.observers.write().push(observer);
    }

    /// Number of registered observers.
    pub fn len(&self) -> usize {
        self.observers.read().len()
    }

    /// Whether no observer is registered.
    pub fn is_empty(&self) -> bool {
        self.observers.read().is_empty()
    }

    /// Deliver an update to every observer.
    pub fn notify(&self, session_id: &SessionId, update: &SceneUpdate) {
        // Observers may register others while handling an update.
        let observers = self.observers.read().clone();
        tracing::trace!(session_id = %session_id, ?update, observers = observers.len(), "Notifying scene observers");
        for observer in observers {
            observer.apply(session_id, update);
        }
    }
}

impl std::fmt::Debug for ObserverSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverSet")
            .field("observers", &self.len())
            .finish()
    }
}
