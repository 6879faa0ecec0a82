//! Single-flight image generation queue.
//!
//! One worker task drains a FIFO of [`ImageJob`]s, issuing at most one image
//! call at a time. Failed attempts wait out their backoff on a separate timer
//! and are then appended to the back of the FIFO, so other scenes keep
//! moving while a flaky prompt cools down.

use crate::{QueueConfig, QueueEvent};
use parking_lot::Mutex;
use reverie_core::{GenerationParams, ImageJob, ImageOutcome, JobKey, Scene, SessionId};
use reverie_error::{QueueError, ReverieResult};
use reverie_interface::{ImageDriver, ObserverSet, SceneUpdate, StoryDriver};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

const EVENT_CAPACITY: usize = 256;

#[derive(Debug)]
struct InFlight {
    key: JobKey,
    orphaned: bool,
}

enum Resolution {
    Discarded(JobKey),
    Ready {
        key: JobKey,
        url: String,
    },
    Retry {
        key: JobKey,
        token: u64,
        retry_count: u32,
        delay: Duration,
    },
    Exhausted {
        key: JobKey,
        attempts: u32,
    },
}

#[derive(Debug, Default)]
struct QueueState {
    pending: VecDeque<ImageJob>,
    in_flight: Option<InFlight>,
    backing_off: HashMap<u64, ImageJob>,
    next_token: u64,
    worker_busy: bool,
    closed: bool,
}

impl QueueState {
    fn is_outstanding(&self, key: &JobKey) -> bool {
        self.in_flight
            .as_ref()
            .is_some_and(|f| !f.orphaned && f.key == *key)
            || self.pending.iter().any(|j| j.key() == *key)
            || self.backing_off.values().any(|j| j.key() == *key)
    }

    fn outstanding(&self) -> usize {
        self.pending.len() + self.backing_off.len() + usize::from(self.worker_busy)
    }
}

/// Keys of everything the queue currently holds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueSnapshot {
    /// Jobs waiting for the worker, oldest first
    pub pending: Vec<JobKey>,
    /// Job whose generation call is running
    pub in_flight: Option<JobKey>,
    /// Jobs waiting out a backoff delay
    pub backing_off: Vec<JobKey>,
}

struct QueueInner {
    state: Mutex<QueueState>,
    wake: Notify,
    idle: watch::Sender<usize>,
    events: broadcast::Sender<QueueEvent>,
    images: Arc<dyn ImageDriver>,
    story: Arc<dyn StoryDriver>,
    observers: ObserverSet,
    config: QueueConfig,
    params: GenerationParams,
    worker: Mutex<Option<JoinHandle<()>>>,
}

/// Handle to the image generation queue.
///
/// Cloning the handle is cheap; all clones share one worker.
///
/// The queue and its observers must share a current-thread runtime. A
/// finished job's index is read under the queue lock but delivered to
/// observers after the lock is released, and only a single-threaded
/// executor keeps a concurrent deletion from landing in between.
#[derive(Clone)]
pub struct ImageQueue {
    inner: Arc<QueueInner>,
}

/// Builder for [`ImageQueue`].
pub struct ImageQueueBuilder {
    images: Arc<dyn ImageDriver>,
    story: Arc<dyn StoryDriver>,
    observers: ObserverSet,
    config: QueueConfig,
    params: GenerationParams,
}

impl ImageQueueBuilder {
    /// Builder method to set the observers that receive image updates.
    pub fn observers(mut self, observers: ObserverSet) -> Self {
        self.observers = observers;
        self
    }

    /// Builder method to set the retry policy.
    pub fn config(mut self, config: QueueConfig) -> Self {
        self.config = config;
        self
    }

    /// Builder method to set the parameters sent with every prompt.
    pub fn params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    /// Start the worker task. Must be called inside a tokio runtime.
    pub fn spawn(self) -> ImageQueue {
        let (idle, _) = watch::channel(0);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let inner = Arc::new(QueueInner {
            state: Mutex::new(QueueState::default()),
            wake: Notify::new(),
            idle,
            events,
            images: self.images,
            story: self.story,
            observers: self.observers,
            config: self.config,
            params: self.params,
            worker: Mutex::new(None),
        });
        let handle = tokio::spawn(run_worker(inner.clone()));
        *inner.worker.lock() = Some(handle);
        info!(
            provider = inner.images.provider_name(),
            max_retries = inner.config.max_retries(),
            "Image queue started"
        );
        ImageQueue { inner }
    }
}

impl ImageQueue {
    /// Start building a queue around the image service and the story service
    /// used for best-effort persistence.
    pub fn builder(images: Arc<dyn ImageDriver>, story: Arc<dyn StoryDriver>) -> ImageQueueBuilder {
        ImageQueueBuilder {
            images,
            story,
            observers: ObserverSet::new(),
            config: QueueConfig::default(),
            params: GenerationParams::default(),
        }
    }

    /// Observers receiving this queue's updates.
    pub fn observers(&self) -> &ObserverSet {
        &self.inner.observers
    }

    /// Retry policy in use.
    pub fn config(&self) -> &QueueConfig {
        &self.inner.config
    }

    /// Submit a scene for image generation.
    ///
    /// Returns `Ok(false)` without doing anything if the scene already has an
    /// image or an outstanding job (pending, in flight or backing off).
    /// Accepted jobs are announced as [`SceneUpdate::ImageQueued`].
    #[instrument(skip(self, scene), fields(session_id = %session_id, scene_idx = scene.idx))]
    pub fn enqueue(&self, session_id: &SessionId, scene: &Scene) -> ReverieResult<bool> {
        if !scene.needs_image() {
            debug!("Scene already has an image");
            return Ok(false);
        }
        let job = ImageJob::for_scene(session_id.clone(), scene);
        let key = job.key();
        {
            let mut state = self.inner.state.lock();
            if state.closed {
                return Err(QueueError::new("image queue is shut down").into());
            }
            if state.is_outstanding(&key) {
                drop(state);
                debug!(%key, "Image job already outstanding");
                self.inner.emit(QueueEvent::Duplicate(key));
                return Ok(false);
            }
            state.pending.push_back(job);
            self.inner.refresh_idle(&state);
        }

        debug!(%key, "Image job enqueued");
        self.inner.observers.notify(
            session_id,
            &SceneUpdate::ImageQueued {
                scene_idx: key.scene_idx,
            },
        );
        self.inner.emit(QueueEvent::Enqueued(key));
        self.inner.wake.notify_one();
        Ok(true)
    }

    /// Whether a scene has a job pending, in flight or backing off.
    pub fn is_outstanding(&self, session_id: &SessionId, scene_idx: usize) -> bool {
        self.inner
            .state
            .lock()
            .is_outstanding(&JobKey::new(session_id.clone(), scene_idx))
    }

    /// Keep outstanding jobs aligned with a scene deletion.
    ///
    /// Jobs for the removed scene are dropped (an in-flight one has its result
    /// discarded) and jobs for later scenes move down one index.
    #[instrument(skip(self), fields(session_id = %session_id))]
    pub fn scene_removed(&self, session_id: &SessionId, scene_idx: usize) {
        let mut discarded = Vec::new();
        {
            let mut state = self.inner.state.lock();
            let shift = |job: &mut ImageJob| {
                if job.session_id == *session_id && job.scene_idx > scene_idx {
                    job.scene_idx -= 1;
                }
            };

            let removed_key = JobKey::new(session_id.clone(), scene_idx);
            state.pending.retain(|job| {
                let keep = job.key() != removed_key;
                if !keep {
                    discarded.push(job.key());
                }
                keep
            });
            state.pending.iter_mut().for_each(shift);

            state.backing_off.retain(|_, job| {
                let keep = job.key() != removed_key;
                if !keep {
                    discarded.push(job.key());
                }
                keep
            });
            state.backing_off.values_mut().for_each(shift);

            if let Some(flight) = state.in_flight.as_mut() {
                if flight.key.session_id == *session_id && !flight.orphaned {
                    if flight.key.scene_idx == scene_idx {
                        flight.orphaned = true;
                        discarded.push(removed_key.clone());
                    } else if flight.key.scene_idx > scene_idx {
                        flight.key.scene_idx -= 1;
                    }
                }
            }
            self.inner.refresh_idle(&state);
        }
        for key in discarded {
            debug!(%key, "Dropped image job for deleted scene");
            self.inner.emit(QueueEvent::Discarded(key));
        }
    }

    /// Keys of everything currently held.
    pub fn snapshot(&self) -> QueueSnapshot {
        let state = self.inner.state.lock();
        let mut backing_off: Vec<JobKey> = state.backing_off.values().map(ImageJob::key).collect();
        backing_off.sort();
        QueueSnapshot {
            pending: state.pending.iter().map(ImageJob::key).collect(),
            in_flight: state
                .in_flight
                .as_ref()
                .filter(|f| !f.orphaned)
                .map(|f| f.key.clone()),
            backing_off,
        }
    }

    /// Subscribe to job lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.inner.events.subscribe()
    }

    /// Resolve once no job is pending, running or backing off.
    pub async fn wait_idle(&self) {
        let mut idle = self.inner.idle.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = idle.wait_for(|outstanding| *outstanding == 0).await;
    }

    /// Stop the worker after its current job. Jobs still queued are dropped.
    pub async fn shutdown(&self) {
        {
            let mut state = self.inner.state.lock();
            state.closed = true;
            state.pending.clear();
            state.backing_off.clear();
            self.inner.refresh_idle(&state);
        }
        self.inner.wake.notify_one();
        let handle = self.inner.worker.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!(error = %e, "Image queue worker panicked");
            }
        }
        info!("Image queue stopped");
    }
}

impl std::fmt::Debug for ImageQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageQueue")
            .field("snapshot", &self.snapshot())
            .finish()
    }
}

async fn run_worker(inner: Arc<QueueInner>) {
    loop {
        let job = {
            let mut state = inner.state.lock();
            if state.closed {
                break;
            }
            let job = state.pending.pop_front();
            if let Some(job) = &job {
                state.in_flight = Some(InFlight {
                    key: job.key(),
                    orphaned: false,
                });
                state.worker_busy = true;
            }
            job
        };

        match job {
            Some(job) => {
                inner.process(job).await;
                let mut state = inner.state.lock();
                state.worker_busy = false;
                inner.refresh_idle(&state);
            }
            None => inner.wake.notified().await,
        }
    }
    debug!("Image queue worker exited");
}

impl QueueInner {
    fn emit(&self, event: QueueEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn refresh_idle(&self, state: &QueueState) {
        self.idle.send_replace(state.outstanding());
    }

    #[instrument(skip(self, job), fields(key = %job.key(), attempt = job.retry_count + 1))]
    async fn process(self: &Arc<Self>, job: ImageJob) {
        let attempt = job.retry_count + 1;
        self.emit(QueueEvent::Started {
            key: job.key(),
            attempt,
        });
        debug!(prompt = %job.image_prompt, "Requesting image");

        let asset = match self
            .images
            .generate_image(&job.image_prompt, &job.negative_prompt, &self.params)
            .await
        {
            Ok(ImageOutcome::Asset(url)) => Some(url),
            Ok(ImageOutcome::NoResult) => {
                warn!(attempt, "Image service returned no assets");
                None
            }
            Err(e) => {
                warn!(attempt, error = %e, "Image generation failed");
                None
            }
        };

        match self.resolve(job, asset) {
            Resolution::Discarded(key) => {
                debug!(%key, "Scene deleted while its image was generating; result dropped");
            }
            Resolution::Ready { key, url } => self.complete(key, url).await,
            Resolution::Retry {
                key,
                token,
                retry_count,
                delay,
            } => {
                debug!(%key, retry_count, delay_ms = delay.as_millis() as u64, "Retry scheduled");
                self.emit(QueueEvent::RetryScheduled {
                    key,
                    retry_count,
                    delay,
                });
                let inner = Arc::clone(self);
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    inner.requeue(token);
                });
            }
            Resolution::Exhausted { key, attempts } => {
                error!(%key, attempts, "Image retries exhausted");
                self.observers.notify(
                    &key.session_id,
                    &SceneUpdate::ImageFailed {
                        scene_idx: key.scene_idx,
                    },
                );
                self.emit(QueueEvent::Exhausted { key, attempts });
            }
        }
    }

    /// Clear the in-flight slot and decide what happens to the job.
    ///
    /// A retried job moves to `backing_off` in the same critical section, so
    /// it stays outstanding for dedup. A ready job's index is only stable
    /// until the caller yields; see [`ImageQueue`].
    fn resolve(&self, job: ImageJob, asset: Option<String>) -> Resolution {
        let mut state = self.state.lock();
        let key = match state.in_flight.take() {
            // The scene may have moved while the call was running.
            Some(InFlight {
                key,
                orphaned: false,
            }) => key,
            _ => return Resolution::Discarded(job.key()),
        };
        if let Some(url) = asset {
            return Resolution::Ready { key, url };
        }

        let job = ImageJob {
            scene_idx: key.scene_idx,
            ..job
        };
        if state.closed || !self.config.should_retry(job.retry_count) {
            return Resolution::Exhausted {
                key,
                attempts: job.retry_count + 1,
            };
        }

        let delay = self.config.backoff_delay(job.retry_count);
        let job = job.retried();
        let retry_count = job.retry_count;
        let token = state.next_token;
        state.next_token += 1;
        state.backing_off.insert(token, job);
        self.refresh_idle(&state);
        Resolution::Retry {
            key,
            token,
            retry_count,
            delay,
        }
    }

    async fn complete(&self, key: JobKey, url: String) {
        info!(%key, %url, "Scene image ready");
        self.observers.notify(
            &key.session_id,
            &SceneUpdate::ImageReady {
                scene_idx: key.scene_idx,
                url: url.clone(),
            },
        );
        self.emit(QueueEvent::Succeeded {
            key: key.clone(),
            url: url.clone(),
        });

        if let Err(e) = self
            .story
            .persist_scene_image(&key.session_id, key.scene_idx, &url)
            .await
        {
            warn!(%key, error = %e, "Failed to persist scene image; keeping in-memory result");
            self.emit(QueueEvent::PersistFailed(key));
        }
    }

    fn requeue(&self, token: u64) {
        let mut state = self.state.lock();
        if let Some(job) = state.backing_off.remove(&token) {
            debug!(key = %job.key(), "Backoff elapsed; job re-appended");
            state.pending.push_back(job);
            self.refresh_idle(&state);
            drop(state);
            self.wake.notify_one();
        }
    }
}
