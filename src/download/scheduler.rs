//! Download scheduler with bounded concurrency and cooperative cancellation.
//!
//! The scheduler owns every active job. All bookkeeping (active jobs, FIFO
//! queue, running count, completed ids, subscribers) lives in one struct
//! behind one lock. Engine calls run outside the lock on Tokio's blocking
//! pool, so a slow download never holds up admission or cancellation.
//!
//! Notifications are pushed onto unbounded channels while the lock is held.
//! That keeps the per-id order intact without ever blocking a worker.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use clipfetch_core::download::{DownloadOptions, DownloadScheduler, VideoQuality, YtDlpEngine};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let scheduler = DownloadScheduler::new(Arc::new(YtDlpEngine::new()), 2)?;
//! let mut notifications = scheduler.subscribe();
//! let options = DownloadOptions::new("./videos", VideoQuality::Fhd, true);
//! scheduler.submit("https://youtu.be/dQw4w9WgXcQ", options).ok();
//! while let Some(notification) = notifications.recv().await {
//!     println!("{notification:?}");
//! }
//! # Ok(())
//! # }
//! ```

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, instrument, warn};

use super::fetch::{FetchEngine, FetchRequest, ProgressControl, ProgressEvent};
use super::job::{Job, JobStatus};
use super::options::DownloadOptions;
use super::{FetchError, SchedulerError, SubmitRejection};
use crate::observer::Notification;
use crate::parser::{VideoId, recognize};

/// Minimum allowed concurrency value.
pub const MIN_CONCURRENCY: usize = 1;

/// Maximum allowed concurrency value.
pub const MAX_CONCURRENCY: usize = 100;

/// Default number of simultaneous downloads.
pub const DEFAULT_CONCURRENCY: usize = 2;

/// Failure reason reported when a worker dies without an engine result.
pub const UNEXPECTED_WORKER_FAILURE: &str = "unexpected worker failure";

/// Result of a cancellation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// The job was still queued and has been removed.
    Dequeued,
    /// The job is running; its engine will be asked to stop on the next tick.
    Requested,
    /// No active job has this id.
    NotActive,
}

/// Bounded-concurrency download scheduler.
///
/// Cheap to clone; clones share the same state. Must be created inside a
/// Tokio runtime, which is used to run workers.
///
/// # Concurrency Model
///
/// - Jobs are dispatched FIFO while `running_count < max_concurrency`
/// - Each running job gets one blocking worker that calls the fetch engine
/// - Lowering the ceiling never aborts running jobs; it only delays dispatch
/// - Every status transition happens under the scheduler lock, and a job
///   leaves the active set exactly once
#[derive(Clone)]
pub struct DownloadScheduler {
    inner: Arc<Inner>,
}

struct Inner {
    state: Mutex<SchedulerState>,
    engine: Arc<dyn FetchEngine>,
    runtime: Handle,
    /// Mirrors the number of active (queued + running) jobs.
    active: watch::Sender<usize>,
}

struct SchedulerState {
    jobs: HashMap<VideoId, Job>,
    queue: VecDeque<VideoId>,
    completed: HashSet<VideoId>,
    running: usize,
    max_concurrency: usize,
    accepting: bool,
    subscribers: Vec<mpsc::UnboundedSender<Notification>>,
}

impl SchedulerState {
    fn emit(&mut self, notification: &Notification) {
        self.subscribers
            .retain(|subscriber| subscriber.send(notification.clone()).is_ok());
    }
}

/// How a worker execution ended.
enum WorkerOutcome {
    Finished,
    Failed(String),
    Cancelled,
}

/// Everything a worker needs; detached from the scheduler state.
struct WorkerTask {
    id: VideoId,
    url: String,
    options: Arc<DownloadOptions>,
    cancel: Arc<AtomicBool>,
}

impl DownloadScheduler {
    /// Creates a scheduler running at most `max_concurrency` downloads at once.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidConcurrency`] if the value is outside
    /// 1-100, and [`SchedulerError::NoRuntime`] when called outside a Tokio
    /// runtime.
    #[instrument(level = "debug", skip(engine))]
    pub fn new(
        engine: Arc<dyn FetchEngine>,
        max_concurrency: usize,
    ) -> Result<Self, SchedulerError> {
        validate_concurrency(max_concurrency)?;
        let runtime = Handle::try_current().map_err(|_| SchedulerError::NoRuntime)?;
        let (active, _) = watch::channel(0);

        debug!(max_concurrency, "creating download scheduler");

        Ok(Self {
            inner: Arc::new(Inner {
                state: Mutex::new(SchedulerState {
                    jobs: HashMap::new(),
                    queue: VecDeque::new(),
                    completed: HashSet::new(),
                    running: 0,
                    max_concurrency,
                    accepting: true,
                    subscribers: Vec::new(),
                }),
                engine,
                runtime,
                active,
            }),
        })
    }

    /// Changes the concurrency ceiling.
    ///
    /// Raising it dispatches queued jobs immediately. Lowering it lets running
    /// jobs finish and holds back dispatch until the count drops below the
    /// new ceiling.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidConcurrency`] if the value is outside 1-100.
    #[instrument(skip(self))]
    pub fn configure(&self, max_concurrency: usize) -> Result<(), SchedulerError> {
        validate_concurrency(max_concurrency)?;
        let mut state = self.inner.state.lock();
        info!(
            previous = state.max_concurrency,
            max_concurrency, "updating concurrency limit"
        );
        state.max_concurrency = max_concurrency;
        self.dispatch(&mut state);
        Ok(())
    }

    /// Registers a new notification subscriber.
    ///
    /// The receiver gets every notification emitted after this call.
    #[must_use]
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<Notification> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.state.lock().subscribers.push(tx);
        rx
    }

    /// Submits `url` for download with the given option snapshot.
    ///
    /// # Errors
    ///
    /// Returns a [`SubmitRejection`] when the URL is not recognized, the video
    /// was already downloaded, a job for it is active, or the scheduler is
    /// shutting down. Rejections leave the scheduler untouched.
    #[instrument(skip(self, options))]
    pub fn submit(&self, url: &str, options: DownloadOptions) -> Result<VideoId, SubmitRejection> {
        let Some(id) = recognize(url) else {
            debug!("rejected: not a video URL");
            return Err(SubmitRejection::Unrecognized);
        };

        let mut state = self.inner.state.lock();
        let rejection = if !state.accepting {
            Some(SubmitRejection::ShuttingDown)
        } else if state.completed.contains(&id) {
            Some(SubmitRejection::AlreadyCompleted)
        } else if state.jobs.contains_key(&id) {
            Some(SubmitRejection::AlreadyActive)
        } else {
            None
        };
        if let Some(rejection) = rejection {
            debug!(id = %id, %rejection, "submission rejected");
            return Err(rejection);
        }

        info!(id = %id, url = %url, "job queued");
        state
            .jobs
            .insert(id.clone(), Job::new(id.clone(), url.trim(), options));
        state.queue.push_back(id.clone());
        self.dispatch(&mut state);
        Ok(id)
    }

    /// Cancels the job for `id`.
    ///
    /// A queued job is removed at once and reported as cancelled. A running
    /// job is flagged; its engine observes the flag on the next progress tick.
    #[instrument(skip(self))]
    pub fn cancel(&self, id: &VideoId) -> CancelOutcome {
        let mut state = self.inner.state.lock();
        let queued = match state.jobs.get(id) {
            Some(job) if job.status() == &JobStatus::Queued => true,
            Some(job) => {
                job.request_cancel();
                false
            }
            None => {
                debug!(id = %id, "cancel ignored: job not active");
                return CancelOutcome::NotActive;
            }
        };

        if queued {
            Self::drop_queued(&mut state, id);
            self.publish_active(&state);
            CancelOutcome::Dequeued
        } else {
            info!(id = %id, "cancellation requested for running job");
            CancelOutcome::Requested
        }
    }

    /// Stops accepting submissions.
    ///
    /// Jobs already queued still run as slots free up. With `wait`, resolves
    /// once every accepted job has reached a terminal state. Without it,
    /// returns immediately and the jobs finish in the background. Use
    /// [`cancel_all`](Self::cancel_all) to drop outstanding work instead.
    #[instrument(skip(self))]
    pub async fn shutdown(&self, wait: bool) {
        {
            let mut state = self.inner.state.lock();
            state.accepting = false;
            info!(
                queued = state.queue.len(),
                running = state.running,
                wait,
                "scheduler shutting down"
            );
        }

        if wait {
            self.wait_idle().await;
            info!("all downloads settled");
        }
    }

    /// Cancels every active job: queued jobs are dropped at once and running
    /// jobs are flagged. Returns how many jobs were affected.
    #[instrument(skip(self))]
    pub fn cancel_all(&self) -> usize {
        let mut state = self.inner.state.lock();
        let queued: Vec<VideoId> = state.queue.iter().cloned().collect();
        for id in &queued {
            Self::drop_queued(&mut state, id);
        }
        // Only running jobs remain once the queue is gone.
        for job in state.jobs.values() {
            job.request_cancel();
        }
        let running = state.jobs.len();
        info!(
            dequeued = queued.len(),
            running, "cancelling all downloads"
        );
        self.publish_active(&state);
        queued.len() + running
    }

    /// Resolves once no job is queued or running.
    pub async fn wait_idle(&self) {
        let mut active = self.inner.active.subscribe();
        // The sender lives as long as `self`, so this only returns on idle.
        let _ = active.wait_for(|count| *count == 0).await;
    }

    /// Returns a snapshot of the active job for `id`.
    #[must_use]
    pub fn job(&self, id: &VideoId) -> Option<Job> {
        self.inner.state.lock().jobs.get(id).cloned()
    }

    /// Returns snapshots of all queued and running jobs.
    #[must_use]
    pub fn active_jobs(&self) -> Vec<Job> {
        self.inner.state.lock().jobs.values().cloned().collect()
    }

    /// Number of jobs currently running.
    #[must_use]
    pub fn running_count(&self) -> usize {
        self.inner.state.lock().running
    }

    /// Number of jobs waiting for a slot.
    #[must_use]
    pub fn queued_count(&self) -> usize {
        self.inner.state.lock().queue.len()
    }

    /// Current concurrency ceiling.
    #[must_use]
    pub fn max_concurrency(&self) -> usize {
        self.inner.state.lock().max_concurrency
    }

    /// Returns true if `id` finished successfully during this run.
    #[must_use]
    pub fn is_completed(&self, id: &VideoId) -> bool {
        self.inner.state.lock().completed.contains(id)
    }

    /// Returns true while submissions are accepted.
    #[must_use]
    pub fn is_accepting(&self) -> bool {
        self.inner.state.lock().accepting
    }

    /// Starts queued jobs while there is headroom.
    fn dispatch(&self, state: &mut SchedulerState) {
        while state.running < state.max_concurrency {
            let Some(id) = state.queue.pop_front() else {
                break;
            };
            let Some(job) = state.jobs.get_mut(&id) else {
                continue;
            };

            job.mark_running();
            let task = WorkerTask {
                id: id.clone(),
                url: job.source_url().to_string(),
                options: job.shared_options(),
                cancel: job.cancel_flag(),
            };
            state.running += 1;
            debug!(
                id = %id,
                running = state.running,
                max = state.max_concurrency,
                "job dispatched"
            );
            state.emit(&Notification::Progress {
                id,
                percent: 0.0,
            });
            self.spawn_worker(task);
        }
        self.publish_active(state);
    }

    fn spawn_worker(&self, task: WorkerTask) {
        let scheduler = self.clone();
        self.inner.runtime.spawn(async move {
            let id = task.id.clone();
            let cancel = Arc::clone(&task.cancel);
            let engine = Arc::clone(&scheduler.inner.engine);
            let reporter = scheduler.clone();

            let handle =
                tokio::task::spawn_blocking(move || run_fetch(engine.as_ref(), &task, &reporter));

            let outcome = match handle.await {
                Ok(Ok(())) => WorkerOutcome::Finished,
                Ok(Err(FetchError::Interrupted)) => WorkerOutcome::Cancelled,
                Ok(Err(e)) if cancel.load(Ordering::SeqCst) => {
                    debug!(id = %id, error = %e, "engine stopped after cancellation");
                    WorkerOutcome::Cancelled
                }
                Ok(Err(e)) => WorkerOutcome::Failed(e.to_string()),
                Err(join_error) => {
                    warn!(id = %id, error = %join_error, "download worker panicked");
                    WorkerOutcome::Failed(UNEXPECTED_WORKER_FAILURE.to_string())
                }
            };

            scheduler.complete(&id, outcome);
        });
    }

    fn report_progress(&self, id: &VideoId, percent: f64) {
        let mut state = self.inner.state.lock();
        let accepted = state
            .jobs
            .get_mut(id)
            .and_then(|job| job.advance_progress(percent));
        if let Some(percent) = accepted {
            state.emit(&Notification::Progress {
                id: id.clone(),
                percent,
            });
        }
    }

    /// Applies the single terminal transition of a running job.
    fn complete(&self, id: &VideoId, outcome: WorkerOutcome) {
        let mut state = self.inner.state.lock();
        let Some(mut job) = state.jobs.remove(id) else {
            warn!(id = %id, "completion for unknown job ignored");
            return;
        };
        if job.status() != &JobStatus::Running {
            warn!(id = %id, status = %job.status(), "completion for job that is not running ignored");
            state.jobs.insert(id.clone(), job);
            return;
        }

        state.running = state.running.saturating_sub(1);
        let status = match outcome {
            WorkerOutcome::Finished => {
                if job.progress() < 100.0 {
                    state.emit(&Notification::Progress {
                        id: id.clone(),
                        percent: 100.0,
                    });
                }
                state.completed.insert(id.clone());
                info!(id = %id, "download finished");
                state.emit(&Notification::Finished { id: id.clone() });
                JobStatus::Finished
            }
            WorkerOutcome::Failed(reason) => {
                warn!(id = %id, url = %job.source_url(), %reason, "download failed");
                state.emit(&Notification::Error {
                    id: id.clone(),
                    url: job.source_url().to_string(),
                    reason: reason.clone(),
                });
                JobStatus::Failed(reason)
            }
            WorkerOutcome::Cancelled => {
                info!(id = %id, "download cancelled");
                state.emit(&Notification::Cancelled { id: id.clone() });
                JobStatus::Cancelled
            }
        };
        job.set_terminal(status);
        debug!(id = %id, status = %job.status(), running = state.running, "job settled");

        self.dispatch(&mut state);
    }

    fn drop_queued(state: &mut SchedulerState, id: &VideoId) {
        state.queue.retain(|queued| queued != id);
        if state.jobs.remove(id).is_some() {
            info!(id = %id, "queued job cancelled");
            state.emit(&Notification::Cancelled { id: id.clone() });
        }
    }

    fn publish_active(&self, state: &SchedulerState) {
        self.inner.active.send_replace(state.jobs.len());
    }
}

impl fmt::Debug for DownloadScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("DownloadScheduler")
            .field("max_concurrency", &state.max_concurrency)
            .field("running", &state.running)
            .field("queued", &state.queue.len())
            .field("completed", &state.completed.len())
            .field("accepting", &state.accepting)
            .finish_non_exhaustive()
    }
}

/// Runs the engine for one job, translating callbacks into scheduler reports.
fn run_fetch(
    engine: &dyn FetchEngine,
    task: &WorkerTask,
    scheduler: &DownloadScheduler,
) -> Result<(), FetchError> {
    let request = FetchRequest::new(task.url.clone(), &task.options);
    let mut on_progress = |event: ProgressEvent| {
        if task.cancel.load(Ordering::SeqCst) {
            return ProgressControl::Abort;
        }
        scheduler.report_progress(&task.id, event.percent());
        ProgressControl::Continue
    };
    engine.fetch(&request, &mut on_progress)
}

fn validate_concurrency(value: usize) -> Result<(), SchedulerError> {
    if (MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&value) {
        Ok(())
    } else {
        Err(SchedulerError::InvalidConcurrency { value })
    }
}
