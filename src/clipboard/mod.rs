//! Clipboard monitoring: turn copied video URLs into download jobs.
//!
//! Two triggers drive the monitor: a fixed poll interval and external change
//! notifications. Both go through [`ClipboardMonitor::check`], which reads,
//! compares, submits and clears under one lock, so the two can race freely
//! without double submissions.

mod command;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, trace, warn};

pub use command::CommandClipboard;

use crate::download::{DownloadOptions, DownloadScheduler, SubmitRejection};
use crate::parser::VideoId;

/// Default interval between clipboard polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Errors from a clipboard backend.
#[derive(Debug, Error)]
pub enum ClipboardError {
    /// No usable clipboard backend was found on this system.
    #[error("no clipboard tool found\n  Suggestion: {suggestion}")]
    Unavailable {
        /// What to install or configure.
        suggestion: &'static str,
    },

    /// A clipboard command could not be run.
    #[error("clipboard command '{program}' failed: {source}")]
    Command {
        /// Program that failed.
        program: String,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// Access to a clipboard holding text.
pub trait ClipboardSource: Send + 'static {
    /// Returns the current text; an empty clipboard reads as an empty string.
    ///
    /// # Errors
    ///
    /// Returns [`ClipboardError`] when the backend cannot be queried.
    fn read_text(&mut self) -> Result<String, ClipboardError>;

    /// Empties the clipboard.
    ///
    /// # Errors
    ///
    /// Returns [`ClipboardError`] when the backend cannot be updated.
    fn clear(&mut self) -> Result<(), ClipboardError>;
}

/// In-process clipboard whose clones share one buffer.
#[derive(Debug, Clone, Default)]
pub struct MemoryClipboard {
    text: Arc<Mutex<String>>,
}

impl MemoryClipboard {
    /// Creates a clipboard holding `text`.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Arc::new(Mutex::new(text.into())),
        }
    }

    /// Replaces the clipboard content.
    pub fn set_text(&self, text: impl Into<String>) {
        *self.text.lock() = text.into();
    }

    /// Returns the clipboard content.
    #[must_use]
    pub fn text(&self) -> String {
        self.text.lock().clone()
    }
}

impl ClipboardSource for MemoryClipboard {
    fn read_text(&mut self) -> Result<String, ClipboardError> {
        Ok(self.text())
    }

    fn clear(&mut self) -> Result<(), ClipboardError> {
        self.text.lock().clear();
        Ok(())
    }
}

/// Result of one clipboard check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    /// Same text as last time.
    Unchanged,
    /// New text, but not a video URL.
    NotVideo,
    /// A job was submitted for this id.
    Submitted(VideoId),
    /// A video URL was found but the scheduler declined it.
    Rejected(SubmitRejection),
}

/// Watches a clipboard and submits new video URLs.
///
/// Cheap to clone; clones share the clipboard and last-seen text.
#[derive(Clone)]
pub struct ClipboardMonitor {
    inner: Arc<MonitorInner>,
}

struct MonitorInner {
    state: Mutex<MonitorState>,
    scheduler: DownloadScheduler,
    options: watch::Receiver<DownloadOptions>,
}

struct MonitorState {
    source: Box<dyn ClipboardSource>,
    last_seen: Option<String>,
}

impl ClipboardMonitor {
    /// Creates a monitor.
    ///
    /// Text already on the clipboard counts as seen, so it is not submitted.
    /// `options` supplies the snapshot taken for each submission; updating
    /// it only affects later submissions.
    pub fn new(
        mut source: impl ClipboardSource,
        scheduler: DownloadScheduler,
        options: watch::Receiver<DownloadOptions>,
    ) -> Self {
        let last_seen = match source.read_text() {
            Ok(text) => Some(text),
            Err(e) => {
                warn!(error = %e, "could not read initial clipboard content");
                None
            }
        };

        Self {
            inner: Arc::new(MonitorInner {
                state: Mutex::new(MonitorState {
                    source: Box::new(source),
                    last_seen,
                }),
                scheduler,
                options,
            }),
        }
    }

    /// Reads the clipboard and submits it if it is a new video URL.
    ///
    /// Recognized URLs are cleared from the clipboard whether or not the
    /// scheduler accepted them.
    ///
    /// # Errors
    ///
    /// Returns [`ClipboardError`] when the clipboard cannot be read.
    pub fn check(&self) -> Result<CheckOutcome, ClipboardError> {
        let mut state = self.inner.state.lock();
        let text = state.source.read_text()?;
        if state.last_seen.as_deref() == Some(text.as_str()) {
            return Ok(CheckOutcome::Unchanged);
        }
        state.last_seen = Some(text.clone());

        let options = self.inner.options.borrow().clone();
        let outcome = match self.inner.scheduler.submit(&text, options) {
            Ok(id) => {
                info!(id = %id, "video URL captured from clipboard");
                CheckOutcome::Submitted(id)
            }
            Err(SubmitRejection::Unrecognized) => {
                trace!("clipboard text is not a video URL");
                return Ok(CheckOutcome::NotVideo);
            }
            Err(rejection) => {
                debug!(%rejection, "clipboard video URL not submitted");
                CheckOutcome::Rejected(rejection)
            }
        };

        match state.source.clear() {
            Ok(()) => state.last_seen = Some(String::new()),
            Err(e) => warn!(error = %e, "failed to clear clipboard"),
        }
        Ok(outcome)
    }

    /// Runs until `shutdown` resolves, checking on every poll tick and on
    /// every message from `changes`.
    #[instrument(skip(self, changes, shutdown))]
    pub async fn run(
        &self,
        poll_interval: Duration,
        mut changes: mpsc::UnboundedReceiver<()>,
        shutdown: impl Future<Output = ()>,
    ) {
        let mut ticker = tokio::time::interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);
        let mut changes_open = true;

        info!("clipboard monitor started");
        loop {
            tokio::select! {
                () = &mut shutdown => break,
                _ = ticker.tick() => self.check_in_background("poll").await,
                change = changes.recv(), if changes_open => match change {
                    Some(()) => self.check_in_background("change").await,
                    None => {
                        debug!("change notifications closed, polling only");
                        changes_open = false;
                    }
                },
            }
        }
        info!("clipboard monitor stopped");
    }

    /// Runs [`check`](Self::check) off the async workers; clipboard tools block.
    async fn check_in_background(&self, trigger: &'static str) {
        let monitor = self.clone();
        match tokio::task::spawn_blocking(move || monitor.check()).await {
            Ok(Ok(outcome)) => trace!(trigger, ?outcome, "clipboard checked"),
            Ok(Err(e)) => warn!(trigger, error = %e, "clipboard check failed"),
            Err(e) => warn!(trigger, error = %e, "clipboard check panicked"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::download::{
        FetchEngine, FetchError, FetchRequest, ProgressControl, ProgressEvent, VideoQuality,
    };

    /// Engine that never returns until the test ends.
    struct StuckEngine;

    impl FetchEngine for StuckEngine {
        fn fetch(
            &self,
            _request: &FetchRequest,
            progress: &mut dyn FnMut(ProgressEvent) -> ProgressControl,
        ) -> Result<(), FetchError> {
            loop {
                let tick = ProgressEvent::Downloading {
                    downloaded_bytes: 0,
                    total_bytes: None,
                };
                if progress(tick) == ProgressControl::Abort {
                    return Err(FetchError::Interrupted);
                }
                std::thread::sleep(Duration::from_millis(10));
            }
        }
    }

    fn setup(initial: &str) -> (MemoryClipboard, ClipboardMonitor, DownloadScheduler) {
        let scheduler = DownloadScheduler::new(Arc::new(StuckEngine), 1).unwrap();
        let (_tx, rx) = watch::channel(DownloadOptions::new("/tmp", VideoQuality::Best, false));
        let clipboard = MemoryClipboard::new(initial);
        let monitor = ClipboardMonitor::new(clipboard.clone(), scheduler.clone(), rx);
        (clipboard, monitor, scheduler)
    }

    #[tokio::test]
    async fn test_initial_content_is_not_submitted() {
        let (clipboard, monitor, scheduler) = setup("https://youtu.be/dQw4w9WgXcQ");
        assert_eq!(monitor.check().unwrap(), CheckOutcome::Unchanged);
        assert!(scheduler.active_jobs().is_empty());
        assert_eq!(clipboard.text(), "https://youtu.be/dQw4w9WgXcQ");
    }

    #[tokio::test]
    async fn test_new_video_url_is_submitted_and_cleared() {
        let (clipboard, monitor, scheduler) = setup("");
        clipboard.set_text("https://youtu.be/dQw4w9WgXcQ");

        let outcome = monitor.check().unwrap();

        assert_eq!(outcome, CheckOutcome::Submitted(VideoId::new("dQw4w9WgXcQ")));
        assert_eq!(clipboard.text(), "");
        assert_eq!(scheduler.active_jobs().len(), 1);
        assert_eq!(monitor.check().unwrap(), CheckOutcome::Unchanged);
        scheduler.cancel(&VideoId::new("dQw4w9WgXcQ"));
    }

    #[tokio::test]
    async fn test_plain_text_is_left_alone() {
        let (clipboard, monitor, _scheduler) = setup("");
        clipboard.set_text("just some notes");
        assert_eq!(monitor.check().unwrap(), CheckOutcome::NotVideo);
        assert_eq!(clipboard.text(), "just some notes");
        assert_eq!(monitor.check().unwrap(), CheckOutcome::Unchanged);
    }

    #[tokio::test]
    async fn test_rejected_url_is_still_cleared() {
        let (clipboard, monitor, scheduler) = setup("");
        clipboard.set_text("https://youtu.be/dQw4w9WgXcQ");
        monitor.check().unwrap();

        clipboard.set_text("https://www.youtube.com/watch?v=dQw4w9WgXcQ");
        let outcome = monitor.check().unwrap();

        assert_eq!(
            outcome,
            CheckOutcome::Rejected(SubmitRejection::AlreadyActive)
        );
        assert_eq!(clipboard.text(), "");
        scheduler.cancel(&VideoId::new("dQw4w9WgXcQ"));
    }
}
