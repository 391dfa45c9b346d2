//! Scheduler notifications and the observer callback surface.
//!
//! The scheduler emits [`Notification`]s onto unbounded channels. Consumers
//! either read a subscription directly or hand it to [`spawn_observer`],
//! which forwards each notification to a [`DownloadObserver`] on the Tokio
//! runtime. Observers are responsible for marshalling to their own
//! presentation context.

mod board;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::trace;

pub use board::{BoardEntry, DownloadBoard, EntryState, IDLE_STATUS};

use crate::parser::VideoId;

/// Notification emitted by the scheduler.
///
/// Notifications for one id arrive in emission order; notifications for
/// different ids may interleave.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Notification {
    /// Download progress in percent, non-decreasing per id.
    Progress {
        /// Video id.
        id: VideoId,
        /// Percentage in `[0, 100]`.
        percent: f64,
    },
    /// The download completed.
    Finished {
        /// Video id.
        id: VideoId,
    },
    /// The download failed.
    Error {
        /// Video id.
        id: VideoId,
        /// URL as submitted.
        url: String,
        /// Failure description.
        reason: String,
    },
    /// The download was cancelled.
    Cancelled {
        /// Video id.
        id: VideoId,
    },
}

impl Notification {
    /// Returns the video id this notification is about.
    #[must_use]
    pub fn id(&self) -> &VideoId {
        match self {
            Self::Progress { id, .. }
            | Self::Finished { id }
            | Self::Error { id, .. }
            | Self::Cancelled { id } => id,
        }
    }

    /// Returns true for the last notification of a job.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Progress { .. })
    }
}

/// Receives scheduler notifications.
///
/// Methods are called from a runtime worker, never from a UI thread.
pub trait DownloadObserver: Send + 'static {
    /// Progress moved forward.
    fn on_progress(&mut self, id: &VideoId, percent: f64);

    /// The download completed.
    fn on_finished(&mut self, id: &VideoId);

    /// The download failed.
    fn on_error(&mut self, id: &VideoId, url: &str, reason: &str);

    /// The download was cancelled.
    fn on_cancelled(&mut self, _id: &VideoId) {}
}

/// Dispatches one notification to the matching observer method.
pub fn deliver(observer: &mut dyn DownloadObserver, notification: &Notification) {
    trace!(id = %notification.id(), ?notification, "delivering notification");
    match notification {
        Notification::Progress { id, percent } => observer.on_progress(id, *percent),
        Notification::Finished { id } => observer.on_finished(id),
        Notification::Error { id, url, reason } => observer.on_error(id, url, reason),
        Notification::Cancelled { id } => observer.on_cancelled(id),
    }
}

/// Forwards a subscription to `observer` until the scheduler goes away.
///
/// Returns the observer once the channel closes.
pub fn spawn_observer<O: DownloadObserver>(
    mut notifications: mpsc::UnboundedReceiver<Notification>,
    mut observer: O,
) -> JoinHandle<O> {
    tokio::spawn(async move {
        while let Some(notification) = notifications.recv().await {
            deliver(&mut observer, &notification);
        }
        observer
    })
}
