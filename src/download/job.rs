//! Job record and status definitions.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

use super::options::DownloadOptions;
use crate::parser::VideoId;

/// Lifecycle status of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "reason")]
pub enum JobStatus {
    /// Waiting for a free worker slot.
    Queued,
    /// Handed to a worker.
    Running,
    /// Downloaded successfully.
    Finished,
    /// The engine or worker failed.
    Failed(String),
    /// Stopped by a cancellation request.
    Cancelled,
}

impl JobStatus {
    /// Returns the stable label for display output.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Finished => "finished",
            Self::Failed(_) => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Returns true once no further transition can happen.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Failed(_) | Self::Cancelled)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed(reason) => write!(f, "failed: {reason}"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// One submitted download.
///
/// Parameters are an immutable snapshot shared with the worker; status and
/// progress are only changed by the scheduler under its lock. Clones handed
/// out by the scheduler are point-in-time views.
#[derive(Debug, Clone)]
pub struct Job {
    id: VideoId,
    source_url: String,
    options: Arc<DownloadOptions>,
    status: JobStatus,
    progress: f64,
    cancel_requested: Arc<AtomicBool>,
}

impl Job {
    /// Creates a queued job.
    pub fn new(id: VideoId, source_url: impl Into<String>, options: DownloadOptions) -> Self {
        Self {
            id,
            source_url: source_url.into(),
            options: Arc::new(options),
            status: JobStatus::Queued,
            progress: 0.0,
            cancel_requested: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Canonical video id.
    #[must_use]
    pub fn id(&self) -> &VideoId {
        &self.id
    }

    /// URL text as submitted.
    #[must_use]
    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    /// Parameter snapshot taken at submission.
    #[must_use]
    pub fn options(&self) -> &DownloadOptions {
        &self.options
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> &JobStatus {
        &self.status
    }

    /// Last accepted progress percentage.
    #[must_use]
    pub fn progress(&self) -> f64 {
        self.progress
    }

    /// Returns true once cancellation was requested.
    #[must_use]
    pub fn is_cancel_requested(&self) -> bool {
        self.cancel_requested.load(Ordering::SeqCst)
    }

    pub(crate) fn shared_options(&self) -> Arc<DownloadOptions> {
        Arc::clone(&self.options)
    }

    pub(crate) fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel_requested)
    }

    pub(crate) fn request_cancel(&self) {
        self.cancel_requested.store(true, Ordering::SeqCst);
    }

    pub(crate) fn mark_running(&mut self) {
        self.status = JobStatus::Running;
        self.progress = 0.0;
    }

    /// Records a progress value if it moves a running job forward.
    ///
    /// Returns the accepted value, or `None` when the value is stale,
    /// regressive, or the job is not running.
    pub(crate) fn advance_progress(&mut self, percent: f64) -> Option<f64> {
        if self.status != JobStatus::Running || percent.is_nan() {
            return None;
        }
        let percent = percent.clamp(0.0, 100.0);
        if percent <= self.progress {
            return None;
        }
        self.progress = percent;
        Some(percent)
    }

    pub(crate) fn set_terminal(&mut self, status: JobStatus) {
        debug_assert!(status.is_terminal());
        self.status = status;
    }
}
