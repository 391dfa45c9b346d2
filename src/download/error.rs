//! Error types for the download module.
//!
//! Engine failures never leave a worker: they are captured per job and turned
//! into notifications. Only configuration errors surface synchronously.

use std::fmt;

use thiserror::Error;

use super::scheduler::{MAX_CONCURRENCY, MIN_CONCURRENCY};

/// Errors returned synchronously by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    /// Invalid concurrency value provided.
    #[error(
        "invalid concurrency value {value}: must be between {MIN_CONCURRENCY} and {MAX_CONCURRENCY}"
    )]
    InvalidConcurrency {
        /// The invalid value that was provided.
        value: usize,
    },

    /// The scheduler was created outside a Tokio runtime.
    #[error("no Tokio runtime available to run download workers")]
    NoRuntime,
}

/// Failures reported by a fetch engine.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The download was stopped because cancellation was requested.
    #[error("download interrupted")]
    Interrupted,

    /// The engine could not be started.
    #[error("failed to start {program}: {source}")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The engine ran and reported a failure.
    #[error("{reason}")]
    Engine {
        /// Engine-provided failure description.
        reason: String,
    },
}

impl FetchError {
    /// Creates an engine failure.
    pub fn engine(reason: impl Into<String>) -> Self {
        Self::Engine {
            reason: reason.into(),
        }
    }

    /// Creates a spawn failure.
    pub fn spawn(program: impl Into<String>, source: std::io::Error) -> Self {
        Self::Spawn {
            program: program.into(),
            source,
        }
    }

    /// Returns true for a cooperative-cancellation stop.
    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Interrupted)
    }
}

/// Why a submission was not admitted.
///
/// Rejections are expected outcomes, not errors: the submitter simply gets
/// nothing scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitRejection {
    /// The text is not a recognized video URL.
    Unrecognized,
    /// The video was already downloaded during this run.
    AlreadyCompleted,
    /// A job for the video is queued or running.
    AlreadyActive,
    /// The scheduler no longer accepts work.
    ShuttingDown,
}

impl SubmitRejection {
    /// Returns a stable label for logs and output.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unrecognized => "unrecognized",
            Self::AlreadyCompleted => "already_completed",
            Self::AlreadyActive => "already_active",
            Self::ShuttingDown => "shutting_down",
        }
    }
}

impl fmt::Display for SubmitRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
