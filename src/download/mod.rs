//! Download orchestration: jobs, the fetch engine seam, and the scheduler.
//!
//! # Features
//!
//! - Bounded concurrency that can be changed while downloads run
//! - FIFO dispatch of queued jobs
//! - Per-job cooperative cancellation through the progress callback
//! - Monotonic progress and exactly one terminal notification per job
//! - Engine failures and worker panics contained per job
//!
//! The actual transfer is delegated to a [`FetchEngine`]; [`YtDlpEngine`]
//! drives the external `yt-dlp` program.

mod error;
mod fetch;
mod job;
mod options;
mod scheduler;
mod ytdlp;

pub use error::{FetchError, SchedulerError, SubmitRejection};
pub use fetch::{FetchEngine, FetchRequest, ProgressControl, ProgressEvent};
pub use job::{Job, JobStatus};
pub use options::{
    DEFAULT_OUTPUT_TEMPLATE, DEFAULT_SUBTITLE_LANGUAGES, DownloadOptions, SubtitleOptions,
    VideoQuality,
};
pub use scheduler::{
    CancelOutcome, DEFAULT_CONCURRENCY, DownloadScheduler, MAX_CONCURRENCY, MIN_CONCURRENCY,
    UNEXPECTED_WORKER_FAILURE,
};
pub use ytdlp::{
    DEFAULT_PROGRAM, YtDlpEngine, find_executable, find_executable_in, parse_progress_line,
};
