//! Clipfetch Core Library
//!
//! Watches the clipboard for video links and downloads them in the
//! background through an external fetch engine.
//!
//! # Architecture
//!
//! - [`parser`] - Video URL recognition and id extraction
//! - [`download`] - Jobs, the fetch engine seam, `yt-dlp` adapter, and the
//!   bounded-concurrency scheduler
//! - [`observer`] - Scheduler notifications and the download list model
//! - [`clipboard`] - Clipboard sources and the monitor that feeds the scheduler
//! - [`config`] - Persistent user settings

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod clipboard;
pub mod config;
pub mod download;
pub mod observer;
pub mod parser;

// Re-export commonly used types
pub use clipboard::{
    CheckOutcome, ClipboardError, ClipboardMonitor, ClipboardSource, CommandClipboard,
    DEFAULT_POLL_INTERVAL, MemoryClipboard,
};
pub use config::{AppConfig, ConfigError};
pub use download::{
    CancelOutcome, DEFAULT_CONCURRENCY, DownloadOptions, DownloadScheduler, FetchEngine,
    FetchError, FetchRequest, Job, JobStatus, ProgressControl, ProgressEvent, SchedulerError,
    SubmitRejection, VideoQuality, YtDlpEngine, find_executable, find_executable_in,
};
pub use observer::{DownloadBoard, DownloadObserver, Notification, spawn_observer};
pub use parser::{VideoId, extract_video_id, extract_video_urls, recognize};
