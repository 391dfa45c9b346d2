//! Fetch engine interface.
//!
//! A fetch engine performs one download synchronously on a worker thread and
//! reports progress through a callback. The callback's return value is the
//! only cancellation channel: once it answers [`ProgressControl::Abort`], the
//! engine must stop and return [`FetchError::Interrupted`].

use std::path::PathBuf;

use super::FetchError;
use super::options::{DownloadOptions, SubtitleOptions};

/// Everything an engine needs to perform one download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// Source URL as submitted.
    pub url: String,
    /// Directory the output is written into.
    pub output_directory: PathBuf,
    /// Output file name template.
    pub output_name_template: String,
    /// Format selector.
    pub format_spec: String,
    /// Subtitle settings.
    pub subtitles: SubtitleOptions,
}

impl FetchRequest {
    /// Builds a request for `url` from a job's option snapshot.
    pub fn new(url: impl Into<String>, options: &DownloadOptions) -> Self {
        Self {
            url: url.into(),
            output_directory: options.output_directory.clone(),
            output_name_template: options.output_name_template.clone(),
            format_spec: options.format_spec.clone(),
            subtitles: options.subtitles.clone(),
        }
    }
}

/// Progress tick reported by an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressEvent {
    /// Bytes are being transferred.
    Downloading {
        /// Bytes written so far.
        downloaded_bytes: u64,
        /// Expected total, when known (exact or estimated).
        total_bytes: Option<u64>,
    },
    /// The engine finished transferring a file.
    Finished,
}

impl ProgressEvent {
    /// Converts the event into a percentage in `[0, 100]`.
    ///
    /// Unknown or zero totals yield 0.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn percent(self) -> f64 {
        match self {
            Self::Finished => 100.0,
            Self::Downloading {
                downloaded_bytes,
                total_bytes,
            } => match total_bytes {
                Some(total) if total > 0 => {
                    (downloaded_bytes as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
                }
                _ => 0.0,
            },
        }
    }
}

/// Answer from the progress callback to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressControl {
    /// Keep downloading.
    Continue,
    /// Stop as soon as possible and return [`FetchError::Interrupted`].
    Abort,
}

/// Performs downloads.
///
/// Implementations are shared across worker threads and called once per job.
/// `fetch` blocks until the download ends. It must invoke `progress` for each
/// progress tick and honor [`ProgressControl::Abort`].
pub trait FetchEngine: Send + Sync + 'static {
    /// Downloads `request`, reporting through `progress`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Interrupted`] after an abort request, and
    /// [`FetchError::Engine`] or [`FetchError::Spawn`] for any other failure.
    fn fetch(
        &self,
        request: &FetchRequest,
        progress: &mut dyn FnMut(ProgressEvent) -> ProgressControl,
    ) -> Result<(), FetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::options::VideoQuality;

    #[test]
    fn test_percent_known_total() {
        let event = ProgressEvent::Downloading {
            downloaded_bytes: 250,
            total_bytes: Some(1000),
        };
        assert!((event.percent() - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_percent_unknown_or_zero_total() {
        let unknown = ProgressEvent::Downloading {
            downloaded_bytes: 250,
            total_bytes: None,
        };
        let zero = ProgressEvent::Downloading {
            downloaded_bytes: 250,
            total_bytes: Some(0),
        };
        assert!(unknown.percent().abs() < f64::EPSILON);
        assert!(zero.percent().abs() < f64::EPSILON);
    }

    #[test]
    fn test_percent_clamps_overshoot() {
        let event = ProgressEvent::Downloading {
            downloaded_bytes: 1500,
            total_bytes: Some(1000),
        };
        assert!((event.percent() - 100.0).abs() < f64::EPSILON);
        assert!((ProgressEvent::Finished.percent() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_fetch_request_copies_snapshot() {
        let options = DownloadOptions::new("/srv/media", VideoQuality::BestAudio, true);
        let request = FetchRequest::new("https://youtu.be/dQw4w9WgXcQ", &options);
        assert_eq!(request.url, "https://youtu.be/dQw4w9WgXcQ");
        assert_eq!(request.output_directory, PathBuf::from("/srv/media"));
        assert_eq!(request.format_spec, "bestaudio/best");
        assert!(request.subtitles.enabled);
    }
}
