//! Per-download parameters captured at submission time.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Output file name template handed to the fetch engine.
pub const DEFAULT_OUTPUT_TEMPLATE: &str = "%(title)s.%(ext)s";

/// Subtitle languages requested when subtitles are enabled.
pub const DEFAULT_SUBTITLE_LANGUAGES: [&str; 2] = ["en", "ko"];

/// Video quality presets offered to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VideoQuality {
    /// Up to 1080p video merged with the best audio.
    #[default]
    #[serde(rename = "FHD")]
    Fhd,
    /// Best single file.
    #[serde(rename = "best")]
    Best,
    /// Smallest single file.
    #[serde(rename = "worst")]
    Worst,
    /// Best video and best audio merged.
    #[serde(rename = "bestvideo+bestaudio")]
    BestVideoBestAudio,
    /// Best video-only stream.
    #[serde(rename = "bestvideo")]
    BestVideo,
    /// Best audio-only stream.
    #[serde(rename = "bestaudio")]
    BestAudio,
}

impl VideoQuality {
    /// All presets, in display order.
    pub const ALL: [Self; 6] = [
        Self::Fhd,
        Self::Best,
        Self::Worst,
        Self::BestVideoBestAudio,
        Self::BestVideo,
        Self::BestAudio,
    ];

    /// Returns the stable label used in config files and on the command line.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fhd => "FHD",
            Self::Best => "best",
            Self::Worst => "worst",
            Self::BestVideoBestAudio => "bestvideo+bestaudio",
            Self::BestVideo => "bestvideo",
            Self::BestAudio => "bestaudio",
        }
    }

    /// Returns the engine format selector for this preset.
    #[must_use]
    pub fn format_spec(self) -> &'static str {
        match self {
            Self::Fhd => "bestvideo[height<=1080]+bestaudio/best[height<=1080]",
            Self::Best => "best",
            Self::Worst => "worst",
            Self::BestVideoBestAudio => "bestvideo+bestaudio/best",
            Self::BestVideo => "bestvideo/best",
            Self::BestAudio => "bestaudio/best",
        }
    }
}

impl fmt::Display for VideoQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VideoQuality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|quality| quality.as_str() == s)
            .ok_or_else(|| {
                let valid: Vec<&str> = Self::ALL.iter().map(|q| q.as_str()).collect();
                format!(
                    "invalid video quality '{s}': expected one of {}",
                    valid.join(", ")
                )
            })
    }
}

/// Subtitle download settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtitleOptions {
    /// Whether subtitles are fetched at all.
    pub enabled: bool,
    /// Requested subtitle languages.
    pub languages: Vec<String>,
    /// Whether auto-generated subtitles are accepted.
    pub include_auto_generated: bool,
}

impl SubtitleOptions {
    /// Subtitles disabled.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            languages: Vec::new(),
            include_auto_generated: false,
        }
    }

    /// Subtitles enabled with the default languages, including auto-generated ones.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            enabled: true,
            languages: DEFAULT_SUBTITLE_LANGUAGES
                .iter()
                .map(ToString::to_string)
                .collect(),
            include_auto_generated: true,
        }
    }
}

/// Immutable snapshot of download parameters for one job.
///
/// Built from the configuration when a URL is submitted; later configuration
/// changes never reach jobs that already exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadOptions {
    /// Directory the engine writes into.
    pub output_directory: PathBuf,
    /// Output file name template.
    pub output_name_template: String,
    /// Engine format selector.
    pub format_spec: String,
    /// Subtitle settings.
    pub subtitles: SubtitleOptions,
}

impl DownloadOptions {
    /// Creates options for `quality` with the default output template.
    pub fn new(output_directory: impl Into<PathBuf>, quality: VideoQuality, subtitles: bool) -> Self {
        Self {
            output_directory: output_directory.into(),
            output_name_template: DEFAULT_OUTPUT_TEMPLATE.to_string(),
            format_spec: quality.format_spec().to_string(),
            subtitles: if subtitles {
                SubtitleOptions::with_defaults()
            } else {
                SubtitleOptions::disabled()
            },
        }
    }

    /// Returns whether subtitles are requested.
    #[must_use]
    pub fn want_subtitles(&self) -> bool {
        self.subtitles.enabled
    }
}
