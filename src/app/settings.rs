//! Effective settings: config file merged with CLI overrides, plus the
//! external tool checks that must pass before downloads start.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clipfetch_core::download::DEFAULT_PROGRAM;
use clipfetch_core::{AppConfig, DownloadScheduler, VideoQuality, YtDlpEngine, find_executable};
use tracing::{debug, info};

use crate::cli::Args;

/// Program that yt-dlp needs for merging formats.
const FFMPEG: &str = "ffmpeg";

/// Per-run flag values that take precedence over the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Overrides {
    concurrency: Option<usize>,
    output_dir: Option<PathBuf>,
    quality: Option<VideoQuality>,
    no_subtitles: bool,
}

impl Overrides {
    pub(crate) fn from_args(args: &Args) -> Self {
        Self {
            concurrency: args.concurrency.map(usize::from),
            output_dir: args.output_dir.clone(),
            quality: args.quality,
            no_subtitles: args.no_subtitles,
        }
    }

    /// Copies flag values over the file values.
    pub(crate) fn apply(&self, config: &mut AppConfig) {
        if let Some(concurrency) = self.concurrency {
            config.concurrent_downloads = concurrency;
        }
        if let Some(output_dir) = &self.output_dir {
            config.download_path.clone_from(output_dir);
        }
        if let Some(quality) = self.quality {
            config.video_quality = quality;
        }
        if self.no_subtitles {
            config.download_subtitles = false;
        }
    }
}

/// Loads the config file and applies per-run flag overrides.
pub(crate) fn resolve_config(args: &Args) -> Result<AppConfig> {
    let mut config = AppConfig::load().context("Failed to load configuration")?;
    Overrides::from_args(args).apply(&mut config);
    config.validate().context("Invalid effective configuration")?;
    debug!(?config, "effective configuration");
    Ok(config)
}

/// Fails unless ffmpeg is installed, unless the check is skipped.
pub(crate) fn ensure_ffmpeg(skip: bool) -> Result<()> {
    if skip {
        debug!("ffmpeg check skipped");
        return Ok(());
    }
    match find_executable(FFMPEG) {
        Some(path) => {
            debug!(path = %path.display(), "ffmpeg found");
            Ok(())
        }
        None => bail!(
            "ffmpeg is not installed or not on PATH\n  Suggestion: install ffmpeg, or pass --skip-ffmpeg-check"
        ),
    }
}

/// Locates yt-dlp: the explicit path if given, otherwise a PATH lookup.
pub(crate) fn resolve_engine(explicit: Option<&PathBuf>) -> Result<YtDlpEngine> {
    let program = match explicit {
        Some(path) => find_executable(path).with_context(|| {
            format!(
                "yt-dlp executable not found at {} (missing or not executable)",
                path.display()
            )
        })?,
        None => find_executable(DEFAULT_PROGRAM).with_context(|| {
            format!("{DEFAULT_PROGRAM} is not installed or not on PATH\n  Suggestion: install it or pass --yt-dlp <PATH>")
        })?,
    };
    debug!(program = %program.display(), "using yt-dlp");
    Ok(YtDlpEngine::with_program(program))
}

/// Creates the download folder and a scheduler driven by yt-dlp.
pub(crate) fn build_scheduler(args: &Args, config: &AppConfig) -> Result<DownloadScheduler> {
    ensure_ffmpeg(args.skip_ffmpeg_check)?;
    let engine = resolve_engine(args.yt_dlp.as_ref())?;

    ensure_download_dir(&config.download_path)?;

    let scheduler = DownloadScheduler::new(Arc::new(engine), config.concurrent_downloads)?;
    Ok(scheduler)
}

/// Creates the download folder if it does not exist yet.
pub(crate) fn ensure_download_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create download folder {}", path.display()))?;
        info!(dir = %path.display(), "Created download folder");
    }
    Ok(())
}
