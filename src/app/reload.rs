//! Live settings for `watch`: the config file is re-read on a timer and
//! changes are pushed to the running scheduler and clipboard monitor.
//!
//! Flag overrides keep their precedence across reloads. A broken file is
//! reported and ignored until it is fixed.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clipfetch_core::{AppConfig, DownloadOptions, DownloadScheduler};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::settings::{Overrides, ensure_download_dir};

/// How often `watch` re-reads the config file.
pub(crate) const RELOAD_INTERVAL: Duration = Duration::from_secs(2);

/// Tracks the effective config and detects changes on disk.
#[derive(Debug)]
pub(crate) struct SettingsReloader {
    path: PathBuf,
    overrides: Overrides,
    current: AppConfig,
    last_error: Option<String>,
}

impl SettingsReloader {
    /// `current` is the effective config the session started with.
    pub(crate) fn new(path: PathBuf, overrides: Overrides, current: AppConfig) -> Self {
        Self {
            path,
            overrides,
            current,
            last_error: None,
        }
    }

    /// Re-reads the file and returns the new effective config if it differs.
    pub(crate) fn poll(&mut self) -> Option<&AppConfig> {
        let mut config = match AppConfig::load_from(&self.path) {
            Ok(config) => config,
            Err(e) => {
                self.report(e.to_string());
                return None;
            }
        };
        self.overrides.apply(&mut config);
        if let Err(e) = config.validate() {
            self.report(e.to_string());
            return None;
        }
        self.last_error = None;

        if config == self.current {
            return None;
        }
        info!(
            folder = %config.download_path.display(),
            quality = %config.video_quality,
            concurrency = config.concurrent_downloads,
            subtitles = config.download_subtitles,
            "Configuration changed"
        );
        self.current = config;
        Some(&self.current)
    }

    /// Warns once per distinct error so a broken file does not flood the log.
    fn report(&mut self, message: String) {
        if self.last_error.as_deref() != Some(message.as_str()) {
            warn!(path = %self.path.display(), error = %message, "Ignoring config change");
        }
        self.last_error = Some(message);
    }
}

/// Pushes `config` to the scheduler and to the monitor's option snapshot.
///
/// Running downloads keep the options they were submitted with.
pub(crate) fn apply_settings(
    config: &AppConfig,
    scheduler: &DownloadScheduler,
    options: &watch::Sender<DownloadOptions>,
) -> Result<()> {
    ensure_download_dir(&config.download_path)?;
    if scheduler.max_concurrency() != config.concurrent_downloads {
        scheduler.configure(config.concurrent_downloads)?;
    }
    options.send_replace(config.download_options());
    Ok(())
}

/// Polls for config changes every `interval` until the task is aborted.
pub(crate) async fn run_reloader(
    mut reloader: SettingsReloader,
    scheduler: DownloadScheduler,
    options: watch::Sender<DownloadOptions>,
    interval: Duration,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick fires at once; the starting config is already applied.
    ticker.tick().await;
    debug!(path = %reloader.path.display(), "watching config file for changes");

    loop {
        ticker.tick().await;
        if let Some(config) = reloader.poll() {
            if let Err(e) = apply_settings(config, &scheduler, &options) {
                warn!(error = %e, "Failed to apply new configuration");
            }
        }
    }
}
