//! Watch command: monitor the clipboard until Ctrl-C.

use anyhow::{Context, Result};
use clipfetch_core::config::resolve_default_config_path;
use clipfetch_core::{
    AppConfig, ClipboardMonitor, CommandClipboard, DEFAULT_POLL_INTERVAL, DownloadScheduler,
};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::app::exit::{ProcessExit, exit_for_board};
use crate::app::reload::{RELOAD_INTERVAL, SettingsReloader, run_reloader};
use crate::app::reporter::{OutputMode, spawn_reporter};
use crate::app::settings::Overrides;

/// Runs the clipboard monitor, then waits for accepted downloads to settle.
///
/// Edits to the config file apply while watching; flags keep precedence.
pub(crate) async fn run_watch_command(
    scheduler: DownloadScheduler,
    config: &AppConfig,
    overrides: Overrides,
    mode: OutputMode,
) -> Result<ProcessExit> {
    let clipboard = CommandClipboard::detect().context("Cannot watch the clipboard")?;
    let reporter = spawn_reporter(scheduler.subscribe(), mode);
    let (options_tx, options_rx) = watch::channel(config.download_options());
    let monitor = ClipboardMonitor::new(clipboard, scheduler.clone(), options_rx);

    let reload = match resolve_default_config_path() {
        Some(path) => {
            let reloader = SettingsReloader::new(path, overrides, config.clone());
            Some(tokio::spawn(run_reloader(
                reloader,
                scheduler.clone(),
                options_tx,
                RELOAD_INTERVAL,
            )))
        }
        None => {
            debug!("no config location, settings stay fixed while watching");
            None
        }
    };

    // No push source for clipboard changes here; the monitor polls.
    let (_changes_tx, changes_rx) = mpsc::unbounded_channel();

    info!(
        folder = %config.download_path.display(),
        quality = %config.video_quality,
        concurrency = config.concurrent_downloads,
        "Watching the clipboard, press Ctrl-C to stop"
    );
    monitor
        .run(DEFAULT_POLL_INTERVAL, changes_rx, async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await;

    if let Some(task) = reload {
        task.abort();
        let _ = task.await;
    }

    let running = scheduler.running_count();
    let queued = scheduler.queued_count();
    if running + queued > 0 {
        info!(
            running,
            queued, "Waiting for downloads to finish, Ctrl-C again to cancel them"
        );
    }
    tokio::select! {
        () = scheduler.shutdown(true) => {}
        _ = tokio::signal::ctrl_c() => {
            warn!("Cancelling running downloads");
            scheduler.cancel_all();
            scheduler.wait_idle().await;
        }
    }

    drop(monitor);
    drop(scheduler);
    let board = reporter.await?;
    Ok(exit_for_board(&board))
}
