//! Get command: download a fixed list of URLs and exit.

use std::io::{self, IsTerminal, Read};

use anyhow::Result;
use clipfetch_core::{AppConfig, DownloadScheduler, SubmitRejection, extract_video_urls};
use tracing::{info, warn};

use crate::app::exit::{ProcessExit, exit_for_board};
use crate::app::reporter::{OutputMode, spawn_reporter};

/// Submits every video URL found in `urls` (or stdin) and waits for them.
///
/// Ctrl-C cancels whatever is still queued or running.
pub(crate) async fn run_get_command(
    urls: &[String],
    scheduler: DownloadScheduler,
    config: &AppConfig,
    mode: OutputMode,
) -> Result<ProcessExit> {
    let input_text = if !urls.is_empty() {
        urls.join("\n")
    } else if !io::stdin().is_terminal() {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        info!("No input provided. Pass video URLs as arguments or pipe them via stdin.");
        info!("Example: clipfetch get https://youtu.be/dQw4w9WgXcQ");
        return Ok(ProcessExit::Success);
    };

    let found = extract_video_urls(&input_text);
    if found.is_empty() {
        info!("No video URLs found in input");
        return Ok(ProcessExit::Success);
    }

    let reporter = spawn_reporter(scheduler.subscribe(), mode);
    let options = config.download_options();
    let mut submitted = 0usize;
    for (id, url) in &found {
        match scheduler.submit(url, options.clone()) {
            Ok(_) => submitted += 1,
            Err(SubmitRejection::AlreadyActive) => {
                info!(id = %id, "Duplicate URL skipped");
            }
            Err(rejection) => warn!(id = %id, url = %url, %rejection, "URL not submitted"),
        }
    }
    info!(
        submitted,
        concurrency = config.concurrent_downloads,
        "Downloads started"
    );

    tokio::select! {
        () = scheduler.wait_idle() => {}
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, cancelling downloads");
            scheduler.cancel_all();
            scheduler.shutdown(true).await;
        }
    }

    drop(scheduler);
    let board = reporter.await?;
    info!(
        failed = board.failed_count(),
        total = board.entries().len(),
        "Download complete"
    );
    Ok(exit_for_board(&board))
}
