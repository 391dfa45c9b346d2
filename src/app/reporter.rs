//! Terminal output for scheduler notifications: progress bars or JSON lines.

use std::collections::HashMap;
use std::io::{self, IsTerminal, Write};
use std::time::Duration;

use clipfetch_core::observer::IDLE_STATUS;
use clipfetch_core::{DownloadBoard, DownloadObserver, Notification, VideoId, spawn_observer};
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::warn;

/// How notifications are shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OutputMode {
    /// One progress bar per download plus a status line.
    Bars,
    /// One JSON object per notification on stdout.
    JsonLines,
    /// Nothing on screen; the board is still kept.
    Silent,
}

impl OutputMode {
    pub(crate) fn select(json: bool, quiet: bool) -> Self {
        if json {
            Self::JsonLines
        } else if quiet || !io::stderr().is_terminal() {
            Self::Silent
        } else {
            Self::Bars
        }
    }
}

/// Consumes notifications until the scheduler goes away and returns the
/// final board.
pub(crate) fn spawn_reporter(
    notifications: mpsc::UnboundedReceiver<Notification>,
    mode: OutputMode,
) -> JoinHandle<DownloadBoard> {
    match mode {
        OutputMode::JsonLines => tokio::spawn(json_lines(notifications, io::stdout())),
        OutputMode::Bars | OutputMode::Silent => {
            let observer = TerminalObserver::new(mode == OutputMode::Bars);
            let handle = spawn_observer(notifications, observer);
            tokio::spawn(async move {
                match handle.await {
                    Ok(observer) => observer.finish(),
                    Err(e) => {
                        warn!(error = %e, "progress reporter stopped unexpectedly");
                        DownloadBoard::new()
                    }
                }
            })
        }
    }
}

/// Writes one JSON line per notification to `out`.
///
/// After the first write error (typically a closed pipe) output stops, but
/// notifications are still consumed so the board stays complete.
async fn json_lines(
    mut notifications: mpsc::UnboundedReceiver<Notification>,
    mut out: impl Write,
) -> DownloadBoard {
    let mut board = DownloadBoard::new();
    let mut writable = true;
    while let Some(notification) = notifications.recv().await {
        board.apply(&notification);
        if !writable {
            continue;
        }
        match serde_json::to_string(&notification) {
            Ok(line) => {
                if let Err(e) = writeln!(out, "{line}").and_then(|()| out.flush()) {
                    warn!(error = %e, "stdout closed, JSON output stopped");
                    writable = false;
                }
            }
            Err(e) => warn!(error = %e, "failed to encode notification"),
        }
    }
    board
}

/// Progress bars keyed by video id, with a status line underneath.
struct TerminalObserver {
    board: DownloadBoard,
    bars: MultiProgress,
    by_id: HashMap<VideoId, ProgressBar>,
    status: ProgressBar,
}

impl TerminalObserver {
    fn new(visible: bool) -> Self {
        let bars = if visible {
            MultiProgress::new()
        } else {
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
        };
        let status = bars.add(ProgressBar::new_spinner());
        status.set_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        status.enable_steady_tick(Duration::from_millis(120));
        status.set_message(IDLE_STATUS);

        Self {
            board: DownloadBoard::new(),
            bars,
            by_id: HashMap::new(),
            status,
        }
    }

    fn bar(&mut self, id: &VideoId) -> &ProgressBar {
        let bars = &self.bars;
        let status = &self.status;
        self.by_id.entry(id.clone()).or_insert_with(|| {
            let bar = bars.insert_before(status, ProgressBar::new(100));
            bar.set_style(
                ProgressStyle::with_template("{prefix:.bold} [{bar:30.cyan/blue}] {pos:>3}% {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("=> "),
            );
            bar.set_prefix(id.to_string());
            bar
        })
    }

    fn refresh_status(&self) {
        self.status.set_message(self.board.status_line());
    }

    fn finish(self) -> DownloadBoard {
        self.status.finish_and_clear();
        self.board
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn whole_percent(percent: f64) -> u64 {
    percent.clamp(0.0, 100.0).round() as u64
}

impl DownloadObserver for TerminalObserver {
    fn on_progress(&mut self, id: &VideoId, percent: f64) {
        self.board.on_progress(id, percent);
        self.bar(id).set_position(whole_percent(percent));
        self.refresh_status();
    }

    fn on_finished(&mut self, id: &VideoId) {
        self.board.on_finished(id);
        let bar = self.bar(id);
        bar.set_position(100);
        bar.finish_with_message("done");
        self.refresh_status();
    }

    fn on_error(&mut self, id: &VideoId, url: &str, reason: &str) {
        self.board.on_error(id, url, reason);
        self.bar(id).abandon_with_message(format!("failed: {reason}"));
        self.refresh_status();
    }

    fn on_cancelled(&mut self, id: &VideoId) {
        self.board.on_cancelled(id);
        self.bar(id).abandon_with_message("cancelled");
        self.refresh_status();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_mode_json_wins() {
        assert_eq!(OutputMode::select(true, true), OutputMode::JsonLines);
        assert_eq!(OutputMode::select(false, true), OutputMode::Silent);
    }

    #[test]
    fn test_whole_percent_rounds_and_clamps() {
        assert_eq!(whole_percent(12.6), 13);
        assert_eq!(whole_percent(-1.0), 0);
        assert_eq!(whole_percent(140.0), 100);
    }

    /// Writer whose every write fails like a closed pipe.
    struct ClosedPipe {
        attempts: usize,
    }

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            self.attempts += 1;
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_json_lines_writes_one_object_per_line() {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = VideoId::new("dQw4w9WgXcQ");
        tx.send(Notification::Finished { id: id.clone() }).unwrap();
        drop(tx);

        let mut out = Vec::new();
        let board = json_lines(rx, &mut out).await;
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "{\"event\":\"finished\",\"id\":\"dQw4w9WgXcQ\"}\n"
        );
        assert_eq!(board.failed_count(), 0);
    }

    #[tokio::test]
    async fn test_json_lines_stops_writing_after_closed_output() {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = VideoId::new("dQw4w9WgXcQ");
        tx.send(Notification::Progress {
            id: id.clone(),
            percent: 10.0,
        })
        .unwrap();
        tx.send(Notification::Error {
            id: id.clone(),
            url: "https://youtu.be/dQw4w9WgXcQ".to_string(),
            reason: "HTTP Error 403".to_string(),
        })
        .unwrap();
        drop(tx);

        let mut pipe = ClosedPipe { attempts: 0 };
        let board = json_lines(rx, &mut pipe).await;
        assert_eq!(pipe.attempts, 1);
        assert_eq!(board.failed_count(), 1);
    }

    #[tokio::test]
    async fn test_silent_reporter_returns_board() {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = spawn_reporter(rx, OutputMode::Silent);
        let id = VideoId::new("dQw4w9WgXcQ");
        tx.send(Notification::Progress {
            id: id.clone(),
            percent: 40.0,
        })
        .unwrap();
        tx.send(Notification::Error {
            id: id.clone(),
            url: "https://youtu.be/dQw4w9WgXcQ".to_string(),
            reason: "HTTP Error 403".to_string(),
        })
        .unwrap();
        drop(tx);

        let board = handle.await.unwrap();
        assert_eq!(board.failed_count(), 1);
        assert_eq!(board.status_line(), IDLE_STATUS);
    }
}
