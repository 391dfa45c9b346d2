//! Presentation-side model of the download list.

use super::{DownloadObserver, Notification};
use crate::parser::VideoId;

/// Status line shown when nothing is downloading.
pub const IDLE_STATUS: &str = "Watching the clipboard for video URLs...";

/// Display state of one list entry.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryState {
    /// Downloading, with the last shown percentage.
    Active(f64),
    /// Download completed.
    Finished,
    /// Download failed with a reason.
    Failed(String),
    /// Download cancelled.
    Cancelled,
}

impl EntryState {
    fn is_terminal(&self) -> bool {
        !matches!(self, Self::Active(_))
    }
}

/// One row of the download list.
#[derive(Debug, Clone, PartialEq)]
pub struct BoardEntry {
    /// Video id.
    pub id: VideoId,
    /// Current display state.
    pub state: EntryState,
}

/// Download list driven by scheduler notifications.
///
/// Applies notifications idempotently: progress that arrives after a
/// terminal notification, or that would move a bar backwards, is ignored.
/// Entries keep their first-seen order.
#[derive(Debug, Default)]
pub struct DownloadBoard {
    entries: Vec<BoardEntry>,
}

impl DownloadBoard {
    /// Creates an empty board.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a notification. Returns true if the board changed.
    ///
    /// Entries in a terminal state ignore everything until [`restart`](Self::restart).
    pub fn apply(&mut self, notification: &Notification) -> bool {
        let id = notification.id();
        let mut created = false;
        let index = match self.entries.iter().position(|entry| &entry.id == id) {
            Some(index) => index,
            None => {
                created = true;
                self.entries.push(BoardEntry {
                    id: id.clone(),
                    state: EntryState::Active(0.0),
                });
                self.entries.len() - 1
            }
        };
        let entry = &mut self.entries[index];
        if entry.state.is_terminal() {
            return false;
        }

        let next = match notification {
            Notification::Progress { percent, .. } => match entry.state {
                EntryState::Active(current) if *percent > current => EntryState::Active(*percent),
                _ => return created,
            },
            Notification::Finished { .. } => EntryState::Finished,
            Notification::Error { reason, .. } => EntryState::Failed(reason.clone()),
            Notification::Cancelled { .. } => EntryState::Cancelled,
        };

        entry.state = next;
        true
    }

    /// Marks `id` as active again, e.g. after a manual retry.
    pub fn restart(&mut self, id: &VideoId) {
        match self.entries.iter_mut().find(|entry| &entry.id == id) {
            Some(entry) => entry.state = EntryState::Active(0.0),
            None => self.entries.push(BoardEntry {
                id: id.clone(),
                state: EntryState::Active(0.0),
            }),
        }
    }

    /// Returns the entry for `id`.
    #[must_use]
    pub fn entry(&self, id: &VideoId) -> Option<&BoardEntry> {
        self.entries.iter().find(|entry| &entry.id == id)
    }

    /// Returns all entries in first-seen order.
    #[must_use]
    pub fn entries(&self) -> &[BoardEntry] {
        &self.entries
    }

    /// Number of entries still downloading.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| !entry.state.is_terminal())
            .count()
    }

    /// Number of entries that failed.
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| matches!(entry.state, EntryState::Failed(_)))
            .count()
    }

    /// Summarizes active downloads as `id: pct%` joined by ` | `.
    ///
    /// Returns [`IDLE_STATUS`] when nothing is downloading.
    #[must_use]
    pub fn status_line(&self) -> String {
        let parts: Vec<String> = self
            .entries
            .iter()
            .filter_map(|entry| match entry.state {
                EntryState::Active(percent) => Some(format!("{}: {percent:.1}%", entry.id)),
                _ => None,
            })
            .collect();

        if parts.is_empty() {
            IDLE_STATUS.to_string()
        } else {
            parts.join(" | ")
        }
    }
}

impl DownloadObserver for DownloadBoard {
    fn on_progress(&mut self, id: &VideoId, percent: f64) {
        self.apply(&Notification::Progress {
            id: id.clone(),
            percent,
        });
    }

    fn on_finished(&mut self, id: &VideoId) {
        self.apply(&Notification::Finished { id: id.clone() });
    }

    fn on_error(&mut self, id: &VideoId, url: &str, reason: &str) {
        self.apply(&Notification::Error {
            id: id.clone(),
            url: url.to_string(),
            reason: reason.to_string(),
        });
    }

    fn on_cancelled(&mut self, id: &VideoId) {
        self.apply(&Notification::Cancelled { id: id.clone() });
    }
}
