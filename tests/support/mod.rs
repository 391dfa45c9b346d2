//! Shared helpers for integration tests.

#![allow(dead_code)]

pub mod gated_engine;

use std::time::Duration;

use clipfetch_core::{
    DownloadOptions, DownloadScheduler, JobStatus, Notification, VideoId, VideoQuality,
};
use tokio::sync::mpsc::UnboundedReceiver;

/// Upper bound for any single wait in a test.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Options pointing at a throwaway folder.
pub fn options() -> DownloadOptions {
    DownloadOptions::new(std::env::temp_dir(), VideoQuality::Best, false)
}

/// Short-link URL for an 11-character id.
pub fn url(id: &str) -> String {
    format!("https://youtu.be/{id}")
}

/// Receives the next notification, failing the test after [`TEST_TIMEOUT`].
pub async fn next(rx: &mut UnboundedReceiver<Notification>) -> Notification {
    tokio::time::timeout(TEST_TIMEOUT, rx.recv())
        .await
        .expect("timed out waiting for a notification")
        .expect("notification channel closed")
}

/// Receives notifications until one for `id` matches `predicate`, returning
/// everything seen for `id` on the way (inclusive).
pub async fn until_for(
    rx: &mut UnboundedReceiver<Notification>,
    id: &VideoId,
    predicate: impl Fn(&Notification) -> bool,
) -> Vec<Notification> {
    let mut seen = Vec::new();
    loop {
        let notification = next(rx).await;
        if notification.id() != id {
            continue;
        }
        let done = predicate(&notification);
        seen.push(notification);
        if done {
            return seen;
        }
    }
}

/// Receives notifications until `id` reaches a terminal state.
pub async fn until_terminal(
    rx: &mut UnboundedReceiver<Notification>,
    id: &VideoId,
) -> Vec<Notification> {
    until_for(rx, id, Notification::is_terminal).await
}

/// Waits until `id` has been dispatched (its 0% notification arrived).
pub async fn until_started(rx: &mut UnboundedReceiver<Notification>, id: &VideoId) {
    until_for(rx, id, |n| matches!(n, Notification::Progress { .. })).await;
}

/// Asserts that the running counter equals the number of running jobs.
///
/// Only call this while no engine step is pending, so no job is between
/// states.
pub fn assert_running_count_consistent(scheduler: &DownloadScheduler) {
    let running_jobs = scheduler
        .active_jobs()
        .iter()
        .filter(|job| job.status() == &JobStatus::Running)
        .count();
    assert_eq!(
        scheduler.running_count(),
        running_jobs,
        "running counter disagrees with job statuses"
    );
}

/// Polls until the active job for `id` is running.
///
/// Unlike [`until_started`], this consumes no notifications.
pub async fn wait_running(scheduler: &DownloadScheduler, id: &VideoId) {
    tokio::time::timeout(TEST_TIMEOUT, async {
        loop {
            let running = scheduler
                .job(id)
                .is_some_and(|job| job.status() == &JobStatus::Running);
            if running {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("timed out waiting for job to start");
}

/// Waits for the scheduler to go idle, failing the test after [`TEST_TIMEOUT`].
pub async fn settle(scheduler: &DownloadScheduler) {
    tokio::time::timeout(TEST_TIMEOUT, scheduler.wait_idle())
        .await
        .expect("timed out waiting for the scheduler to go idle");
}
