//! Integration tests for the clipboard monitor feeding a live scheduler.

use std::sync::Arc;
use std::time::Duration;

use clipfetch_core::{
    CheckOutcome, ClipboardMonitor, DownloadScheduler, MemoryClipboard, Notification,
    SubmitRejection, VideoId,
};
use tokio::sync::{mpsc, oneshot, watch};

mod support;
use support::gated_engine::GatedEngine;
use support::{TEST_TIMEOUT, options, settle, until_started, until_terminal};

const VIDEO: &str = "dQw4w9WgXcQ";

struct Harness {
    engine: Arc<GatedEngine>,
    scheduler: DownloadScheduler,
    clipboard: MemoryClipboard,
    monitor: ClipboardMonitor,
    options_tx: watch::Sender<clipfetch_core::DownloadOptions>,
}

fn harness(initial: &str) -> Harness {
    let engine = Arc::new(GatedEngine::new());
    let scheduler = DownloadScheduler::new(engine.clone(), 2).unwrap();
    let clipboard = MemoryClipboard::new(initial);
    let (options_tx, options_rx) = watch::channel(options());
    let monitor = ClipboardMonitor::new(clipboard.clone(), scheduler.clone(), options_rx);
    Harness {
        engine,
        scheduler,
        clipboard,
        monitor,
        options_tx,
    }
}

#[tokio::test]
async fn test_change_notification_triggers_submission() {
    let h = harness("");
    let mut rx = h.scheduler.subscribe();
    let (changes_tx, changes_rx) = mpsc::unbounded_channel();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();

    let monitor = h.monitor.clone();
    let run = tokio::spawn(async move {
        // Long poll interval so only the change notification can trigger.
        monitor
            .run(Duration::from_secs(3600), changes_rx, async {
                let _ = stop_rx.await;
            })
            .await;
    });

    h.clipboard
        .set_text(format!("https://www.youtube.com/watch?v={VIDEO}"));
    changes_tx.send(()).unwrap();

    let id = VideoId::new(VIDEO);
    until_started(&mut rx, &id).await;
    assert_eq!(h.clipboard.text(), "");

    h.engine.finish(&id);
    let seen = until_terminal(&mut rx, &id).await;
    assert_eq!(seen.last(), Some(&Notification::Finished { id: id.clone() }));

    stop_tx.send(()).unwrap();
    tokio::time::timeout(TEST_TIMEOUT, run).await.unwrap().unwrap();
}

#[tokio::test]
async fn test_polling_picks_up_url_without_notifications() {
    let h = harness("some earlier text");
    let mut rx = h.scheduler.subscribe();
    let (changes_tx, changes_rx) = mpsc::unbounded_channel::<()>();
    drop(changes_tx);
    let (stop_tx, stop_rx) = oneshot::channel::<()>();

    let monitor = h.monitor.clone();
    let run = tokio::spawn(async move {
        monitor
            .run(Duration::from_millis(10), changes_rx, async {
                let _ = stop_rx.await;
            })
            .await;
    });

    h.clipboard.set_text(format!("https://youtu.be/{VIDEO}"));
    let id = VideoId::new(VIDEO);
    until_started(&mut rx, &id).await;

    h.engine.finish(&id);
    until_terminal(&mut rx, &id).await;
    stop_tx.send(()).unwrap();
    tokio::time::timeout(TEST_TIMEOUT, run).await.unwrap().unwrap();
    assert_eq!(h.engine.calls(), vec![id]);
}

#[tokio::test]
async fn test_completed_video_copied_again_is_rejected_and_cleared() {
    let h = harness("");
    let mut rx = h.scheduler.subscribe();
    let id = VideoId::new(VIDEO);

    h.clipboard.set_text(format!("https://youtu.be/{VIDEO}"));
    assert_eq!(h.monitor.check().unwrap(), CheckOutcome::Submitted(id.clone()));
    h.engine.finish(&id);
    until_terminal(&mut rx, &id).await;

    h.clipboard
        .set_text(format!("https://www.youtube.com/shorts/{VIDEO}"));
    assert_eq!(
        h.monitor.check().unwrap(),
        CheckOutcome::Rejected(SubmitRejection::AlreadyCompleted)
    );
    assert_eq!(h.clipboard.text(), "");
    assert_eq!(h.engine.calls().len(), 1);
}

#[tokio::test]
async fn test_same_url_copied_twice_after_clear_is_a_new_event() {
    let h = harness("");
    let id = VideoId::new(VIDEO);
    let url = format!("https://youtu.be/{VIDEO}");

    h.clipboard.set_text(url.clone());
    assert_eq!(h.monitor.check().unwrap(), CheckOutcome::Submitted(id.clone()));
    assert_eq!(h.monitor.check().unwrap(), CheckOutcome::Unchanged);

    h.clipboard.set_text(url);
    assert_eq!(
        h.monitor.check().unwrap(),
        CheckOutcome::Rejected(SubmitRejection::AlreadyActive)
    );

    h.engine.finish(&id);
    settle(&h.scheduler).await;
}

#[tokio::test]
async fn test_option_changes_apply_to_later_submissions_only() {
    let h = harness("");
    let first = VideoId::new("aaaaaaaaaaa");
    let second = VideoId::new("bbbbbbbbbbb");

    h.clipboard.set_text("https://youtu.be/aaaaaaaaaaa");
    h.monitor.check().unwrap();

    let mut changed = options();
    changed.output_directory = "/videos/later".into();
    h.options_tx.send(changed).unwrap();

    h.clipboard.set_text("https://youtu.be/bbbbbbbbbbb");
    h.monitor.check().unwrap();

    assert_eq!(
        h.scheduler.job(&first).unwrap().options().output_directory,
        options().output_directory
    );
    assert_eq!(
        h.scheduler.job(&second).unwrap().options().output_directory,
        std::path::PathBuf::from("/videos/later")
    );

    h.engine.finish(&first);
    h.engine.finish(&second);
    settle(&h.scheduler).await;
    assert_eq!(h.engine.output_directories().len(), 2);
}
