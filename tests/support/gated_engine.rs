//! Fetch engine scripted step by step from the test body.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

use clipfetch_core::{
    FetchEngine, FetchError, FetchRequest, ProgressControl, ProgressEvent, VideoId, recognize,
};
use parking_lot::Mutex;

/// Instruction for a running fetch.
#[derive(Debug, Clone)]
pub enum Step {
    /// Report this many of 100 bytes downloaded.
    Progress(u64),
    /// Return success.
    Finish,
    /// Return an engine error with this reason.
    Fail(String),
}

type Gate = (Sender<Step>, Option<Receiver<Step>>);

/// Engine whose fetches block until the test sends them [`Step`]s.
///
/// While waiting, each fetch ticks the progress callback every few
/// milliseconds with its last byte count, so cancellation is observed
/// promptly without producing new progress values.
#[derive(Default)]
pub struct GatedEngine {
    gates: Mutex<HashMap<VideoId, Gate>>,
    calls: Mutex<Vec<(VideoId, PathBuf)>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl GatedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a step for the current (or next) fetch of `id`.
    pub fn send(&self, id: &VideoId, step: Step) {
        let sender = {
            let mut gates = self.gates.lock();
            let gate = gates.entry(id.clone()).or_insert_with(new_gate);
            gate.0.clone()
        };
        sender.send(step).expect("gate receiver dropped");
    }

    pub fn finish(&self, id: &VideoId) {
        self.send(id, Step::Finish);
    }

    pub fn fail(&self, id: &VideoId, reason: &str) {
        self.send(id, Step::Fail(reason.to_string()));
    }

    pub fn progress(&self, id: &VideoId, percent: u64) {
        self.send(id, Step::Progress(percent));
    }

    /// Ids the engine was invoked for, in call order.
    pub fn calls(&self) -> Vec<VideoId> {
        self.calls.lock().iter().map(|(id, _)| id.clone()).collect()
    }

    /// Output directories the engine was invoked with, in call order.
    pub fn output_directories(&self) -> Vec<PathBuf> {
        self.calls.lock().iter().map(|(_, dir)| dir.clone()).collect()
    }

    /// Highest number of fetches that ran at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn take_receiver(&self, id: &VideoId) -> Receiver<Step> {
        let mut gates = self.gates.lock();
        let gate = gates.entry(id.clone()).or_insert_with(new_gate);
        match gate.1.take() {
            Some(receiver) => receiver,
            None => {
                *gate = new_gate();
                gate.1.take().expect("fresh gate has a receiver")
            }
        }
    }
}

fn new_gate() -> Gate {
    let (tx, rx) = mpsc::channel();
    (tx, Some(rx))
}

impl FetchEngine for GatedEngine {
    fn fetch(
        &self,
        request: &FetchRequest,
        progress: &mut dyn FnMut(ProgressEvent) -> ProgressControl,
    ) -> Result<(), FetchError> {
        let id = recognize(&request.url).expect("scheduler only dispatches recognized URLs");
        let receiver = self.take_receiver(&id);
        self.calls
            .lock()
            .push((id.clone(), request.output_directory.clone()));
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let result = drive(&receiver, progress);

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        // Drop the spent gate so a resubmission gets a fresh one.
        self.gates.lock().remove(&id);
        result
    }
}

fn drive(
    receiver: &Receiver<Step>,
    progress: &mut dyn FnMut(ProgressEvent) -> ProgressControl,
) -> Result<(), FetchError> {
    let mut downloaded = 0;
    loop {
        match receiver.recv_timeout(Duration::from_millis(5)) {
            Ok(Step::Progress(bytes)) => downloaded = bytes,
            Ok(Step::Finish) => return Ok(()),
            Ok(Step::Fail(reason)) => return Err(FetchError::engine(reason)),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                return Err(FetchError::engine("gate closed"));
            }
        }

        let tick = ProgressEvent::Downloading {
            downloaded_bytes: downloaded,
            total_bytes: Some(100),
        };
        if progress(tick) == ProgressControl::Abort {
            return Err(FetchError::Interrupted);
        }
    }
}
