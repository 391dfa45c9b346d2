//! Fetch engine backed by the external `yt-dlp` program.
//!
//! The engine runs one `yt-dlp` process per job and reads machine-readable
//! progress lines from its stdout. Aborting kills the process; partial files
//! are left for `yt-dlp` to resume or clean up.

use std::collections::VecDeque;
use std::env;
use std::ffi::{OsStr, OsString};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, instrument, trace, warn};

use super::FetchError;
use super::fetch::{FetchEngine, FetchRequest, ProgressControl, ProgressEvent};

/// Default program name looked up on `PATH`.
pub const DEFAULT_PROGRAM: &str = "yt-dlp";

/// Marker that starts every progress line we ask `yt-dlp` to print.
const PROGRESS_MARKER: &str = "clipfetch-progress";

/// Progress template: marker, status, downloaded, total, estimated total.
const PROGRESS_TEMPLATE: &str = "download:clipfetch-progress %(progress.status)s \
     %(progress.downloaded_bytes)s %(progress.total_bytes)s %(progress.total_bytes_estimate)s";

/// Number of stderr lines kept for failure messages.
const STDERR_TAIL_LINES: usize = 8;

/// How long an aborted fetch waits for stderr to close.
const ABORT_STDERR_GRACE: Duration = Duration::from_millis(500);

type StderrReader = JoinHandle<VecDeque<String>>;

/// Runs downloads through `yt-dlp`.
#[derive(Debug, Clone)]
pub struct YtDlpEngine {
    program: PathBuf,
    leading_args: Vec<OsString>,
}

impl Default for YtDlpEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl YtDlpEngine {
    /// Uses `yt-dlp` from `PATH`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_program(DEFAULT_PROGRAM)
    }

    /// Uses the given executable.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
        }
    }

    /// Uses a launcher command, e.g. `python3 -m yt_dlp`.
    pub fn with_command<I, S>(program: impl Into<PathBuf>, leading_args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Self {
            program: program.into(),
            leading_args: leading_args.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the configured program.
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Builds the argument list for `request` (after any launcher args).
    #[must_use]
    pub fn build_args(request: &FetchRequest) -> Vec<OsString> {
        let output = request
            .output_directory
            .join(&request.output_name_template);

        let mut args: Vec<OsString> = [
            "--newline",
            "--no-playlist",
            "--no-warnings",
            "--quiet",
            "--progress",
            "--progress-template",
            PROGRESS_TEMPLATE,
            "--format",
            request.format_spec.as_str(),
        ]
        .into_iter()
        .map(OsString::from)
        .collect();
        args.push("--output".into());
        args.push(output.into_os_string());

        if request.subtitles.enabled {
            args.push("--write-subs".into());
            if !request.subtitles.languages.is_empty() {
                args.push("--sub-langs".into());
                args.push(request.subtitles.languages.join(",").into());
            }
            if request.subtitles.include_auto_generated {
                args.push("--write-auto-subs".into());
            }
            args.push("--sub-format".into());
            args.push("best".into());
        }

        args.push("--".into());
        args.push(request.url.as_str().into());
        args
    }
}

/// Parses one stdout line printed through the progress template.
///
/// Returns `None` for any other output.
#[must_use]
pub fn parse_progress_line(line: &str) -> Option<ProgressEvent> {
    let mut fields = line.split_whitespace();
    if fields.next()? != PROGRESS_MARKER {
        return None;
    }

    match fields.next()? {
        "downloading" => {
            let downloaded = fields.next().and_then(parse_bytes).unwrap_or(0);
            let total = fields.next().and_then(parse_bytes);
            let estimate = fields.next().and_then(parse_bytes);
            Some(ProgressEvent::Downloading {
                downloaded_bytes: downloaded,
                total_bytes: total.or(estimate),
            })
        }
        "finished" => Some(ProgressEvent::Finished),
        _ => None,
    }
}

/// Parses a byte count; `yt-dlp` prints `NA` for unknown and floats for estimates.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn parse_bytes(field: &str) -> Option<u64> {
    if let Ok(value) = field.parse::<u64>() {
        return Some(value);
    }
    let value = field.parse::<f64>().ok()?;
    (value.is_finite() && value >= 0.0).then(|| value as u64)
}

impl FetchEngine for YtDlpEngine {
    #[instrument(skip(self, request, progress), fields(url = %request.url))]
    fn fetch(
        &self,
        request: &FetchRequest,
        progress: &mut dyn FnMut(ProgressEvent) -> ProgressControl,
    ) -> Result<(), FetchError> {
        let program = self.program.display().to_string();
        let mut child = Command::new(&self.program)
            .args(&self.leading_args)
            .args(Self::build_args(request))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| FetchError::spawn(program.clone(), e))?;
        debug!(pid = child.id(), "engine process started");

        // Drain stderr on its own thread so a chatty process never blocks on a full pipe.
        let stderr_reader = child.stderr.take().map(|stderr| {
            thread::spawn(move || {
                let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
                for line in BufReader::new(stderr).lines().map_while(Result::ok) {
                    if tail.len() == STDERR_TAIL_LINES {
                        tail.pop_front();
                    }
                    tail.push_back(line);
                }
                tail
            })
        });

        if let Some(stdout) = child.stdout.take() {
            for line in BufReader::new(stdout).lines().map_while(Result::ok) {
                trace!(%line, "engine output");
                let Some(event) = parse_progress_line(&line) else {
                    continue;
                };
                if progress(event) == ProgressControl::Abort {
                    debug!("abort requested, stopping engine process");
                    if let Err(e) = child.kill() {
                        warn!(error = %e, "failed to kill engine process");
                    }
                    if let Err(e) = child.wait() {
                        warn!(error = %e, "failed to reap engine process");
                    }
                    collect_stderr(stderr_reader, Some(ABORT_STDERR_GRACE));
                    return Err(FetchError::Interrupted);
                }
            }
        }

        let status = child
            .wait()
            .map_err(|e| FetchError::engine(format!("failed waiting for {program}: {e}")))?;
        let stderr_tail = collect_stderr(stderr_reader, None);

        if status.success() {
            return Ok(());
        }

        let reason = stderr_tail
            .iter()
            .rev()
            .find(|line| line.contains("ERROR"))
            .or_else(|| stderr_tail.back())
            .map_or_else(
                || format!("{program} exited with {status}"),
                |line| line.trim().to_string(),
            );
        Err(FetchError::engine(reason))
    }
}

/// Joins the stderr reader and returns the lines it kept.
///
/// With a `grace` period the reader is detached if it is still blocked when
/// the period ends; a killed process can leave children holding the pipe.
fn collect_stderr(reader: Option<StderrReader>, grace: Option<Duration>) -> VecDeque<String> {
    let Some(reader) = reader else {
        return VecDeque::new();
    };
    if let Some(grace) = grace {
        let deadline = Instant::now() + grace;
        while !reader.is_finished() {
            if Instant::now() >= deadline {
                debug!("stderr still held open after abort, detaching reader");
                return VecDeque::new();
            }
            thread::sleep(Duration::from_millis(10));
        }
    }
    reader.join().unwrap_or_else(|_| {
        warn!("stderr reader panicked");
        VecDeque::new()
    })
}

/// Finds an executable on `PATH`, or checks a path given directly.
///
/// Only files the current user can run are returned.
#[must_use]
pub fn find_executable(name: impl AsRef<OsStr>) -> Option<PathBuf> {
    which::which(name).ok()
}

/// Like [`find_executable`], searching `paths` instead of `PATH`.
#[must_use]
pub fn find_executable_in(name: impl AsRef<OsStr>, paths: impl AsRef<OsStr>) -> Option<PathBuf> {
    let cwd = env::current_dir().ok()?;
    which::which_in(name, Some(paths), cwd).ok()
}
