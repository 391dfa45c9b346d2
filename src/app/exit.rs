//! Exit code logic for the clipfetch process.

use std::process::ExitCode;

use clipfetch_core::DownloadBoard;
use clipfetch_core::observer::EntryState;

/// Final outcome of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProcessExit {
    /// Everything that was attempted finished.
    Success,
    /// Some downloads finished and some failed.
    Partial,
    /// Nothing finished and something failed.
    Failure,
}

impl From<ProcessExit> for ExitCode {
    fn from(exit: ProcessExit) -> Self {
        match exit {
            ProcessExit::Success => Self::SUCCESS,
            ProcessExit::Partial => Self::from(1),
            ProcessExit::Failure => Self::from(2),
        }
    }
}

/// Determines the process exit outcome from completed and failed counts.
pub(crate) fn determine_exit_outcome(completed: usize, failed: usize) -> ProcessExit {
    if failed == 0 {
        ProcessExit::Success
    } else if completed > 0 {
        ProcessExit::Partial
    } else {
        ProcessExit::Failure
    }
}

/// Same as [`determine_exit_outcome`], counted from a finished board.
pub(crate) fn exit_for_board(board: &DownloadBoard) -> ProcessExit {
    let completed = board
        .entries()
        .iter()
        .filter(|entry| entry.state == EntryState::Finished)
        .count();
    determine_exit_outcome(completed, board.failed_count())
}
