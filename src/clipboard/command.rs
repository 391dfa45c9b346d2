//! Clipboard access through the platform's command-line tools.

use std::ffi::OsString;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use tracing::{debug, trace};

use super::{ClipboardError, ClipboardSource};
use crate::download::find_executable;

/// One external program invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Invocation {
    program: PathBuf,
    args: Vec<OsString>,
}

impl Invocation {
    fn new(program: PathBuf, args: &[&str]) -> Self {
        Self {
            program,
            args: args.iter().map(OsString::from).collect(),
        }
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        command
    }

    fn error(&self, source: std::io::Error) -> ClipboardError {
        ClipboardError::Command {
            program: self.program.display().to_string(),
            source,
        }
    }
}

/// Clipboard backed by `pbpaste`/`pbcopy`, `wl-paste`/`wl-copy`, `xclip`
/// or PowerShell, whichever the platform provides.
#[derive(Debug, Clone)]
pub struct CommandClipboard {
    read: Invocation,
    clear: Invocation,
    /// Clear by piping empty input into `clear` instead of running it bare.
    clear_via_stdin: bool,
}

impl CommandClipboard {
    /// Finds a clipboard tool on `PATH`.
    ///
    /// # Errors
    ///
    /// Returns [`ClipboardError::Unavailable`] if no supported tool is installed.
    pub fn detect() -> Result<Self, ClipboardError> {
        let clipboard = if cfg!(target_os = "macos") {
            Self::macos()
        } else if cfg!(windows) {
            Self::windows()
        } else {
            Self::wayland().or_else(Self::x11)
        };

        match clipboard {
            Some(clipboard) => {
                debug!(program = %clipboard.read.program.display(), "clipboard tool found");
                Ok(clipboard)
            }
            None => Err(ClipboardError::Unavailable {
                suggestion: unavailable_suggestion(),
            }),
        }
    }

    fn macos() -> Option<Self> {
        Some(Self {
            read: Invocation::new(find_executable("pbpaste")?, &[]),
            clear: Invocation::new(find_executable("pbcopy")?, &[]),
            clear_via_stdin: true,
        })
    }

    fn windows() -> Option<Self> {
        let powershell = find_executable("powershell")?;
        Some(Self {
            read: Invocation::new(
                powershell.clone(),
                &["-NoProfile", "-Command", "Get-Clipboard -Raw"],
            ),
            clear: Invocation::new(
                powershell,
                &["-NoProfile", "-Command", "Set-Clipboard -Value $null"],
            ),
            clear_via_stdin: false,
        })
    }

    fn wayland() -> Option<Self> {
        std::env::var_os("WAYLAND_DISPLAY")?;
        Some(Self {
            read: Invocation::new(find_executable("wl-paste")?, &["--no-newline"]),
            clear: Invocation::new(find_executable("wl-copy")?, &["--clear"]),
            clear_via_stdin: false,
        })
    }

    fn x11() -> Option<Self> {
        let xclip = find_executable("xclip")?;
        Some(Self {
            read: Invocation::new(xclip.clone(), &["-selection", "clipboard", "-o"]),
            clear: Invocation::new(xclip, &["-selection", "clipboard", "-i"]),
            clear_via_stdin: true,
        })
    }
}

impl ClipboardSource for CommandClipboard {
    fn read_text(&mut self) -> Result<String, ClipboardError> {
        let output = self
            .read
            .command()
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .map_err(|e| self.read.error(e))?;

        // Most tools exit non-zero on an empty clipboard.
        if !output.status.success() {
            trace!(status = %output.status, "clipboard read returned nothing");
            return Ok(String::new());
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn clear(&mut self) -> Result<(), ClipboardError> {
        let mut command = self.clear.command();
        command.stdout(Stdio::null()).stderr(Stdio::null());

        if self.clear_via_stdin {
            let mut child = command
                .stdin(Stdio::piped())
                .spawn()
                .map_err(|e| self.clear.error(e))?;
            // Dropping stdin sends EOF; the tool then stores the empty input.
            if let Some(mut stdin) = child.stdin.take() {
                stdin.write_all(b"").map_err(|e| self.clear.error(e))?;
            }
            child.wait().map_err(|e| self.clear.error(e))?;
        } else {
            command
                .stdin(Stdio::null())
                .status()
                .map_err(|e| self.clear.error(e))?;
        }
        Ok(())
    }
}

fn unavailable_suggestion() -> &'static str {
    if cfg!(target_os = "macos") {
        "pbpaste and pbcopy should ship with macOS; check your PATH"
    } else if cfg!(windows) {
        "make sure powershell is on PATH"
    } else {
        "install wl-clipboard (Wayland) or xclip (X11)"
    }
}
