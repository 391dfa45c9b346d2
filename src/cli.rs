//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use clipfetch_core::VideoQuality;

/// Watch the clipboard for video links and download them in the background.
///
/// Copy a YouTube link and clipfetch picks it up, clears the clipboard and
/// hands the video to yt-dlp. Settings come from the config file and can be
/// overridden per run with the flags below.
#[derive(Parser, Debug)]
#[command(name = "clipfetch")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Maximum concurrent downloads (1-100), overrides the config file
    #[arg(short = 'c', long, global = true, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub concurrency: Option<u8>,

    /// Download folder, overrides the config file
    #[arg(short = 'o', long, global = true)]
    pub output_dir: Option<PathBuf>,

    /// Quality preset (FHD, best, worst, bestvideo+bestaudio, bestvideo, bestaudio)
    #[arg(long, global = true)]
    pub quality: Option<VideoQuality>,

    /// Do not download subtitles
    #[arg(long, global = true)]
    pub no_subtitles: bool,

    /// Print notifications as JSON lines instead of progress bars
    #[arg(long, global = true)]
    pub json: bool,

    /// Path to the yt-dlp executable
    #[arg(long = "yt-dlp", global = true, value_name = "PATH")]
    pub yt_dlp: Option<PathBuf>,

    /// Start even if ffmpeg is not on PATH
    #[arg(long, global = true)]
    pub skip_ffmpeg_check: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Top-level commands. Without one, `watch` runs.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Watch the clipboard until Ctrl-C
    Watch,

    /// Download the given URLs (or URLs read from stdin) and exit
    Get {
        /// Video URLs; read from stdin when omitted
        urls: Vec<String>,
    },

    /// Show or change persistent settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// `config` subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConfigAction {
    /// Print the effective settings
    Show,

    /// Change one setting and save it
    Set {
        /// Setting name (concurrent_downloads, download_path, video_quality, download_subtitles)
        key: String,
        /// New value
        value: String,
    },
}

impl Args {
    /// Returns the command to run, defaulting to `watch`.
    #[must_use]
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Watch)
    }
}
