//! CLI entry point for the clipfetch tool.

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::{debug, info};

mod app;
mod cli;
mod commands;

use app::exit::ProcessExit;
use app::reporter::OutputMode;
use app::settings;
use cli::{Args, Command, ConfigAction};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Determine log level based on verbose/quiet flags
    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();

    debug!(?args, "CLI arguments parsed");

    let exit = match args.command() {
        Command::Config { action } => {
            match action {
                ConfigAction::Show => commands::run_config_show_command()?,
                ConfigAction::Set { key, value } => {
                    commands::run_config_set_command(&key, &value)?;
                }
            }
            ProcessExit::Success
        }
        Command::Watch => {
            info!("clipfetch starting");
            let config = settings::resolve_config(&args)?;
            let scheduler = settings::build_scheduler(&args, &config)?;
            let mode = OutputMode::select(args.json, args.quiet);
            let overrides = settings::Overrides::from_args(&args);
            commands::run_watch_command(scheduler, &config, overrides, mode).await?
        }
        Command::Get { urls } => {
            let config = settings::resolve_config(&args)?;
            let scheduler = settings::build_scheduler(&args, &config)?;
            let mode = OutputMode::select(args.json, args.quiet);
            commands::run_get_command(&urls, scheduler, &config, mode).await?
        }
    };

    Ok(exit.into())
}
