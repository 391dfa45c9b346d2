//! Config command handlers: show and change persistent settings.

use anyhow::{Context, Result};
use clipfetch_core::AppConfig;
use clipfetch_core::config::resolve_default_config_path;

/// Prints the settings stored on disk, or the defaults when there is no file.
pub(crate) fn run_config_show_command() -> Result<()> {
    let path = resolve_default_config_path();
    let loaded_from_file = path.as_deref().is_some_and(std::path::Path::exists);
    let config = AppConfig::load()?;

    let resolved_path = path.as_ref().map_or_else(
        || "<unresolved>".to_string(),
        |path| path.display().to_string(),
    );
    println!("config_path = {resolved_path}");
    println!(
        "config_file = {}",
        if loaded_from_file {
            "loaded"
        } else {
            "not found (using defaults)"
        }
    );
    for line in render_settings(&config) {
        println!("{line}");
    }
    Ok(())
}

/// Updates one setting and writes the file.
pub(crate) fn run_config_set_command(key: &str, value: &str) -> Result<()> {
    let mut config = AppConfig::load()?;
    config.set(key, value)?;
    let path = config.save().context("Failed to save configuration")?;
    println!("Saved {key} in {}", path.display());
    Ok(())
}

fn render_settings(config: &AppConfig) -> Vec<String> {
    vec![
        format!("concurrent_downloads = {}", config.concurrent_downloads),
        format!("download_path = {}", config.download_path.display()),
        format!("video_quality = {}", config.video_quality),
        format!("download_subtitles = {}", config.download_subtitles),
    ]
}
