//! CLI command handlers.

mod config;
mod get;
mod watch;

pub(crate) use config::{run_config_set_command, run_config_show_command};
pub(crate) use get::run_get_command;
pub(crate) use watch::run_watch_command;
