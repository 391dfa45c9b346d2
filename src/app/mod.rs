//! Application wiring shared by the commands.

pub(crate) mod exit;
pub(crate) mod reload;
pub(crate) mod reporter;
pub(crate) mod settings;
