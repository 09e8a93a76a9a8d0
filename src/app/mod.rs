//! Application runtime composition modules.

pub(crate) mod commands;
pub(crate) mod config_runtime;
pub(crate) mod exit_handler;
pub(crate) mod runtime;
pub(crate) mod terminal;
