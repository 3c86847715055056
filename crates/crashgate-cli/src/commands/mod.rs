pub mod classify;
pub mod config;
pub mod emit;
pub mod identity;
pub mod report;

use std::path::PathBuf;

use crashgate_core::config::Config;

use crate::output::OutputFormat;

/// Shared state handed to every command.
pub struct CommandContext {
    pub format: OutputFormat,
    pub config_path: PathBuf,
    pub config: Config,
}
