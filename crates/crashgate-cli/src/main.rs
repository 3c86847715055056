//! Crashgate CLI - Command-line interface for the diagnostic-event gateway
//!
//! Provides commands for:
//! - Inspecting and deleting locally spooled reports
//! - Reading or provisioning the install identifier
//! - Showing how the configured build is classified
//! - Viewing and validating configuration
//! - Emitting events through the gateway

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crashgate_core::config::Config;

mod commands;
mod output;

use commands::{
    classify::ClassifyCommand, config::ConfigCommand, emit::EmitCommand,
    identity::IdentityCommand, report::ReportCommand, CommandContext,
};
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(
    name = "crashgate",
    version,
    about = "Diagnostic-event gateway for crash and error reporting"
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Manage locally stored reports
    #[command(subcommand)]
    Report(ReportCommand),
    /// Read or provision the install identifier
    #[command(subcommand)]
    Identity(IdentityCommand),
    /// Show the build channel and reporting decisions
    Classify(ClassifyCommand),
    /// View and validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Send one event through the gateway
    Emit(EmitCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    // `config validate` reports load failures itself
    let explicit = cli.config.is_some()
        && !matches!(cli.command, Commands::Config(ConfigCommand::Validate));
    let (config, load_warning) = load_config(&config_path, explicit)?;

    // Setup tracing
    let level = match (cli.quiet, cli.verbose) {
        (true, _) => "error".to_string(),
        (false, 0) => config.logging.level.clone(),
        (false, 1) => "debug".to_string(),
        (false, _) => "trace".to_string(),
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if config.logging.json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
    if let Some(warning) = load_warning {
        tracing::warn!(path = %config_path.display(), "Using default configuration: {warning}");
    }

    let ctx = CommandContext {
        format: if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        },
        config_path,
        config,
    };

    match cli.command {
        Commands::Report(cmd) => cmd.execute(&ctx).await,
        Commands::Identity(cmd) => cmd.execute(&ctx).await,
        Commands::Classify(cmd) => cmd.execute(&ctx).await,
        Commands::Config(cmd) => cmd.execute(&ctx).await,
        Commands::Emit(cmd) => cmd.execute(&ctx).await,
    }
}

/// Load the configuration at `path`.
///
/// An `explicit` path must load. Otherwise a missing file silently yields
/// defaults, and a file that fails to load yields defaults plus a warning to
/// log once tracing is up.
fn load_config(path: &Path, explicit: bool) -> Result<(Config, Option<String>)> {
    match Config::load(path) {
        Ok(config) => Ok((config, None)),
        Err(e) if explicit => Err(e).with_context(|| {
            format!("Failed to load configuration from {}", path.display())
        }),
        Err(_) if !path.exists() => Ok((Config::default(), None)),
        Err(e) => Ok((Config::default(), Some(format!("{e:#}")))),
    }
}
