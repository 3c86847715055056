//! Config command - View and validate crashgate configuration
//!
//! Provides the `crashgate config` CLI command which:
//! 1. Shows the effective configuration (YAML or JSON)
//! 2. Validates the configuration file and reports errors

use std::path::Path;

use anyhow::{Context, Result};
use clap::Subcommand;
use tracing::info;

use crashgate_core::config::{Config, ValidationError};

use super::CommandContext;
use crate::output::{get_formatter, OutputFormatter};

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display current configuration
    Show,
    /// Validate configuration file
    Validate,
}

impl ConfigCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        match self {
            ConfigCommand::Show => execute_show(ctx),
            ConfigCommand::Validate => execute_validate(ctx),
        }
    }
}

fn execute_show(ctx: &CommandContext) -> Result<()> {
    let formatter = get_formatter(ctx.format);
    info!(config_path = %ctx.config_path.display(), "Showing configuration");

    if ctx.format.is_json() {
        let json = serde_json::to_value(&ctx.config)
            .context("Failed to serialize configuration to JSON")?;
        formatter.print_json(&json);
        return Ok(());
    }

    let source = if ctx.config_path.exists() {
        ctx.config_path.display().to_string()
    } else {
        format!("defaults; {} not found", ctx.config_path.display())
    };
    formatter.success(&format!("Configuration ({source})"));
    formatter.info("");

    let yaml =
        serde_yaml::to_string(&ctx.config).context("Failed to serialize configuration to YAML")?;
    for line in yaml.lines() {
        formatter.info(line);
    }

    Ok(())
}

fn execute_validate(ctx: &CommandContext) -> Result<()> {
    let formatter = get_formatter(ctx.format);
    let path = &ctx.config_path;

    // Load explicitly: a parse failure must not fall back to defaults here
    let errors = match load_and_validate(path) {
        Ok(errors) => errors,
        Err(message) => {
            report(formatter.as_ref(), ctx.format.is_json(), path, &[message]);
            return Ok(());
        }
    };

    info!(config_path = %path.display(), errors = errors.len(), "Validated configuration");

    let messages: Vec<String> = errors.iter().map(ValidationError::to_string).collect();
    report(formatter.as_ref(), ctx.format.is_json(), path, &messages);
    Ok(())
}

/// Load the file at `path` and validate it. `Err` carries a load failure.
fn load_and_validate(path: &Path) -> std::result::Result<Vec<ValidationError>, String> {
    if !path.exists() {
        return Err(format!(
            "Configuration file not found at {}; defaults are in use",
            path.display()
        ));
    }
    Config::load(path)
        .map(|config| config.validate())
        .map_err(|e| format!("Failed to parse configuration: {e:#}"))
}

fn report(formatter: &dyn OutputFormatter, json: bool, path: &Path, errors: &[String]) {
    if json {
        formatter.print_json(&serde_json::json!({
            "valid": errors.is_empty(),
            "config_path": path.display().to_string(),
            "errors": errors,
        }));
    } else if errors.is_empty() {
        formatter.success("Configuration is valid");
        formatter.info(&format!("File: {}", path.display()));
    } else {
        formatter.error(&format!(
            "Configuration has {} error{}:",
            errors.len(),
            if errors.len() == 1 { "" } else { "s" }
        ));
        formatter.info(&format!("File: {}", path.display()));
        formatter.info("");
        for error in errors {
            formatter.info(&format!("  {error}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_a_load_failure() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_and_validate(&dir.path().join("config.yaml"));
        assert!(result.unwrap_err().contains("not found"));
    }

    #[test]
    fn test_invalid_yaml_is_a_load_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "reporting: [unclosed").unwrap();

        let result = load_and_validate(&path);
        assert!(result.unwrap_err().starts_with("Failed to parse configuration"));
    }

    #[test]
    fn test_validation_errors_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "reporting:\n  breadcrumb_capacity: 0\nlogging:\n  level: loud\n",
        )
        .unwrap();

        let errors = load_and_validate(&path).unwrap();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"reporting.breadcrumb_capacity"));
        assert!(fields.contains(&"logging.level"));
    }

    #[test]
    fn test_valid_file_has_no_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "app:\n  bundle_identifier: org.mozilla.ios.Firefox\n").unwrap();

        assert!(load_and_validate(&path).unwrap().is_empty());
    }
}
