//! Identity command - Inspect the install identifier
//!
//! - `show`: Print the identifier stored in the shared container
//! - `ensure`: Provision one if absent, then print it

use anyhow::{Context, Result};
use clap::Subcommand;
use tracing::info;

use crashgate_core::domain::InstallId;
use crashgate_telemetry::identifier::{ensure_identifier, read_identifier, Provisioning};
use crashgate_telemetry::DirectoryStorage;

use super::CommandContext;
use crate::output::get_formatter;

/// Install identifier subcommands
#[derive(Debug, Subcommand)]
pub enum IdentityCommand {
    /// Show the stored install identifier
    Show,
    /// Create the install identifier if it does not exist yet
    Ensure,
}

impl IdentityCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let formatter = get_formatter(ctx.format);

        let Some(container) = ctx.config.storage.shared_container.clone() else {
            formatter.error("No shared container configured (storage.shared_container)");
            return Ok(());
        };
        let storage = DirectoryStorage::new(&container);

        let provisioning = match self {
            IdentityCommand::Show => None,
            IdentityCommand::Ensure => {
                let result = ensure_identifier(&storage).with_context(|| {
                    format!("Failed to provision identifier in {}", container.display())
                })?;
                info!(?result, "Install identifier ensured");
                Some(result)
            }
        };

        let id = read_identifier(&storage).context("Failed to read install identifier")?;
        let output = IdentityOutput {
            container: container.display().to_string(),
            id,
            provisioning,
        };

        if ctx.format.is_json() {
            formatter.print_json(&output.to_json());
        } else {
            output.print(formatter.as_ref());
        }

        Ok(())
    }
}

struct IdentityOutput {
    container: String,
    id: Option<InstallId>,
    provisioning: Option<Provisioning>,
}

impl IdentityOutput {
    fn status(&self) -> &'static str {
        match (&self.id, self.provisioning) {
            (Some(_), Some(Provisioning::Created)) => "created",
            (Some(_), _) => "present",
            (None, _) => "absent",
        }
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "container": self.container,
            "install_id": self.id.as_ref().map(InstallId::as_str),
            "status": self.status(),
        })
    }

    fn print(&self, formatter: &dyn crate::output::OutputFormatter) {
        match &self.id {
            Some(_) => formatter.success(&format!("Install identifier {}", self.status())),
            None if self.provisioning.is_some() => {
                formatter.warn("Stored identifier is malformed and was left untouched")
            }
            None => formatter.warn("No install identifier stored"),
        }
        if let Some(id) = &self.id {
            formatter.field("Identifier", id.as_str());
        }
        formatter.field("Container", &self.container);
    }
}
