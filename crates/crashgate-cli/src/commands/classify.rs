//! Classify command - Show how the configured build is treated
//!
//! Prints the build channel, release label and, for every severity, whether
//! an event would be transmitted or kept as a breadcrumb once reporting is
//! active.

use anyhow::Result;
use clap::Args;

use crashgate_core::config::Config;
use crashgate_core::domain::{BuildChannel, Severity};
use crashgate_telemetry::{Decision, ReportingPolicy};

use super::CommandContext;
use crate::output::get_formatter;

#[derive(Debug, Args)]
pub struct ClassifyCommand {}

/// Result of classifying a configuration
struct Classification {
    channel: BuildChannel,
    release: String,
    decisions: Vec<(Severity, Decision)>,
}

impl Classification {
    fn from_config(config: &Config) -> Self {
        let channel = config.classifier().classify(&config.app_metadata());
        let policy = ReportingPolicy::new(
            config.reporting.respect_opt_out,
            config.reporting.send_crash_reports,
        );
        Self {
            channel,
            release: config.app_metadata().release_label(),
            decisions: Severity::ALL
                .iter()
                .map(|&severity| (severity, policy.decide(channel, severity)))
                .collect(),
        }
    }
}

fn decision_label(decision: Decision) -> &'static str {
    match decision {
        Decision::Transmit => "transmit",
        Decision::Retain => "breadcrumb",
    }
}

impl ClassifyCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let formatter = get_formatter(ctx.format);
        let result = Classification::from_config(&ctx.config);

        if ctx.format.is_json() {
            let decisions: serde_json::Map<String, serde_json::Value> = result
                .decisions
                .iter()
                .map(|(s, d)| (s.to_string(), decision_label(*d).into()))
                .collect();
            formatter.print_json(&serde_json::json!({
                "channel": result.channel,
                "environment": result.channel.environment(),
                "reporting": result.channel.is_reporting(),
                "release": result.release,
                "decisions": decisions,
            }));
            return Ok(());
        }

        formatter.success(&format!("Build classified as {}", result.channel));
        formatter.field("Release", &result.release);
        formatter.field("Environment", result.channel.environment());
        if !result.channel.is_reporting() {
            formatter.warn("Unrecognized build: events never leave the device");
        }
        formatter.info("");
        for (severity, decision) in &result.decisions {
            formatter.field(severity.as_str(), decision_label(*decision));
        }

        Ok(())
    }
}
