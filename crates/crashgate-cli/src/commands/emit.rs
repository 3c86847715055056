//! Emit command - Send one event through the gateway
//!
//! Builds a gateway from the loaded configuration with the local spool as its
//! transport, activates it, sends the event and waits for the spool worker
//! to flush. Transmitted events end up in the report store
//! (`crashgate report list`).
//!
//! With `--panic` the panic is caught after the crash reporter hook ran, so
//! both the crash report and the spooled panic event are written. The
//! gateway is not shut down, leaving the launch sentinel in place for the
//! next launch to detect.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tracing::debug;

use crashgate_core::domain::{Category, Severity};
use crashgate_telemetry::{
    install_crash_reporter, GatewayBuilder, GatewayMetrics, LocalReportStore, SpoolTransport,
};

use super::CommandContext;
use crate::output::get_formatter;

#[derive(Debug, Args)]
pub struct EmitCommand {
    /// Event message
    message: String,

    /// Event severity (debug, info, warning, fatal)
    #[arg(long, default_value = "info")]
    severity: Severity,

    /// Event category
    #[arg(long, default_value = "cli")]
    category: Category,

    /// Extra key=value pairs attached to the event
    #[arg(long = "extra", value_parser = parse_key_val)]
    extra: Vec<(String, String)>,

    /// Panic after sending, exercising the crash reporter. The crash report
    /// and the panic event are both stored, and the command exits with an error
    #[arg(long)]
    panic: bool,

    /// Print Prometheus metrics after the event is handled
    #[arg(long)]
    metrics: bool,
}

/// What happened to the emitted event. Labels match the metrics outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Transmitted,
    Breadcrumb,
    Dropped,
}

impl Outcome {
    fn as_str(self) -> &'static str {
        match self {
            Outcome::Transmitted => "transmitted",
            Outcome::Breadcrumb => "breadcrumb",
            Outcome::Dropped => "dropped",
        }
    }
}

impl EmitCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let formatter = get_formatter(ctx.format);
        let config = &ctx.config;

        let errors = config.validate();
        if !errors.is_empty() {
            for error in &errors {
                formatter.error(&error.to_string());
            }
            anyhow::bail!("Invalid configuration ({} error(s))", errors.len());
        }

        let store = LocalReportStore::new(config.storage.reports_dir.clone());
        let metrics =
            Arc::new(GatewayMetrics::new().context("Failed to create metrics registry")?);
        let (transport, worker) = SpoolTransport::new(store.clone(), Some(Arc::clone(&metrics)));
        let flushed = tokio::spawn(worker.run());

        let gateway = Arc::new(
            GatewayBuilder::from_config(config)
                .transport(Arc::new(transport))
                .metrics(Arc::clone(&metrics))
                .build(),
        );
        install_crash_reporter(Arc::clone(&gateway), Some(store));

        gateway.setup(config.reporting.send_crash_reports);
        let crashed_last_launch = gateway.crashed_last_launch();

        let extra: BTreeMap<String, String> = self.extra.iter().cloned().collect();
        gateway.send(
            self.message.clone(),
            self.category.clone(),
            self.severity,
            (!extra.is_empty()).then_some(extra),
        );

        let message = &self.message;
        let panicked = self.panic
            && std::panic::catch_unwind(|| {
                panic!("{}", message);
            })
            .is_err();

        let outcome = [Outcome::Transmitted, Outcome::Breadcrumb]
            .into_iter()
            .find(|o| {
                metrics
                    .events_total
                    .with_label_values(&[o.as_str(), self.severity.as_str()])
                    .get()
                    > 0
            })
            .unwrap_or(Outcome::Dropped);
        let channel = gateway.channel();
        let install_id = gateway.install_id();

        if !panicked {
            gateway.shutdown();
        }
        // The hook holds a gateway handle; removing it lets the spool close
        drop(std::panic::take_hook());
        drop(gateway);
        let written = flushed.await.context("Spool worker failed")?;
        debug!(written, "Spool flushed");

        if ctx.format.is_json() {
            formatter.print_json(&serde_json::json!({
                "outcome": outcome.as_str(),
                "channel": channel,
                "install_id": install_id.as_ref().map(|id| id.as_str()),
                "crashed_last_launch": crashed_last_launch,
                "spooled": written,
                "panicked": panicked,
            }));
        } else {
            formatter.success(&format!("Event {}", outcome.as_str()));
            formatter.field("Channel", &channel.to_string());
            formatter.field(
                "Install ID",
                install_id.as_ref().map(|id| id.as_str()).unwrap_or("(none)"),
            );
            formatter.field("Crashed last launch", &crashed_last_launch.to_string());
            formatter.field("Spooled", &written.to_string());
            if panicked {
                formatter.warn("Panicked after sending; crash report saved");
            }
            if outcome == Outcome::Dropped {
                formatter.warn("Reporting is inactive (simulated environment)");
            }
        }

        if self.metrics {
            print!("{}", metrics.encode()?);
        }

        if panicked {
            anyhow::bail!("Panicked: {}", self.message);
        }
        Ok(())
    }
}

/// Parse a `key=value` argument.
fn parse_key_val(s: &str) -> std::result::Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{s}'"))?;
    if key.is_empty() {
        return Err(format!("empty key in '{s}'"));
    }
    Ok((key.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Debug, Parser)]
    struct Harness {
        #[command(flatten)]
        emit: EmitCommand,
    }

    #[test]
    fn test_parse_key_val() {
        assert_eq!(
            parse_key_val("tab=3").unwrap(),
            ("tab".to_string(), "3".to_string())
        );
        assert_eq!(
            parse_key_val("url=a=b").unwrap(),
            ("url".to_string(), "a=b".to_string())
        );
        assert!(parse_key_val("novalue").is_err());
        assert!(parse_key_val("=x").is_err());
    }

    #[test]
    fn test_arguments_parse() {
        let harness = Harness::try_parse_from([
            "emit",
            "disk full",
            "--severity",
            "warn",
            "--category",
            "storage",
            "--extra",
            "free=0",
        ])
        .unwrap();

        assert_eq!(harness.emit.message, "disk full");
        assert_eq!(harness.emit.severity, Severity::Warning);
        assert_eq!(harness.emit.category.as_str(), "storage");
        assert_eq!(harness.emit.extra, [("free".to_string(), "0".to_string())]);
    }

    #[test]
    fn test_unknown_severity_is_rejected() {
        assert!(Harness::try_parse_from(["emit", "x", "--severity", "loud"]).is_err());
    }

    #[tokio::test]
    async fn test_panic_spools_event_and_keeps_sentinel() {
        use crashgate_core::config::ConfigBuilder;
        use crashgate_core::domain::ChannelHint;
        use crashgate_telemetry::store::{CRASH_REPORT, EVENT_REPORT};
        use crashgate_telemetry::LaunchSentinel;

        use crate::output::OutputFormat;

        let dir = tempfile::tempdir().unwrap();
        let reports = dir.path().join("reports");
        let config = ConfigBuilder::new()
            .app_bundle_identifier("org.mozilla.ios.Firefox")
            .app_version("131.0")
            .app_channel(ChannelHint::Release)
            .reporting_simulated(false)
            .storage_shared_container(Some(dir.path().join("shared")))
            .storage_reports_dir(reports.clone())
            .build();
        let ctx = CommandContext {
            format: OutputFormat::Json,
            config_path: dir.path().join("config.yaml"),
            config,
        };

        let harness =
            Harness::try_parse_from(["emit", "tab crashed", "--severity", "fatal", "--panic"])
                .unwrap();
        let err = harness.emit.execute(&ctx).await.unwrap_err();
        assert!(err.to_string().contains("tab crashed"));

        let store = LocalReportStore::new(reports.clone());
        let entries = store.list().unwrap();
        assert_eq!(
            entries.iter().filter(|e| e.report_type == CRASH_REPORT).count(),
            1
        );
        let panic_events = entries
            .iter()
            .filter(|e| e.report_type == EVENT_REPORT)
            .filter_map(|e| store.read(&e.id).unwrap())
            .filter(|report| report["event"]["extra"]["mechanism"] == "panic")
            .count();
        assert_eq!(panic_events, 1);

        assert!(LaunchSentinel::for_current_process(&reports).path().exists());
    }
}
