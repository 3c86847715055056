//! Report command - Manage spooled event and crash reports
//!
//! Provides the `crashgate report` CLI command with subcommands:
//! - `list`: Show all saved reports
//! - `view <id>`: Display a specific report
//! - `delete`: Remove reports from local storage

use anyhow::Result;
use clap::Subcommand;
use serde_json::Value;

use crashgate_telemetry::LocalReportStore;

use super::CommandContext;
use crate::output::get_formatter;

/// Report management subcommands
#[derive(Debug, Subcommand)]
pub enum ReportCommand {
    /// List all saved event and crash reports
    List,
    /// View a specific report
    View {
        /// Report ID or filename fragment
        id: String,
        /// Show raw JSON instead of a summary
        #[arg(long)]
        raw: bool,
    },
    /// Delete reports from local storage
    Delete {
        /// Specific report ID to delete
        id: Option<String>,
        /// Delete all reports
        #[arg(long)]
        all: bool,
    },
}

impl ReportCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let formatter = get_formatter(ctx.format);
        let store = LocalReportStore::new(ctx.config.storage.reports_dir.clone());

        match self {
            ReportCommand::List => {
                let entries = store.list()?;

                if ctx.format.is_json() {
                    let json: Vec<Value> = entries
                        .iter()
                        .map(|e| {
                            serde_json::json!({
                                "id": e.id,
                                "type": e.report_type,
                                "date": e.date,
                                "size_bytes": e.size_bytes,
                            })
                        })
                        .collect();
                    formatter.print_json(&Value::Array(json));
                    return Ok(());
                }

                if entries.is_empty() {
                    formatter.info("No reports found.");
                    return Ok(());
                }

                println!("{:<12} {:<8} {:<12} {:>10}", "ID", "Type", "Date", "Size");
                println!("{}", "-".repeat(46));
                for entry in &entries {
                    println!(
                        "{:<12} {:<8} {:<12} {:>10}",
                        entry.id,
                        entry.report_type,
                        entry.date,
                        format_size(entry.size_bytes),
                    );
                }
                println!();
                println!("Total: {} report(s)", entries.len());
            }

            ReportCommand::View { id, raw } => match store.read(id)? {
                Some(value) if *raw || ctx.format.is_json() => {
                    println!("{}", serde_json::to_string_pretty(&value)?);
                }
                Some(value) => {
                    for (key, text) in summarize(&value) {
                        formatter.field(&key, &text);
                    }
                }
                None => {
                    formatter.error(&format!("Report '{id}' not found"));
                }
            },

            ReportCommand::Delete { id, all } => {
                if *all {
                    let count = store.delete_all()?;
                    formatter.success(&format!("Deleted {count} report(s)"));
                    formatter.print_json(&serde_json::json!({ "deleted": count }));
                } else if let Some(report_id) = id {
                    if store.delete(report_id)? {
                        formatter.success(&format!("Deleted report '{report_id}'"));
                        formatter.print_json(&serde_json::json!({ "deleted": 1 }));
                    } else {
                        formatter.error(&format!("Report '{report_id}' not found"));
                    }
                } else {
                    formatter.error("Specify a report ID or use --all");
                }
            }
        }

        Ok(())
    }
}

/// Flatten the interesting fields of an event envelope or crash report.
fn summarize(value: &Value) -> Vec<(String, String)> {
    let mut rows = Vec::new();
    let mut push = |key: &str, v: Option<&Value>| {
        if let Some(v) = v {
            let text = match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            rows.push((key.to_string(), text));
        }
    };

    if let Some(event) = value.get("event") {
        push("release", value.get("release"));
        push("environment", value.get("environment"));
        push("install_id", value.get("install_id"));
        push("timestamp", event.get("timestamp"));
        push("severity", event.get("severity"));
        push("category", event.get("category"));
        push("message", event.get("message"));
        if let Some(Value::Object(extra)) = event.get("extra") {
            for (k, v) in extra {
                push(&format!("extra.{k}"), Some(v));
            }
        }
        if let Some(Value::Array(crumbs)) = value.get("breadcrumbs") {
            push("breadcrumbs", Some(&Value::from(crumbs.len())));
        }
    } else {
        push("release", value.get("release"));
        push("timestamp", value.get("timestamp"));
        push("panic_message", value.get("panic_message"));
        push("location", value.get("location"));
    }
    rows
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MB");
    }

    #[test]
    fn test_summarize_envelope() {
        let value = serde_json::json!({
            "release": "org.mozilla.ios.Firefox@131.0",
            "environment": "Production",
            "event": {
                "message": "crash",
                "severity": "fatal",
                "category": "uncaught_error",
                "extra": { "location": "main.rs:1:1" }
            },
            "breadcrumbs": [{}, {}]
        });
        let rows = summarize(&value);
        assert!(rows.contains(&("message".to_string(), "crash".to_string())));
        assert!(rows.contains(&("extra.location".to_string(), "main.rs:1:1".to_string())));
        assert!(rows.contains(&("breadcrumbs".to_string(), "2".to_string())));
    }

    #[test]
    fn test_summarize_crash_report() {
        let value = serde_json::json!({
            "release": "app@1",
            "panic_message": "boom",
            "location": "lib.rs:2:3"
        });
        let rows = summarize(&value);
        assert!(rows.contains(&("panic_message".to_string(), "boom".to_string())));
        assert!(!rows.iter().any(|(k, _)| k == "message"));
    }
}
