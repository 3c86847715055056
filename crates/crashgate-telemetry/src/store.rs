//! Local report storage
//!
//! Manages spooled event and crash report files in
//! `~/.local/share/crashgate/reports/`. File names follow
//! `{type}-{YYYYMMDD}-{id8}.json`.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

use crashgate_core::ports::Envelope;

/// Report type prefix for transmitted events.
pub const EVENT_REPORT: &str = "event";
/// Report type prefix for panic reports.
pub const CRASH_REPORT: &str = "crash";

/// Entry in the local report store
#[derive(Debug, Clone)]
pub struct ReportEntry {
    pub id: String,
    pub report_type: String,
    pub date: String,
    pub size_bytes: u64,
    pub path: PathBuf,
}

/// Manages the local directory of report files.
#[derive(Debug, Clone)]
pub struct LocalReportStore {
    reports_dir: PathBuf,
}

impl LocalReportStore {
    /// Creates a new store pointing at `reports_dir`.
    pub fn new(reports_dir: PathBuf) -> Self {
        Self { reports_dir }
    }

    /// Returns the default reports directory.
    pub fn default_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("crashgate")
            .join("reports")
    }

    /// Write `report` as pretty JSON under `{report_type}-{today}-{short_id}.json`.
    pub fn save<T: Serialize>(
        &self,
        report_type: &str,
        short_id: &str,
        report: &T,
    ) -> anyhow::Result<PathBuf> {
        std::fs::create_dir_all(&self.reports_dir)?;

        let date = Utc::now().format("%Y%m%d");
        let path = self
            .reports_dir
            .join(format!("{report_type}-{date}-{short_id}.json"));

        let json = serde_json::to_string_pretty(report)?;
        std::fs::write(&path, json)?;

        Ok(path)
    }

    /// Spool a transmitted envelope.
    pub fn save_envelope(&self, envelope: &Envelope) -> anyhow::Result<PathBuf> {
        self.save(EVENT_REPORT, &envelope.event.id().short(), envelope)
    }

    /// List all report files in the store, newest date first.
    pub fn list(&self) -> anyhow::Result<Vec<ReportEntry>> {
        if !self.reports_dir.exists() {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        for entry in std::fs::read_dir(&self.reports_dir)? {
            let entry = entry?;
            let path = entry.path();

            if path.extension().is_some_and(|e| e == "json") {
                let filename = path
                    .file_stem()
                    .unwrap_or_default()
                    .to_string_lossy()
                    .to_string();

                let (report_type, date, id) = parse_report_filename(&filename);
                let metadata = entry.metadata()?;

                entries.push(ReportEntry {
                    id,
                    report_type,
                    date,
                    size_bytes: metadata.len(),
                    path,
                });
            }
        }

        entries.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.id.cmp(&b.id)));
        Ok(entries)
    }

    /// Read a report by its ID (filename stem match).
    pub fn read(&self, id: &str) -> anyhow::Result<Option<Value>> {
        match self.find(id)? {
            Some(entry) => {
                let content = std::fs::read_to_string(&entry.path)?;
                Ok(Some(serde_json::from_str(&content)?))
            }
            None => Ok(None),
        }
    }

    /// Delete a report by its ID.
    pub fn delete(&self, id: &str) -> anyhow::Result<bool> {
        match self.find(id)? {
            Some(entry) => {
                std::fs::remove_file(&entry.path)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Delete all reports.
    pub fn delete_all(&self) -> anyhow::Result<u32> {
        let entries = self.list()?;
        let mut count = 0;
        for entry in entries {
            if std::fs::remove_file(&entry.path).is_ok() {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Returns the reports directory path.
    pub fn reports_dir(&self) -> &Path {
        &self.reports_dir
    }

    fn find(&self, id: &str) -> anyhow::Result<Option<ReportEntry>> {
        Ok(self.list()?.into_iter().find(|entry| {
            entry.id == id
                || entry
                    .path
                    .file_stem()
                    .unwrap_or_default()
                    .to_string_lossy()
                    .contains(id)
        }))
    }
}

/// Parse a report filename like `crash-20260207-a1b2c3d4` into (type, date, id).
fn parse_report_filename(stem: &str) -> (String, String, String) {
    let parts: Vec<&str> = stem.splitn(3, '-').collect();
    match parts.len() {
        3 => (
            parts[0].to_string(),
            parts[1].to_string(),
            parts[2].to_string(),
        ),
        2 => (parts[0].to_string(), parts[1].to_string(), stem.to_string()),
        _ => ("unknown".to_string(), String::new(), stem.to_string()),
    }
}
