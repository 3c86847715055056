//! Crash report generation and persistence
//!
//! Captures panic information, routes it through the gateway as a fatal
//! event and saves a structured JSON report to the local report store.
//! Also tracks unclean terminations with a launch sentinel.

use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crashgate_core::domain::{BuildChannel, EventId};

use crate::gateway::Gateway;
use crate::os_info::OsInfo;
use crate::store::{LocalReportStore, CRASH_REPORT};

/// A structured crash report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrashReport {
    pub id: EventId,
    pub timestamp: String,
    pub release: String,
    pub channel: BuildChannel,
    pub panic_message: String,
    pub location: String,
    pub backtrace: String,
    pub os_info: OsInfo,
}

impl CrashReport {
    /// Create a new crash report from panic information.
    pub fn new(
        release: &str,
        channel: BuildChannel,
        panic_message: &str,
        location: &str,
        backtrace: &str,
    ) -> Self {
        Self {
            id: EventId::new(),
            timestamp: Utc::now().to_rfc3339(),
            release: release.to_string(),
            channel,
            panic_message: panic_message.to_string(),
            location: location.to_string(),
            backtrace: backtrace.to_string(),
            os_info: OsInfo::collect(),
        }
    }
}

/// Save a crash report to the store. File name: `crash-{date}-{id8}.json`
pub fn save_crash_report(
    store: &LocalReportStore,
    report: &CrashReport,
) -> anyhow::Result<PathBuf> {
    store.save(CRASH_REPORT, &report.id.short(), report)
}

/// Installs a panic hook that reports panics through `gateway` and, when a
/// store is given, saves a crash report locally.
///
/// Chains with the existing panic hook so default behavior (stderr output)
/// is preserved.
pub fn install_crash_reporter(gateway: Arc<Gateway>, store: Option<LocalReportStore>) {
    let previous_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        let location = panic_info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_default();

        gateway.capture_panic(&message, &location);

        if let Some(store) = &store {
            let backtrace = std::backtrace::Backtrace::force_capture().to_string();
            let report = CrashReport::new(
                gateway.release_label(),
                gateway.channel(),
                &message,
                &location,
                &backtrace,
            );
            if let Err(e) = save_crash_report(store, &report) {
                eprintln!("Failed to save crash report: {e}");
            }
        }

        // Call the previous panic hook
        previous_hook(panic_info);
    }));
}

/// Token identifying this process incarnation inside its sentinel file.
///
/// Distinguishes a sentinel left by an earlier process that had the same PID.
fn process_token() -> &'static str {
    static TOKEN: OnceLock<String> = OnceLock::new();
    TOKEN.get_or_init(|| Uuid::new_v4().simple().to_string())
}

/// Whether a process with `pid` is still running.
#[cfg(unix)]
fn process_alive(pid: u32) -> bool {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return false;
    };
    // SAFETY: signal 0 performs only the existence and permission check.
    if unsafe { libc::kill(pid, 0) } == 0 {
        return true;
    }
    std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

/// Without a liveness check, other processes are assumed to be running.
#[cfg(not(unix))]
fn process_alive(_pid: u32) -> bool {
    true
}

/// Per-process marker file present while a reporting process is running.
///
/// Each process owns `launch-<pid>.sentinel` in the reports directory, so an
/// app and its helper processes can share the directory. A sentinel whose
/// owner is no longer running means that process never reached a clean
/// shutdown.
#[derive(Debug, Clone)]
pub struct LaunchSentinel {
    dir: PathBuf,
    pid: u32,
    token: String,
}

impl LaunchSentinel {
    const PREFIX: &'static str = "launch-";
    const SUFFIX: &'static str = ".sentinel";

    /// Sentinel owned by the running process.
    pub fn for_current_process(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            pid: std::process::id(),
            token: process_token().to_string(),
        }
    }

    /// Sentinel owned by another process, identified by `pid`.
    pub fn for_pid(dir: impl Into<PathBuf>, pid: u32) -> Self {
        Self {
            dir: dir.into(),
            pid,
            token: Uuid::new_v4().simple().to_string(),
        }
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn path(&self) -> PathBuf {
        self.dir
            .join(format!("{}{}{}", Self::PREFIX, self.pid, Self::SUFFIX))
    }

    /// Collect sentinels left by terminated processes, then create our own.
    ///
    /// Returns `true` if any previous process exited uncleanly. Stale
    /// sentinels are removed; those of running processes are left alone.
    pub fn arm(&self) -> bool {
        let crashed = self.reap_stale();

        let path = self.path();
        let result = std::fs::create_dir_all(&self.dir).and_then(|()| {
            std::fs::write(&path, format!("{}\n{}\n", self.token, Utc::now().to_rfc3339()))
        });
        if let Err(e) = result {
            tracing::warn!(path = %path.display(), error = %e, "Failed to write launch sentinel");
        }

        if crashed {
            tracing::info!("Previous launch did not shut down cleanly");
        }
        crashed
    }

    /// Remove this process's sentinel after a clean shutdown.
    pub fn disarm(&self) {
        let path = self.path();
        match std::fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to remove launch sentinel")
            }
        }
    }

    fn reap_stale(&self) -> bool {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return false,
            Err(e) => {
                tracing::warn!(dir = %self.dir.display(), error = %e, "Failed to scan launch sentinels");
                return false;
            }
        };

        let mut crashed = false;
        for entry in entries.flatten() {
            let path = entry.path();
            let Some(pid) = path
                .file_name()
                .and_then(|name| Self::owner_pid(&name.to_string_lossy()))
            else {
                continue;
            };

            let stale = if pid == self.pid {
                // Same PID but another incarnation: the PID was reused
                std::fs::read_to_string(&path)
                    .map(|content| content.lines().next() != Some(self.token.as_str()))
                    .unwrap_or(false)
            } else {
                !process_alive(pid)
            };

            if stale {
                tracing::debug!(pid, "Found launch sentinel of terminated process");
                crashed = true;
                if pid != self.pid {
                    if let Err(e) = std::fs::remove_file(&path) {
                        tracing::warn!(path = %path.display(), error = %e, "Failed to remove stale launch sentinel");
                    }
                }
            }
        }
        crashed
    }

    fn owner_pid(file_name: &str) -> Option<u32> {
        file_name
            .strip_prefix(Self::PREFIX)?
            .strip_suffix(Self::SUFFIX)?
            .parse()
            .ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crash_report_creation() {
        let report = CrashReport::new(
            "org.mozilla.ios.Firefox@131.0",
            BuildChannel::Release,
            "test panic",
            "lib.rs:42:1",
            "fake backtrace",
        );
        assert_eq!(report.release, "org.mozilla.ios.Firefox@131.0");
        assert_eq!(report.panic_message, "test panic");
        assert_eq!(report.location, "lib.rs:42:1");
    }

    #[test]
    fn test_save_crash_report() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalReportStore::new(dir.path().to_path_buf());
        let report = CrashReport::new("app@1", BuildChannel::Beta, "boom", "main.rs:10:5", "");

        let path = save_crash_report(&store, &report).unwrap();
        assert!(path.exists());
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("crash-"));

        let content = std::fs::read_to_string(&path).unwrap();
        let loaded: CrashReport = serde_json::from_str(&content).unwrap();
        assert_eq!(loaded.panic_message, "boom");
        assert_eq!(loaded.channel, BuildChannel::Beta);
    }

    /// PID of a process that has already exited and been reaped.
    #[cfg(unix)]
    fn dead_pid() -> u32 {
        let mut child = std::process::Command::new("true").spawn().unwrap();
        let pid = child.id();
        child.wait().unwrap();
        pid
    }

    #[test]
    fn test_owner_pid_parsing() {
        assert_eq!(LaunchSentinel::owner_pid("launch-4242.sentinel"), Some(4242));
        assert_eq!(LaunchSentinel::owner_pid("launch.sentinel"), None);
        assert_eq!(LaunchSentinel::owner_pid("launch-abc.sentinel"), None);
        assert_eq!(LaunchSentinel::owner_pid("event-20260207-abc.json"), None);
    }

    #[test]
    fn test_rearm_in_same_process_is_clean() {
        let dir = tempfile::tempdir().unwrap();
        let sentinel = LaunchSentinel::for_current_process(dir.path());

        assert!(!sentinel.arm());
        assert!(sentinel.path().exists());
        assert!(!sentinel.arm());
    }

    #[test]
    fn test_reused_pid_counts_as_unclean_exit() {
        let dir = tempfile::tempdir().unwrap();
        // Earlier incarnation that happened to have our PID
        LaunchSentinel::for_pid(dir.path(), std::process::id()).arm();

        let current = LaunchSentinel::for_current_process(dir.path());
        assert!(current.arm());
        assert!(!current.arm());
    }

    #[cfg(unix)]
    #[test]
    fn test_dead_owner_is_reported_and_reaped() {
        let dir = tempfile::tempdir().unwrap();
        let crashed = LaunchSentinel::for_pid(dir.path(), dead_pid());
        crashed.arm();

        let current = LaunchSentinel::for_current_process(dir.path());
        assert!(current.arm());
        assert!(!crashed.path().exists());

        current.disarm();
        assert!(!current.path().exists());
        assert!(!current.arm());
    }

    #[cfg(unix)]
    #[test]
    fn test_running_owner_is_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let parent = LaunchSentinel::for_pid(dir.path(), std::os::unix::process::parent_id());
        parent.arm();

        let current = LaunchSentinel::for_current_process(dir.path());
        assert!(!current.arm());
        current.disarm();
        assert!(parent.path().exists());
    }

    #[test]
    fn test_disarm_without_sentinel_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let sentinel = LaunchSentinel::for_current_process(dir.path());
        sentinel.disarm();
        assert!(!sentinel.path().exists());
    }
}
