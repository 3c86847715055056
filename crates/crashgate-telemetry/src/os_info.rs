//! Operating system information collector
//!
//! Gathers non-identifying system information attached to transmitted
//! envelopes and crash reports. Never includes hostname or username.

use serde::{Deserialize, Serialize};

/// Non-identifying operating system information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OsInfo {
    pub os: String,
    pub family: String,
    pub kernel: String,
    pub arch: String,
}

impl OsInfo {
    /// Collect OS information from the current system.
    pub fn collect() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            family: std::env::consts::FAMILY.to_string(),
            kernel: read_kernel_version(),
            arch: std::env::consts::ARCH.to_string(),
        }
    }

    /// JSON form used as the `os` context of an envelope.
    pub fn to_context(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(target_os = "linux")]
fn read_kernel_version() -> String {
    std::fs::read_to_string("/proc/version")
        .ok()
        .and_then(|v| v.split_whitespace().nth(2).map(String::from))
        .unwrap_or_default()
}

#[cfg(not(target_os = "linux"))]
fn read_kernel_version() -> String {
    String::new()
}
