//! Release channel classification
//!
//! A running build belongs to exactly one [`BuildChannel`], derived once from
//! static [`AppMetadata`]. Builds that do not carry a known production bundle
//! identifier classify as [`BuildChannel::Unrecognized`] and never report.

use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

/// Bundle identifiers of production builds that are allowed to report.
pub const DEFAULT_ALLOWED_BUNDLE_IDS: &[&str] =
    &["org.mozilla.ios.Firefox", "org.mozilla.ios.FirefoxBeta"];

/// Distribution track the build was shipped through, as declared by the
/// build itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelHint {
    /// Local or CI build
    #[default]
    Developer,
    Beta,
    Release,
}

impl Display for ChannelHint {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChannelHint::Developer => "developer",
            ChannelHint::Beta => "beta",
            ChannelHint::Release => "release",
        };
        f.write_str(s)
    }
}

impl FromStr for ChannelHint {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "developer" | "debug" => Ok(ChannelHint::Developer),
            "beta" => Ok(ChannelHint::Beta),
            "release" => Ok(ChannelHint::Release),
            _ => Err(DomainError::InvalidChannelHint(s.to_string())),
        }
    }
}

/// Release channel the running process belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildChannel {
    /// Development or unknown build; never reports
    Unrecognized,
    /// Nightly build shipped through the beta track
    Nightly,
    Beta,
    Release,
}

impl BuildChannel {
    /// Whether this channel represents a real install that may transmit.
    pub fn is_reporting(self) -> bool {
        !matches!(self, BuildChannel::Unrecognized)
    }

    /// Environment tag attached to emitted reports.
    pub fn environment(self) -> &'static str {
        match self {
            BuildChannel::Nightly => "Nightly",
            BuildChannel::Unrecognized => "Development",
            BuildChannel::Beta | BuildChannel::Release => "Production",
        }
    }
}

impl Display for BuildChannel {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            BuildChannel::Unrecognized => "unrecognized",
            BuildChannel::Nightly => "nightly",
            BuildChannel::Beta => "beta",
            BuildChannel::Release => "release",
        };
        f.write_str(s)
    }
}

/// Static application metadata supplied by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppMetadata {
    pub bundle_identifier: String,
    pub app_version: String,
    #[serde(default)]
    pub build_number: String,
    /// Version string that marks a nightly build
    #[serde(default)]
    pub nightly_app_version: String,
    #[serde(default)]
    pub channel_hint: ChannelHint,
    /// Storage area shared by the app and its auxiliary processes
    #[serde(default)]
    pub shared_container: Option<PathBuf>,
}

impl AppMetadata {
    pub fn new(bundle_identifier: impl Into<String>, app_version: impl Into<String>) -> Self {
        Self {
            bundle_identifier: bundle_identifier.into(),
            app_version: app_version.into(),
            build_number: String::new(),
            nightly_app_version: String::new(),
            channel_hint: ChannelHint::Developer,
            shared_container: None,
        }
    }

    pub fn with_channel_hint(mut self, hint: ChannelHint) -> Self {
        self.channel_hint = hint;
        self
    }

    pub fn with_nightly_version(mut self, version: impl Into<String>) -> Self {
        self.nightly_app_version = version.into();
        self
    }

    pub fn with_shared_container(mut self, path: impl Into<PathBuf>) -> Self {
        self.shared_container = Some(path.into());
        self
    }

    /// `"<bundle_id>@<version>"`, the release name attached to reports.
    pub fn release_label(&self) -> String {
        format!("{}@{}", self.bundle_identifier, self.app_version)
    }

    fn is_nightly(&self) -> bool {
        !self.nightly_app_version.is_empty()
            && self.app_version == self.nightly_app_version
            && self.channel_hint == ChannelHint::Beta
    }
}

/// Derives a [`BuildChannel`] from [`AppMetadata`].
#[derive(Debug, Clone)]
pub struct ChannelClassifier {
    allowed_bundle_ids: Vec<String>,
    skip_release_name_check: bool,
}

impl ChannelClassifier {
    pub fn new(allowed_bundle_ids: Vec<String>, skip_release_name_check: bool) -> Self {
        Self {
            allowed_bundle_ids,
            skip_release_name_check,
        }
    }

    /// Classify the running build.
    ///
    /// Nightly is decided first (version marker plus beta hint). Otherwise an
    /// allow-listed bundle follows its hint (`Beta` for a beta hint, `Release`
    /// for anything else), and everything else is `Unrecognized`.
    pub fn classify(&self, metadata: &AppMetadata) -> BuildChannel {
        if metadata.is_nightly() {
            return BuildChannel::Nightly;
        }

        if !self.is_valid_release_name(metadata) {
            return BuildChannel::Unrecognized;
        }

        match metadata.channel_hint {
            ChannelHint::Beta => BuildChannel::Beta,
            ChannelHint::Release | ChannelHint::Developer => BuildChannel::Release,
        }
    }

    fn is_valid_release_name(&self, metadata: &AppMetadata) -> bool {
        self.skip_release_name_check
            || self
                .allowed_bundle_ids
                .iter()
                .any(|id| *id == metadata.bundle_identifier)
    }
}

impl Default for ChannelClassifier {
    fn default() -> Self {
        Self::new(
            DEFAULT_ALLOWED_BUNDLE_IDS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            false,
        )
    }
}
