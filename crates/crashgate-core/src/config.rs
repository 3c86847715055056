//! Configuration module for crashgate.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::channel::{AppMetadata, ChannelClassifier, ChannelHint, DEFAULT_ALLOWED_BUNDLE_IDS};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for crashgate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub app: AppConfig,
    pub reporting: ReportingConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

/// Static metadata describing the host application.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Bundle / package identifier of the running application.
    pub bundle_identifier: String,
    /// Marketing version string.
    pub version: String,
    pub build_number: String,
    /// Version string that marks nightly builds.
    pub nightly_version: String,
    /// Distribution track: `developer`, `beta` or `release`.
    pub channel: ChannelHint,
}

/// Reporting policy settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportingConfig {
    /// Consent flag passed to `setup`.
    pub send_crash_reports: bool,
    /// When set, `send_crash_reports: false` suppresses all transmission.
    pub respect_opt_out: bool,
    /// Treat any bundle identifier as a production build (test harnesses).
    pub skip_release_name_check: bool,
    /// Force the simulated-environment answer instead of probing.
    pub simulated: Option<bool>,
    /// Bundle identifiers of production builds.
    pub allowed_bundle_ids: Vec<String>,
    /// Maximum number of retained breadcrumbs.
    pub breadcrumb_capacity: usize,
}

/// Storage locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory shared by the app and its auxiliary processes. Without it
    /// no install identifier is provisioned.
    pub shared_container: Option<PathBuf>,
    /// Directory for locally spooled reports and the launch sentinel.
    pub reports_dir: PathBuf,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
    /// Emit JSON log lines instead of the human-readable format.
    pub json: bool,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Using default configuration");
                Self::default()
            }
        }
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/crashgate/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("crashgate")
            .join("config.yaml")
    }

    /// The [`AppMetadata`] described by the `app` and `storage` sections.
    pub fn app_metadata(&self) -> AppMetadata {
        AppMetadata {
            bundle_identifier: self.app.bundle_identifier.clone(),
            app_version: self.app.version.clone(),
            build_number: self.app.build_number.clone(),
            nightly_app_version: self.app.nightly_version.clone(),
            channel_hint: self.app.channel,
            shared_container: self.storage.shared_container.clone(),
        }
    }

    /// A [`ChannelClassifier`] built from the `reporting` section.
    pub fn classifier(&self) -> ChannelClassifier {
        ChannelClassifier::new(
            self.reporting.allowed_bundle_ids.clone(),
            self.reporting.skip_release_name_check,
        )
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Default number of breadcrumbs retained.
pub const DEFAULT_BREADCRUMB_CAPACITY: usize = 100;

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bundle_identifier: "com.browser".to_string(),
            version: "1.0".to_string(),
            build_number: "1".to_string(),
            nightly_version: String::new(),
            channel: ChannelHint::Developer,
        }
    }
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            send_crash_reports: true,
            respect_opt_out: false,
            skip_release_name_check: false,
            simulated: None,
            allowed_bundle_ids: DEFAULT_ALLOWED_BUNDLE_IDS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            breadcrumb_capacity: DEFAULT_BREADCRUMB_CAPACITY,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("crashgate");
        Self {
            shared_container: Some(data_dir.join("shared")),
            reports_dir: data_dir.join("reports"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"reporting.breadcrumb_capacity"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Upper bound for `reporting.breadcrumb_capacity`.
const MAX_BREADCRUMB_CAPACITY: usize = 10_000;

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- app ---
        if self.app.bundle_identifier.trim().is_empty() {
            errors.push(ValidationError {
                field: "app.bundle_identifier".into(),
                message: "must not be empty".into(),
            });
        }
        if self.app.version.trim().is_empty() {
            errors.push(ValidationError {
                field: "app.version".into(),
                message: "must not be empty".into(),
            });
        }

        // --- reporting ---
        if self.reporting.breadcrumb_capacity == 0
            || self.reporting.breadcrumb_capacity > MAX_BREADCRUMB_CAPACITY
        {
            errors.push(ValidationError {
                field: "reporting.breadcrumb_capacity".into(),
                message: format!("must be in range 1..={MAX_BREADCRUMB_CAPACITY}"),
            });
        }
        if self
            .reporting
            .allowed_bundle_ids
            .iter()
            .any(|id| id.trim().is_empty())
        {
            errors.push(ValidationError {
                field: "reporting.allowed_bundle_ids".into(),
                message: "entries must not be empty".into(),
            });
        }

        // --- storage ---
        if self.storage.reports_dir.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "storage.reports_dir".into(),
                message: "must not be empty".into(),
            });
        }
        if let Some(shared) = &self.storage.shared_container {
            if shared.as_os_str().is_empty() {
                errors.push(ValidationError {
                    field: "storage.shared_container".into(),
                    message: "must not be empty when set".into(),
                });
            }
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use crashgate_core::config::ConfigBuilder;
/// use crashgate_core::domain::ChannelHint;
///
/// let config = ConfigBuilder::new()
///     .app_bundle_identifier("org.mozilla.ios.Firefox")
///     .app_version("131.0")
///     .app_channel(ChannelHint::Release)
///     .logging_level("debug")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- app ---

    pub fn app_bundle_identifier(mut self, id: impl Into<String>) -> Self {
        self.config.app.bundle_identifier = id.into();
        self
    }

    pub fn app_version(mut self, version: impl Into<String>) -> Self {
        self.config.app.version = version.into();
        self
    }

    pub fn app_nightly_version(mut self, version: impl Into<String>) -> Self {
        self.config.app.nightly_version = version.into();
        self
    }

    pub fn app_channel(mut self, channel: ChannelHint) -> Self {
        self.config.app.channel = channel;
        self
    }

    // --- reporting ---

    pub fn reporting_send_crash_reports(mut self, send: bool) -> Self {
        self.config.reporting.send_crash_reports = send;
        self
    }

    pub fn reporting_respect_opt_out(mut self, respect: bool) -> Self {
        self.config.reporting.respect_opt_out = respect;
        self
    }

    pub fn reporting_skip_release_name_check(mut self, skip: bool) -> Self {
        self.config.reporting.skip_release_name_check = skip;
        self
    }

    pub fn reporting_simulated(mut self, simulated: bool) -> Self {
        self.config.reporting.simulated = Some(simulated);
        self
    }

    pub fn reporting_breadcrumb_capacity(mut self, capacity: usize) -> Self {
        self.config.reporting.breadcrumb_capacity = capacity;
        self
    }

    // --- storage ---

    pub fn storage_shared_container(mut self, dir: Option<PathBuf>) -> Self {
        self.config.storage.shared_container = dir;
        self
    }

    pub fn storage_reports_dir(mut self, dir: PathBuf) -> Self {
        self.config.storage.reports_dir = dir;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
