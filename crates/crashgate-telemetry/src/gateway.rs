//! Reporting gateway
//!
//! Decides, for every event raised by the host application, whether it is
//! transmitted, kept as a breadcrumb, or dropped.
//!
//! # State machine
//!
//! ```text
//! Uninitialized --setup()--> Active
//! ```
//!
//! Activation is monotonic. Before it, every event is dropped. A single
//! mutex guards the activation flag and the breadcrumb ring, so each event
//! is evaluated against either the complete pre-setup or the complete
//! post-setup state. The transport is always called after that lock is
//! released.

use std::collections::BTreeMap;
use std::error::Error;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crashgate_core::config::{Config, DEFAULT_BREADCRUMB_CAPACITY};
use crashgate_core::domain::{
    AppMetadata, BuildChannel, Category, ChannelClassifier, Event, InstallId, Severity,
};
use crashgate_core::ports::{
    EnvProbe, Envelope, EnvironmentProbe, SharedStorage, StaticProbe, Transport,
};
use tracing::{debug, info};

use crate::breadcrumbs::BreadcrumbRing;
use crate::crash_report::LaunchSentinel;
use crate::identifier;
use crate::metrics::{outcome, setup_result, GatewayMetrics};
use crate::os_info::OsInfo;
use crate::policy::{Decision, ReportingPolicy};
use crate::shared_storage::DirectoryStorage;
use crate::signals;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Uninitialized,
    Active,
}

/// Mutable state, only touched with the gateway lock held.
#[derive(Debug)]
struct GatewayState {
    phase: Phase,
    consent: bool,
    install_id: Option<InstallId>,
    crashed_last_launch: bool,
    breadcrumbs: BreadcrumbRing,
}

/// Thread-safe diagnostic-event gateway.
pub struct Gateway {
    metadata: AppMetadata,
    channel: BuildChannel,
    release: String,
    respect_opt_out: bool,
    probe: Arc<dyn EnvironmentProbe>,
    storage: Option<Arc<dyn SharedStorage>>,
    transport: Arc<dyn Transport>,
    sentinel: Option<LaunchSentinel>,
    metrics: Option<Arc<GatewayMetrics>>,
    os: OsInfo,
    state: Mutex<GatewayState>,
}

/// Builder for [`Gateway`].
pub struct GatewayBuilder {
    metadata: AppMetadata,
    classifier: ChannelClassifier,
    respect_opt_out: bool,
    breadcrumb_capacity: usize,
    probe: Arc<dyn EnvironmentProbe>,
    storage: Option<Arc<dyn SharedStorage>>,
    transport: Arc<dyn Transport>,
    reports_dir: Option<PathBuf>,
    metrics: Option<Arc<GatewayMetrics>>,
}

impl GatewayBuilder {
    fn new(metadata: AppMetadata) -> Self {
        let storage = metadata
            .shared_container
            .clone()
            .map(|dir| Arc::new(DirectoryStorage::new(dir)) as Arc<dyn SharedStorage>);
        Self {
            metadata,
            classifier: ChannelClassifier::default(),
            respect_opt_out: false,
            breadcrumb_capacity: DEFAULT_BREADCRUMB_CAPACITY,
            probe: Arc::new(EnvProbe),
            storage,
            transport: Arc::new(crashgate_core::ports::NullTransport),
            reports_dir: None,
            metrics: None,
        }
    }

    /// Builder wired from configuration: classifier, probe, storage scope,
    /// breadcrumb capacity and reports directory.
    pub fn from_config(config: &Config) -> Self {
        let probe: Arc<dyn EnvironmentProbe> = match config.reporting.simulated {
            Some(simulated) => Arc::new(StaticProbe(simulated)),
            None => Arc::new(EnvProbe),
        };

        Self::new(config.app_metadata())
            .classifier(config.classifier())
            .respect_opt_out(config.reporting.respect_opt_out)
            .breadcrumb_capacity(config.reporting.breadcrumb_capacity)
            .probe(probe)
            .reports_dir(Some(config.storage.reports_dir.clone()))
    }

    pub fn classifier(mut self, classifier: ChannelClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn respect_opt_out(mut self, respect: bool) -> Self {
        self.respect_opt_out = respect;
        self
    }

    pub fn breadcrumb_capacity(mut self, capacity: usize) -> Self {
        self.breadcrumb_capacity = capacity;
        self
    }

    pub fn probe(mut self, probe: Arc<dyn EnvironmentProbe>) -> Self {
        self.probe = probe;
        self
    }

    /// Overrides the storage derived from `AppMetadata::shared_container`.
    pub fn storage(mut self, storage: Option<Arc<dyn SharedStorage>>) -> Self {
        self.storage = storage;
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = transport;
        self
    }

    /// Directory holding the per-process launch sentinels used by
    /// `crashed_last_launch`.
    pub fn reports_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.reports_dir = dir;
        self
    }

    pub fn metrics(mut self, metrics: Arc<GatewayMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Classifies the build and returns an inactive gateway.
    pub fn build(self) -> Gateway {
        let channel = self.classifier.classify(&self.metadata);
        let release = self.metadata.release_label();
        debug!(%channel, %release, "Gateway created");

        Gateway {
            channel,
            release,
            metadata: self.metadata,
            respect_opt_out: self.respect_opt_out,
            probe: self.probe,
            storage: self.storage,
            transport: self.transport,
            sentinel: self.reports_dir.map(LaunchSentinel::for_current_process),
            metrics: self.metrics,
            os: OsInfo::collect(),
            state: Mutex::new(GatewayState {
                phase: Phase::Uninitialized,
                consent: false,
                install_id: None,
                crashed_last_launch: false,
                breadcrumbs: BreadcrumbRing::new(self.breadcrumb_capacity),
            }),
        }
    }
}

impl Gateway {
    pub fn builder(metadata: AppMetadata) -> GatewayBuilder {
        GatewayBuilder::new(metadata)
    }

    /// Gateway wired from configuration. See [`GatewayBuilder::from_config`].
    pub fn from_config(config: &Config, transport: Arc<dyn Transport>) -> Self {
        GatewayBuilder::from_config(config)
            .transport(transport)
            .build()
    }

    // ========================================================================
    // Activation
    // ========================================================================

    /// Activate reporting.
    ///
    /// Does nothing in a simulated environment. Repeated calls keep the
    /// gateway active, retry identifier provisioning if no identity was
    /// obtained yet, and update the recorded consent.
    pub fn setup(&self, send_crash_reports: bool) {
        if self.probe.is_simulated() {
            debug!("Simulated environment; crash reporting stays inactive");
            self.record_setup(setup_result::SIMULATED);
            return;
        }

        {
            let mut state = self.lock();
            state.consent = send_crash_reports;

            if state.install_id.is_none() {
                state.install_id = identifier::provision(self.storage.as_deref());
            }

            if state.phase == Phase::Active {
                debug!("Crash reporting already active");
                self.record_setup(setup_result::ALREADY_ACTIVE);
            } else {
                state.crashed_last_launch =
                    self.sentinel.as_ref().is_some_and(LaunchSentinel::arm);
                state.phase = Phase::Active;
                info!(
                    channel = %self.channel,
                    release = %self.release,
                    send_crash_reports,
                    has_install_id = state.install_id.is_some(),
                    "Crash reporting activated"
                );
                self.record_setup(setup_result::ACTIVATED);
            }
        }

        signals::ignore_broken_pipe();
    }

    /// Mark a clean shutdown so the next launch does not report a crash.
    pub fn shutdown(&self) {
        let state = self.lock();
        if state.phase == Phase::Active {
            if let Some(sentinel) = &self.sentinel {
                sentinel.disarm();
            }
        }
    }

    // ========================================================================
    // Events
    // ========================================================================

    /// Report a message event.
    pub fn send(
        &self,
        message: impl Into<String>,
        category: Category,
        severity: Severity,
        extra: Option<BTreeMap<String, String>>,
    ) {
        let event = Event::new(message, category, severity).with_extra(extra.unwrap_or_default());
        self.send_event(event);
    }

    /// Report a pre-built event.
    pub fn send_event(&self, event: Event) {
        let envelope = {
            let mut state = self.lock();
            let severity = event.severity();

            if state.phase != Phase::Active {
                self.record_event(outcome::DROPPED, severity);
                return;
            }

            let policy = ReportingPolicy::new(self.respect_opt_out, state.consent);
            match policy.decide(self.channel, severity) {
                Decision::Retain => {
                    state.breadcrumbs.record(event);
                    self.record_event(outcome::BREADCRUMB, severity);
                    if let Some(metrics) = &self.metrics {
                        metrics.set_breadcrumbs(state.breadcrumbs.len());
                    }
                    return;
                }
                Decision::Transmit => {
                    self.record_event(outcome::TRANSMITTED, severity);
                    self.envelope(event, &state)
                }
            }
        };

        debug!(event_id = %envelope.event.id(), breadcrumbs = envelope.breadcrumbs.len(), "Transmitting event");
        self.transport.deliver(envelope);
    }

    /// Report an error as a fatal `uncaught_error` event.
    ///
    /// The concrete error type and its source chain are attached as extras.
    pub fn capture_error<E: Error>(&self, error: &E) {
        self.capture(error, Some(std::any::type_name::<E>()));
    }

    /// Report a type-erased error, such as the contents of a
    /// `Box<dyn Error>`. Only the source chain is attached; the concrete
    /// type is not recoverable from a trait object.
    pub fn capture_dyn_error(&self, error: &dyn Error) {
        self.capture(error, None);
    }

    fn capture(&self, error: &dyn Error, error_type: Option<&str>) {
        let mut extra = BTreeMap::new();
        if let Some(error_type) = error_type {
            extra.insert("error_type".to_string(), error_type.to_string());
        }

        let chain: Vec<String> = std::iter::successors(error.source(), |&e| e.source())
            .map(|e| e.to_string())
            .collect();
        if !chain.is_empty() {
            extra.insert("error_chain".to_string(), chain.join("\ncaused by: "));
        }

        let event = Event::new(error.to_string(), Category::uncaught_error(), Severity::Fatal)
            .with_extra(extra);
        self.send_event(event);
    }

    /// Report a panic intercepted by the crash reporter hook.
    pub fn capture_panic(&self, message: &str, location: &str) {
        let mut event = Event::new(message, Category::uncaught_error(), Severity::Fatal)
            .with_extra([("mechanism", "panic")]);
        if !location.is_empty() {
            event = event.with_extra([("location", location)]);
        }
        self.send_event(event);
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Whether the previous process terminated without a clean `shutdown`.
    pub fn crashed_last_launch(&self) -> bool {
        self.lock().crashed_last_launch
    }

    pub fn is_enabled(&self) -> bool {
        self.lock().phase == Phase::Active
    }

    pub fn channel(&self) -> BuildChannel {
        self.channel
    }

    pub fn release_label(&self) -> &str {
        &self.release
    }

    pub fn metadata(&self) -> &AppMetadata {
        &self.metadata
    }

    pub fn install_id(&self) -> Option<InstallId> {
        self.lock().install_id.clone()
    }

    /// Current breadcrumbs, oldest first.
    pub fn breadcrumbs(&self) -> Vec<Event> {
        self.lock().breadcrumbs.snapshot()
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn lock(&self) -> MutexGuard<'_, GatewayState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn envelope(&self, event: Event, state: &GatewayState) -> Envelope {
        let mut contexts = BTreeMap::new();
        contexts.insert("os".to_string(), self.os.to_context());

        Envelope {
            release: self.release.clone(),
            channel: self.channel,
            environment: self.channel.environment().to_string(),
            install_id: state.install_id.clone(),
            event,
            breadcrumbs: state.breadcrumbs.snapshot(),
            contexts,
        }
    }

    fn record_event(&self, outcome: &str, severity: Severity) {
        if let Some(metrics) = &self.metrics {
            metrics.record_event(outcome, severity.as_str());
        }
    }

    fn record_setup(&self, result: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.record_setup(result);
        }
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("channel", &self.channel)
            .field("release", &self.release)
            .field("respect_opt_out", &self.respect_opt_out)
            .field("sentinel", &self.sentinel)
            .finish_non_exhaustive()
    }
}
