//! Prometheus metrics registry for the gateway
//!
//! Counts what the gateway did with each event and how `setup` calls were
//! resolved. Encoded in the Prometheus text exposition format on demand.

use prometheus::{Encoder, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

/// Outcome label values for `events_total`.
pub mod outcome {
    pub const TRANSMITTED: &str = "transmitted";
    pub const BREADCRUMB: &str = "breadcrumb";
    pub const DROPPED: &str = "dropped";
}

/// Result label values for `setup_total`.
pub mod setup_result {
    pub const ACTIVATED: &str = "activated";
    pub const ALREADY_ACTIVE: &str = "already_active";
    pub const SIMULATED: &str = "simulated";
}

/// Central metrics registry holding all gateway metrics.
pub struct GatewayMetrics {
    registry: Registry,
    /// Counter: events by (outcome, severity)
    pub events_total: IntCounterVec,
    /// Counter: setup calls by result
    pub setup_total: IntCounterVec,
    /// Gauge: breadcrumbs currently retained
    pub breadcrumbs: IntGauge,
    /// Counter: envelopes written to the local spool by (result)
    pub spooled_total: IntCounterVec,
}

impl GatewayMetrics {
    /// Creates a new `GatewayMetrics` with all metrics registered.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new_custom(Some("crashgate".to_string()), None)?;

        let events_total = IntCounterVec::new(
            Opts::new("events_total", "Events handled by the gateway"),
            &["outcome", "severity"],
        )?;
        registry.register(Box::new(events_total.clone()))?;

        let setup_total = IntCounterVec::new(
            Opts::new("setup_total", "Gateway setup calls by result"),
            &["result"],
        )?;
        registry.register(Box::new(setup_total.clone()))?;

        let breadcrumbs = IntGauge::new("breadcrumbs", "Breadcrumbs currently retained")?;
        registry.register(Box::new(breadcrumbs.clone()))?;

        let spooled_total = IntCounterVec::new(
            Opts::new("spooled_total", "Envelopes written to the local spool"),
            &["result"],
        )?;
        registry.register(Box::new(spooled_total.clone()))?;

        Ok(Self {
            registry,
            events_total,
            setup_total,
            breadcrumbs,
            spooled_total,
        })
    }

    // ========================================================================
    // Recording helpers
    // ========================================================================

    /// Record what happened to an event.
    pub fn record_event(&self, outcome: &str, severity: &str) {
        self.events_total
            .with_label_values(&[outcome, severity])
            .inc();
    }

    /// Record a setup call.
    pub fn record_setup(&self, result: &str) {
        self.setup_total.with_label_values(&[result]).inc();
    }

    /// Set the retained breadcrumb gauge.
    pub fn set_breadcrumbs(&self, count: usize) {
        self.breadcrumbs
            .set(i64::try_from(count).unwrap_or(i64::MAX));
    }

    /// Record a spool write (`ok` or `error`).
    pub fn record_spooled(&self, result: &str) {
        self.spooled_total.with_label_values(&[result]).inc();
    }

    // ========================================================================
    // Encoding
    // ========================================================================

    /// Encode all metrics in Prometheus text exposition format.
    pub fn encode(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
