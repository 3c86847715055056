//! Local spool transport
//!
//! Hands transmitted envelopes from the gateway to a background task that
//! writes them into the [`LocalReportStore`]. `deliver` never blocks the
//! caller; the worker drains the channel until every sender is dropped.
//!
//! ```text
//! Gateway::send ──→ SpoolTransport ──→ mpsc ──→ SpoolWorker ──→ reports/event-*.json
//! ```

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crashgate_core::ports::{Envelope, Transport};

use crate::metrics::GatewayMetrics;
use crate::store::LocalReportStore;

/// Transport that queues envelopes for the spool worker.
#[derive(Debug, Clone)]
pub struct SpoolTransport {
    tx: mpsc::UnboundedSender<Envelope>,
}

/// Background half of the spool. Run it with [`SpoolWorker::run`].
pub struct SpoolWorker {
    rx: mpsc::UnboundedReceiver<Envelope>,
    store: LocalReportStore,
    metrics: Option<Arc<GatewayMetrics>>,
}

impl SpoolTransport {
    /// Create a connected transport/worker pair.
    pub fn new(
        store: LocalReportStore,
        metrics: Option<Arc<GatewayMetrics>>,
    ) -> (Self, SpoolWorker) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self { tx },
            SpoolWorker {
                rx,
                store,
                metrics,
            },
        )
    }
}

impl Transport for SpoolTransport {
    fn deliver(&self, envelope: Envelope) {
        if let Err(e) = self.tx.send(envelope) {
            warn!(event_id = %e.0.event.id(), "Spool worker stopped; envelope discarded");
        }
    }
}

impl SpoolWorker {
    /// Write envelopes to the store until all transports are dropped.
    ///
    /// Returns the number of envelopes written successfully.
    pub async fn run(mut self) -> usize {
        let mut written = 0;

        while let Some(envelope) = self.rx.recv().await {
            match self.store.save_envelope(&envelope) {
                Ok(path) => {
                    written += 1;
                    debug!(path = %path.display(), "Envelope spooled");
                    self.record("ok");
                }
                Err(e) => {
                    warn!(event_id = %envelope.event.id(), error = %e, "Failed to spool envelope");
                    self.record("error");
                }
            }
        }

        debug!(written, "Spool worker finished");
        written
    }

    fn record(&self, result: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.record_spooled(result);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crashgate_core::domain::{BuildChannel, Category, Event, Severity};

    fn envelope(message: &str) -> Envelope {
        Envelope {
            release: "org.mozilla.ios.Firefox@131.0".to_string(),
            channel: BuildChannel::Release,
            environment: "Production".to_string(),
            install_id: None,
            event: Event::new(message, Category::uncaught_error(), Severity::Fatal),
            breadcrumbs: Vec::new(),
            contexts: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn test_worker_writes_queued_envelopes() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalReportStore::new(dir.path().to_path_buf());
        let metrics = Arc::new(GatewayMetrics::new().unwrap());

        let (transport, worker) = SpoolTransport::new(store.clone(), Some(Arc::clone(&metrics)));
        let handle = tokio::spawn(worker.run());

        transport.deliver(envelope("first"));
        transport.deliver(envelope("second"));
        drop(transport);

        assert_eq!(handle.await.unwrap(), 2);
        assert_eq!(store.list().unwrap().len(), 2);
        assert_eq!(metrics.spooled_total.with_label_values(&["ok"]).get(), 2);
    }

    #[tokio::test]
    async fn test_deliver_after_worker_dropped_does_not_panic() {
        let dir = tempfile::tempdir().unwrap();
        let (transport, worker) =
            SpoolTransport::new(LocalReportStore::new(dir.path().to_path_buf()), None);
        drop(worker);

        transport.deliver(envelope("lost"));
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    #[tokio::test]
    async fn test_unwritable_store_counts_errors() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where the reports directory should be
        let blocker = dir.path().join("reports");
        std::fs::write(&blocker, "").unwrap();

        let metrics = Arc::new(GatewayMetrics::new().unwrap());
        let (transport, worker) =
            SpoolTransport::new(LocalReportStore::new(blocker), Some(Arc::clone(&metrics)));

        transport.deliver(envelope("nowhere"));
        drop(transport);

        assert_eq!(worker.run().await, 0);
        assert_eq!(metrics.spooled_total.with_label_values(&["error"]).get(), 1);
    }
}
