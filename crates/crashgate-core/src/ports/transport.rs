//! Transport port (driven/secondary port)
//!
//! The gateway hands every qualifying event to a [`Transport`] wrapped in an
//! [`Envelope`]. Network delivery, retries and symbolication belong to the
//! transport, never to the gateway.
//!
//! ## Design Notes
//!
//! - `deliver` is called after the gateway lock is released and must not
//!   block for long; adapters that do I/O should queue the envelope.
//! - Delivery failures are the transport's concern and are not reported
//!   back to the caller.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{BuildChannel, Event, InstallId};

/// A transmitted event together with its reporting context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// `"<bundle_id>@<version>"`
    pub release: String,
    pub channel: BuildChannel,
    pub environment: String,
    /// Absent when no shared storage scope was available
    pub install_id: Option<InstallId>,
    pub event: Event,
    /// Breadcrumbs recorded before `event`, oldest first
    pub breadcrumbs: Vec<Event>,
    /// Extra context sections such as `os`
    #[serde(default)]
    pub contexts: BTreeMap<String, serde_json::Value>,
}

/// Accepts envelopes for delivery to a collector.
pub trait Transport: Send + Sync {
    fn deliver(&self, envelope: Envelope);
}

/// Transport that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullTransport;

impl Transport for NullTransport {
    fn deliver(&self, _envelope: Envelope) {}
}

impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    fn deliver(&self, envelope: Envelope) {
        (**self).deliver(envelope)
    }
}
