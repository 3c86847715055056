//! Diagnostic event entity
//!
//! An [`Event`] is built once by the caller (or by `capture_error`) and is
//! never mutated afterwards. It ends up either discarded, retained as a
//! breadcrumb, or handed to a transport inside an envelope.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::EventId;
use super::severity::{Category, Severity};

/// A single error or log event raised by the host application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    id: EventId,
    timestamp: DateTime<Utc>,
    message: String,
    category: Category,
    severity: Severity,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    extra: BTreeMap<String, String>,
}

impl Event {
    /// Creates a new event stamped with the current UTC time.
    pub fn new(message: impl Into<String>, category: Category, severity: Severity) -> Self {
        Self {
            id: EventId::new(),
            timestamp: Utc::now(),
            message: message.into(),
            category,
            severity,
            extra: BTreeMap::new(),
        }
    }

    /// Attaches the caller-supplied extra key/value pairs.
    pub fn with_extra<I, K, V>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.extra
            .extend(extra.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn id(&self) -> EventId {
        self.id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn category(&self) -> &Category {
        &self.category
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn extra(&self) -> &BTreeMap<String, String> {
        &self.extra
    }
}
