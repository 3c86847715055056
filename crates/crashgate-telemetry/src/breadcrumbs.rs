//! Breadcrumb ring
//!
//! Bounded, insertion-ordered history of low-severity events. When full the
//! oldest entry is evicted before the newest is inserted. Reading a snapshot
//! never drains the ring.
//!
//! The ring has no synchronization of its own; the gateway keeps it behind
//! the same lock as its activation flag.

use std::collections::VecDeque;

use crashgate_core::domain::Event;

/// Fixed-capacity FIFO of events.
#[derive(Debug, Clone)]
pub struct BreadcrumbRing {
    capacity: usize,
    entries: VecDeque<Event>,
}

impl BreadcrumbRing {
    /// Creates a ring holding at most `capacity` events (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    /// Append `event`, evicting the oldest entry if the ring is full.
    pub fn record(&mut self, event: Event) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(event);
    }

    /// Oldest-first copy of the current contents.
    pub fn snapshot(&self) -> Vec<Event> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
