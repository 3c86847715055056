//! Domain entities and business logic
//!
//! This module contains the core domain types for crashgate:
//! - Severity levels and category tags
//! - The immutable diagnostic `Event`
//! - Release channel classification from static app metadata
//! - Newtypes for event ids and the per-install identifier
//! - Domain-specific error types

pub mod channel;
pub mod errors;
pub mod event;
pub mod newtypes;
pub mod severity;

// Re-export commonly used types
pub use channel::{AppMetadata, BuildChannel, ChannelClassifier, ChannelHint};
pub use errors::DomainError;
pub use event::Event;
pub use newtypes::{EventId, InstallId};
pub use severity::{Category, Severity};
