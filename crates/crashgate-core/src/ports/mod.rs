//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! gateway. The domain core depends on these interfaces, while their
//! implementations live in the telemetry crate or in the host application.
//!
//! ## Ports Overview
//!
//! - [`SharedStorage`] - Key/value storage shared by all processes of one installation
//! - [`Transport`] - Hand-off of qualifying events to a collector
//! - [`EnvironmentProbe`] - Detection of simulated/virtualized test environments

pub mod environment;
pub mod shared_storage;
pub mod transport;

pub use environment::{EnvProbe, EnvironmentProbe, StaticProbe};
pub use shared_storage::{SharedStorage, StorageError};
pub use transport::{Envelope, NullTransport, Transport};
