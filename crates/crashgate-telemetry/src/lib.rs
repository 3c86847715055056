//! Crashgate Telemetry - Diagnostic-event gateway and local reporting
//!
//! Provides:
//! - `Gateway`: Activation, severity policy and event routing
//! - `BreadcrumbRing`: Bounded history of retained events
//! - `DirectoryStorage`: Shared-container key/value storage for the install identifier
//! - `CrashReport`: Structured panic reports with backtraces
//! - `SpoolTransport`: Writes transmitted envelopes to the local report store
//! - `GatewayMetrics`: Prometheus counters for gateway outcomes
//! - `LocalReportStore`: File-based report management

pub mod breadcrumbs;
pub mod crash_report;
pub mod gateway;
pub mod identifier;
pub mod metrics;
pub mod os_info;
pub mod policy;
pub mod shared_storage;
pub mod signals;
pub mod spool;
pub mod store;

pub use breadcrumbs::BreadcrumbRing;
pub use crash_report::{install_crash_reporter, save_crash_report, CrashReport, LaunchSentinel};
pub use gateway::{Gateway, GatewayBuilder};
pub use identifier::{ensure_identifier, Provisioning, DEVICE_APP_HASH_KEY};
pub use metrics::GatewayMetrics;
pub use os_info::OsInfo;
pub use policy::{should_report, Decision, ReportingPolicy};
pub use shared_storage::{DirectoryStorage, MemoryStorage};
pub use spool::{SpoolTransport, SpoolWorker};
pub use store::LocalReportStore;
