//! Domain error types
//!
//! This module defines error types for parsing and validating domain values:
//! severities, channel hints, install identifiers and event ids.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Unknown severity name
    #[error("Invalid severity: {0}")]
    InvalidSeverity(String),

    /// Unknown build channel hint
    #[error("Invalid channel hint: {0}")]
    InvalidChannelHint(String),

    /// Category tags must be non-empty
    #[error("Invalid category: {0}")]
    InvalidCategory(String),

    /// Install identifier that is not 40 lowercase hex characters
    #[error("Invalid install identifier: {0}")]
    InvalidInstallId(String),

    /// ID parsing error
    #[error("Invalid ID format: {0}")]
    InvalidId(String),
}
