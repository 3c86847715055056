//! Shared storage port (driven/secondary port)
//!
//! Models a storage area reachable by the main application and every
//! auxiliary process belonging to the same installation.
//!
//! ## Design Notes
//!
//! - The only mutation is "create if absent": an existing value is never
//!   overwritten. Concurrent first writers race harmlessly, only the first
//!   persisted value survives.
//! - Implementations must be `Send + Sync` because the gateway is shared
//!   across threads.

use thiserror::Error;

/// Errors raised by [`SharedStorage`] adapters
#[derive(Debug, Error)]
pub enum StorageError {
    /// The storage scope could not be resolved or created
    #[error("storage scope unavailable: {0}")]
    Unavailable(String),

    /// The key contains characters the adapter cannot store
    #[error("invalid storage key: {0}")]
    InvalidKey(String),

    /// A stored value is not valid UTF-8
    #[error("stored value for {key} is not valid UTF-8")]
    Corrupt { key: String },

    /// Underlying I/O failure
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Key/value storage shared across the processes of one installation.
pub trait SharedStorage: Send + Sync {
    /// Read the value stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key` unless a value is already present.
    ///
    /// Returns `true` if this call created the entry.
    fn set_if_absent(&self, key: &str, value: &str) -> Result<bool, StorageError>;
}

impl<T: SharedStorage + ?Sized> SharedStorage for std::sync::Arc<T> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn set_if_absent(&self, key: &str, value: &str) -> Result<bool, StorageError> {
        (**self).set_if_absent(key, value)
    }
}
