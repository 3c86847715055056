//! Install identifier provisioning
//!
//! If this installation has no identifier yet, generate a random one and
//! store it in the shared container so the main application and its
//! auxiliary processes all report under the same value.

use crashgate_core::domain::InstallId;
use crashgate_core::ports::{SharedStorage, StorageError};
use rand::RngCore;
use tracing::{debug, warn};

/// Key under which the identifier is stored.
pub const DEVICE_APP_HASH_KEY: &str = "DeviceAppHash";

/// Outcome of [`ensure_identifier`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provisioning {
    /// This call generated and stored a new identifier
    Created,
    /// An identifier (possibly written by another process) already existed
    Existing,
}

/// Generate a fresh identifier from the thread-local CSPRNG.
pub fn generate_install_id() -> InstallId {
    let mut bytes = [0u8; InstallId::BYTE_LEN];
    rand::thread_rng().fill_bytes(&mut bytes);
    InstallId::from_bytes(bytes)
}

/// Store a new identifier unless one is already present.
///
/// Never overwrites an existing value, even one that fails to parse.
pub fn ensure_identifier(storage: &dyn SharedStorage) -> Result<Provisioning, StorageError> {
    if storage.get(DEVICE_APP_HASH_KEY)?.is_some() {
        return Ok(Provisioning::Existing);
    }

    let id = generate_install_id();
    if storage.set_if_absent(DEVICE_APP_HASH_KEY, id.as_str())? {
        debug!("Generated install identifier");
        Ok(Provisioning::Created)
    } else {
        Ok(Provisioning::Existing)
    }
}

/// Read the stored identifier. A malformed value is reported as absent.
pub fn read_identifier(storage: &dyn SharedStorage) -> Result<Option<InstallId>, StorageError> {
    let Some(raw) = storage.get(DEVICE_APP_HASH_KEY)? else {
        return Ok(None);
    };
    match InstallId::parse(&raw) {
        Ok(id) => Ok(Some(id)),
        Err(e) => {
            warn!(error = %e, "Stored install identifier is malformed; reporting without identity");
            Ok(None)
        }
    }
}

/// Provision then read, swallowing storage failures.
///
/// Reporting must proceed without a stable identity rather than fail.
pub fn provision(storage: Option<&dyn SharedStorage>) -> Option<InstallId> {
    let storage = storage?;
    if let Err(e) = ensure_identifier(storage) {
        warn!(error = %e, "Failed to provision install identifier");
        return None;
    }
    match read_identifier(storage) {
        Ok(id) => id,
        Err(e) => {
            warn!(error = %e, "Failed to read install identifier");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared_storage::{DirectoryStorage, MemoryStorage};

    #[test]
    fn test_generated_id_is_40_hex() {
        let id = generate_install_id();
        assert_eq!(id.as_str().len(), 40);
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_generated_ids_differ() {
        assert_ne!(generate_install_id(), generate_install_id());
    }

    #[test]
    fn test_ensure_is_idempotent() {
        let storage = MemoryStorage::new();
        assert_eq!(ensure_identifier(&storage).unwrap(), Provisioning::Created);
        let first = read_identifier(&storage).unwrap().unwrap();

        assert_eq!(ensure_identifier(&storage).unwrap(), Provisioning::Existing);
        let second = read_identifier(&storage).unwrap().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_fresh_scopes_get_distinct_ids() {
        let a = MemoryStorage::new();
        let b = MemoryStorage::new();
        ensure_identifier(&a).unwrap();
        ensure_identifier(&b).unwrap();
        assert_ne!(read_identifier(&a).unwrap(), read_identifier(&b).unwrap());
    }

    #[test]
    fn test_malformed_value_is_never_overwritten() {
        let storage = MemoryStorage::new().with_value(DEVICE_APP_HASH_KEY, "garbage");
        assert_eq!(ensure_identifier(&storage).unwrap(), Provisioning::Existing);
        assert_eq!(read_identifier(&storage).unwrap(), None);
        assert_eq!(
            storage.get(DEVICE_APP_HASH_KEY).unwrap().as_deref(),
            Some("garbage")
        );
    }

    #[test]
    fn test_provision_without_scope() {
        assert_eq!(provision(None), None);
    }

    #[test]
    fn test_provision_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let first = provision(Some(&DirectoryStorage::new(dir.path()))).unwrap();
        let second = provision(Some(&DirectoryStorage::new(dir.path()))).unwrap();
        assert_eq!(first, second);

        let on_disk = std::fs::read_to_string(dir.path().join(DEVICE_APP_HASH_KEY)).unwrap();
        assert_eq!(on_disk, first.as_str());
    }

    #[test]
    fn test_provision_swallows_unavailable_scope() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();
        let storage = DirectoryStorage::new(blocker.join("group"));
        assert_eq!(provision(Some(&storage)), None);
    }
}
