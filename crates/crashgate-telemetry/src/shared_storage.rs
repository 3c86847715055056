//! Shared storage adapters
//!
//! - [`DirectoryStorage`]: one file per key inside a directory shared by all
//!   processes of an installation.
//! - [`MemoryStorage`]: in-process map for tests and embedded hosts.

use std::collections::HashMap;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crashgate_core::ports::{SharedStorage, StorageError};
use uuid::Uuid;

/// File-per-key storage rooted at a shared container directory.
///
/// `set_if_absent` writes the value to a temporary file and hard-links it
/// into place, so a reader in another process never observes a partially
/// written value and an existing key is never replaced.
#[derive(Debug, Clone)]
pub struct DirectoryStorage {
    root: PathBuf,
}

impl DirectoryStorage {
    /// Creates an adapter for `root`. The directory is created lazily on
    /// first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn key_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(key))
    }

    fn ensure_root(&self) -> Result<(), StorageError> {
        std::fs::create_dir_all(&self.root).map_err(|e| {
            StorageError::Unavailable(format!("{}: {e}", self.root.display()))
        })
    }
}

impl SharedStorage for DirectoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.key_path(key)?;
        match std::fs::read(&path) {
            Ok(bytes) => String::from_utf8(bytes)
                .map(Some)
                .map_err(|_| StorageError::Corrupt {
                    key: key.to_string(),
                }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_if_absent(&self, key: &str, value: &str) -> Result<bool, StorageError> {
        let path = self.key_path(key)?;
        self.ensure_root()?;

        if path.exists() {
            return Ok(false);
        }

        let tmp = self.root.join(format!(".{key}.{}.tmp", Uuid::new_v4().simple()));
        {
            let mut file = std::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&tmp)?;
            file.write_all(value.as_bytes())?;
            file.sync_all()?;
        }

        let result = std::fs::hard_link(&tmp, &path);
        if let Err(e) = std::fs::remove_file(&tmp) {
            tracing::debug!(path = %tmp.display(), error = %e, "Failed to remove temporary storage file");
        }

        match result {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory storage, shared by cloning an `Arc` around it.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populates a value, bypassing the create-if-absent rule.
    pub fn with_value(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), value.into());
        self
    }
}

impl SharedStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(values.get(key).cloned())
    }

    fn set_if_absent(&self, key: &str, value: &str) -> Result<bool, StorageError> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        if values.contains_key(key) {
            return Ok(false);
        }
        values.insert(key.to_string(), value.to_string());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_get_missing_key() {
        let dir = tempfile::tempdir().unwrap();
        let storage = DirectoryStorage::new(dir.path());
        assert_eq!(storage.get("DeviceAppHash").unwrap(), None);
    }

    #[test]
    fn test_directory_set_if_absent_once() {
        let dir = tempfile::tempdir().unwrap();
        let storage = DirectoryStorage::new(dir.path().join("group"));

        assert!(storage.set_if_absent("DeviceAppHash", "first").unwrap());
        assert!(!storage.set_if_absent("DeviceAppHash", "second").unwrap());
        assert_eq!(
            storage.get("DeviceAppHash").unwrap(),
            Some("first".to_string())
        );
    }

    #[test]
    fn test_directory_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let storage = DirectoryStorage::new(dir.path());
        storage.set_if_absent("key", "value").unwrap();

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, ["key"]);
    }

    #[test]
    fn test_directory_rejects_path_like_keys() {
        let dir = tempfile::tempdir().unwrap();
        let storage = DirectoryStorage::new(dir.path());
        assert!(matches!(
            storage.get("../escape"),
            Err(StorageError::InvalidKey(_))
        ));
        assert!(storage.set_if_absent(".hidden", "v").is_err());
        assert!(storage.set_if_absent("", "v").is_err());
    }

    #[test]
    fn test_directory_unavailable_root() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "not a directory").unwrap();

        let storage = DirectoryStorage::new(blocker.join("nested"));
        assert!(matches!(
            storage.set_if_absent("key", "v"),
            Err(StorageError::Unavailable(_))
        ));
    }

    #[test]
    fn test_directory_shared_between_instances() {
        let dir = tempfile::tempdir().unwrap();
        let app = DirectoryStorage::new(dir.path());
        let extension = DirectoryStorage::new(dir.path());

        app.set_if_absent("DeviceAppHash", "from-app").unwrap();
        assert!(!extension
            .set_if_absent("DeviceAppHash", "from-extension")
            .unwrap());
        assert_eq!(
            extension.get("DeviceAppHash").unwrap().as_deref(),
            Some("from-app")
        );
    }

    #[test]
    fn test_memory_storage() {
        let storage = MemoryStorage::new().with_value("a", "1");
        assert_eq!(storage.get("a").unwrap().as_deref(), Some("1"));
        assert!(!storage.set_if_absent("a", "2").unwrap());
        assert!(storage.set_if_absent("b", "3").unwrap());
        assert_eq!(storage.get("b").unwrap().as_deref(), Some("3"));
    }
}
