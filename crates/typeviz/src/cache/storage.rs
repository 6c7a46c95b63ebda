//! Storage media for the LRU cache.

use std::{
    collections::HashMap,
    fs, io,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use log::trace;
use thiserror::Error;

/// Errors reported by a storage medium.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("storage quota exceeded: {required} bytes required, quota is {quota} bytes")]
    QuotaExceeded { required: usize, quota: usize },
}

/// A string key-value medium.
///
/// Implementations may fail on every call; the cache reports these failures
/// instead of panicking.
pub trait Storage: Send + Sync {
    /// Read the value stored under `key`, if any.
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`. Removing a missing key succeeds.
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

impl<S: Storage + ?Sized> Storage for Arc<S> {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        (**self).remove_item(key)
    }
}

/// In-process storage with an optional byte quota.
///
/// The quota counts the bytes of every stored key and value.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryStorage {
    /// Creates an unbounded memory storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a memory storage that refuses writes beyond `quota` bytes.
    pub fn with_quota(quota: usize) -> Self {
        Self {
            items: Mutex::default(),
            quota: Some(quota),
        }
    }

    /// Bytes currently used by keys and values.
    pub fn used_bytes(&self) -> usize {
        let items = self.items();
        items.iter().map(|(key, value)| key.len() + value.len()).sum()
    }

    pub fn len(&self) -> usize {
        self.items().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every write replaces a whole entry, so the map stays usable after a
    /// panic in another holder.
    fn items(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let items = self.items();
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut items = self.items();

        if let Some(quota) = self.quota {
            let used: usize = items
                .iter()
                .filter(|(existing, _)| existing.as_str() != key)
                .map(|(key, value)| key.len() + value.len())
                .sum();
            let required = used + key.len() + value.len();
            if required > quota {
                return Err(StorageError::QuotaExceeded { required, quota });
            }
        }

        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.items().remove(key);
        Ok(())
    }
}

/// Storage keeping one file per key under a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    directory: PathBuf,
}

impl FileStorage {
    /// Opens the storage, creating `directory` if needed.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if the directory can not be created.
    pub fn new(directory: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let directory = directory.into();
        fs::create_dir_all(&directory)?;
        Ok(Self { directory })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.directory.join(file_name(key))
    }
}

impl Storage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key);
        let staging = path.with_extension("tmp");
        trace!(path:? = path; "Writing storage item");

        // Rename so readers never observe a half-written value.
        fs::write(&staging, value)?;
        fs::rename(&staging, &path)?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(key)) {
            Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err.into()),
            _ => Ok(()),
        }
    }
}

/// Map a key onto a portable file name.
///
/// ASCII alphanumerics, `-` and `_` are kept; every other byte becomes `%XX`.
fn file_name(key: &str) -> String {
    let mut name = String::with_capacity(key.len() + 6);
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            name.push(char::from(byte));
        } else {
            name.push_str(&format!("%{byte:02X}"));
        }
    }
    name.push_str(".entry");
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_storage_round_trip() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get_item("a").unwrap(), None);

        storage.set_item("a", "1").unwrap();
        storage.set_item("a", "2").unwrap();
        assert_eq!(storage.get_item("a").unwrap().as_deref(), Some("2"));
        assert_eq!(storage.len(), 1);

        storage.remove_item("a").unwrap();
        storage.remove_item("a").unwrap();
        assert!(storage.is_empty());
    }

    #[test]
    fn test_memory_storage_quota() {
        let storage = MemoryStorage::with_quota(10);
        storage.set_item("ab", "12345678").unwrap();
        assert_eq!(storage.used_bytes(), 10);

        // Replacing a value only counts the new size.
        storage.set_item("ab", "87654321").unwrap();

        let err = storage.set_item("c", "x").unwrap_err();
        assert!(matches!(
            err,
            StorageError::QuotaExceeded {
                required: 12,
                quota: 10
            }
        ));
        assert_eq!(storage.get_item("c").unwrap(), None);
    }

    #[test]
    fn test_file_name_is_portable() {
        assert_eq!(
            file_name("TypevizSvgCache:worker:1.0:dot:ab"),
            "TypevizSvgCache%3Aworker%3A1%2E0%3Adot%3Aab.entry"
        );
        assert_eq!(file_name("a/b"), "a%2Fb.entry");
    }

    #[test]
    fn test_file_storage_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("cache")).unwrap();

        assert_eq!(storage.get_item("ns:key").unwrap(), None);
        storage.set_item("ns:key", "<svg/>").unwrap();
        assert_eq!(storage.get_item("ns:key").unwrap().as_deref(), Some("<svg/>"));
        assert!(storage.directory().join("ns%3Akey.entry").exists());

        storage.remove_item("ns:key").unwrap();
        storage.remove_item("ns:key").unwrap();
        assert_eq!(storage.get_item("ns:key").unwrap(), None);
    }

    #[test]
    fn test_shared_storage_through_arc() {
        let storage = Arc::new(MemoryStorage::new());
        let shared = Arc::clone(&storage);
        shared.set_item("k", "v").unwrap();
        assert_eq!(storage.get_item("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn test_memory_storage_survives_poisoned_lock() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set_item("k", "v").unwrap();

        let poisoner = Arc::clone(&storage);
        let result = std::thread::spawn(move || {
            let _items = poisoner.items.lock().unwrap();
            panic!("holder panicked");
        })
        .join();
        assert!(result.is_err());
        assert!(storage.items.is_poisoned());

        assert_eq!(storage.get_item("k").unwrap().as_deref(), Some("v"));
        storage.set_item("k2", "v2").unwrap();
        storage.remove_item("k").unwrap();
        assert_eq!(storage.len(), 1);
        assert_eq!(storage.used_bytes(), 4);
    }
}
