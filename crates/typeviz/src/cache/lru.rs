use std::sync::{Mutex, MutexGuard};

use indexmap::IndexSet;
use log::{debug, trace, warn};

use super::{CacheError, Storage, StorageError};

/// A least-recently-used cache over a [`Storage`] medium.
///
/// The access-order index is a JSON array stored under `namespace`, oldest
/// key first. Entries are stored under `<namespace>:<key>`. All operations
/// take `&self`; an internal lock serializes index updates so the cache can be
/// shared between tasks.
///
/// ```
/// use typeviz::cache::{LruCache, MemoryStorage};
///
/// let cache = LruCache::new(MemoryStorage::new(), "Svg", 2);
/// cache.set("a", "1").unwrap();
/// cache.set("b", "2").unwrap();
/// cache.get("a").unwrap();
/// cache.set("c", "3").unwrap();
///
/// assert_eq!(cache.get("b").unwrap(), None);
/// assert_eq!(cache.get("a").unwrap().as_deref(), Some("1"));
/// ```
pub struct LruCache {
    storage: Box<dyn Storage>,
    namespace: String,
    max_size: usize,
    lock: Mutex<()>,
}

impl LruCache {
    /// Creates a cache holding at most `max_size` entries in `storage`.
    pub fn new(
        storage: impl Storage + 'static,
        namespace: impl Into<String>,
        max_size: usize,
    ) -> Self {
        Self {
            storage: Box::new(storage),
            namespace: namespace.into(),
            max_size,
            lock: Mutex::new(()),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Look up `key` and mark it as most recently used.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Index`] if the stored index can not be parsed and
    /// [`CacheError::Storage`] if the medium fails.
    pub fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let _guard = self.acquire();

        let mut index = self.load_index()?;
        if !index.contains(key) {
            trace!(key; "Cache miss");
            return Ok(None);
        }

        let value = self.storage.get_item(&self.entry_key(key))?;
        index.shift_remove(key);
        if value.is_some() {
            index.insert(key.to_string());
        } else {
            debug!(key; "Cached value vanished from storage, dropping it from the index");
        }
        self.store_index(&index)?;

        Ok(value)
    }

    /// Store `value` under `key` as the most recently used entry.
    ///
    /// Evicts the least recently used entries while the cache is full or the
    /// medium reports its quota exceeded. A corrupt index is replaced by a
    /// fresh one.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Storage`] if the medium fails, including a quota
    /// that the value alone exceeds.
    pub fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        if self.max_size == 0 {
            return Ok(());
        }

        let _guard = self.acquire();

        let mut index = match self.load_index() {
            Ok(index) => index,
            Err(CacheError::Index(err)) => {
                warn!(err:%, namespace = self.namespace; "Rebuilding corrupt cache index");
                IndexSet::new()
            }
            Err(err) => return Err(err),
        };

        index.shift_remove(key);
        while index.len() >= self.max_size {
            self.evict_oldest(&mut index)?;
        }

        let entry_key = self.entry_key(key);
        loop {
            match self.storage.set_item(&entry_key, value) {
                Ok(()) => break,
                Err(StorageError::QuotaExceeded { .. }) if !index.is_empty() => {
                    self.evict_oldest(&mut index)?;
                }
                Err(err) => {
                    self.store_index(&index)?;
                    return Err(err.into());
                }
            }
        }

        index.insert(key.to_string());
        self.store_index(&index)
    }

    /// Keys in access order, least recently used first.
    ///
    /// # Errors
    ///
    /// Fails like [`LruCache::get`] when the index can not be read.
    pub fn keys(&self) -> Result<Vec<String>, CacheError> {
        let _guard = self.acquire();
        Ok(self.load_index()?.into_iter().collect())
    }

    /// Lock the index, recovering it after a panic in another holder.
    ///
    /// The lock guards no data of its own; a half-written index in the medium
    /// is detected on load and rebuilt by `set`.
    fn acquire(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(|poisoned| {
            warn!(namespace = self.namespace; "Recovering cache lock poisoned by a panic");
            self.lock.clear_poison();
            poisoned.into_inner()
        })
    }

    fn entry_key(&self, key: &str) -> String {
        format!("{}:{key}", self.namespace)
    }

    fn evict_oldest(&self, index: &mut IndexSet<String>) -> Result<(), CacheError> {
        if let Some(oldest) = index.shift_remove_index(0) {
            debug!(key = oldest; "Evicting cache entry");
            self.storage.remove_item(&self.entry_key(&oldest))?;
        }
        Ok(())
    }

    fn load_index(&self) -> Result<IndexSet<String>, CacheError> {
        let Some(raw) = self.storage.get_item(&self.namespace)? else {
            return Ok(IndexSet::new());
        };
        let keys: Vec<String> = serde_json::from_str(&raw).map_err(CacheError::Index)?;
        Ok(keys.into_iter().collect())
    }

    fn store_index(&self, index: &IndexSet<String>) -> Result<(), CacheError> {
        let keys: Vec<&String> = index.iter().collect();
        let raw = serde_json::to_string(&keys).map_err(CacheError::Index)?;
        self.storage.set_item(&self.namespace, &raw)?;
        Ok(())
    }
}

impl std::fmt::Debug for LruCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LruCache")
            .field("namespace", &self.namespace)
            .field("max_size", &self.max_size)
            .finish_non_exhaustive()
    }
}
