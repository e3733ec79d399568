//! Public keys recovered per wallet address, persisted across sessions.

use parking_lot::Mutex;
use std::{collections::BTreeMap, sync::Arc};
use wirelink_common::{storage::PUB_KEYS_KEY, KeyValueStore, StorageError};

/// Persistent address → public key map.
///
/// The whole map is read once at construction and written back in full on every insert. Writers
/// in other processes are not coordinated: the last write wins.
#[derive(Debug)]
pub struct KeyCache {
    store: Arc<dyn KeyValueStore>,
    keys: Mutex<BTreeMap<String, String>>,
}

impl KeyCache {
    /// Loads the persisted map from `store`. Unreadable storage starts an empty map.
    pub fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let keys = match store.get_json::<BTreeMap<String, String>>(PUB_KEYS_KEY) {
            Ok(keys) => keys.unwrap_or_default(),
            Err(StorageError::Unavailable) => BTreeMap::new(),
            Err(err) => {
                warn!(%err, "ignoring unreadable public key cache");
                BTreeMap::new()
            }
        };
        trace!(entries = keys.len(), "loaded public key cache");
        Self { store, keys: Mutex::new(keys) }
    }

    /// Returns the key recovered for `address`. Addresses are matched exactly.
    pub fn get(&self, address: &str) -> Option<String> {
        self.keys.lock().get(address).cloned()
    }

    /// Remembers `key` for `address` and persists the map.
    ///
    /// An existing entry is never replaced; `Ok(false)` is returned instead. The entry is kept in
    /// memory even when persisting fails.
    pub fn put(&self, address: &str, key: &str) -> Result<bool, StorageError> {
        let snapshot = {
            let mut keys = self.keys.lock();
            if keys.contains_key(address) {
                return Ok(false);
            }
            keys.insert(address.to_string(), key.to_string());
            keys.clone()
        };
        self.store.set_json(PUB_KEYS_KEY, &snapshot)?;
        Ok(true)
    }

    /// Forgets every key, in memory and in storage.
    pub fn clear(&self) -> Result<(), StorageError> {
        self.keys.lock().clear();
        self.store.remove(PUB_KEYS_KEY)
    }

    /// Returns the number of cached keys.
    pub fn len(&self) -> usize {
        self.keys.lock().len()
    }

    /// Returns `true` if no key is cached.
    pub fn is_empty(&self) -> bool {
        self.keys.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wirelink_common::{FileStore, MemoryStore, NullStore};

    #[test]
    fn persists_and_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(dir.path()));

        let cache = KeyCache::load(store.clone());
        assert!(cache.is_empty());
        assert!(cache.put("0xAA", "0x04aa").unwrap());
        assert!(!cache.put("0xAA", "0x04bb").unwrap());
        assert_eq!(cache.get("0xAA").as_deref(), Some("0x04aa"));
        assert_eq!(cache.get("0xaa"), None);

        let reloaded = KeyCache::load(store);
        assert_eq!(reloaded.get("0xAA").as_deref(), Some("0x04aa"));
        assert_eq!(reloaded.len(), 1);
    }

    #[test]
    fn clear_removes_persisted_entry() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let cache = KeyCache::load(store.clone());
        cache.put("0xAA", "0x04aa").unwrap();
        cache.clear().unwrap();
        assert_eq!(cache.get("0xAA"), None);
        assert_eq!(store.get(PUB_KEYS_KEY).unwrap(), None);
        assert!(cache.put("0xAA", "0x04bb").unwrap());
    }

    #[test]
    fn degrades_without_storage() {
        let cache = KeyCache::load(Arc::new(NullStore));
        assert!(matches!(cache.put("0xAA", "0x04aa"), Err(StorageError::Unavailable)));
        assert_eq!(cache.get("0xAA").as_deref(), Some("0x04aa"));
    }

    #[test]
    fn ignores_corrupt_blob() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        store.set(PUB_KEYS_KEY, "not json").unwrap();
        assert!(KeyCache::load(store).is_empty());
    }
}
