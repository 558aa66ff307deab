//! Local persistent key-value storage.
//!
//! Defines [`KeyValueStorage`], the string-keyed blob store both the field
//! store and the media stores persist into, and [`MemoryStorage`], an
//! in-memory implementation with an optional byte quota.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::error::{FormError, Result};

/// String blob storage, one value per key.
///
/// Writes replace the whole value (last write wins). A write that would
/// exceed the backing store's capacity fails with
/// [`FormError::StorageCapacityExceeded`] and leaves the old value in place.
pub trait KeyValueStorage: Send + Sync {
    /// Read a value, or `None` if the key was never written or was removed.
    fn get_item(&self, key: &str) -> Option<String>;

    /// Insert or replace a value.
    fn set_item(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a value. Missing keys are ignored.
    fn remove_item(&self, key: &str);
}

/// In-memory storage. Size accounting counts key and value bytes.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
    quota: Mutex<Option<usize>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage that rejects writes once `quota` bytes are in use.
    pub fn with_quota(quota: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            quota: Mutex::new(Some(quota)),
        }
    }

    pub fn set_quota(&self, quota: Option<usize>) {
        *self.quota.lock() = quota;
    }

    pub fn used_bytes(&self) -> usize {
        self.entries
            .lock()
            .iter()
            .map(|(k, v)| k.len() + v.len())
            .sum()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.lock().keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let quota = *self.quota.lock();
        let mut entries = self.entries.lock();

        if let Some(capacity) = quota {
            let used: usize = entries.iter().map(|(k, v)| k.len() + v.len()).sum();
            let replaced = entries.get(key).map(|v| key.len() + v.len()).unwrap_or(0);
            let required = used - replaced + key.len() + value.len();
            if required > capacity {
                log::warn!(
                    "STORAGE_QUOTA_EXCEEDED key={} required={} capacity={}",
                    key,
                    required,
                    capacity
                );
                return Err(FormError::StorageCapacityExceeded {
                    key: key.to_string(),
                    required,
                    capacity,
                });
            }
        }

        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) {
        self.entries.lock().remove(key);
    }
}
