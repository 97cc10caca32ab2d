use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::storage::store::{KeyValueStorage, StorageError};

/// In-memory implementation of KeyValueStorage
#[derive(Debug, Default, Clone)]
pub struct InMemoryStorage {
    /// Thread-safe storage of items
    items: Arc<RwLock<HashMap<String, String>>>,
}

impl InMemoryStorage {
    /// Create a new, empty InMemoryStorage
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.items.read().map(|items| items.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStorage for InMemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let items = self.items.read().map_err(|e| {
            StorageError::Backend(format!("Failed to acquire read lock: {}", e))
        })?;
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut items = self.items.write().map_err(|e| {
            StorageError::Backend(format!("Failed to acquire write lock: {}", e))
        })?;
        items.insert(key.to_string(), value.to_string());
        debug!(key, "Stored item");
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let mut items = self.items.write().map_err(|e| {
            StorageError::Backend(format!("Failed to acquire write lock: {}", e))
        })?;
        if items.remove(key).is_some() {
            debug!(key, "Removed item");
        }
        Ok(())
    }
}
