use std::fmt::Debug;
use std::sync::Arc;

use thiserror::Error;

/// Error type for storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend could not be read or written
    #[error("Storage backend error: {0}")]
    Backend(String),
    /// Error occurred while touching the filesystem
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait defining the interface for key/value stores
pub trait KeyValueStorage: Send + Sync + Debug {
    /// Get the value stored under `key`, if any
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`; removing an absent key is not an error
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

/// Type alias for Arc-wrapped storage trait objects
pub type StorageRef = Arc<dyn KeyValueStorage>;
