//! On-device key/value storage.
//!
//! Mirrors the browser's local storage: string keys mapped to JSON strings.
//! Every value the editor persists goes through a [`LocalStore`].

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Well-known keys written by the editor and the cart bridge.
pub mod keys {
    pub const SAVED_DESIGN_STATE: &str = "savedDesignState";
    pub const SAVED_PROPS_STATE: &str = "savedPropsState";
    pub const CART_ID: &str = "cart_id";
    pub const PENDING_CART_ADD: &str = "pendingCartAdd";
    pub const PENDING_DESIGN_STATE: &str = "pendingDesignState";
    pub const PENDING_PROPS_STATE: &str = "pendingPropsState";
    pub const DESIGN_STATE: &str = "designState";
    pub const UNDO_STACK: &str = "undoStack";
    pub const REDO_STACK: &str = "redoStack";
}

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Storage error: {0}")]
    Other(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for on-device key/value backends.
///
/// Values are opaque strings; callers serialize with [`save_json`] and
/// read back with [`load_json`].
pub trait LocalStore: Send + Sync {
    /// Read a value. Missing keys are `Ok(None)`.
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Write a value, replacing any previous one.
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Remove a value. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> StorageResult<()>;

    /// List all stored keys.
    fn keys(&self) -> StorageResult<Vec<String>>;

    /// Check if a key is present.
    fn contains(&self, key: &str) -> StorageResult<bool> {
        Ok(self.get(key)?.is_some())
    }
}

/// Serialize `value` as JSON and store it under `key`.
pub fn save_json<T: Serialize + ?Sized>(
    store: &dyn LocalStore,
    key: &str,
    value: &T,
) -> StorageResult<()> {
    let json =
        serde_json::to_string(value).map_err(|e| StorageError::Serialization(e.to_string()))?;
    store.set(key, &json)
}

/// Load and deserialize the JSON value stored under `key`.
pub fn load_json<T: DeserializeOwned>(
    store: &dyn LocalStore,
    key: &str,
) -> StorageResult<Option<T>> {
    match store.get(key)? {
        Some(json) => serde_json::from_str(&json)
            .map(Some)
            .map_err(|e| StorageError::Serialization(format!("{}: {}", key, e))),
        None => Ok(None),
    }
}

/// Remove every key in `keys`, attempting all of them even if one fails.
/// Returns the first error encountered.
pub fn remove_all(store: &dyn LocalStore, keys: &[&str]) -> StorageResult<()> {
    let mut first_err = None;
    for key in keys {
        if let Err(e) = store.remove(key) {
            log::warn!("Failed to remove {}: {}", key, e);
            first_err.get_or_insert(e);
        }
    }
    match first_err {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        count: u32,
    }

    #[test]
    fn test_json_helpers() {
        let store = MemoryStore::new();
        let sample = Sample { name: "front".to_string(), count: 2 };

        save_json(&store, "sample", &sample).unwrap();
        let loaded: Option<Sample> = load_json(&store, "sample").unwrap();
        assert_eq!(loaded, Some(sample));

        let missing: Option<Sample> = load_json(&store, "missing").unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_load_json_corrupt() {
        let store = MemoryStore::new();
        store.set("sample", "{not json").unwrap();

        let result: StorageResult<Option<Sample>> = load_json(&store, "sample");
        assert!(matches!(result, Err(StorageError::Serialization(_))));
    }

    #[test]
    fn test_remove_all() {
        let store = MemoryStore::new();
        store.set(keys::PENDING_CART_ADD, "true").unwrap();
        store.set(keys::PENDING_DESIGN_STATE, "{}").unwrap();

        let pending = [
            keys::PENDING_CART_ADD,
            keys::PENDING_DESIGN_STATE,
            keys::PENDING_PROPS_STATE,
        ];
        remove_all(&store, &pending).unwrap();
        assert!(store.keys().unwrap().is_empty());
    }
}
