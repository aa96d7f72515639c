//! File-based storage implementation for native platforms.

use super::{LocalStore, StorageError, StorageResult};
use std::fs;
use std::path::{Path, PathBuf};

/// File-based store.
///
/// Each key is kept as one `<key>.json` file in a directory. Bytes outside
/// `[A-Za-z0-9_-]` are written as `%XX`, so every key maps to its own file
/// and [`LocalStore::keys`] returns the keys as they were set.
pub struct FileStore {
    /// Base directory for stored values.
    base_path: PathBuf,
}

impl FileStore {
    /// Create a new file store with the given base directory.
    ///
    /// Creates the directory if it doesn't exist.
    pub fn new(base_path: PathBuf) -> StorageResult<Self> {
        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(|e| {
                StorageError::Io(format!("Failed to create storage directory: {}", e))
            })?;
        }
        Ok(Self { base_path })
    }

    /// Create a file store in the default location.
    ///
    /// On Unix: `~/.local/share/tailorink/store/`
    /// On Windows: `%LOCALAPPDATA%\tailorink\store\`
    pub fn default_location() -> StorageResult<Self> {
        let base = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| StorageError::Io("Could not determine home directory".to_string()))?;

        Self::new(base.join("tailorink").join("store"))
    }

    /// Get the file path for a key.
    fn value_path(&self, key: &str) -> PathBuf {
        self.base_path.join(format!("{}.json", encode_key(key)))
    }

    /// Get the base path.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}

impl LocalStore for FileStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let path = self.value_path(key);
        if !path.exists() {
            return Ok(None);
        }
        fs::read_to_string(&path)
            .map(Some)
            .map_err(|e| StorageError::Io(format!("Failed to read {}: {}", path.display(), e)))
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let path = self.value_path(key);
        fs::write(&path, value)
            .map_err(|e| StorageError::Io(format!("Failed to write {}: {}", path.display(), e)))
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let path = self.value_path(key);
        if path.exists() {
            fs::remove_file(&path).map_err(|e| {
                StorageError::Io(format!("Failed to delete {}: {}", path.display(), e))
            })?;
        }
        Ok(())
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        if !self.base_path.exists() {
            return Ok(vec![]);
        }

        let entries = fs::read_dir(&self.base_path)
            .map_err(|e| StorageError::Io(format!("Failed to read directory: {}", e)))?;

        let mut keys = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                if let Some(key) = path.file_stem().and_then(|s| s.to_str()).and_then(decode_key) {
                    keys.push(key);
                }
            }
        }
        Ok(keys)
    }
}

fn encode_key(key: &str) -> String {
    let mut encoded = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("%{:02X}", byte));
        }
    }
    encoded
}

/// Inverse of [`encode_key`]. `None` for stems this store did not write.
fn decode_key(stem: &str) -> Option<String> {
    let mut bytes = Vec::with_capacity(stem.len());
    let mut rest = stem.as_bytes();
    while let Some((&byte, tail)) = rest.split_first() {
        if byte == b'%' {
            let hex = std::str::from_utf8(tail.get(..2)?).ok()?;
            bytes.push(u8::from_str_radix(hex, 16).ok()?);
            rest = &tail[2..];
        } else {
            bytes.push(byte);
            rest = tail;
        }
    }
    String::from_utf8(bytes).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_file_store_set_get() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf()).unwrap();

        store.set("savedDesignState", "{\"designs\":[]}").unwrap();
        let loaded = store.get("savedDesignState").unwrap();

        assert_eq!(loaded.as_deref(), Some("{\"designs\":[]}"));
    }

    #[test]
    fn test_file_store_missing() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf()).unwrap();

        assert!(store.get("nonexistent").unwrap().is_none());
    }

    #[test]
    fn test_file_store_keys() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf()).unwrap();

        store.set("undoStack", "[]").unwrap();
        store.set("redoStack", "[]").unwrap();

        let keys = store.keys().unwrap();
        assert_eq!(keys.len(), 2);
        assert!(keys.contains(&"undoStack".to_string()));
        assert!(keys.contains(&"redoStack".to_string()));
    }

    #[test]
    fn test_file_store_remove() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf()).unwrap();

        store.set("cart_id", "\"abc\"").unwrap();
        assert!(store.contains("cart_id").unwrap());

        store.remove("cart_id").unwrap();
        assert!(!store.contains("cart_id").unwrap());
    }

    #[test]
    fn test_file_store_escapes_keys() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf()).unwrap();

        store.set("odd/key:with*chars", "1").unwrap();
        store.set("odd_key_with_chars", "2").unwrap();
        store.set("größe", "3").unwrap();

        assert_eq!(store.get("odd/key:with*chars").unwrap().as_deref(), Some("1"));
        assert_eq!(store.get("odd_key_with_chars").unwrap().as_deref(), Some("2"));
        let mut keys = store.keys().unwrap();
        keys.sort();
        assert_eq!(keys, vec!["größe", "odd/key:with*chars", "odd_key_with_chars"]);
    }

    #[test]
    fn test_decode_key() {
        assert_eq!(decode_key("a%2Fb").as_deref(), Some("a/b"));
        assert_eq!(decode_key("plain").as_deref(), Some("plain"));
        assert_eq!(decode_key("bad%2"), None);
        assert_eq!(decode_key("bad%zz"), None);
    }
}
