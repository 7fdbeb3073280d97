// latex-proxy-client - platform/storage.rs
//
// Durable client-side key/value storage: the native counterpart of the
// browser's localStorage. Values are plain strings; callers serialise
// structured values themselves.
//
// Design principles:
// - Reads are synchronous and served from memory, so the API client can
//   consult the token without awaiting anything.
// - Every write rewrites the whole file atomically (write temp, rename) so a
//   crash mid-save never corrupts the previous contents.
// - A missing file is a normal first run; a malformed file is logged and
//   treated as empty rather than blocking startup.

use crate::util::constants::STORAGE_FILE_NAME;
use crate::util::error::StorageError;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// String key/value storage shared by the session and the application store.
pub trait KeyValueStore: Send + Sync {
    /// Current value for `key`, if any.
    fn get(&self, key: &str) -> Option<String>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Resolve the storage file path from the platform data directory.
pub fn storage_path(data_dir: &Path) -> PathBuf {
    data_dir.join(STORAGE_FILE_NAME)
}

// =============================================================================
// File-backed storage
// =============================================================================

/// Key/value storage persisted as a single JSON object on disk.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStorage {
    /// Open the storage file at `path`, loading existing entries.
    ///
    /// The file (and its parent directory) is only created on first write.
    pub fn open(path: &Path) -> Self {
        let entries = load_entries(path).unwrap_or_default();
        tracing::debug!(
            path = %path.display(),
            keys = entries.len(),
            "Storage opened"
        );
        Self {
            path: path.to_path_buf(),
            entries: Mutex::new(entries),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write `entries` to disk atomically.
    fn flush(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StorageError::Io {
                path: parent.to_path_buf(),
                operation: "create directory",
                source,
            })?;
        }

        let json = serde_json::to_string_pretty(entries).map_err(|source| StorageError::Json {
            path: self.path.clone(),
            source,
        })?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json.as_bytes()).map_err(|source| StorageError::Io {
            path: tmp.clone(),
            operation: "write",
            source,
        })?;

        std::fs::rename(&tmp, &self.path).map_err(|source| {
            let _ = std::fs::remove_file(&tmp);
            StorageError::Io {
                path: self.path.clone(),
                operation: "rename",
                source,
            }
        })?;

        tracing::trace!(path = %self.path.display(), "Storage flushed");
        Ok(())
    }
}

impl KeyValueStore for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.lock();
        if entries.get(key).map(String::as_str) == Some(value) {
            return Ok(());
        }
        let previous = entries.insert(key.to_string(), value.to_string());
        if let Err(e) = self.flush(&entries) {
            // Keep memory and disk in agreement.
            match previous {
                Some(old) => entries.insert(key.to_string(), old),
                None => entries.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.lock();
        let Some(previous) = entries.remove(key) else {
            return Ok(());
        };
        if let Err(e) = self.flush(&entries) {
            entries.insert(key.to_string(), previous);
            return Err(e);
        }
        Ok(())
    }
}

/// Read the JSON object at `path`. `None` on any error.
fn load_entries(path: &Path) -> Option<BTreeMap<String, String>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %path.display(), error = %e, "Cannot read storage file");
            }
        })
        .ok()?;

    serde_json::from_str(&content)
        .map_err(|e| {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Storage file is malformed; starting empty"
            );
        })
        .ok()
}

// =============================================================================
// In-memory storage
// =============================================================================

/// Volatile storage for tests and sessions that must not touch disk.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KeyValueStore for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.lock().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_storage_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = storage_path(dir.path());

        let storage = FileStorage::open(&path);
        storage.set("token", "abc").unwrap();
        storage.set("other", "1").unwrap();
        storage.remove("other").unwrap();

        let reopened = FileStorage::open(&path);
        assert_eq!(reopened.get("token").as_deref(), Some("abc"));
        assert_eq!(reopened.get("other"), None);
    }

    #[test]
    fn test_file_storage_creates_missing_parent_dir() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("deeper").join("storage.json");
        let storage = FileStorage::open(&path);
        storage.set("k", "v").unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_file_storage_malformed_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        let path = storage_path(dir.path());
        std::fs::write(&path, b"not valid json {{{{").unwrap();

        let storage = FileStorage::open(&path);
        assert_eq!(storage.get("token"), None);

        // The next write replaces the garbage with a valid document.
        storage.set("token", "t").unwrap();
        assert_eq!(FileStorage::open(&path).get("token").as_deref(), Some("t"));
    }

    #[test]
    fn test_remove_absent_key_is_ok_and_does_not_create_file() {
        let dir = TempDir::new().unwrap();
        let path = storage_path(dir.path());
        let storage = FileStorage::open(&path);
        storage.remove("missing").unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_memory_storage_round_trip() {
        let storage = MemoryStorage::new();
        storage.set("a", "1").unwrap();
        assert_eq!(storage.get("a").as_deref(), Some("1"));
        storage.remove("a").unwrap();
        assert_eq!(storage.get("a"), None);
    }
}
