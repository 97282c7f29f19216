//! Durable key-value substrate behind the persistence adapter.
//!
//! Backends take `&self` and synchronize internally so one handle can be
//! shared between the store and whoever inspects it.
//!
//! # File Format
//!
//! [`FileStorage`] keeps every key in one JSON document:
//!
//! ```json
//! {
//!   "version": 1,
//!   "entries": {
//!     "panel-layout:proj-1": "{\"schema_version\":1,...}"
//!   }
//! }
//! ```
//!
//! Writes use a temp-file-then-rename so a crash mid-write leaves the previous
//! document intact. A write that finds an unreadable document renames it to
//! `*.json.corrupt` and starts a fresh one.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::StorageError;

pub type StorageResult<T> = Result<T, StorageError>;

/// Key-value persistence substrate.
pub trait StorageBackend: Send + Sync {
    /// Short label for logs.
    fn name(&self) -> &str;

    fn load(&self, key: &str) -> StorageResult<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    fn save(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Remove `key`. Missing keys are not an error.
    fn remove(&self, key: &str) -> StorageResult<()>;

    /// All stored keys, sorted.
    fn keys(&self) -> StorageResult<Vec<String>>;

    fn clear(&self) -> StorageResult<()>;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// =========================================================================
// In-memory backend
// =========================================================================

/// Volatile backend. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<Mutex<BTreeMap<String, String>>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        lock(&self.entries).is_empty()
    }
}

impl StorageBackend for MemoryStorage {
    fn name(&self) -> &str {
        "memory"
    }

    fn load(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(lock(&self.entries).get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> StorageResult<()> {
        lock(&self.entries).insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        lock(&self.entries).remove(key);
        Ok(())
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        Ok(lock(&self.entries).keys().cloned().collect())
    }

    fn clear(&self) -> StorageResult<()> {
        lock(&self.entries).clear();
        Ok(())
    }
}

// =========================================================================
// JSON file backend
// =========================================================================

const FILE_FORMAT_VERSION: u64 = 1;

#[derive(Debug, Default, Serialize, Deserialize)]
struct StorageFile {
    #[serde(default)]
    version: u64,
    #[serde(default)]
    entries: BTreeMap<String, String>,
}

/// Single-document JSON backend.
///
/// - **Missing file** reads as empty.
/// - **Corrupted file** is a [`StorageError::Corrupted`] on read.
/// - **Version mismatch** is a [`StorageError::UnsupportedVersion`] on read.
/// - **Writes** over an unreadable file move it aside to `*.json.corrupt` and
///   continue from an empty document.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    guard: Mutex<()>,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> StorageError {
        StorageError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn read(&self) -> StorageResult<StorageFile> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Ok(StorageFile::default());
            }
            Err(err) => return Err(self.io_error(err)),
        };
        let file: StorageFile =
            serde_json::from_str(&contents).map_err(|source| StorageError::Corrupted {
                path: self.path.clone(),
                source,
            })?;
        if file.version != FILE_FORMAT_VERSION {
            return Err(StorageError::UnsupportedVersion {
                path: self.path.clone(),
                found: file.version,
                expected: FILE_FORMAT_VERSION,
            });
        }
        Ok(file)
    }

    /// Path an unreadable document is moved to before it is replaced.
    #[must_use]
    pub fn quarantine_path(&self) -> PathBuf {
        self.path.with_extension("json.corrupt")
    }

    /// Read for a write. An unreadable document is moved aside so the write
    /// can proceed from an empty one.
    fn read_for_write(&self) -> StorageResult<StorageFile> {
        match self.read() {
            Err(err @ (StorageError::Corrupted { .. } | StorageError::UnsupportedVersion { .. })) => {
                let aside = self.quarantine_path();
                std::fs::rename(&self.path, &aside).map_err(|e| self.io_error(e))?;
                warn!(
                    path = %self.path.display(),
                    moved_to = %aside.display(),
                    error = %err,
                    "storage file unreadable; starting a new one"
                );
                Ok(StorageFile::default())
            }
            other => other,
        }
    }

    fn write(&self, mut file: StorageFile) -> StorageResult<()> {
        file.version = FILE_FORMAT_VERSION;
        let json = serde_json::to_string_pretty(&file).map_err(StorageError::Serialize)?;
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        let temp = self.path.with_extension("json.tmp");
        std::fs::write(&temp, json).map_err(|e| self.io_error(e))?;
        std::fs::rename(&temp, &self.path).map_err(|e| self.io_error(e))
    }

    fn modify(&self, edit: impl FnOnce(&mut BTreeMap<String, String>)) -> StorageResult<()> {
        let _held = lock(&self.guard);
        let mut file = self.read_for_write()?;
        edit(&mut file.entries);
        self.write(file)
    }
}

impl StorageBackend for FileStorage {
    fn name(&self) -> &str {
        "file"
    }

    fn load(&self, key: &str) -> StorageResult<Option<String>> {
        let _held = lock(&self.guard);
        Ok(self.read()?.entries.remove(key))
    }

    fn save(&self, key: &str, value: &str) -> StorageResult<()> {
        self.modify(|entries| {
            entries.insert(key.to_owned(), value.to_owned());
        })
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.modify(|entries| {
            entries.remove(key);
        })
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        let _held = lock(&self.guard);
        Ok(self.read()?.entries.into_keys().collect())
    }

    fn clear(&self) -> StorageResult<()> {
        self.modify(BTreeMap::clear)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise(backend: &dyn StorageBackend) {
        assert_eq!(backend.load("a").unwrap(), None);
        backend.save("b", "2").unwrap();
        backend.save("a", "1").unwrap();
        backend.save("a", "1b").unwrap();
        assert_eq!(backend.load("a").unwrap().as_deref(), Some("1b"));
        assert_eq!(backend.keys().unwrap(), vec!["a".to_owned(), "b".to_owned()]);

        backend.remove("a").unwrap();
        backend.remove("missing").unwrap();
        assert_eq!(backend.keys().unwrap(), vec!["b".to_owned()]);

        backend.clear().unwrap();
        assert!(backend.keys().unwrap().is_empty());
    }

    #[test]
    fn memory_backend_contract() {
        exercise(&MemoryStorage::new());
    }

    #[test]
    fn memory_clones_share_entries() {
        let storage = MemoryStorage::new();
        let observer = storage.clone();
        storage.save("k", "v").unwrap();
        assert_eq!(observer.load("k").unwrap().as_deref(), Some("v"));
        assert_eq!(observer.len(), 1);
    }

    #[test]
    fn file_backend_contract() {
        let dir = tempfile::tempdir().unwrap();
        exercise(&FileStorage::new(dir.path().join("layouts.json")));
    }

    #[test]
    fn file_backend_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("layouts.json");
        FileStorage::new(&path).save("scope", "{}").unwrap();

        let reopened = FileStorage::new(&path);
        assert_eq!(reopened.load("scope").unwrap().as_deref(), Some("{}"));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("absent.json"));
        assert!(storage.keys().unwrap().is_empty());
        assert_eq!(storage.load("x").unwrap(), None);
    }

    #[test]
    fn corrupted_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layouts.json");
        std::fs::write(&path, "{ not json").unwrap();
        let storage = FileStorage::new(&path);
        assert!(matches!(
            storage.load("x"),
            Err(StorageError::Corrupted { .. })
        ));
        assert!(storage.keys().is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[test]
    fn write_over_corrupted_file_moves_it_aside() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layouts.json");
        std::fs::write(&path, "{ not json").unwrap();
        let storage = FileStorage::new(&path);

        storage.save("x", "1").unwrap();
        assert_eq!(storage.load("x").unwrap().as_deref(), Some("1"));
        assert_eq!(
            std::fs::read_to_string(storage.quarantine_path()).unwrap(),
            "{ not json"
        );

        storage.save("y", "2").unwrap();
        storage.remove("x").unwrap();
        assert_eq!(storage.keys().unwrap(), vec!["y".to_owned()]);
    }

    #[test]
    fn version_mismatch_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layouts.json");
        let newer = serde_json::json!({ "version": 999, "entries": { "x": "1" } });
        std::fs::write(&path, newer.to_string()).unwrap();
        let storage = FileStorage::new(&path);

        let err = storage.load("x").unwrap_err();
        assert!(matches!(
            err,
            StorageError::UnsupportedVersion { found: 999, expected: 1, .. }
        ));
        assert!(err.to_string().contains("version"), "{err}");

        storage.save("y", "2").unwrap();
        assert_eq!(storage.keys().unwrap(), vec!["y".to_owned()]);
        assert!(storage.quarantine_path().exists());
    }

    #[test]
    fn unversioned_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layouts.json");
        std::fs::write(&path, r#"{"entries": {"x": "1"}}"#).unwrap();
        assert!(matches!(
            FileStorage::new(&path).load("x"),
            Err(StorageError::UnsupportedVersion { found: 0, .. })
        ));
    }
}
