use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("could not encode dreams: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A flat namespace of named text blobs.
pub trait BlobStorage {
    /// `Ok(None)` when nothing has been stored under `key` yet.
    fn read(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn write(&self, key: &str, contents: &str) -> Result<(), StorageError>;
}

/// Blobs as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(FileStorage { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl BlobStorage for FileStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, key: &str, contents: &str) -> Result<(), StorageError> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

/// In-process storage, counting writes so callers can observe persistence.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    blobs: Mutex<HashMap<String, String>>,
    writes: Mutex<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_blob(key: &str, contents: &str) -> Self {
        let storage = Self::default();
        storage
            .blobs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), contents.to_string());
        storage
    }

    pub fn write_count(&self) -> usize {
        *self.writes.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl BlobStorage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        let blobs = self.blobs.lock().unwrap_or_else(|e| e.into_inner());
        Ok(blobs.get(key).cloned())
    }

    fn write(&self, key: &str, contents: &str) -> Result<(), StorageError> {
        self.blobs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), contents.to_string());
        *self.writes.lock().unwrap_or_else(|e| e.into_inner()) += 1;
        Ok(())
    }
}

impl<T: BlobStorage + ?Sized> BlobStorage for &T {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).read(key)
    }

    fn write(&self, key: &str, contents: &str) -> Result<(), StorageError> {
        (**self).write(key, contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_blob_reads_as_none() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::open(dir.path()).unwrap();
        assert!(storage.read("dreams").unwrap().is_none());
    }

    #[test]
    fn write_then_read_file_blob() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::open(dir.path().join("nested")).unwrap();
        storage.write("dreams", "[]").unwrap();
        assert_eq!(storage.read("dreams").unwrap().as_deref(), Some("[]"));
        assert!(storage.dir().join("dreams.json").exists());
        assert!(!storage.dir().join("dreams.json.tmp").exists());
    }

    #[test]
    fn memory_storage_counts_writes() {
        let storage = MemoryStorage::new();
        storage.write("a", "1").unwrap();
        storage.write("a", "2").unwrap();
        assert_eq!(storage.write_count(), 2);
        assert_eq!(storage.read("a").unwrap().as_deref(), Some("2"));
    }
}
