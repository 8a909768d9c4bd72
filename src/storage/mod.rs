//! Durable key-value storage for client-side session data.
//!
//! Stores plain strings under fixed keys (`wsoptv_tokens`,
//! `wsoptv_recent_searches`). The file-backed store writes one file per key
//! with owner-only permissions.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use thiserror::Error;

/// Durable storage failures.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Invalid key: {0}")]
    InvalidKey(String),
}

impl From<std::io::Error> for StorageError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error.to_string())
    }
}

/// Storage abstraction for persisted client state.
pub trait LocalStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// File-backed storage, one file per key.
///
/// # Example
/// ```no_run
/// use wsoptv::storage::{FileStorage, LocalStorage};
///
/// let storage = FileStorage::new_default();
/// storage.set("wsoptv_recent_searches", r#"["wsop"]"#)?;
/// # Ok::<(), wsoptv::storage::StorageError>(())
/// ```
#[derive(Debug, Clone)]
pub struct FileStorage {
    base_dir: PathBuf,
}

impl FileStorage {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn new_default() -> Self {
        Self::new(default_storage_dir())
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn key_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-');
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.base_dir.join(format!("{key}.json")))
    }
}

impl LocalStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.key_path(key)?;
        match fs::read_to_string(&path) {
            Ok(data) => Ok(Some(data)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.key_path(key)?;
        fs::create_dir_all(&self.base_dir)?;
        fs::write(&path, value)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.key_path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// In-process storage for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self
            .values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}

/// `~/.wsoptv`, or `.wsoptv` when no home directory is known.
pub fn default_storage_dir() -> PathBuf {
    directories::UserDirs::new()
        .map(|dirs| dirs.home_dir().join(".wsoptv"))
        .unwrap_or_else(|| PathBuf::from(".wsoptv"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn file_round_trip_and_remove() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path().join("nested"));

        assert_eq!(storage.get("wsoptv_tokens").unwrap(), None);
        storage.set("wsoptv_tokens", "{}").unwrap();
        assert_eq!(storage.get("wsoptv_tokens").unwrap().as_deref(), Some("{}"));

        storage.remove("wsoptv_tokens").unwrap();
        storage.remove("wsoptv_tokens").unwrap();
        assert_eq!(storage.get("wsoptv_tokens").unwrap(), None);
    }

    #[cfg(unix)]
    #[test]
    fn files_are_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path());
        storage.set("wsoptv_tokens", "{}").unwrap();
        let mode = fs::metadata(dir.path().join("wsoptv_tokens.json"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn rejects_path_like_keys() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path());
        assert!(matches!(
            storage.set("../escape", "x"),
            Err(StorageError::InvalidKey(_))
        ));
    }
}
