//! Small key/value persistence for the session token and preferences.
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use directories::ProjectDirs;

/// Key of the bearer token.
pub const ACCESS_TOKEN_KEY: &str = "twitch_access_token";
/// Key of the CSRF state of an authorization request that has not come back yet.
pub const OAUTH_STATE_KEY: &str = "twitch_oauth_state";
/// Key of the dashboard theme.
pub const THEME_KEY: &str = "theme";

/// Errors for [`Storage`] implementations
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("failed to do IO operation on {path:?}")]
    IoError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("storage file {path:?} is not valid json")]
    JsonError {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub trait Storage {
    /// `None` when nothing is stored under `key`.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

impl<S: Storage + ?Sized> Storage for &S {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        (**self).remove(key)
    }
}

/// A storage that remembers values for one session only.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> MemoryStorage {
        Default::default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let values = self.values.lock().expect("poisoned mutex");
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut values = self.values.lock().expect("poisoned mutex");
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut values = self.values.lock().expect("poisoned mutex");
        values.remove(key);
        Ok(())
    }
}

/// Serializes values to a JSON object on disk, rewritten after every change.
#[derive(Debug)]
pub struct DiskStorage {
    location: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl DiskStorage {
    /// Open the store at `location`. A missing file is an empty store.
    pub fn new<P: Into<PathBuf>>(location: P) -> Result<DiskStorage, StorageError> {
        let location = location.into();
        let values = match load_from_file(&location) {
            Ok(values) => values,
            Err(StorageError::IoError { ref source, .. })
                if source.kind() == io::ErrorKind::NotFound =>
            {
                BTreeMap::new()
            }
            Err(e) => return Err(e),
        };
        Ok(DiskStorage {
            location,
            values: Mutex::new(values),
        })
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    fn dump_to_file(&self, values: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let io_error = |source| StorageError::IoError {
            path: self.location.clone(),
            source,
        };
        let serialized =
            serde_json::to_string_pretty(values).map_err(|source| StorageError::JsonError {
                path: self.location.clone(),
                source,
            })?;
        if let Some(parent) = self.location.parent() {
            fs::create_dir_all(parent).map_err(io_error)?;
        }
        fs::write(&self.location, serialized).map_err(io_error)
    }
}

fn load_from_file(path: &Path) -> Result<BTreeMap<String, String>, StorageError> {
    let contents = fs::read_to_string(path).map_err(|source| StorageError::IoError {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| StorageError::JsonError {
        path: path.to_path_buf(),
        source,
    })
}

impl Storage for DiskStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let values = self.values.lock().expect("poisoned mutex");
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut values = self.values.lock().expect("poisoned mutex");
        values.insert(key.to_string(), value.to_string());
        self.dump_to_file(&values)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut values = self.values.lock().expect("poisoned mutex");
        if values.remove(key).is_some() {
            self.dump_to_file(&values)?;
        }
        Ok(())
    }
}

/// `storage.json` in the platform data directory, if the platform has one.
pub fn default_storage_path() -> Option<PathBuf> {
    ProjectDirs::from("tv", "twitch", "hype-train").map(|dirs| dirs.data_dir().join("storage.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_storage() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get(ACCESS_TOKEN_KEY).unwrap(), None);
        storage.set(ACCESS_TOKEN_KEY, "abc").unwrap();
        assert_eq!(storage.get(ACCESS_TOKEN_KEY).unwrap().as_deref(), Some("abc"));
        storage.remove(ACCESS_TOKEN_KEY).unwrap();
        storage.remove(ACCESS_TOKEN_KEY).unwrap();
        assert_eq!(storage.get(ACCESS_TOKEN_KEY).unwrap(), None);
    }

    #[test]
    fn disk_storage_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("storage.json");
        {
            let storage = DiskStorage::new(&path).unwrap();
            assert_eq!(storage.get(THEME_KEY).unwrap(), None);
            storage.set(THEME_KEY, "light").unwrap();
            storage.set(ACCESS_TOKEN_KEY, "abc").unwrap();
            storage.remove(ACCESS_TOKEN_KEY).unwrap();
        }
        let storage = DiskStorage::new(&path).unwrap();
        assert_eq!(storage.get(THEME_KEY).unwrap().as_deref(), Some("light"));
        assert_eq!(storage.get(ACCESS_TOKEN_KEY).unwrap(), None);
    }

    #[test]
    fn disk_storage_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        fs::write(&path, "{ nope").unwrap();
        assert!(matches!(
            DiskStorage::new(&path),
            Err(StorageError::JsonError { .. })
        ));
    }
}
