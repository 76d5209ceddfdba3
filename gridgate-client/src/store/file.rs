//! File-backed credential storage.
//!
//! Credentials are kept in a JSON file in the platform data directory
//! (`~/.local/share/gridgate/credentials.json` on Linux) and rewritten on
//! every mutation, so they survive process restarts.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::{Secret, SecretStore, StoreError};

/// On-disk format.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct FileStoreData {
    /// Version of the file format (for future migrations).
    version: u32,

    entries: BTreeMap<String, Secret>,
}

impl Default for FileStoreData {
    fn default() -> Self {
        Self {
            version: 1,
            entries: BTreeMap::new(),
        }
    }
}

/// Durable JSON-file store.
///
/// Reads are served from an in-memory copy; every write replaces the file.
pub struct FileStore {
    path: PathBuf,
    data: RwLock<FileStoreData>,
}

impl FileStore {
    /// Default path for the credentials file.
    pub fn default_path() -> Result<PathBuf, StoreError> {
        let dirs = directories::ProjectDirs::from("com", "raibid-labs", "gridgate")
            .ok_or(StoreError::DataDirUnavailable)?;
        Ok(dirs.data_dir().join("credentials.json"))
    }

    /// Load the store from `path`.
    ///
    /// Creates parent directories if needed. A missing file is an empty store.
    pub fn load_from_path(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let data = if path.exists() {
            let contents = fs::read_to_string(&path)?;
            serde_json::from_str(&contents)?
        } else {
            FileStoreData::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self, data: &FileStoreData) -> Result<(), StoreError> {
        let contents = serde_json::to_string_pretty(data)?;

        // Write to a sibling file first so a crash never leaves a torn file
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl std::fmt::Debug for FileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStore")
            .field("path", &self.path)
            .field("keys_count", &self.data.read().entries.len())
            .finish()
    }
}

#[async_trait]
impl SecretStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<Secret>, StoreError> {
        Ok(self.data.read().entries.get(key).cloned())
    }

    async fn set(&self, key: &str, secret: &Secret) -> Result<(), StoreError> {
        let mut data = self.data.write();
        data.entries.insert(key.to_string(), secret.clone());
        self.save(&data)
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut data = self.data.write();
        if data.entries.remove(key).is_some() {
            self.save(&data)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> FileStore {
        FileStore::load_from_path(dir.path().join("nested").join("credentials.json")).unwrap()
    }

    #[tokio::test]
    async fn test_file_store_persists_across_instances() {
        let dir = TempDir::new().unwrap();

        let store = store_in(&dir);
        store.set("access_token", &Secret::new("a1")).await.unwrap();
        store.set("refresh_token", &Secret::new("r1")).await.unwrap();
        drop(store);

        let reopened = store_in(&dir);
        assert_eq!(reopened.get("access_token").await.unwrap().unwrap().expose(), "a1");
        assert_eq!(reopened.get("refresh_token").await.unwrap().unwrap().expose(), "r1");
    }

    #[tokio::test]
    async fn test_file_store_delete_persists() {
        let dir = TempDir::new().unwrap();

        let store = store_in(&dir);
        store.set("access_token", &Secret::new("a1")).await.unwrap();
        store.delete("access_token").await.unwrap();
        store.delete("never-set").await.unwrap();

        let reopened = store_in(&dir);
        assert!(reopened.get("access_token").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_store_rejects_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("credentials.json");
        fs::write(&path, "not json").unwrap();

        let result = FileStore::load_from_path(&path);
        assert!(matches!(result, Err(StoreError::SerializationError(_))));
    }

    #[test]
    fn test_default_path_ends_with_file_name() {
        if let Ok(path) = FileStore::default_path() {
            assert!(path.ends_with("credentials.json"));
        }
    }
}
