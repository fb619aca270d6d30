use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{
    DocumentStore, KeyedGuard, KeyedLocks, ReplaceOptions, Result, StoreError, Version, Versioned,
};

/// Document store that keeps one pretty-printed JSON file per collection.
///
/// Files live in a single data directory. By default collection `name` maps to
/// `name.json`; [`JsonFileStore::with_file_name`] overrides that. Version tokens
/// are tracked in memory, so compare-and-swap is only meaningful within one
/// process.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
    file_names: HashMap<String, String>,
    versions: Arc<Mutex<HashMap<String, Version>>>,
    writers: KeyedLocks<String>,
}

impl JsonFileStore {
    /// Opens a store rooted at `dir`, creating the directory if needed.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| StoreError::Io {
                path: dir.clone(),
                source,
            })?;

        tracing::info!(dir = %dir.display(), "opened JSON file store");

        Ok(Self {
            dir,
            file_names: HashMap::new(),
            versions: Arc::new(Mutex::new(HashMap::new())),
            writers: KeyedLocks::new(),
        })
    }

    /// Stores `collection` in `file_name` instead of `<collection>.json`.
    pub fn with_file_name(mut self, collection: &str, file_name: impl Into<String>) -> Self {
        self.file_names
            .insert(collection.to_string(), file_name.into());
        self
    }

    /// Returns the data directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the path of the file backing `collection`.
    pub fn path_for(&self, collection: &str) -> PathBuf {
        match self.file_names.get(collection) {
            Some(name) => self.dir.join(name),
            None => self.dir.join(format!("{collection}.json")),
        }
    }

    async fn read_file(path: &Path) -> Result<serde_json::Value> {
        match tokio::fs::read(path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(serde_json::Value::Null),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(serde_json::Value::Null),
            Err(source) => Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    async fn write_file(path: &Path, documents: &serde_json::Value) -> Result<()> {
        let json = serde_json::to_vec_pretty(documents)?;

        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, &json)
            .await
            .map_err(|source| StoreError::Io {
                path: tmp.clone(),
                source,
            })?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|source| StoreError::Io {
                path: path.to_path_buf(),
                source,
            })
    }
}

#[async_trait]
impl DocumentStore for JsonFileStore {
    async fn get_all(&self, collection: &str) -> Result<Versioned<serde_json::Value>> {
        let path = self.path_for(collection);
        let versions = self.versions.lock().await;
        let version = versions.get(collection).copied().unwrap_or_default();

        let value = Self::read_file(&path).await.inspect_err(|e| {
            tracing::error!(collection, path = %path.display(), error = %e, "failed to read collection");
        })?;

        Ok(Versioned::new(version, value))
    }

    async fn replace_all(
        &self,
        collection: &str,
        documents: serde_json::Value,
        options: ReplaceOptions,
    ) -> Result<Version> {
        let path = self.path_for(collection);
        let mut versions = self.versions.lock().await;
        let current_version = versions.get(collection).copied().unwrap_or_default();

        if let Some(expected) = options.expected_version
            && current_version != expected
        {
            return Err(StoreError::ConcurrencyConflict {
                collection: collection.to_string(),
                expected,
                actual: current_version,
            });
        }

        Self::write_file(&path, &documents).await.inspect_err(|e| {
            tracing::error!(collection, path = %path.display(), error = %e, "failed to write collection");
        })?;

        let new_version = current_version.next();
        versions.insert(collection.to_string(), new_version);

        Ok(new_version)
    }

    async fn lock_collection(&self, collection: &str) -> KeyedGuard<String> {
        self.writers.lock(&collection.to_string()).await
    }
}
