//! JSON key-value store persisted to a single file.
//!
//! Every mutation rewrites the whole file: the new content goes to a
//! temporary sibling first and is then renamed over the original, so a crash
//! never leaves a half-written store behind.

use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to read {path}: {source}")]
    Read { path: String, source: io::Error },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write { path: String, source: io::Error },

    #[error("Failed to serialize value: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub struct JsonStore {
    path: PathBuf,
    data: Mutex<Map<String, Value>>,
}

impl JsonStore {
    /// Load the store at `path`. A missing file is an empty store.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let data = match tokio::fs::read_to_string(&path).await {
            Ok(content) if content.trim().is_empty() => Map::new(),
            Ok(content) => serde_json::from_str(&content).map_err(|source| StoreError::Parse {
                path: path.display().to_string(),
                source,
            })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Map::new(),
            Err(source) => {
                return Err(StoreError::Read {
                    path: path.display().to_string(),
                    source,
                })
            }
        };

        Ok(Self {
            path,
            data: Mutex::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn get(&self, key: &str) -> Option<Value> {
        self.data.lock().await.get(key).cloned()
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.data.lock().await.contains_key(key)
    }

    pub async fn len(&self) -> usize {
        self.data.lock().await.len()
    }

    pub async fn all(&self) -> Map<String, Value> {
        self.data.lock().await.clone()
    }

    /// Insert or replace `key` and persist.
    pub async fn put(&self, key: impl Into<String>, value: impl Serialize) -> Result<(), StoreError> {
        let value = serde_json::to_value(value)?;
        let mut data = self.data.lock().await;
        let mut next = data.clone();
        next.insert(key.into(), value);
        self.persist(&next).await?;
        *data = next;
        Ok(())
    }

    /// Remove `key` and persist. Returns the old value, if any.
    pub async fn remove(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let mut data = self.data.lock().await;
        if !data.contains_key(key) {
            return Ok(None);
        }
        let mut next = data.clone();
        let old = next.remove(key);
        self.persist(&next).await?;
        *data = next;
        Ok(old)
    }

    async fn persist(&self, data: &Map<String, Value>) -> Result<(), StoreError> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        data.serialize(&mut ser)?;

        let tmp = temp_path(&self.path);
        let write_err = |source| StoreError::Write {
            path: self.path.display().to_string(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }
        tokio::fs::write(&tmp, &buf).await.map_err(write_err)?;
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(write_err(e));
        }

        debug!("Saved {} keys to {}", data.len(), self.path.display());
        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let suffix: String = uuid::Uuid::new_v4().simple().to_string().chars().take(10).collect();
    PathBuf::from(format!("{}-{}.tmp", path.display(), suffix))
}
