//! Session storage: a small key-value store that outlives the worker.

use std::{
    collections::HashMap,
    io,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context;
use murmur_api::CollectionState;
use murmur_store::CommentStore;

pub const STATE_KEY: &str = "murmur_state";
pub const COMMENTS_KEY: &str = "murmur_comments";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage quota of {quota} bytes exceeded")]
    QuotaExceeded { quota: usize },

    #[error("invalid storage key {0:?}")]
    InvalidKey(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

#[async_trait::async_trait]
pub trait Storage: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;
    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError>;
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// In-process storage, optionally limited to a total number of bytes
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage {
    data: Arc<parking_lot::Mutex<HashMap<String, Vec<u8>>>>,
    quota: Arc<parking_lot::Mutex<Option<usize>>>,
}

impl MemoryStorage {
    pub fn new() -> MemoryStorage {
        MemoryStorage::default()
    }

    pub fn with_quota(quota: usize) -> MemoryStorage {
        let res = MemoryStorage::new();
        res.set_quota(Some(quota));
        res
    }

    /// Applies to the next writes only, already stored data is kept
    pub fn set_quota(&self, quota: Option<usize>) {
        *self.quota.lock() = quota;
    }

    pub fn used(&self) -> usize {
        self.data.lock().values().map(|v| v.len()).sum()
    }
}

#[async_trait::async_trait]
impl Storage for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.data.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
        let mut data = self.data.lock();
        if let Some(quota) = *self.quota.lock() {
            let others = data
                .iter()
                .filter(|(k, _)| *k != key)
                .map(|(_, v)| v.len())
                .sum::<usize>();
            if others + value.len() > quota {
                return Err(StorageError::QuotaExceeded { quota });
            }
        }
        data.insert(String::from(key), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.data.lock().remove(key);
        Ok(())
    }
}

/// One `<key>.json` file per key
#[derive(Clone, Debug)]
pub struct DirStorage {
    dir: PathBuf,
}

impl DirStorage {
    pub async fn open(dir: impl AsRef<Path>) -> anyhow::Result<DirStorage> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("creating storage directory {dir:?}"))?;
        Ok(DirStorage { dir })
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StorageError::InvalidKey(String::from(key)));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

#[async_trait::async_trait]
impl Storage for DirStorage {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        match tokio::fs::read(self.path_for(key)?).await {
            Ok(data) => Ok(Some(data)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, value).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        match tokio::fs::remove_file(self.path_for(key)?).await {
            Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err.into()),
            _ => Ok(()),
        }
    }
}

/// Missing state means nothing ever ran: a fresh idle state
pub async fn load_state(storage: &dyn Storage) -> anyhow::Result<CollectionState> {
    match storage.get(STATE_KEY).await.context("reading state")? {
        None => Ok(CollectionState::default()),
        Some(data) => serde_json::from_slice(&data).context("parsing stored state"),
    }
}

pub async fn save_state(storage: &dyn Storage, state: &CollectionState) -> anyhow::Result<()> {
    let data = serde_json::to_vec(state).context("serializing state")?;
    storage.set(STATE_KEY, data).await.context("saving state")
}

pub async fn load_comments(storage: &dyn Storage) -> anyhow::Result<CommentStore> {
    match storage.get(COMMENTS_KEY).await.context("reading comments")? {
        None => Ok(CommentStore::new()),
        Some(data) => serde_json::from_slice(&data).context("parsing stored comments"),
    }
}

pub async fn save_comments(storage: &dyn Storage, comments: &CommentStore) -> anyhow::Result<()> {
    let data = serde_json::to_vec(comments).context("serializing comments")?;
    storage.set(COMMENTS_KEY, data).await.context("saving comments")
}
