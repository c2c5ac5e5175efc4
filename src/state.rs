use crate::{Result, SignInError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::{Mutex, RwLock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StateKey {
    #[serde(rename = "lastSignTime")]
    LastSignTime,
    #[serde(rename = "lastCheckTime")]
    LastCheckTime,
}

impl StateKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            StateKey::LastSignTime => "lastSignTime",
            StateKey::LastCheckTime => "lastCheckTime",
        }
    }
}

impl std::fmt::Display for StateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timestamps {
    pub last_sign_time: i64,
    pub last_check_time: i64,
}

/// Durable key-value substrate for the two coordinator timestamps.
/// Missing keys read as 0.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn get(&self, key: StateKey) -> Result<i64>;
    async fn set(&self, key: StateKey, value: i64) -> Result<()>;

    async fn timestamps(&self) -> Result<Timestamps> {
        Ok(Timestamps {
            last_sign_time: self.get(StateKey::LastSignTime).await?,
            last_check_time: self.get(StateKey::LastCheckTime).await?,
        })
    }
}

/// JSON file store, `{"lastSignTime": .., "lastCheckTime": ..}`.
pub struct FileStateStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStateStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    pub fn default_path() -> Result<PathBuf> {
        Ok(crate::config::default_config_dir()?.join("state.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_map(&self) -> Result<HashMap<StateKey, i64>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) if content.trim().is_empty() => Ok(HashMap::new()),
            Ok(content) => serde_json::from_str(&content).map_err(|e| {
                SignInError::StorageError(format!("{}: {}", self.path.display(), e))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_map(&self, map: &HashMap<StateKey, i64>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(map)?).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn get(&self, key: StateKey) -> Result<i64> {
        let _guard = self.lock.lock().await;
        Ok(self.read_map().await?.get(&key).copied().unwrap_or(0))
    }

    async fn set(&self, key: StateKey, value: i64) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut map = self.read_map().await?;
        map.insert(key, value);
        self.write_map(&map).await
    }
}

#[derive(Debug, Default)]
pub struct MemoryStateStore {
    values: RwLock<HashMap<StateKey, i64>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timestamps(timestamps: Timestamps) -> Self {
        let mut values = HashMap::new();
        values.insert(StateKey::LastSignTime, timestamps.last_sign_time);
        values.insert(StateKey::LastCheckTime, timestamps.last_check_time);
        Self {
            values: RwLock::new(values),
        }
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn get(&self, key: StateKey) -> Result<i64> {
        Ok(self.values.read().await.get(&key).copied().unwrap_or(0))
    }

    async fn set(&self, key: StateKey, value: i64) -> Result<()> {
        self.values.write().await.insert(key, value);
        Ok(())
    }
}
