//! Key-value storage boundary
//!
//! All persistence (batches, preferences, history) is expressed against
//! this narrow async interface. `MemoryStore` backs tests and embedded
//! use; `JsonFileStore` backs the CLI with a single pretty-printed JSON
//! file.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;

/// External blob store abstraction
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Fetch the requested keys; absent keys are simply missing from the map.
    async fn get(&self, keys: &[&str]) -> Result<HashMap<String, Value>>;

    /// Fetch every stored entry.
    async fn get_all(&self) -> Result<HashMap<String, Value>>;

    /// Write (upsert) the given entries.
    async fn set(&self, entries: HashMap<String, Value>) -> Result<()>;

    /// Delete the given keys; deleting an absent key is not an error.
    async fn remove(&self, keys: &[&str]) -> Result<()>;
}

/// Read one key and deserialize it.
pub(crate) async fn read_key<T: DeserializeOwned>(
    kv: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>> {
    let mut map = kv.get(&[key]).await?;
    match map.remove(key) {
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
        None => Ok(None),
    }
}

/// Serialize one value and write it under the key.
pub(crate) async fn write_key<T: Serialize>(
    kv: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<()> {
    let mut entries = HashMap::new();
    entries.insert(key.to_string(), serde_json::to_value(value)?);
    kv.set(entries).await
}

/// In-memory store
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: std::sync::Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Value>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, keys: &[&str]) -> Result<HashMap<String, Value>> {
        let entries = self.lock();
        Ok(keys
            .iter()
            .filter_map(|key| entries.get(*key).map(|v| (key.to_string(), v.clone())))
            .collect())
    }

    async fn get_all(&self) -> Result<HashMap<String, Value>> {
        Ok(self.lock().clone())
    }

    async fn set(&self, new_entries: HashMap<String, Value>) -> Result<()> {
        self.lock().extend(new_entries);
        Ok(())
    }

    async fn remove(&self, keys: &[&str]) -> Result<()> {
        let mut entries = self.lock();
        for key in keys {
            entries.remove(*key);
        }
        Ok(())
    }
}

/// File-backed store persisting all entries as one pretty JSON document.
///
/// A tokio mutex serializes operations, so each read-modify-write call
/// is atomic within the process.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: tokio::sync::Mutex<HashMap<String, Value>>,
}

impl JsonFileStore {
    /// Open (or create) the store at the given path.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create store directory")?;
        }

        let entries = if tokio::fs::try_exists(&path).await? {
            let content = tokio::fs::read_to_string(&path)
                .await
                .context("Failed to read store file")?;
            if content.trim().is_empty() {
                HashMap::new()
            } else {
                serde_json::from_str(&content).context("Failed to parse store file")?
            }
        } else {
            HashMap::new()
        };

        Ok(Self {
            path,
            entries: tokio::sync::Mutex::new(entries),
        })
    }

    async fn persist(&self, entries: &HashMap<String, Value>) -> Result<()> {
        let json = serde_json::to_string_pretty(entries)?;
        tokio::fs::write(&self.path, json)
            .await
            .context("Failed to write store file")?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get(&self, keys: &[&str]) -> Result<HashMap<String, Value>> {
        let entries = self.entries.lock().await;
        Ok(keys
            .iter()
            .filter_map(|key| entries.get(*key).map(|v| (key.to_string(), v.clone())))
            .collect())
    }

    async fn get_all(&self) -> Result<HashMap<String, Value>> {
        Ok(self.entries.lock().await.clone())
    }

    async fn set(&self, new_entries: HashMap<String, Value>) -> Result<()> {
        let mut entries = self.entries.lock().await;
        entries.extend(new_entries);
        self.persist(&entries).await
    }

    async fn remove(&self, keys: &[&str]) -> Result<()> {
        let mut entries = self.entries.lock().await;
        for key in keys {
            entries.remove(*key);
        }
        self.persist(&entries).await
    }
}
