//! Cache stores: where entries live between runs.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::{Error, Result};

/// Default location of the cache file, relative to the working directory.
pub const DEFAULT_CACHE_FILE: &str = ".cache/ai-cache.json";

/// Key → JSON value mapping with whole-value get/set semantics.
///
/// Stores report failures; [`super::CacheManager`] is what turns them into
/// cache misses.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Make sure the backing storage exists. Idempotent.
    async fn ensure_ready(&self) -> Result<()>;
    /// `Ok(None)` for an absent key. Never creates an entry.
    async fn get(&self, key: &str) -> Result<Option<Value>>;
    /// Insert or overwrite `key`.
    async fn set(&self, key: &str, value: Value) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<bool>;
    async fn keys(&self) -> Result<Vec<String>>;
    async fn len(&self) -> Result<usize> {
        Ok(self.keys().await?.len())
    }
    async fn clear(&self) -> Result<()>;
    fn name(&self) -> &'static str;
}

/// All entries in one pretty-printed JSON object on disk.
///
/// Every lookup reads the whole file and every write rewrites it. Writes
/// from this process are serialized per path (across every instance opened
/// on that path) and land through a unique temp file + rename, so readers
/// never observe a half-written file. Separate processes sharing the file
/// can still lose each other's updates (last writer wins).
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

static FILE_STORES: Lazy<std::sync::Mutex<HashMap<PathBuf, Arc<JsonFileStore>>>> =
    Lazy::new(|| std::sync::Mutex::new(HashMap::new()));

// One write lock per path, shared by every store instance opened on it.
static WRITE_LOCKS: Lazy<std::sync::Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> =
    Lazy::new(|| std::sync::Mutex::new(HashMap::new()));

fn write_lock_for(path: &Path) -> Arc<Mutex<()>> {
    let mut locks = WRITE_LOCKS.lock().unwrap_or_else(|e| e.into_inner());
    locks
        .entry(path.to_path_buf())
        .or_insert_with(|| Arc::new(Mutex::new(())))
        .clone()
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            write_lock: write_lock_for(&path),
            path,
        }
    }

    /// Process-wide store for `path`. All callers asking for the same path
    /// share one instance and therefore one write lock.
    pub fn shared(path: impl AsRef<Path>) -> Arc<JsonFileStore> {
        let path = path.as_ref().to_path_buf();
        let mut stores = FILE_STORES.lock().unwrap_or_else(|e| e.into_inner());
        stores
            .entry(path.clone())
            .or_insert_with(|| Arc::new(JsonFileStore::new(path)))
            .clone()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The whole mapping, read and parsed once.
    pub async fn snapshot(&self) -> Result<Map<String, Value>> {
        self.read_map().await
    }

    fn unavailable(&self, source: std::io::Error) -> Error {
        Error::StorageUnavailable {
            path: self.path.clone(),
            source,
        }
    }

    async fn read_map(&self) -> Result<Map<String, Value>> {
        self.ensure_ready().await?;
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| self.unavailable(e))?;
        // An interrupted initialization can leave an empty file behind.
        if raw.trim().is_empty() {
            return Ok(Map::new());
        }
        serde_json::from_str(&raw).map_err(|source| Error::CorruptCacheFile {
            path: self.path.clone(),
            source,
        })
    }

    /// Replace the file with `map`. Each write goes through its own
    /// uniquely named temp file in the target directory, then an atomic
    /// rename over the cache file.
    async fn write_map(&self, map: &Map<String, Value>) -> Result<()> {
        let body = serde_json::to_string_pretty(map)?;
        let path = self.path.clone();
        let dir = path
            .parent()
            .filter(|d| !d.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let prefix = format!(
            ".{}-",
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "cache".to_string())
        );

        tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            use std::io::Write;
            let mut tmp = tempfile::Builder::new()
                .prefix(&prefix)
                .suffix(".tmp")
                .tempfile_in(&dir)?;
            tmp.write_all(body.as_bytes())?;
            tmp.flush()?;
            tmp.persist(&path).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .map_err(|e| self.unavailable(std::io::Error::other(e)))?
        .map_err(|e| self.unavailable(e))
    }

    async fn modify<T>(&self, f: impl FnOnce(&mut Map<String, Value>) -> T) -> Result<T> {
        let _guard = self.write_lock.lock().await;
        let mut map = self.read_map().await?;
        let out = f(&mut map);
        self.write_map(&map).await?;
        Ok(out)
    }
}

#[async_trait]
impl CacheStore for JsonFileStore {
    async fn ensure_ready(&self) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| self.unavailable(e))?;
        }
        match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
            .await
        {
            Ok(mut file) => {
                file.write_all(b"{}").await.map_err(|e| self.unavailable(e))?;
                file.flush().await.map_err(|e| self.unavailable(e))?;
                debug!(path = %self.path.display(), "created cache file");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(()),
            Err(e) => Err(self.unavailable(e)),
        }
    }

    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.read_map().await?.remove(key))
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        self.modify(|map| {
            map.insert(key.to_string(), value);
        })
        .await
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        self.modify(|map| map.remove(key).is_some()).await
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Ok(self.read_map().await?.keys().cloned().collect())
    }

    async fn clear(&self) -> Result<()> {
        self.modify(|map| map.clear()).await
    }

    fn name(&self) -> &'static str {
        "json-file"
    }
}

/// In-process store, mainly for tests. Counts writes.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Value>>,
    writes: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `set` calls served so far.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn ensure_ready(&self) -> Result<()> {
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        self.entries.write().await.insert(key.to_string(), value);
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        Ok(self.entries.write().await.remove(key).is_some())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let mut keys: Vec<String> = self.entries.read().await.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    async fn clear(&self) -> Result<()> {
        self.entries.write().await.clear();
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
