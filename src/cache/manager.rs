//! Cache manager: typed, failure-tolerant access to a [`CacheStore`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

use super::entry::CacheEntry;
use super::key::CacheKey;
use super::store::CacheStore;

/// Default pause between replayed stream parts.
pub const DEFAULT_CHUNK_DELAY: Duration = Duration::from_millis(10);

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub enabled: bool,
    /// Serialize concurrent unary misses for the same key so upstream is
    /// called once.
    pub single_flight: bool,
    /// Delay before the first replayed stream part.
    pub replay_initial_delay: Duration,
    /// Delay between subsequent replayed stream parts.
    pub replay_chunk_delay: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            single_flight: false,
            replay_initial_delay: Duration::ZERO,
            replay_chunk_delay: DEFAULT_CHUNK_DELAY,
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
    pub fn with_single_flight(mut self, on: bool) -> Self {
        self.single_flight = on;
        self
    }
    pub fn with_replay_delays(mut self, initial: Duration, chunk: Duration) -> Self {
        self.replay_initial_delay = initial;
        self.replay_chunk_delay = chunk;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
    pub errors: u64,
}

impl CacheStats {
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Default)]
struct AtomicStats {
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
    errors: AtomicU64,
}

impl AtomicStats {
    fn to_stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

type Pending = Arc<StdMutex<HashMap<String, CacheEntry>>>;
type Flights = Arc<StdMutex<HashMap<String, Arc<Mutex<()>>>>>;

/// Typed access to a cache store.
///
/// Storage failures never escape: a failed or malformed read is a miss and a
/// failed write is dropped, both logged. Writes run as tracked background
/// tasks; call [`CacheManager::flush`] before shutdown so none are lost.
pub struct CacheManager {
    config: CacheConfig,
    store: Arc<dyn CacheStore>,
    stats: Arc<AtomicStats>,
    // Entries handed to `persist` whose write has not finished yet.
    pending: Pending,
    flights: Flights,
    tasks: TaskTracker,
}

impl CacheManager {
    pub fn new(config: CacheConfig, store: Arc<dyn CacheStore>) -> Self {
        Self {
            config,
            store,
            stats: Arc::new(AtomicStats::default()),
            pending: Arc::new(StdMutex::new(HashMap::new())),
            flights: Arc::new(StdMutex::new(HashMap::new())),
            tasks: TaskTracker::new(),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.to_stats()
    }

    /// Look up `key`. Returns an entry only if it has the shape of
    /// `key.kind()`.
    pub async fn lookup(&self, key: &CacheKey) -> Option<CacheEntry> {
        let pending = lock(&self.pending).get(key.as_str()).cloned();
        if let Some(entry) = pending {
            self.stats.hits.fetch_add(1, Ordering::Relaxed);
            debug!(key = %key, "cache hit (pending write)");
            return Some(entry);
        }

        match self.store.get(key.as_str()).await {
            Ok(Some(value)) => match CacheEntry::decode(value, key.kind()) {
                Ok(entry) => {
                    self.stats.hits.fetch_add(1, Ordering::Relaxed);
                    debug!(key = %key, "cache hit");
                    Some(entry)
                }
                Err(e) => {
                    self.stats.errors.fetch_add(1, Ordering::Relaxed);
                    warn!(key = %key, error = %e, "ignoring malformed cache entry");
                    None
                }
            },
            Ok(None) => {
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key, "cache miss");
                None
            }
            Err(e) => {
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
                warn!(key = %key, store = self.store.name(), error = %e, "cache lookup failed; treating as miss");
                None
            }
        }
    }

    /// Write `entry` in the background. Returns immediately; lookups of
    /// `key` see the entry from now on.
    pub fn persist(&self, key: &CacheKey, entry: CacheEntry) {
        let value = match entry.encode() {
            Ok(v) => v,
            Err(e) => {
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
                warn!(key = %key, error = %e, "could not encode cache entry");
                return;
            }
        };
        lock(&self.pending).insert(key.to_string(), entry);

        let store = self.store.clone();
        let stats = self.stats.clone();
        let pending = self.pending.clone();
        let key = key.to_string();
        self.tasks.spawn(async move {
            write_value(store.as_ref(), &stats, &key, value).await;
            lock(&pending).remove(&key);
        });
    }

    /// Write `entry` and wait for the write to finish.
    pub async fn persist_now(&self, key: &CacheKey, entry: CacheEntry) {
        match entry.encode() {
            Ok(value) => write_value(self.store.as_ref(), &self.stats, key.as_str(), value).await,
            Err(e) => {
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
                warn!(key = %key, error = %e, "could not encode cache entry");
            }
        }
    }

    /// With single-flight enabled, wait until no other call holds `key` and
    /// claim it. Returns `None` when single-flight is off.
    pub async fn claim(&self, key: &CacheKey) -> Option<FlightGuard> {
        if !self.config.single_flight {
            return None;
        }
        let slot = lock(&self.flights)
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = slot.lock_owned().await;
        Some(FlightGuard {
            key: key.to_string(),
            flights: self.flights.clone(),
            guard: Some(guard),
        })
    }

    /// Number of background writes still running.
    pub fn pending_writes(&self) -> usize {
        self.tasks.len()
    }

    /// Wait for every background write started so far.
    pub async fn flush(&self) {
        self.tasks.close();
        self.tasks.wait().await;
        self.tasks.reopen();
    }
}

async fn write_value(
    store: &dyn CacheStore,
    stats: &AtomicStats,
    key: &str,
    value: serde_json::Value,
) {
    match store.set(key, value).await {
        Ok(()) => {
            stats.writes.fetch_add(1, Ordering::Relaxed);
            debug!(key = %key, "cache entry written");
        }
        Err(e) => {
            stats.errors.fetch_add(1, Ordering::Relaxed);
            warn!(key = %key, store = store.name(), error = %e, "cache write failed; entry dropped");
        }
    }
}

fn lock<T>(m: &StdMutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

/// Exclusive claim on one key; released on drop.
pub struct FlightGuard {
    key: String,
    flights: Flights,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        let mut flights = lock(&self.flights);
        // Map + this guard hold the slot; anything more is a waiter.
        if flights
            .get(&self.key)
            .map(|slot| Arc::strong_count(slot) <= 2)
            .unwrap_or(false)
        {
            flights.remove(&self.key);
        }
        self.guard.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::key::CallKind;
    use crate::cache::store::{JsonFileStore, MemoryStore};
    use crate::types::{GenerateResult, PromptMessage};

    fn key(text: &str) -> CacheKey {
        CacheKey::for_call(&[PromptMessage::user(text)], "m", CallKind::Generate)
    }

    #[tokio::test]
    async fn miss_then_hit_after_flush() {
        let store = Arc::new(MemoryStore::new());
        let manager = CacheManager::new(CacheConfig::default(), store.clone());
        let k = key("hello");

        assert!(manager.lookup(&k).await.is_none());
        manager.persist(&k, CacheEntry::Generate(GenerateResult::text("hi")));
        manager.flush().await;

        assert_eq!(store.write_count(), 1);
        assert_eq!(
            manager.lookup(&k).await,
            Some(CacheEntry::Generate(GenerateResult::text("hi")))
        );
        let stats = manager.stats();
        assert_eq!((stats.hits, stats.misses, stats.writes), (1, 1, 1));
        assert_eq!(stats.hit_ratio(), 0.5);
    }

    #[tokio::test]
    async fn pending_entries_are_visible_before_the_write_lands() {
        let store = Arc::new(MemoryStore::new());
        let manager = CacheManager::new(CacheConfig::default(), store);
        let k = key("soon");
        manager.persist(&k, CacheEntry::Generate(GenerateResult::text("x")));
        assert!(manager.lookup(&k).await.is_some());
        manager.flush().await;
        assert_eq!(manager.pending_writes(), 0);
    }

    #[tokio::test]
    async fn wrong_shape_is_a_miss() {
        let store = Arc::new(MemoryStore::new());
        let k = key("shape");
        store
            .set(k.as_str(), serde_json::json!({"kind": "stream", "chunks": []}))
            .await
            .unwrap();
        let manager = CacheManager::new(CacheConfig::default(), store);
        assert!(manager.lookup(&k).await.is_none());
        assert_eq!(manager.stats().errors, 1);
    }

    #[tokio::test]
    async fn storage_failures_degrade_to_miss_and_dropped_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ai-cache.json");
        std::fs::write(&path, "garbage").unwrap();
        let manager = CacheManager::new(CacheConfig::default(), Arc::new(JsonFileStore::new(&path)));
        let k = key("x");

        assert!(manager.lookup(&k).await.is_none());
        manager
            .persist_now(&k, CacheEntry::Generate(GenerateResult::text("y")))
            .await;
        assert_eq!(manager.stats().errors, 2);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "garbage");
    }

    #[tokio::test]
    async fn claim_is_exclusive_per_key() {
        let manager = Arc::new(CacheManager::new(
            CacheConfig::default().with_single_flight(true),
            Arc::new(MemoryStore::new()),
        ));
        let k = key("busy");
        let first = manager.claim(&k).await.unwrap();

        let m2 = manager.clone();
        let k2 = k.clone();
        let waiter = tokio::spawn(async move { m2.claim(&k2).await.is_some() });
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        assert!(manager.claim(&key("other")).await.is_some());
        drop(first);
        assert!(waiter.await.unwrap());
        assert!(lock(&manager.flights).is_empty());
    }

    #[tokio::test]
    async fn claim_is_noop_without_single_flight() {
        let manager = CacheManager::new(CacheConfig::default(), Arc::new(MemoryStore::new()));
        assert!(manager.claim(&key("a")).await.is_none());
    }
}
