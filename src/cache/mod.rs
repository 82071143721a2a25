//! # Response Cache Module
//!
//! Deterministic record/replay cache for model calls. A call is addressed by
//! its normalized prompt, model and call kind; the first call records the
//! response, later identical calls replay it without touching the provider.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`CacheKey`] | Content-addressed key derived from a normalized request |
//! | [`normalize`] | Scrubs tool-call ids and tool outputs from a prompt |
//! | [`CacheEntry`] | Tagged unary / streaming payload |
//! | [`CacheStore`] | Storage trait: `ensure_ready` / `get` / `set` |
//! | [`JsonFileStore`] | One pretty-printed JSON file on disk |
//! | [`MemoryStore`] | In-process store for tests |
//! | [`CacheManager`] | Failure-tolerant typed access, background writes, stats |
//!
//! ## Example
//!
//! ```rust,no_run
//! use canvas_lm_cache::cache::{CacheConfig, CacheManager, JsonFileStore};
//!
//! let store = JsonFileStore::shared(".cache/ai-cache.json");
//! let manager = CacheManager::new(CacheConfig::default(), store);
//! assert!(manager.is_enabled());
//! ```
//!
//! The cache is a development aid: entries never expire and a failing store
//! only ever costs a cache miss.

mod entry;
mod key;
mod manager;
mod store;

pub use entry::{CacheEntry, StreamEntry};
pub use key::{canonical_json, normalize, serialize, CacheKey, CallKind, SCRUBBED_CALL_ID};
pub use manager::{CacheConfig, CacheManager, CacheStats, FlightGuard, DEFAULT_CHUNK_DELAY};
pub use store::{CacheStore, JsonFileStore, MemoryStore, DEFAULT_CACHE_FILE};
