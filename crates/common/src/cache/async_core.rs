//! Async cache with per-entry time-to-live.
//!
//! Uses `tokio::sync::RwLock` for concurrent access in async contexts. Each
//! entry stores its own deadline so callers can mix lifetimes in one cache.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use super::config::CacheConfig;
use crate::time::{Clock, SystemClock};

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Option<Instant>,
    last_accessed: Instant,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| now >= deadline)
    }
}

/// Async LRU cache with per-entry TTL.
///
/// Clones share the same storage. When `max_size` is set the cache never
/// holds more entries than that: expired entries are purged first, then the
/// least recently read entry is evicted.
///
/// ```
/// use std::time::Duration;
///
/// use keyturn_common::cache::{AsyncCache, CacheConfig};
///
/// # tokio_test::block_on(async {
/// let cache: AsyncCache<String, i32> = AsyncCache::new(CacheConfig::lru(100));
/// cache.insert_with_ttl("key".to_string(), 42, Duration::from_secs(60)).await;
/// assert_eq!(cache.get(&"key".to_string()).await, Some(42));
/// # });
/// ```
pub struct AsyncCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    storage: Arc<RwLock<HashMap<K, CacheEntry<V>>>>,
    config: CacheConfig,
    clock: Arc<dyn Clock>,
}

impl<K, V> AsyncCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Creates a new async cache on the system clock.
    pub fn new(config: CacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates a new async cache reading time from `clock`.
    pub fn with_clock(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self { storage: Arc::new(RwLock::new(HashMap::new())), config, clock }
    }

    /// Inserts an entry that expires `ttl` after now.
    ///
    /// A zero `ttl` stores an entry that is already expired and will never
    /// be returned.
    pub async fn insert_with_ttl(&self, key: K, value: V, ttl: Duration) {
        let now = self.clock.now();
        let mut storage = self.storage.write().await;

        if let Some(max_size) = self.config.max_size {
            if storage.len() >= max_size && !storage.contains_key(&key) {
                storage.retain(|_, entry| !entry.is_expired(now));
                while storage.len() >= max_size {
                    if !Self::evict_lru(&mut storage) {
                        break;
                    }
                }
            }
        }

        let entry = CacheEntry { value, expires_at: now.checked_add(ttl), last_accessed: now };
        storage.insert(key, entry);
    }

    /// Retrieves a live value by key.
    ///
    /// An expired entry is removed and reported as a miss.
    pub async fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.now();
        let mut storage = self.storage.write().await;

        if storage.get(key)?.is_expired(now) {
            storage.remove(key);
            return None;
        }

        let entry = storage.get_mut(key)?;
        entry.last_accessed = now;
        Some(entry.value.clone())
    }

    /// Removes and returns a value. Removing an absent key is a no-op.
    pub async fn remove(&self, key: &K) -> Option<V> {
        let mut storage = self.storage.write().await;
        storage.remove(key).map(|entry| entry.value)
    }

    /// Returns the number of stored entries, expired ones included.
    pub async fn len(&self) -> usize {
        self.storage.read().await.len()
    }

    /// Returns `true` if the cache is empty.
    pub async fn is_empty(&self) -> bool {
        self.storage.read().await.is_empty()
    }

    fn evict_lru(storage: &mut HashMap<K, CacheEntry<V>>) -> bool {
        let victim = storage
            .iter()
            .min_by_key(|(_, entry)| entry.last_accessed)
            .map(|(k, _)| k.clone());

        match victim {
            Some(key) => {
                storage.remove(&key);
                tracing::trace!("evicted least recently used cache entry");
                true
            }
            None => false,
        }
    }
}

impl<K, V> Clone for AsyncCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            config: self.config.clone(),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<K, V> std::fmt::Debug for AsyncCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncCache").field("config", &self.config).finish_non_exhaustive()
    }
}
