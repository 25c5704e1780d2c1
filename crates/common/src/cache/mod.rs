//! Async in-memory cache with per-entry expiry
//!
//! The cache backs the engine cache of the encryptor factory: entries carry
//! their own time-to-live, size is bounded with least-recently-used eviction
//! and time is read through [`crate::time::Clock`] so tests can move it.
//!
//! ```
//! use std::time::Duration;
//!
//! use keyturn_common::cache::{AsyncCache, CacheConfig};
//!
//! # tokio_test::block_on(async {
//! let cache: AsyncCache<String, u32> = AsyncCache::new(CacheConfig::lru(16));
//! cache.insert_with_ttl("Encrypt".to_string(), 7, Duration::from_secs(1800)).await;
//! assert_eq!(cache.get(&"Encrypt".to_string()).await, Some(7));
//! # });
//! ```

mod async_core;
mod config;

pub use async_core::AsyncCache;
pub use config::CacheConfig;
