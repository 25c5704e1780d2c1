//! Cache configuration

/// Configuration for cache behavior
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of entries (None = unlimited)
    ///
    /// Reaching the bound evicts the least recently read entry.
    pub max_size: Option<usize>,
}

impl CacheConfig {
    /// Bounded LRU cache
    pub fn lru(max_size: usize) -> Self {
        Self { max_size: Some(max_size) }
    }
}
