//! Resolves keys into cached block-cipher engines.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use keyturn_common::time::Clock;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::{BlockCipherEncryptor, EncryptorState};
use crate::error::Result;
use crate::key_factory::KeyFactory;
use crate::ports::EncryptorCache;

/// Cache slot of the current encryption engine
pub const ENCRYPT_CACHE_KEY: &str = "Encrypt";

/// Lifetime of cached engines
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(30 * 60);

fn decrypt_cache_key(id: Uuid) -> String {
    format!("Decrypt/{id}")
}

/// Produces ready-to-use engines for encryption and decryption
///
/// Engines are cached for a fixed TTL independent of key expiration. Cache
/// failures never fail a call: read errors count as misses and write
/// errors are logged.
pub struct EncryptorFactory {
    key_factory: Arc<dyn KeyFactory>,
    cache: Arc<dyn EncryptorCache>,
    cache_ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl EncryptorFactory {
    /// Factory with the default 30 minute cache TTL
    pub fn new(
        key_factory: Arc<dyn KeyFactory>,
        cache: Arc<dyn EncryptorCache>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { key_factory, cache, cache_ttl: DEFAULT_CACHE_TTL, clock }
    }

    /// Override the cache TTL
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Configured cache TTL
    pub fn cache_ttl(&self) -> Duration {
        self.cache_ttl
    }

    /// Underlying key factory
    pub fn key_factory(&self) -> &Arc<dyn KeyFactory> {
        &self.key_factory
    }

    /// Engine whose policy currently permits encryption
    #[instrument(skip(self))]
    pub async fn get_valid_for_encryption(&self) -> Result<Arc<BlockCipherEncryptor>> {
        if let Some(engine) = self.cached(ENCRYPT_CACHE_KEY).await {
            if engine.state() == EncryptorState::Active {
                debug!(key_id = %engine.key_id(), "encryption engine cache hit");
                return Ok(engine);
            }
            debug!(key_id = %engine.key_id(), "cached encryption engine expired");
            self.evict(ENCRYPT_CACHE_KEY).await;
        }

        let key = self.key_factory.get_encryption_key().await?;
        let engine = Arc::new(BlockCipherEncryptor::with_clock(key, Arc::clone(&self.clock))?);
        self.store(ENCRYPT_CACHE_KEY, Arc::clone(&engine)).await;
        Ok(engine)
    }

    /// Engine for the key with `id`, expired or not
    #[instrument(skip(self), fields(key_id = %id))]
    pub async fn get_valid_for_decryption(&self, id: Uuid) -> Result<Arc<BlockCipherEncryptor>> {
        let cache_key = decrypt_cache_key(id);
        if let Some(engine) = self.cached(&cache_key).await {
            debug!("decryption engine cache hit");
            return Ok(engine);
        }

        let key = self.key_factory.get_decryption_key(id).await?;
        let engine = Arc::new(BlockCipherEncryptor::with_clock(key, Arc::clone(&self.clock))?);
        self.store(&cache_key, Arc::clone(&engine)).await;
        Ok(engine)
    }

    /// Drop the cached encryption engine so the next call re-resolves it
    pub async fn invalidate_encryption(&self) {
        self.evict(ENCRYPT_CACHE_KEY).await;
    }

    /// Retire `id` through the key factory and drop its cached engines
    #[instrument(skip(self), fields(key_id = %id))]
    pub async fn retire_key(&self, id: Uuid) -> Result<()> {
        self.key_factory.retire_key(id).await?;
        self.evict(&decrypt_cache_key(id)).await;
        if let Some(engine) = self.cached(ENCRYPT_CACHE_KEY).await {
            if engine.key_id() == id {
                self.evict(ENCRYPT_CACHE_KEY).await;
            }
        }
        Ok(())
    }

    async fn cached(&self, cache_key: &str) -> Option<Arc<BlockCipherEncryptor>> {
        match self.cache.get(cache_key).await {
            Ok(hit) => {
                if hit.is_none() {
                    debug!(cache_key, "engine cache miss");
                }
                hit
            }
            Err(err) => {
                warn!(cache_key, error = %err, "engine cache read failed; treating as miss");
                None
            }
        }
    }

    async fn store(&self, cache_key: &str, engine: Arc<BlockCipherEncryptor>) {
        if let Err(err) = self.cache.add(cache_key, engine, self.cache_ttl).await {
            warn!(cache_key, error = %err, "engine cache write failed");
        }
    }

    async fn evict(&self, cache_key: &str) {
        if let Err(err) = self.cache.remove(cache_key).await {
            warn!(cache_key, error = %err, "engine cache eviction failed");
        }
    }
}

impl fmt::Debug for EncryptorFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptorFactory")
            .field("cache_ttl", &self.cache_ttl)
            .finish_non_exhaustive()
    }
}
