//! [`EncryptorCache`] backed by the shared async cache.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use keyturn_common::cache::AsyncCache;

use crate::encryptor::BlockCipherEncryptor;
use crate::error::Result;
use crate::ports::EncryptorCache;

/// In-process engine cache
pub type EngineCache = AsyncCache<String, Arc<BlockCipherEncryptor>>;

#[async_trait]
impl EncryptorCache for EngineCache {
    async fn get(&self, key: &str) -> Result<Option<Arc<BlockCipherEncryptor>>> {
        Ok(AsyncCache::get(self, &key.to_string()).await)
    }

    async fn add(&self, key: &str, value: Arc<BlockCipherEncryptor>, ttl: Duration) -> Result<()> {
        self.insert_with_ttl(key.to_string(), value, ttl).await;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        AsyncCache::remove(self, &key.to_string()).await;
        Ok(())
    }
}
