//! Key issuance, rotation and retirement.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use keyturn_common::time::Clock;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::error::Result;
use crate::key::Key;
use crate::key_store::KeyStore;
use crate::policy::Policy;

/// Source of keys for encryption and decryption
#[async_trait]
pub trait KeyFactory: Send + Sync {
    /// An unexpired key for new encryption, issuing one if none exists
    async fn get_encryption_key(&self) -> Result<Key>;

    /// The key with `id`; `KeyNotFound` if it was never issued or was retired
    async fn get_decryption_key(&self, id: Uuid) -> Result<Key>;

    /// Permanently retire `id` so it can no longer encrypt or decrypt
    async fn retire_key(&self, id: Uuid) -> Result<()>;
}

/// [`KeyFactory`] over a decryption store (every issued key) and an
/// encryption store (keys still eligible for new encryption)
pub struct StoreKeyFactory {
    template: Policy,
    lifetime: Duration,
    decryption: KeyStore,
    encryption: KeyStore,
    clock: Arc<dyn Clock>,
    issue_lock: Mutex<()>,
}

impl StoreKeyFactory {
    /// Factory issuing keys shaped like `template` that stay valid for `lifetime`
    pub fn new(
        template: Policy,
        lifetime: Duration,
        decryption: KeyStore,
        encryption: KeyStore,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { template, lifetime, decryption, encryption, clock, issue_lock: Mutex::new(()) }
    }

    /// Store holding every issued key
    pub fn decryption_store(&self) -> &KeyStore {
        &self.decryption
    }

    /// Store holding keys eligible for new encryption
    pub fn encryption_store(&self) -> &KeyStore {
        &self.encryption
    }

    /// Lifetime given to newly issued keys
    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// First unexpired key in the encryption store
    ///
    /// Expired keys seen during the scan are removed from the encryption
    /// store afterwards. A failed read yields `None`.
    async fn scan(&self) -> Option<Key> {
        let keys = match self.encryption.get_all().await {
            Ok(keys) => keys,
            Err(err) => {
                warn!(error = %err, "encryption store scan failed; issuing a new key");
                return None;
            }
        };

        let now = self.clock.utc_now();
        let mut current = None;
        let mut expired = Vec::new();
        for key in keys {
            if key.policy().is_expired_at(now) {
                expired.push(key.id());
                key.dispose();
            } else if current.is_none() {
                current = Some(key);
            } else {
                key.dispose();
            }
        }

        for id in expired {
            match self.encryption.remove(id).await {
                Ok(()) => debug!(key_id = %id, "pruned expired key from encryption store"),
                Err(err) => warn!(key_id = %id, error = %err, "failed to prune expired key"),
            }
        }

        current
    }

    async fn issue(&self) -> Result<Key> {
        let policy = self.template.derive(self.lifetime, self.clock.utc_now())?;
        let key = Key::generate(policy)?;

        self.decryption.add(&key).await?;
        self.encryption.add(&key).await?;

        info!(
            key_id = %key.id(),
            expires_at = %key.policy().expires_at(),
            algorithm = %key.policy().algorithm(),
            "issued encryption key"
        );
        Ok(key)
    }
}

#[async_trait]
impl KeyFactory for StoreKeyFactory {
    #[instrument(skip(self))]
    async fn get_encryption_key(&self) -> Result<Key> {
        if let Some(key) = self.scan().await {
            return Ok(key);
        }

        let _guard = self.issue_lock.lock().await;
        // another caller in this process may have issued while we waited
        if let Some(key) = self.scan().await {
            return Ok(key);
        }
        self.issue().await
    }

    #[instrument(skip(self), fields(key_id = %id))]
    async fn get_decryption_key(&self, id: Uuid) -> Result<Key> {
        self.decryption.get(id).await
    }

    #[instrument(skip(self), fields(key_id = %id))]
    async fn retire_key(&self, id: Uuid) -> Result<()> {
        self.encryption.remove(id).await?;
        self.decryption.remove(id).await?;
        info!("retired key");
        Ok(())
    }
}

impl std::fmt::Debug for StoreKeyFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreKeyFactory")
            .field("template", &self.template)
            .field("lifetime", &self.lifetime)
            .field("decryption", &self.decryption)
            .field("encryption", &self.encryption)
            .finish_non_exhaustive()
    }
}
