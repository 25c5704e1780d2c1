//! Assemble a ready-to-use engine from configuration.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use keyturn_common::cache::CacheConfig;
use keyturn_common::time::{Clock, SystemClock};
use keyturn_core::{
    BlobStore, BlockCipherEncryptor, Encryptor, EncryptorFactory, EngineCache, Key, KeyStore,
    Policy, RotatingEncryptor, StoreKeyFactory,
};
use tracing::info;
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::blob::{FileBlobStore, MemoryBlobStore};
use crate::config::{KeyturnConfig, StorageBackend};
use crate::errors::{InfraError, Result};

/// Wired engine and the components behind it
#[derive(Debug, Clone)]
pub struct Keyturn {
    encryptor: RotatingEncryptor,
    factory: Arc<EncryptorFactory>,
    key_factory: Arc<StoreKeyFactory>,
}

impl Keyturn {
    /// Self-describing encryptor for application data
    pub fn encryptor(&self) -> &RotatingEncryptor {
        &self.encryptor
    }

    /// Engine factory, for retiring keys with cache eviction
    pub fn factory(&self) -> &Arc<EncryptorFactory> {
        &self.factory
    }

    /// Key factory over both stores
    pub fn key_factory(&self) -> &Arc<StoreKeyFactory> {
        &self.key_factory
    }

    /// Store of every issued key
    pub fn decryption_store(&self) -> &KeyStore {
        self.key_factory.decryption_store()
    }

    /// Store of keys still eligible for encryption
    pub fn encryption_store(&self) -> &KeyStore {
        self.key_factory.encryption_store()
    }
}

/// Build the engine, reading the master key from `config.master_key_env`
///
/// # Errors
/// Fails if the configuration is invalid, the master key variable is unset
/// or malformed, or the storage backend cannot be opened.
pub async fn build(config: &KeyturnConfig) -> Result<Keyturn> {
    let name = &config.master_key_env;
    let master_key = std::env::var(name)
        .map(Zeroizing::new)
        .map_err(|_| InfraError::MissingMasterKey(name.clone()))?;
    build_with_master_key(config, &master_key).await
}

/// Build the engine with an explicit hex master key
pub async fn build_with_master_key(
    config: &KeyturnConfig,
    master_key_hex: &str,
) -> Result<Keyturn> {
    build_with_clock(config, master_key_hex, Arc::new(SystemClock)).await
}

/// Build the engine on `clock`
pub async fn build_with_clock(
    config: &KeyturnConfig,
    master_key_hex: &str,
    clock: Arc<dyn Clock>,
) -> Result<Keyturn> {
    config.validate()?;
    let algorithm = config.policy.algorithm()?;

    let at_rest = at_rest_encryptor(config, master_key_hex, Arc::clone(&clock))?;
    let (decryption, encryption) = open_blob_stores(config).await?;

    let template =
        Policy::builder().algorithm(algorithm).key_size(config.policy.key_size).build()?;
    let key_factory = Arc::new(StoreKeyFactory::new(
        template,
        config.policy.key_lifetime,
        KeyStore::new("decryption", decryption, Arc::clone(&at_rest)),
        KeyStore::new("encryption", encryption, at_rest),
        Arc::clone(&clock),
    ));

    let cache_config = CacheConfig::lru(config.cache.max_entries);
    let cache = EngineCache::with_clock(cache_config, Arc::clone(&clock));
    let factory = Arc::new(
        EncryptorFactory::new(key_factory.clone(), Arc::new(cache), clock)
            .with_cache_ttl(config.cache.ttl),
    );

    info!(
        algorithm = %algorithm,
        key_size = config.policy.key_size,
        key_lifetime_secs = config.policy.key_lifetime.as_secs(),
        backend = ?config.storage.backend,
        "keyturn engine ready"
    );

    Ok(Keyturn { encryptor: RotatingEncryptor::new(Arc::clone(&factory)), factory, key_factory })
}

/// Encryptor protecting key records, under a fixed policy that never expires
fn at_rest_encryptor(
    config: &KeyturnConfig,
    master_key_hex: &str,
    clock: Arc<dyn Clock>,
) -> Result<Arc<dyn Encryptor>> {
    let policy = Policy::builder()
        .id(Uuid::nil())
        .algorithm(config.policy.algorithm()?)
        .key_size(config.policy.key_size)
        .expires_at(DateTime::<Utc>::MAX_UTC)
        .build()?;
    let bytes = hex::decode(master_key_hex.trim())?;
    let key = Key::new(policy, bytes)?;
    let engine: Arc<dyn Encryptor> = Arc::new(BlockCipherEncryptor::with_clock(key, clock)?);
    Ok(engine)
}

async fn open_blob_stores(
    config: &KeyturnConfig,
) -> Result<(Arc<dyn BlobStore>, Arc<dyn BlobStore>)> {
    let stores: (Arc<dyn BlobStore>, Arc<dyn BlobStore>) = match config.storage.backend {
        StorageBackend::Memory => {
            (Arc::new(MemoryBlobStore::new()), Arc::new(MemoryBlobStore::new()))
        }
        StorageBackend::Filesystem => (
            Arc::new(FileBlobStore::open(config.storage.decryption_dir()).await?),
            Arc::new(FileBlobStore::open(config.storage.encryption_dir()).await?),
        ),
    };
    Ok(stores)
}
