//! Shared test helpers for `keyturn-core` integration tests.
//!
//! These helpers provide an in-memory blob store with failure injection and
//! a fully wired engine so scenarios can focus on behaviour.

#![allow(dead_code)]

pub mod blobs;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use keyturn_common::cache::CacheConfig;
use keyturn_common::time::{Clock, MockClock};
use keyturn_core::{
    BlockCipherEncryptor, Encryptor, EncryptorFactory, EngineCache, Key, KeyStore, Policy,
    RotatingEncryptor, StoreKeyFactory,
};

pub use self::blobs::MockBlobStore;

/// Fixed at-rest key so separate engines can read each other's stores
pub const AT_REST_KEY: [u8; 32] = [0x42; 32];

/// Non-expiring at-rest encryptor
pub fn at_rest_encryptor() -> Arc<dyn Encryptor> {
    let far_future: DateTime<Utc> = Utc.with_ymd_and_hms(9999, 1, 1, 0, 0, 0).unwrap();
    let policy = Policy::builder().expires_at(far_future).build().unwrap();
    let key = Key::new(policy, AT_REST_KEY.to_vec()).unwrap();
    Arc::new(BlockCipherEncryptor::new(key).unwrap())
}

/// Backing blob stores shared between engine instances
#[derive(Clone, Default)]
pub struct Backing {
    pub decryption: MockBlobStore,
    pub encryption: MockBlobStore,
}

impl Backing {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decryption_store(&self) -> KeyStore {
        KeyStore::new("decryption", Arc::new(self.decryption.clone()), at_rest_encryptor())
    }

    pub fn encryption_store(&self) -> KeyStore {
        KeyStore::new("encryption", Arc::new(self.encryption.clone()), at_rest_encryptor())
    }
}

/// One engine instance, as a process would assemble it
pub struct Harness {
    pub clock: MockClock,
    pub key_factory: Arc<StoreKeyFactory>,
    pub factory: Arc<EncryptorFactory>,
    pub encryptor: RotatingEncryptor,
}

impl Harness {
    /// Engine over `backing` issuing keys that live for `lifetime`
    pub fn new(backing: &Backing, lifetime: Duration) -> Self {
        Self::with_clock(backing, lifetime, MockClock::new())
    }

    pub fn with_clock(backing: &Backing, lifetime: Duration, clock: MockClock) -> Self {
        Self::assemble(backing, Policy::builder().build().unwrap(), lifetime, clock)
    }

    /// Engine issuing keys shaped like `template`
    pub fn with_template(backing: &Backing, template: Policy, lifetime: Duration) -> Self {
        Self::assemble(backing, template, lifetime, MockClock::new())
    }

    fn assemble(backing: &Backing, template: Policy, lifetime: Duration, clock: MockClock) -> Self {
        let shared_clock: Arc<dyn Clock> = Arc::new(clock.clone());
        let key_factory = Arc::new(StoreKeyFactory::new(
            template,
            lifetime,
            backing.decryption_store(),
            backing.encryption_store(),
            Arc::clone(&shared_clock),
        ));
        let cache = EngineCache::with_clock(CacheConfig::lru(64), Arc::clone(&shared_clock));
        let factory = Arc::new(EncryptorFactory::new(
            key_factory.clone(),
            Arc::new(cache),
            shared_clock,
        ));
        let encryptor = RotatingEncryptor::new(Arc::clone(&factory));
        Self { clock, key_factory, factory, encryptor }
    }
}

/// Install a test subscriber once; output is captured per test
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().with_env_filter("debug").try_init();
}
