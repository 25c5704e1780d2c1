//! # Keyturn Core
//!
//! Rotating-key symmetric encryption engine - no infrastructure dependencies.
//!
//! This crate contains:
//! - [`policy`]: cipher descriptors that double as key identity
//! - [`key`]: secret bytes bound to a policy
//! - [`key_store`]: encrypted-at-rest persistence over a [`ports::BlobStore`]
//! - [`key_factory`]: issuance, rotation and retirement
//! - [`encryptor`]: block-cipher, rotating and factory encryptors
//!
//! ## Architecture Principles
//! - Only depends on `keyturn-common` for shared infrastructure
//! - No filesystem, environment or network access
//! - Persistence and caching via traits in [`ports`]
//!
//! ```
//! use keyturn_core::{BlockCipherEncryptor, Encryptor, Key, Policy};
//!
//! # tokio_test::block_on(async {
//! let key = Key::generate(Policy::builder().build()?)?;
//! let engine = BlockCipherEncryptor::new(key)?;
//! let ciphertext = engine.encrypt(b"bob").await?;
//! assert_eq!(engine.decrypt(&ciphertext).await?.as_slice(), b"bob");
//! # Ok::<(), keyturn_core::EncryptionError>(())
//! # }).unwrap();
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod cache;
pub mod encryptor;
pub mod error;
pub mod key;
pub mod key_factory;
pub mod key_store;
pub mod policy;
pub mod ports;

pub use cache::EngineCache;
pub use encryptor::{
    BlockCipherEncryptor, Encryptor, EncryptorFactory, EncryptorState, RotatingEncryptor,
    SeekableWrite,
};
pub use error::{EncryptionError, Result, StoreError};
pub use key::Key;
pub use key_factory::{KeyFactory, StoreKeyFactory};
pub use key_store::KeyStore;
pub use policy::{Algorithm, CipherMode, Padding, Policy, PolicyBuilder};
pub use ports::{BlobStore, EncryptorCache};
