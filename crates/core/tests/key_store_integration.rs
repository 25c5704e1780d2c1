//! Integration tests for the encrypted-at-rest key store.

mod support;

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use keyturn_core::key_store::blob_id;
use keyturn_core::{BlockCipherEncryptor, EncryptionError, Key, KeyStore, Policy};
use support::{at_rest_encryptor, MockBlobStore};

fn store(blobs: &MockBlobStore) -> KeyStore {
    KeyStore::new("test", Arc::new(blobs.clone()), at_rest_encryptor())
}

/// Validates add then get restores the same key.
///
/// Assertions:
/// - Confirms the blob is stored under the lowercase hyphenated id.
/// - Confirms policy and key bytes survive the round trip.
#[tokio::test]
async fn add_then_get_restores_key() {
    let blobs = MockBlobStore::default();
    let store = store(&blobs);
    let key = Key::generate(Policy::builder().build().unwrap()).unwrap();

    store.add(&key).await.unwrap();
    let id = blob_id(key.id());
    assert!(blobs.contains(&id));
    assert_eq!(id, id.to_lowercase());

    let loaded = store.get(key.id()).await.unwrap();
    assert_eq!(loaded.policy(), key.policy());
    assert_eq!(loaded.expose(), key.expose());
}

/// Validates that blobs never hold the raw key.
///
/// Assertions:
/// - Ensures neither the stored bytes nor their base64 decoding contain the
///   key bytes.
#[tokio::test]
async fn blobs_never_contain_plaintext_key() {
    let blobs = MockBlobStore::default();
    let store = store(&blobs);
    let key = Key::generate(Policy::builder().build().unwrap()).unwrap();
    store.add(&key).await.unwrap();

    let raw = blobs.raw(&blob_id(key.id())).unwrap();
    let decoded = BASE64.decode(&raw).unwrap();
    let secret = key.expose();

    assert!(!raw.windows(secret.len()).any(|w| w == secret));
    assert!(!decoded.windows(secret.len()).any(|w| w == secret));
}

/// Validates lookup misses and idempotent removal.
///
/// Assertions:
/// - Confirms a missing id yields `KeyNotFound`.
/// - Confirms removing twice succeeds both times.
#[tokio::test]
async fn missing_key_and_idempotent_remove() {
    let blobs = MockBlobStore::default();
    let store = store(&blobs);
    let key = Key::generate(Policy::builder().build().unwrap()).unwrap();
    let id = key.id();

    let missing = store.get(id).await;
    assert!(matches!(missing, Err(EncryptionError::KeyNotFound(found)) if found == id));

    store.add(&key).await.unwrap();
    store.remove(id).await.unwrap();
    store.remove(id).await.unwrap();
    assert!(store.is_empty().await.unwrap());
}

/// Validates listing skips foreign blob ids.
///
/// Assertions:
/// - Confirms `get_all` and `len` only count key blobs.
#[tokio::test]
async fn get_all_skips_foreign_ids() {
    let blobs = MockBlobStore::default();
    let store = store(&blobs);
    for _ in 0..3 {
        let key = Key::generate(Policy::builder().key_size(128).build().unwrap()).unwrap();
        store.add(&key).await.unwrap();
    }
    blobs.insert_raw("README", b"not a key");

    assert_eq!(store.get_all().await.unwrap().len(), 3);
    assert_eq!(store.len().await.unwrap(), 3);
    assert_eq!(store.ids().await.unwrap().len(), 3);
}

/// Validates that a different at-rest key cannot read the store.
///
/// Assertions:
/// - Confirms reading with a foreign at-rest encryptor fails with `Cipher`.
/// - Confirms a corrupted blob fails rather than yielding a key.
#[tokio::test]
async fn wrong_at_rest_key_or_corruption_fails() {
    let blobs = MockBlobStore::default();
    let key = Key::generate(Policy::builder().build().unwrap()).unwrap();
    store(&blobs).add(&key).await.unwrap();

    let foreign_key = Key::generate(Policy::builder().build().unwrap()).unwrap();
    let foreign_engine = Arc::new(BlockCipherEncryptor::new(foreign_key).unwrap());
    let foreign = KeyStore::new("foreign", Arc::new(blobs.clone()), foreign_engine);
    assert!(matches!(foreign.get(key.id()).await, Err(EncryptionError::Cipher(_))));

    let id = blob_id(key.id());
    let mut raw = blobs.raw(&id).unwrap();
    raw.truncate(raw.len() / 2);
    blobs.insert_raw(&id, &raw);
    assert!(store(&blobs).get(key.id()).await.is_err());
}
