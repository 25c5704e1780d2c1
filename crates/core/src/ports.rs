//! Port interfaces for the rotating-key engine
//!
//! These traits define the boundaries between the engine and the
//! infrastructure that persists key records and caches engines.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;

use crate::encryptor::BlockCipherEncryptor;
use crate::error::{Result, StoreError};

/// Durable byte store addressed by string ids
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Fetch the blob stored under `id`; `StoreError::NotFound` if absent
    async fn get(&self, id: &str) -> std::result::Result<Vec<u8>, StoreError>;

    /// Store `bytes` under `id`, replacing any existing blob
    async fn put(&self, id: &str, bytes: &[u8]) -> std::result::Result<(), StoreError>;

    /// Delete the blob under `id`; deleting an absent id succeeds
    async fn delete(&self, id: &str) -> std::result::Result<(), StoreError>;

    /// Ids matching a glob `pattern` (`*` any run, `?` one character)
    async fn find(&self, pattern: &str) -> std::result::Result<Vec<String>, StoreError>;
}

/// Time-bounded cache of ready-to-use engines
#[async_trait]
pub trait EncryptorCache: Send + Sync {
    /// Cached engine under `key`, if any and not expired
    async fn get(&self, key: &str) -> Result<Option<Arc<BlockCipherEncryptor>>>;

    /// Cache `value` under `key` for `ttl`
    async fn add(&self, key: &str, value: Arc<BlockCipherEncryptor>, ttl: Duration) -> Result<()>;

    /// Drop the entry under `key`; absent keys are ignored
    async fn remove(&self, key: &str) -> Result<()>;
}

/// Compile a blob-id glob into an anchored regex
pub fn glob_matcher(pattern: &str) -> std::result::Result<Regex, StoreError> {
    let mut expr = String::with_capacity(pattern.len() + 8);
    expr.push('^');
    for ch in pattern.chars() {
        match ch {
            '*' => expr.push_str(".*"),
            '?' => expr.push('.'),
            other => expr.push_str(&regex::escape(other.encode_utf8(&mut [0u8; 4]))),
        }
    }
    expr.push('$');
    Regex::new(&expr).map_err(|e| StoreError::Backend(format!("bad pattern '{pattern}': {e}")))
}
