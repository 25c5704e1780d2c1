//! In-memory blob store.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use keyturn_core::ports::glob_matcher;
use keyturn_core::{BlobStore, StoreError};
use parking_lot::RwLock;

/// Blob store held in process memory
///
/// Clones share the same contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStore {
    blobs: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryBlobStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blobs
    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.blobs.read().is_empty()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn get(&self, id: &str) -> Result<Vec<u8>, StoreError> {
        self.blobs.read().get(id).cloned().ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn put(&self, id: &str, bytes: &[u8]) -> Result<(), StoreError> {
        self.blobs.write().insert(id.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.blobs.write().remove(id);
        Ok(())
    }

    async fn find(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        let matcher = glob_matcher(pattern)?;
        let mut ids: Vec<String> =
            self.blobs.read().keys().filter(|id| matcher.is_match(id)).cloned().collect();
        ids.sort();
        Ok(ids)
    }
}
