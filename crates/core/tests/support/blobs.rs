//! In-memory [`BlobStore`] mock with failure injection.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use keyturn_core::ports::glob_matcher;
use keyturn_core::{BlobStore, StoreError};

type BlobMap = Arc<Mutex<BTreeMap<String, Vec<u8>>>>;

/// In-memory mock for `BlobStore`.
///
/// Clones share contents and failure switches.
#[derive(Clone, Default)]
pub struct MockBlobStore {
    blobs: BlobMap,
    fail_find: Arc<AtomicBool>,
    fail_delete: Arc<AtomicBool>,
    fail_put: Arc<AtomicBool>,
    puts: Arc<AtomicUsize>,
}

impl MockBlobStore {
    pub fn len(&self) -> usize {
        self.blobs.lock().unwrap().len()
    }

    pub fn ids(&self) -> Vec<String> {
        self.blobs.lock().unwrap().keys().cloned().collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.blobs.lock().unwrap().contains_key(id)
    }

    pub fn raw(&self, id: &str) -> Option<Vec<u8>> {
        self.blobs.lock().unwrap().get(id).cloned()
    }

    pub fn insert_raw(&self, id: &str, bytes: &[u8]) {
        self.blobs.lock().unwrap().insert(id.to_string(), bytes.to_vec());
    }

    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    /// Make `find` fail until switched back
    pub fn fail_find(&self, fail: bool) {
        self.fail_find.store(fail, Ordering::SeqCst);
    }

    /// Make `put` fail until switched back
    pub fn fail_put(&self, fail: bool) {
        self.fail_put.store(fail, Ordering::SeqCst);
    }

    /// Make `delete` fail until switched back
    pub fn fail_delete(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl BlobStore for MockBlobStore {
    async fn get(&self, id: &str) -> Result<Vec<u8>, StoreError> {
        self.raw(id).ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn put(&self, id: &str, bytes: &[u8]) -> Result<(), StoreError> {
        if self.fail_put.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("put disabled".into()));
        }
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.insert_raw(id, bytes);
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("delete disabled".into()));
        }
        self.blobs.lock().unwrap().remove(id);
        Ok(())
    }

    async fn find(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        if self.fail_find.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("find disabled".into()));
        }
        let matcher = glob_matcher(pattern)?;
        Ok(self.ids().into_iter().filter(|id| matcher.is_match(id)).collect())
    }
}
