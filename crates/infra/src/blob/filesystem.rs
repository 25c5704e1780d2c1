//! Filesystem blob store: one file per id under a root directory.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use keyturn_core::ports::glob_matcher;
use keyturn_core::{BlobStore, StoreError};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// Longest id accepted as a file name
const MAX_ID_LEN: usize = 128;

/// Blob store writing each blob to `<root>/<id>`
///
/// Writes go to a hidden temporary file that is renamed over the target,
/// so readers never observe a partial blob. Ids are limited to ASCII
/// alphanumerics, `-` and `_`.
#[derive(Debug, Clone)]
pub struct FileBlobStore {
    root: PathBuf,
}

impl FileBlobStore {
    /// Store rooted at `root`, creating the directory if needed
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        debug!(root = %root.display(), "opened filesystem blob store");
        Ok(Self { root })
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, id: &str) -> Result<PathBuf, StoreError> {
        validate_id(id)?;
        Ok(self.root.join(id))
    }
}

fn validate_id(id: &str) -> Result<(), StoreError> {
    let valid = !id.is_empty()
        && id.len() <= MAX_ID_LEN
        && id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidId(id.to_string()))
    }
}

#[async_trait]
impl BlobStore for FileBlobStore {
    async fn get(&self, id: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.path_for(id)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == ErrorKind::NotFound => Err(StoreError::NotFound(id.into())),
            Err(err) => Err(err.into()),
        }
    }

    #[instrument(skip(self, bytes), fields(root = %self.root.display(), len = bytes.len()))]
    async fn put(&self, id: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let path = self.path_for(id)?;
        let temp = self.root.join(format!(".{id}.{}.tmp", Uuid::new_v4().simple()));

        let written = async {
            let mut file = fs::File::create(&temp).await?;
            file.write_all(bytes).await?;
            file.sync_all().await?;
            fs::rename(&temp, &path).await
        }
        .await;

        if let Err(err) = written {
            if let Err(cleanup) = fs::remove_file(&temp).await {
                if cleanup.kind() != ErrorKind::NotFound {
                    warn!(temp = %temp.display(), error = %cleanup, "failed to remove temp blob");
                }
            }
            return Err(err.into());
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let path = self.path_for(id)?;
        match fs::remove_file(&path).await {
            Err(err) if err.kind() != ErrorKind::NotFound => Err(err.into()),
            _ => Ok(()),
        }
    }

    async fn find(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        let matcher = glob_matcher(pattern)?;
        let mut entries = fs::read_dir(&self.root).await?;
        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            // temp files and foreign names never parse as ids
            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            if validate_id(&name).is_ok() && matcher.is_match(&name) {
                ids.push(name);
            }
        }
        ids.sort();
        Ok(ids)
    }
}
