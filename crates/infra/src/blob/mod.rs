//! [`BlobStore`](keyturn_core::BlobStore) implementations.
//!
//! - [`MemoryBlobStore`]: process-local, for tests and ephemeral deployments
//! - [`FileBlobStore`]: one file per blob under a root directory

mod filesystem;
mod memory;

pub use filesystem::FileBlobStore;
pub use memory::MemoryBlobStore;
