//! # Keyturn Infrastructure
//!
//! Adapters and wiring for `keyturn-core`.
//!
//! This crate contains:
//! - Blob stores (in-memory, filesystem)
//! - Configuration loading (environment, TOML)
//! - Tracing subscriber setup
//! - A bootstrap that assembles a [`RotatingEncryptor`](keyturn_core::RotatingEncryptor)
//!
//! ## Architecture
//! - Implements ports defined in `keyturn-core`
//! - Contains all "impure" code (filesystem, environment)

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod blob;
pub mod bootstrap;
pub mod config;
pub mod errors;
pub mod observability;

// Re-export commonly used items
pub use blob::{FileBlobStore, MemoryBlobStore};
pub use bootstrap::{build, build_with_clock, build_with_master_key, Keyturn};
pub use config::KeyturnConfig;
pub use errors::{InfraError, Result};
pub use observability::init_tracing;
