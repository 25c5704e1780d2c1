//! Security primitives for handling key material
//!
//! - [`SecretBytes`]: owned byte buffer wiped on drop and on explicit dispose

pub mod secret_bytes;

pub use secret_bytes::SecretBytes;
