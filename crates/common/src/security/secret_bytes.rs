//! Byte buffer with automatic memory zeroization
//!
//! Holds raw key material. The buffer is overwritten with zeros on drop, and
//! [`SecretBytes::dispose`] does the same deterministically for call sites
//! that want the wipe to be visible in the code.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

/// Secret byte buffer that zeroes memory on drop
///
/// `Debug` never prints the contents and there is no `PartialEq`.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretBytes {
    inner: Vec<u8>,
}

impl SecretBytes {
    /// Take ownership of `bytes`
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { inner: bytes }
    }

    /// Expose the inner bytes (use with caution)
    ///
    /// The returned slice should not be copied into unmanaged buffers or
    /// logged.
    pub fn expose(&self) -> &[u8] {
        &self.inner
    }

    /// Get length in bytes
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Zero the buffer and release it
    pub fn dispose(mut self) {
        self.inner.zeroize();
    }
}

impl fmt::Debug for SecretBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretBytes([REDACTED; {}])", self.inner.len())
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for security::secret_bytes.
    use super::*;

    /// Validates `SecretBytes::new` behavior for the creation scenario.
    ///
    /// Assertions:
    /// - Confirms `secret.len()` equals `4`.
    /// - Confirms `secret.expose()` equals the input.
    #[test]
    fn test_secret_bytes_creation() {
        let secret = SecretBytes::new(vec![1, 2, 3, 4]);
        assert_eq!(secret.len(), 4);
        assert_eq!(secret.expose(), &[1, 2, 3, 4]);
        assert!(!secret.is_empty());
    }

    /// Validates the debug output redacts contents.
    ///
    /// Assertions:
    /// - Confirms `debug_str` equals `"SecretBytes([REDACTED; 3])"`.
    #[test]
    fn test_secret_bytes_debug_is_redacted() {
        let secret = SecretBytes::new(vec![0xde, 0xad, 0xbe]);
        let debug_str = format!("{:?}", secret);
        assert_eq!(debug_str, "SecretBytes([REDACTED; 3])");
    }

    /// Validates that `zeroize` clears the buffer in place.
    ///
    /// Assertions:
    /// - Ensures `secret.is_empty()` after zeroize.
    #[test]
    fn test_secret_bytes_zeroize_clears() {
        let mut secret = SecretBytes::new(vec![7u8; 32]);
        secret.zeroize();
        assert!(secret.is_empty());
    }

    /// Validates `dispose` consumes without panicking.
    ///
    /// Assertion coverage: ensures the routine completes without panicking.
    #[test]
    fn test_dispose() {
        let secret = SecretBytes::new(vec![9u8; 16]);
        secret.dispose();
    }
}
