//! Secret key bound to a policy.

use std::fmt;

use keyturn_common::security::SecretBytes;
use uuid::Uuid;
use zeroize::Zeroize;

use crate::encryptor::BlockCipherEncryptor;
use crate::error::{EncryptionError, Result};
use crate::policy::Policy;

/// Raw key bytes and the policy that governs them
///
/// The key shares its identifier with its policy. The bytes are zeroed when
/// the key is dropped or [`Key::dispose`]d.
pub struct Key {
    policy: Policy,
    secret: SecretBytes,
}

impl Key {
    /// Reconstruct a key from stored bytes
    ///
    /// Fails with `KeySizeMismatch` when `bytes` is not `key_size / 8` long;
    /// the rejected bytes are zeroed before returning.
    pub fn new(policy: Policy, mut bytes: Vec<u8>) -> Result<Self> {
        let expected = policy.key_len();
        if bytes.len() != expected {
            let actual = bytes.len();
            bytes.zeroize();
            return Err(EncryptionError::KeySizeMismatch { expected, actual });
        }
        Ok(Self { policy, secret: SecretBytes::new(bytes) })
    }

    /// Generate fresh random key bytes sized to `policy`
    pub fn generate(policy: Policy) -> Result<Self> {
        BlockCipherEncryptor::keyless(policy).generate_key()
    }

    /// Identifier (equal to the policy id)
    pub fn id(&self) -> Uuid {
        self.policy.id()
    }

    /// Owning policy
    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Raw key bytes
    pub fn expose(&self) -> &[u8] {
        self.secret.expose()
    }

    /// Zero the key bytes now
    pub fn dispose(self) {
        let Self { secret, .. } = self;
        secret.dispose();
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Key")
            .field("id", &self.id())
            .field("policy", &self.policy)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}
