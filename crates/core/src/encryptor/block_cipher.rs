//! Single-key authenticated cipher engine.

use std::fmt;
use std::io::SeekFrom;
use std::sync::Arc;

use aes::{Aes128, Aes192, Aes256};
use aes_gcm::aead::consts::U16;
use aes_gcm::aead::generic_array::typenum::Unsigned;
use aes_gcm::aead::{Aead, AeadCore, KeyInit, Nonce};
use aes_gcm::AesGcm;
use async_trait::async_trait;
use chacha20poly1305::XChaCha20Poly1305;
use keyturn_common::time::{Clock, SystemClock};
use rand::rngs::OsRng;
use rand::RngCore;
use tokio::io::{AsyncRead, AsyncSeekExt, AsyncWriteExt};
use tracing::debug;
use uuid::Uuid;
use zeroize::Zeroizing;

use super::{read_to_end_zeroizing, Encryptor, SeekableWrite};
use crate::error::{EncryptionError, Result};
use crate::key::Key;
use crate::policy::{Algorithm, Policy};

/// Authentication tag appended by every supported mode
pub const TAG_LEN: usize = 16;

type Aes128Gcm16 = AesGcm<Aes128, U16>;
type Aes192Gcm16 = AesGcm<Aes192, U16>;
type Aes256Gcm16 = AesGcm<Aes256, U16>;

/// Lifecycle of a block-cipher encryptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncryptorState {
    /// Policy not expired; encryption and decryption permitted
    Active,
    /// Policy expired; only decryption permitted
    Expired,
}

/// Initialized cipher; the AES key schedules are wiped on drop
enum CipherEngine {
    Aes128(Aes128Gcm16),
    Aes192(Aes192Gcm16),
    Aes256(Aes256Gcm16),
    XChaCha20(XChaCha20Poly1305),
}

impl CipherEngine {
    fn new(policy: &Policy, key: &[u8]) -> Result<Self> {
        let invalid = |_| EncryptionError::InvalidPolicy(format!("bad key for {policy}"));
        let engine = match (policy.algorithm(), policy.key_size()) {
            (Algorithm::Aes, 128) => {
                Self::Aes128(Aes128Gcm16::new_from_slice(key).map_err(invalid)?)
            }
            (Algorithm::Aes, 192) => {
                Self::Aes192(Aes192Gcm16::new_from_slice(key).map_err(invalid)?)
            }
            (Algorithm::Aes, 256) => {
                Self::Aes256(Aes256Gcm16::new_from_slice(key).map_err(invalid)?)
            }
            (Algorithm::XChaCha20, 256) => {
                Self::XChaCha20(XChaCha20Poly1305::new_from_slice(key).map_err(invalid)?)
            }
            (algorithm, bits) => {
                return Err(EncryptionError::InvalidPolicy(format!(
                    "no engine for {algorithm}-{bits}"
                )))
            }
        };
        Ok(engine)
    }

    fn seal(&self, iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
        match self {
            Self::Aes128(c) => seal_with(c, iv, plaintext),
            Self::Aes192(c) => seal_with(c, iv, plaintext),
            Self::Aes256(c) => seal_with(c, iv, plaintext),
            Self::XChaCha20(c) => seal_with(c, iv, plaintext),
        }
    }

    fn open(&self, iv: &[u8], ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        match self {
            Self::Aes128(c) => open_with(c, iv, ciphertext),
            Self::Aes192(c) => open_with(c, iv, ciphertext),
            Self::Aes256(c) => open_with(c, iv, ciphertext),
            Self::XChaCha20(c) => open_with(c, iv, ciphertext),
        }
    }
}

fn nonce<C: AeadCore>(iv: &[u8]) -> Result<&Nonce<C>> {
    if iv.len() == C::NonceSize::USIZE {
        Ok(Nonce::<C>::from_slice(iv))
    } else {
        Err(EncryptionError::MalformedCiphertext(format!("iv of {} bytes", iv.len())))
    }
}

fn seal_with<C: Aead>(cipher: &C, iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    cipher
        .encrypt(nonce::<C>(iv)?, plaintext)
        .map_err(|_| EncryptionError::Cipher("encryption failed".to_string()))
}

fn open_with<C: Aead>(cipher: &C, iv: &[u8], ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    cipher.decrypt(nonce::<C>(iv)?, ciphertext).map(Zeroizing::new).map_err(|_| {
        EncryptionError::Cipher("authentication failed; wrong key or tampered data".to_string())
    })
}

/// Encryptor bound to one key and policy
///
/// Output is `iv | ciphertext | tag`, with a fresh random IV per call.
/// Encryption is refused once the policy expires; decryption never is.
pub struct BlockCipherEncryptor {
    policy: Policy,
    key: Option<Key>,
    engine: Option<CipherEngine>,
    clock: Arc<dyn Clock>,
}

impl BlockCipherEncryptor {
    /// Engine for `key` on the system clock
    pub fn new(key: Key) -> Result<Self> {
        Self::with_clock(key, Arc::new(SystemClock))
    }

    /// Engine for `key` reading expiry against `clock`
    pub fn with_clock(key: Key, clock: Arc<dyn Clock>) -> Result<Self> {
        let engine = CipherEngine::new(key.policy(), key.expose())?;
        Ok(Self { policy: key.policy().clone(), key: Some(key), engine: Some(engine), clock })
    }

    /// Key-less instance that can only [`generate_key`](Self::generate_key)
    pub fn keyless(policy: Policy) -> Self {
        Self { policy, key: None, engine: None, clock: Arc::new(SystemClock) }
    }

    /// Fresh random key for this instance's policy
    pub fn generate_key(&self) -> Result<Key> {
        let mut bytes = vec![0u8; self.policy.key_len()];
        OsRng.fill_bytes(&mut bytes);
        Key::new(self.policy.clone(), bytes)
    }

    /// Id of the key (and policy) this engine applies
    pub fn key_id(&self) -> Uuid {
        self.policy.id()
    }

    /// Current lifecycle state
    pub fn state(&self) -> EncryptorState {
        if self.policy.is_expired_at(self.clock.utc_now()) {
            EncryptorState::Expired
        } else {
            EncryptorState::Active
        }
    }

    /// Whether this engine holds a key
    pub fn has_key(&self) -> bool {
        self.key.is_some()
    }

    fn engine(&self) -> Result<&CipherEngine> {
        self.engine.as_ref().ok_or(EncryptionError::UnsupportedOperation(
            "key-less encryptor cannot transform data",
        ))
    }

    fn seal(&self, plaintext: &[u8]) -> Result<(Vec<u8>, Vec<u8>)> {
        let engine = self.engine()?;
        if self.state() == EncryptorState::Expired {
            return Err(EncryptionError::PolicyExpired { policy_id: self.policy.id() });
        }

        let mut iv = vec![0u8; self.policy.iv_len()];
        OsRng.fill_bytes(&mut iv);
        let body = engine.seal(&iv, plaintext)?;
        Ok((iv, body))
    }

    fn open(&self, ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        let engine = self.engine()?;
        let iv_len = self.policy.iv_len();
        if ciphertext.len() < iv_len + TAG_LEN {
            return Err(EncryptionError::MalformedCiphertext(format!(
                "{} bytes is shorter than iv and tag ({})",
                ciphertext.len(),
                iv_len + TAG_LEN
            )));
        }
        let (iv, body) = ciphertext.split_at(iv_len);
        engine.open(iv, body)
    }
}

#[async_trait]
impl Encryptor for BlockCipherEncryptor {
    async fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let (mut out, body) = self.seal(plaintext)?;
        out.extend_from_slice(&body);
        Ok(out)
    }

    async fn decrypt(&self, ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        self.open(ciphertext)
    }

    async fn encrypt_stream(
        &self,
        input: &mut (dyn AsyncRead + Send + Unpin),
        output: &mut dyn SeekableWrite,
    ) -> Result<()> {
        self.engine()?;
        let plaintext = read_to_end_zeroizing(input).await?;
        let (iv, body) = self.seal(&plaintext)?;

        output.write_all(&iv).await?;
        output.write_all(&body).await?;
        output.flush().await?;
        output.seek(SeekFrom::Start(0)).await?;
        debug!(key_id = %self.key_id(), bytes = plaintext.len(), "encrypted stream");
        Ok(())
    }

    async fn decrypt_stream(
        &self,
        input: &mut (dyn AsyncRead + Send + Unpin),
        output: &mut dyn SeekableWrite,
    ) -> Result<()> {
        self.engine()?;
        let ciphertext = read_to_end_zeroizing(input).await?;
        let plaintext = self.open(&ciphertext)?;

        output.write_all(&plaintext).await?;
        output.flush().await?;
        output.seek(SeekFrom::Start(0)).await?;
        debug!(key_id = %self.key_id(), bytes = plaintext.len(), "decrypted stream");
        Ok(())
    }

    fn policy(&self) -> Result<&Policy> {
        Ok(&self.policy)
    }
}

impl fmt::Debug for BlockCipherEncryptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockCipherEncryptor")
            .field("policy", &self.policy)
            .field("key", &self.key.as_ref().map(|_| "[REDACTED]"))
            .field("state", &self.state())
            .finish()
    }
}
