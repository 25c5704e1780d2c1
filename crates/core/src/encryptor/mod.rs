//! Byte and stream encryptors.
//!
//! - [`BlockCipherEncryptor`]: one key, one policy; frames output as `iv | ciphertext`
//! - [`RotatingEncryptor`]: prefixes the active policy id so any instance can
//!   pick the right key for decryption
//! - [`EncryptorFactory`]: resolves and caches block-cipher engines

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncWrite};
use zeroize::Zeroizing;

use crate::error::Result;
use crate::policy::Policy;

mod block_cipher;
mod factory;
mod rotating;

pub use block_cipher::{BlockCipherEncryptor, EncryptorState, TAG_LEN};
pub use factory::{EncryptorFactory, DEFAULT_CACHE_TTL, ENCRYPT_CACHE_KEY};
pub use rotating::{RotatingEncryptor, POLICY_ID_LEN};

/// Output sink for stream transforms; must be seekable so it can be rewound
pub trait SeekableWrite: AsyncWrite + AsyncSeek + Send + Unpin {}

impl<T: AsyncWrite + AsyncSeek + Send + Unpin + ?Sized> SeekableWrite for T {}

/// Symmetric encryptor over bytes and streams
#[async_trait]
pub trait Encryptor: Send + Sync {
    /// Encrypt `plaintext`
    async fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>>;

    /// Decrypt `ciphertext`; pass a sub-slice to start at an offset
    async fn decrypt(&self, ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>>;

    /// Encrypt everything read from `input` into `output`
    ///
    /// `output` is left positioned at its start.
    async fn encrypt_stream(
        &self,
        input: &mut (dyn AsyncRead + Send + Unpin),
        output: &mut dyn SeekableWrite,
    ) -> Result<()>;

    /// Decrypt everything read from `input` into `output`
    ///
    /// `output` is left positioned at its start.
    async fn decrypt_stream(
        &self,
        input: &mut (dyn AsyncRead + Send + Unpin),
        output: &mut dyn SeekableWrite,
    ) -> Result<()>;

    /// The single policy this encryptor applies
    fn policy(&self) -> Result<&Policy>;
}

/// Drain `input` into a buffer that is zeroed on drop
pub(crate) async fn read_to_end_zeroizing(
    input: &mut (dyn AsyncRead + Send + Unpin),
) -> Result<Zeroizing<Vec<u8>>> {
    let mut buf = Zeroizing::new(Vec::new());
    input.read_to_end(&mut buf).await?;
    Ok(buf)
}
