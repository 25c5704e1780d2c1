//! Self-describing encryptor spanning every key rotation.

use std::fmt;
use std::io::SeekFrom;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tracing::instrument;
use uuid::Uuid;
use zeroize::Zeroizing;

use super::{read_to_end_zeroizing, Encryptor, EncryptorFactory, SeekableWrite};
use crate::error::{EncryptionError, Result};
use crate::policy::Policy;

/// Bytes of policy id heading every ciphertext
pub const POLICY_ID_LEN: usize = 16;

/// Encryptor that prefixes each ciphertext with the policy id it used
///
/// Framing is `policy_id[16] | iv | ciphertext | tag`. Decryption reads the
/// id and resolves the matching key, so data stays readable after any
/// number of rotations.
#[derive(Clone)]
pub struct RotatingEncryptor {
    factory: Arc<EncryptorFactory>,
}

impl RotatingEncryptor {
    /// Encryptor resolving engines through `factory`
    pub fn new(factory: Arc<EncryptorFactory>) -> Self {
        Self { factory }
    }

    /// Underlying encryptor factory
    pub fn factory(&self) -> &Arc<EncryptorFactory> {
        &self.factory
    }

    /// Policy id a ciphertext was produced under
    pub fn policy_id_of(ciphertext: &[u8]) -> Result<Uuid> {
        let head = ciphertext.get(..POLICY_ID_LEN).ok_or_else(|| {
            EncryptionError::MalformedCiphertext(format!(
                "{} bytes is shorter than the policy id",
                ciphertext.len()
            ))
        })?;
        Uuid::from_slice(head).map_err(|e| EncryptionError::MalformedCiphertext(e.to_string()))
    }
}

#[async_trait]
impl Encryptor for RotatingEncryptor {
    #[instrument(skip_all, fields(bytes = plaintext.len()))]
    async fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let mut engine = self.factory.get_valid_for_encryption().await?;
        let first = engine.encrypt(plaintext).await;
        // the engine can expire between resolution and use; re-resolve once
        let body = match first {
            Err(EncryptionError::PolicyExpired { .. }) => {
                self.factory.invalidate_encryption().await;
                engine = self.factory.get_valid_for_encryption().await?;
                engine.encrypt(plaintext).await?
            }
            other => other?,
        };

        let mut out = Vec::with_capacity(POLICY_ID_LEN + body.len());
        out.extend_from_slice(engine.key_id().as_bytes());
        out.extend_from_slice(&body);
        Ok(out)
    }

    #[instrument(skip_all, fields(bytes = ciphertext.len()))]
    async fn decrypt(&self, ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        let id = Self::policy_id_of(ciphertext)?;
        let engine = self.factory.get_valid_for_decryption(id).await?;
        engine.decrypt(&ciphertext[POLICY_ID_LEN..]).await
    }

    async fn encrypt_stream(
        &self,
        input: &mut (dyn AsyncRead + Send + Unpin),
        output: &mut dyn SeekableWrite,
    ) -> Result<()> {
        // nothing reaches `output` until the whole frame is sealed
        let plaintext = read_to_end_zeroizing(input).await?;
        let framed = self.encrypt(&plaintext).await?;

        output.write_all(&framed).await?;
        output.flush().await?;
        output.seek(SeekFrom::Start(0)).await?;
        Ok(())
    }

    async fn decrypt_stream(
        &self,
        input: &mut (dyn AsyncRead + Send + Unpin),
        output: &mut dyn SeekableWrite,
    ) -> Result<()> {
        let mut head = [0u8; POLICY_ID_LEN];
        input.read_exact(&mut head).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::UnexpectedEof => EncryptionError::MalformedCiphertext(
                "stream is shorter than the policy id".to_string(),
            ),
            _ => EncryptionError::Io(e),
        })?;
        let engine = self.factory.get_valid_for_decryption(Uuid::from_bytes(head)).await?;
        engine.decrypt_stream(input, output).await
    }

    fn policy(&self) -> Result<&Policy> {
        Err(EncryptionError::UnsupportedOperation("a rotating encryptor spans many policies"))
    }
}

impl fmt::Debug for RotatingEncryptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RotatingEncryptor").field("factory", &self.factory).finish()
    }
}
