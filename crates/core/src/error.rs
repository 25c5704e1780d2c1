//! Error types for the rotating-key engine.

use keyturn_common::error::{ErrorClassification, ErrorSeverity};
use thiserror::Error;
use uuid::Uuid;

/// Result alias used throughout `keyturn-core`
pub type Result<T> = std::result::Result<T, EncryptionError>;

/// Errors raised by blob-store collaborators
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested id is not present
    #[error("blob '{0}' not found")]
    NotFound(String),

    /// Backend-specific failure
    #[error("blob store backend error: {0}")]
    Backend(String),

    /// I/O failure
    #[error("blob store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The id contains characters the backend cannot store
    #[error("invalid blob id '{0}'")]
    InvalidId(String),
}

/// Errors raised by policies, keys, key stores and encryptors
#[derive(Debug, Error)]
pub enum EncryptionError {
    /// Encryption attempted under a policy whose expiration has passed
    #[error("policy {policy_id} expired; encryption is no longer permitted")]
    PolicyExpired {
        /// Identifier of the expired policy
        policy_id: Uuid,
    },

    /// Decryption key lookup missed in the decryption store
    #[error("key {0} not found")]
    KeyNotFound(Uuid),

    /// Raw key bytes disagree with the policy's key size
    #[error("key size mismatch: expected {expected} bytes, got {actual}")]
    KeySizeMismatch {
        /// Byte length required by the policy
        expected: usize,
        /// Byte length supplied
        actual: usize,
    },

    /// Operation not available on this encryptor
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(&'static str),

    /// Policy parameters do not describe a supported cipher
    #[error("invalid policy: {0}")]
    InvalidPolicy(String),

    /// Ciphertext framing is truncated or malformed
    #[error("malformed ciphertext: {0}")]
    MalformedCiphertext(String),

    /// Persisted key record could not be decoded
    #[error("malformed key record: {0}")]
    MalformedKeyRecord(String),

    /// Primitive or authentication failure
    #[error("cipher failure: {0}")]
    Cipher(String),

    /// Blob store failure
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Encryptor cache failure
    #[error("encryptor cache error: {0}")]
    Cache(String),

    /// Stream I/O failure
    #[error("stream I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EncryptionError {
    /// True for a decryption-key miss or a blob store `NotFound`
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::KeyNotFound(_) | Self::Store(StoreError::NotFound(_)))
    }
}

impl ErrorClassification for StoreError {
    fn is_retryable(&self) -> bool {
        matches!(self, Self::Backend(_) | Self::Io(_))
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::NotFound(_) => ErrorSeverity::Info,
            Self::InvalidId(_) => ErrorSeverity::Warning,
            Self::Backend(_) | Self::Io(_) => ErrorSeverity::Error,
        }
    }

    fn is_critical(&self) -> bool {
        false
    }
}

impl ErrorClassification for EncryptionError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Store(err) => err.is_retryable(),
            Self::Cache(_) | Self::Io(_) => true,
            _ => false,
        }
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::PolicyExpired { .. } => ErrorSeverity::Warning,
            Self::KeyNotFound(_) | Self::Cipher(_) | Self::MalformedCiphertext(_) => {
                ErrorSeverity::Error
            }
            Self::MalformedKeyRecord(_) | Self::KeySizeMismatch { .. } => ErrorSeverity::Critical,
            Self::UnsupportedOperation(_) | Self::InvalidPolicy(_) => ErrorSeverity::Error,
            Self::Store(err) => err.severity(),
            Self::Cache(_) => ErrorSeverity::Warning,
            Self::Io(_) => ErrorSeverity::Error,
        }
    }

    fn is_critical(&self) -> bool {
        match self {
            Self::MalformedKeyRecord(_) | Self::KeySizeMismatch { .. } => true,
            _ => false,
        }
    }
}
