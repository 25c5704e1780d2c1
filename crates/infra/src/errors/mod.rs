//! Error type for configuration and wiring failures.

use keyturn_common::error::{CommonError, ErrorClassification, ErrorSeverity};
use keyturn_core::{EncryptionError, StoreError};
use thiserror::Error;

/// Result alias for `keyturn-infra`
pub type Result<T> = std::result::Result<T, InfraError>;

/// Failures raised while loading configuration or assembling the engine
#[derive(Debug, Error)]
pub enum InfraError {
    /// Configuration is missing or invalid
    #[error(transparent)]
    Common(#[from] CommonError),

    /// Configuration file is not valid TOML
    #[error("invalid TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),

    /// The master key variable is not set
    #[error("master key variable '{0}' is not set")]
    MissingMasterKey(String),

    /// The master key is not hex
    #[error("master key is not valid hex: {0}")]
    MasterKeyEncoding(#[from] hex::FromHexError),

    /// Engine construction failed
    #[error(transparent)]
    Encryption(#[from] EncryptionError),

    /// Blob store could not be opened
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ErrorClassification for InfraError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Common(err) => err.is_retryable(),
            Self::Encryption(err) => err.is_retryable(),
            Self::Store(err) => err.is_retryable(),
            _ => false,
        }
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Common(err) => err.severity(),
            Self::Encryption(err) => err.severity(),
            Self::MissingMasterKey(_) | Self::MasterKeyEncoding(_) => ErrorSeverity::Critical,
            Self::Store(err) => err.severity(),
            Self::Toml(_) => ErrorSeverity::Error,
        }
    }

    fn is_critical(&self) -> bool {
        match self {
            Self::Common(err) => err.is_critical(),
            Self::Encryption(err) => err.is_critical(),
            Self::MissingMasterKey(_) | Self::MasterKeyEncoding(_) => true,
            _ => false,
        }
    }
}
