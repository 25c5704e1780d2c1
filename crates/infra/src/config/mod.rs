//! Configuration loading and management
//!
//! [`KeyturnConfig`] describes the key template, engine cache, blob storage,
//! master key source and logging. It is loaded from environment variables or
//! a TOML file by [`loader`].

pub mod loader;

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use keyturn_common::duration_secs;
use keyturn_common::error::CommonError;
use keyturn_core::encryptor::DEFAULT_CACHE_TTL;
use keyturn_core::Algorithm;
use serde::{Deserialize, Serialize};

use crate::errors::Result;

// Re-export commonly used items
pub use loader::{load, load_from_env, load_from_file, load_from_lookup, probe_config_paths};

/// Lifetime of newly issued keys when none is configured
pub const DEFAULT_KEY_LIFETIME: Duration = Duration::from_secs(90 * 24 * 60 * 60);

/// Environment variable holding the hex master key when none is configured
pub const DEFAULT_MASTER_KEY_ENV: &str = "KEYTURN_MASTER_KEY";

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KeyturnConfig {
    /// Name of the environment variable holding the hex master key
    pub master_key_env: String,
    /// Template for issued keys
    pub policy: PolicyConfig,
    /// Engine cache
    pub cache: CacheSettings,
    /// Blob storage backend
    pub storage: StorageConfig,
    /// Log output
    pub logging: LoggingConfig,
}

impl Default for KeyturnConfig {
    fn default() -> Self {
        Self {
            master_key_env: DEFAULT_MASTER_KEY_ENV.to_string(),
            policy: PolicyConfig::default(),
            cache: CacheSettings::default(),
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl KeyturnConfig {
    /// Reject configurations the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.master_key_env.trim().is_empty() {
            return Err(CommonError::config_field("master_key_env", "must not be empty").into());
        }
        self.policy.validate()?;
        self.cache.validate()?;
        self.storage.validate()?;
        Ok(())
    }
}

/// Template for issued keys
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PolicyConfig {
    /// Cipher family name (`AES` or `XChaCha20`)
    pub algorithm: String,
    /// Key size in bits
    pub key_size: u32,
    /// How long a key may encrypt after issuance
    #[serde(rename = "key_lifetime_secs", with = "duration_secs")]
    pub key_lifetime: Duration,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::default().to_string(),
            key_size: 256,
            key_lifetime: DEFAULT_KEY_LIFETIME,
        }
    }
}

impl PolicyConfig {
    /// Parsed cipher family
    pub fn algorithm(&self) -> Result<Algorithm> {
        Algorithm::from_str(&self.algorithm)
            .map_err(|e| CommonError::config_field("policy.algorithm", e.to_string()).into())
    }

    fn validate(&self) -> Result<()> {
        let algorithm = self.algorithm()?;
        if !algorithm.supported_key_sizes().contains(&self.key_size) {
            return Err(CommonError::config_field(
                "policy.key_size",
                format!(
                    "{algorithm} supports {:?} bits, got {}",
                    algorithm.supported_key_sizes(),
                    self.key_size
                ),
            )
            .into());
        }
        if self.key_lifetime.is_zero() {
            return Err(
                CommonError::config_field("policy.key_lifetime_secs", "must be positive").into()
            );
        }
        Ok(())
    }
}

/// Engine cache settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheSettings {
    /// How long a resolved engine stays cached
    #[serde(rename = "ttl_secs", with = "duration_secs")]
    pub ttl: Duration,
    /// Upper bound on cached engines
    pub max_entries: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self { ttl: DEFAULT_CACHE_TTL, max_entries: 1024 }
    }
}

impl CacheSettings {
    fn validate(&self) -> Result<()> {
        if self.ttl.is_zero() {
            return Err(CommonError::config_field("cache.ttl_secs", "must be positive").into());
        }
        if self.max_entries == 0 {
            return Err(CommonError::config_field("cache.max_entries", "must be positive").into());
        }
        Ok(())
    }
}

/// Where key blobs are persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process memory; keys are lost on exit
    #[default]
    Memory,
    /// One file per key under `storage.root`
    Filesystem,
}

impl FromStr for StorageBackend {
    type Err = CommonError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "filesystem" | "fs" => Ok(Self::Filesystem),
            other => Err(CommonError::config_field(
                "storage.backend",
                format!("unknown backend '{other}', expected memory or filesystem"),
            )),
        }
    }
}

/// Blob storage settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Backend kind
    pub backend: StorageBackend,
    /// Directory holding `decryption/` and `encryption/` for the filesystem backend
    pub root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { backend: StorageBackend::Memory, root: PathBuf::from("data/keys") }
    }
}

impl StorageConfig {
    /// Directory of the decryption store
    pub fn decryption_dir(&self) -> PathBuf {
        self.root.join("decryption")
    }

    /// Directory of the encryption store
    pub fn encryption_dir(&self) -> PathBuf {
        self.root.join("encryption")
    }

    fn validate(&self) -> Result<()> {
        if self.root.as_os_str().is_empty() {
            return Err(CommonError::config_field("storage.root", "must not be empty").into());
        }
        Ok(())
    }
}

/// Log output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), json: false }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for config.
    use super::*;
    use crate::errors::InfraError;

    fn field_of(err: InfraError) -> Option<String> {
        match err {
            InfraError::Common(CommonError::Config { field, .. }) => field,
            _ => None,
        }
    }

    /// Validates the documented defaults.
    ///
    /// Assertions:
    /// - Confirms AES-256, 90 day keys, 30 minute cache, memory storage.
    /// - Confirms defaults pass validation.
    #[test]
    fn test_defaults() {
        let config = KeyturnConfig::default();
        assert_eq!(config.policy.algorithm().unwrap(), Algorithm::Aes);
        assert_eq!(config.policy.key_size, 256);
        assert_eq!(config.policy.key_lifetime, Duration::from_secs(7_776_000));
        assert_eq!(config.cache.ttl, Duration::from_secs(1800));
        assert_eq!(config.cache.max_entries, 1024);
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.storage.decryption_dir(), PathBuf::from("data/keys/decryption"));
        assert_eq!(config.master_key_env, "KEYTURN_MASTER_KEY");
        assert_eq!(config.logging.level, "info");
        config.validate().unwrap();
    }

    /// Validates rejection of unusable settings.
    ///
    /// Assertions:
    /// - Confirms each invalid field is named in the error.
    #[test]
    fn test_validate_rejects_invalid_fields() {
        let mut config = KeyturnConfig::default();
        config.policy.key_size = 512;
        assert_eq!(field_of(config.validate().unwrap_err()).as_deref(), Some("policy.key_size"));

        let mut config = KeyturnConfig::default();
        config.policy.algorithm = "XChaCha20".into();
        config.policy.key_size = 128;
        assert_eq!(field_of(config.validate().unwrap_err()).as_deref(), Some("policy.key_size"));

        let mut config = KeyturnConfig::default();
        config.policy.algorithm = "DES".into();
        assert_eq!(field_of(config.validate().unwrap_err()).as_deref(), Some("policy.algorithm"));

        let mut config = KeyturnConfig::default();
        config.policy.key_lifetime = Duration::ZERO;
        let field = field_of(config.validate().unwrap_err());
        assert_eq!(field.as_deref(), Some("policy.key_lifetime_secs"));

        let mut config = KeyturnConfig::default();
        config.cache.ttl = Duration::ZERO;
        assert_eq!(field_of(config.validate().unwrap_err()).as_deref(), Some("cache.ttl_secs"));

        let mut config = KeyturnConfig::default();
        config.storage.root = PathBuf::new();
        assert_eq!(field_of(config.validate().unwrap_err()).as_deref(), Some("storage.root"));

        let mut config = KeyturnConfig::default();
        config.master_key_env = " ".into();
        assert_eq!(field_of(config.validate().unwrap_err()).as_deref(), Some("master_key_env"));
    }

    /// Validates backend names parse case-insensitively.
    ///
    /// Assertions:
    /// - Confirms known names parse and unknown names fail.
    #[test]
    fn test_storage_backend_from_str() {
        assert_eq!("Memory".parse::<StorageBackend>().unwrap(), StorageBackend::Memory);
        assert_eq!("FILESYSTEM".parse::<StorageBackend>().unwrap(), StorageBackend::Filesystem);
        assert!("s3".parse::<StorageBackend>().is_err());
    }
}
