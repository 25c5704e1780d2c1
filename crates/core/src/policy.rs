//! Encryption policy: cipher parameters, expiration and key identity.
//!
//! A [`Policy`] is built once through [`PolicyBuilder`], which resolves the
//! algorithm defaults (block size, mode, padding) and validates the
//! combination. The resulting value has no setters, so a finalized policy
//! cannot be mutated.
//!
//! ```
//! use std::time::Duration;
//!
//! use keyturn_core::policy::{Algorithm, CipherMode, Policy};
//!
//! let policy = Policy::builder().lifetime(Duration::from_secs(300)).build()?;
//! assert_eq!(policy.algorithm(), Algorithm::Aes);
//! assert_eq!(policy.mode(), CipherMode::Gcm);
//! assert_eq!(policy.iv_len(), 16);
//! assert!(!policy.is_expired());
//! # Ok::<(), keyturn_core::EncryptionError>(())
//! ```

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Months, SubsecRound, Utc};
use uuid::Uuid;

use crate::error::{EncryptionError, Result};

/// Months a default policy stays valid for encryption
pub const DEFAULT_POLICY_MONTHS: u32 = 3;

/// Symmetric cipher family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Algorithm {
    /// AES in GCM mode with a 128-bit nonce
    #[default]
    Aes,
    /// XChaCha20 with Poly1305 authentication
    XChaCha20,
}

impl Algorithm {
    /// Key sizes (bits) the algorithm accepts
    pub fn supported_key_sizes(self) -> &'static [u32] {
        match self {
            Self::Aes => &[128, 192, 256],
            Self::XChaCha20 => &[256],
        }
    }

    /// Block size (bits) used when none is given
    ///
    /// The IV is always `block_size / 8` bytes, so XChaCha20 reports its
    /// 192-bit nonce width here.
    pub fn default_block_size(self) -> u32 {
        match self {
            Self::Aes => 128,
            Self::XChaCha20 => 192,
        }
    }

    /// Mode used when none is given
    pub fn default_mode(self) -> CipherMode {
        match self {
            Self::Aes => CipherMode::Gcm,
            Self::XChaCha20 => CipherMode::Poly1305,
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Aes => f.write_str("AES"),
            Self::XChaCha20 => f.write_str("XChaCha20"),
        }
    }
}

impl FromStr for Algorithm {
    type Err = EncryptionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aes" => Ok(Self::Aes),
            "xchacha20" | "xchacha20poly1305" => Ok(Self::XChaCha20),
            other => Err(EncryptionError::InvalidPolicy(format!("unknown algorithm '{other}'"))),
        }
    }
}

/// Block cipher mode of operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CipherMode {
    /// Galois/Counter mode
    Gcm,
    /// Poly1305 authenticated stream
    Poly1305,
}

impl fmt::Display for CipherMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gcm => f.write_str("GCM"),
            Self::Poly1305 => f.write_str("Poly1305"),
        }
    }
}

impl FromStr for CipherMode {
    type Err = EncryptionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gcm" => Ok(Self::Gcm),
            "poly1305" => Ok(Self::Poly1305),
            other => Err(EncryptionError::InvalidPolicy(format!("unknown cipher mode '{other}'"))),
        }
    }
}

/// Plaintext padding scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Padding {
    /// No padding
    #[default]
    None,
    /// PKCS#7 block padding
    Pkcs7,
}

impl fmt::Display for Padding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Pkcs7 => f.write_str("PKCS7"),
        }
    }
}

impl FromStr for Padding {
    type Err = EncryptionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Ok(Self::None),
            "pkcs7" => Ok(Self::Pkcs7),
            other => Err(EncryptionError::InvalidPolicy(format!("unknown padding '{other}'"))),
        }
    }
}

/// Immutable cipher descriptor; its id is also the id of the key it governs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    id: Uuid,
    algorithm: Algorithm,
    key_size: u32,
    block_size: u32,
    padding: Padding,
    mode: CipherMode,
    expires_at: DateTime<Utc>,
}

impl Policy {
    /// Start building a policy with defaults
    pub fn builder() -> PolicyBuilder {
        PolicyBuilder::default()
    }

    /// Identifier shared by the policy and its key
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Cipher family
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Key size in bits
    pub fn key_size(&self) -> u32 {
        self.key_size
    }

    /// Block size in bits
    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    /// Padding scheme
    pub fn padding(&self) -> Padding {
        self.padding
    }

    /// Mode of operation
    pub fn mode(&self) -> CipherMode {
        self.mode
    }

    /// Instant after which encryption is refused
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// `now > expires_at` on the system clock
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// `now > expires_at` for an explicit `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Raw key length in bytes
    pub fn key_len(&self) -> usize {
        (self.key_size / 8) as usize
    }

    /// Length of the IV (nonce) written ahead of each ciphertext
    pub fn iv_len(&self) -> usize {
        (self.block_size / 8) as usize
    }

    /// Successor policy: same parameters, fresh id, expiring `lifetime` after `now`
    pub fn derive(&self, lifetime: Duration, now: DateTime<Utc>) -> Result<Self> {
        Ok(Self { id: Uuid::new_v4(), expires_at: expiry_after(now, lifetime)?, ..self.clone() })
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}/{}/{} ({}) until {}",
            self.algorithm,
            self.key_size,
            self.mode,
            self.padding,
            self.id,
            self.expires_at.to_rfc3339()
        )
    }
}

fn expiry_after(now: DateTime<Utc>, lifetime: Duration) -> Result<DateTime<Utc>> {
    chrono::Duration::from_std(lifetime)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .map(|at| at.trunc_subsecs(6))
        .ok_or_else(|| EncryptionError::InvalidPolicy(format!("lifetime {lifetime:?} overflows")))
}

/// When a built policy expires
#[derive(Debug, Clone, Copy)]
enum Expiry {
    At(DateTime<Utc>),
    After(Duration),
}

/// Builder for [`Policy`]
///
/// Unset fields take the algorithm's defaults in [`PolicyBuilder::build`].
#[derive(Debug, Clone, Default)]
pub struct PolicyBuilder {
    id: Option<Uuid>,
    algorithm: Algorithm,
    key_size: Option<u32>,
    block_size: Option<u32>,
    padding: Option<Padding>,
    mode: Option<CipherMode>,
    expiry: Option<Expiry>,
    issued_at: Option<DateTime<Utc>>,
}

impl PolicyBuilder {
    /// Use a specific identifier instead of a fresh one
    pub fn id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }

    /// Cipher family
    pub fn algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Key size in bits
    pub fn key_size(mut self, bits: u32) -> Self {
        self.key_size = Some(bits);
        self
    }

    /// Block size in bits
    pub fn block_size(mut self, bits: u32) -> Self {
        self.block_size = Some(bits);
        self
    }

    /// Padding scheme
    pub fn padding(mut self, padding: Padding) -> Self {
        self.padding = Some(padding);
        self
    }

    /// Mode of operation
    pub fn mode(mut self, mode: CipherMode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Absolute expiration
    pub fn expires_at(mut self, at: DateTime<Utc>) -> Self {
        self.expiry = Some(Expiry::At(at));
        self
    }

    /// Expire `lifetime` after the issue time
    pub fn lifetime(mut self, lifetime: Duration) -> Self {
        self.expiry = Some(Expiry::After(lifetime));
        self
    }

    /// Reference time for `lifetime` and the default expiry (defaults to now)
    pub fn issued_at(mut self, now: DateTime<Utc>) -> Self {
        self.issued_at = Some(now);
        self
    }

    /// Resolve defaults and validate the parameter combination
    pub fn build(self) -> Result<Policy> {
        let algorithm = self.algorithm;
        let key_size = self.key_size.unwrap_or(256);
        let block_size = self.block_size.unwrap_or_else(|| algorithm.default_block_size());
        let mode = self.mode.unwrap_or_else(|| algorithm.default_mode());
        let padding = self.padding.unwrap_or_default();

        if !algorithm.supported_key_sizes().contains(&key_size) {
            return Err(EncryptionError::InvalidPolicy(format!(
                "{algorithm} does not support {key_size}-bit keys"
            )));
        }
        if block_size != algorithm.default_block_size() {
            return Err(EncryptionError::InvalidPolicy(format!(
                "{algorithm} requires a {}-bit block size, got {block_size}",
                algorithm.default_block_size()
            )));
        }
        if mode != algorithm.default_mode() {
            return Err(EncryptionError::InvalidPolicy(format!(
                "{algorithm} does not support mode {mode}"
            )));
        }
        if padding != Padding::None {
            return Err(EncryptionError::InvalidPolicy(format!(
                "padding {padding} is not applicable to authenticated mode {mode}"
            )));
        }

        let now = self.issued_at.unwrap_or_else(Utc::now);
        // stored records keep microseconds
        let expires_at = match self.expiry {
            Some(Expiry::At(at)) => at.trunc_subsecs(6),
            Some(Expiry::After(lifetime)) => expiry_after(now, lifetime)?,
            None => now
                .checked_add_months(Months::new(DEFAULT_POLICY_MONTHS))
                .map(|at| at.trunc_subsecs(6))
                .ok_or_else(|| {
                    EncryptionError::InvalidPolicy("default expiration overflows".to_string())
                })?,
        };

        Ok(Policy {
            id: self.id.unwrap_or_else(Uuid::new_v4),
            algorithm,
            key_size,
            block_size,
            padding,
            mode,
            expires_at,
        })
    }
}
