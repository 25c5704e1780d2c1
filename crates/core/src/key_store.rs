//! Encrypted-at-rest key persistence.
//!
//! Each key is written as one blob under its lowercase hyphenated id. The
//! blob is `base64(at_rest.encrypt(record))` where `record` is:
//!
//! ```text
//! i32 LE key_size | i32 LE block_size | key bytes (key_size / 8)
//!   | i64 LE expiration ticks | varint length | UTF-8 "padding;mode;algorithm"
//! ```
//!
//! Ticks count 100 ns intervals since 0001-01-01T00:00:00Z. The length
//! prefix is 7 bits per byte, low group first, high bit set on all but the
//! last byte.

use std::fmt;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use tracing::{debug, instrument, warn};
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::encryptor::Encryptor;
use crate::error::{EncryptionError, Result, StoreError};
use crate::key::Key;
use crate::policy::Policy;
use crate::ports::BlobStore;

/// Ticks between 0001-01-01 and the UNIX epoch
pub const TICKS_AT_UNIX_EPOCH: i64 = 621_355_968_000_000_000;

const TICKS_PER_MICRO: i64 = 10;

fn malformed(msg: impl Into<String>) -> EncryptionError {
    EncryptionError::MalformedKeyRecord(msg.into())
}

/// Blob id for a key id
pub fn blob_id(id: Uuid) -> String {
    id.hyphenated().to_string()
}

/// Expiration as 100 ns ticks since 0001-01-01
pub fn to_ticks(at: DateTime<Utc>) -> Result<i64> {
    at.timestamp_micros()
        .checked_mul(TICKS_PER_MICRO)
        .and_then(|t| t.checked_add(TICKS_AT_UNIX_EPOCH))
        .ok_or_else(|| malformed(format!("expiration {at} is outside the tick range")))
}

/// Inverse of [`to_ticks`]; sub-microsecond ticks are dropped
pub fn from_ticks(ticks: i64) -> Result<DateTime<Utc>> {
    ticks
        .checked_sub(TICKS_AT_UNIX_EPOCH)
        .and_then(|t| DateTime::from_timestamp_micros(t / TICKS_PER_MICRO))
        .ok_or_else(|| malformed(format!("tick count {ticks} is not a valid timestamp")))
}

fn write_varint(out: &mut Vec<u8>, mut value: u32) {
    while value >= 0x80 {
        out.push((value as u8) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

/// Serialize `key` into the plaintext record
pub fn encode_record(key: &Key) -> Result<Zeroizing<Vec<u8>>> {
    let policy = key.policy();
    let descriptor = format!("{};{};{}", policy.padding(), policy.mode(), policy.algorithm());
    let key_size =
        i32::try_from(policy.key_size()).map_err(|_| malformed("key size exceeds i32"))?;
    let block_size =
        i32::try_from(policy.block_size()).map_err(|_| malformed("block size exceeds i32"))?;
    let descriptor_len =
        u32::try_from(descriptor.len()).map_err(|_| malformed("descriptor too long"))?;

    let mut out = Zeroizing::new(Vec::with_capacity(4 + 4 + key.expose().len() + 8 + 1 + 32));
    out.extend_from_slice(&key_size.to_le_bytes());
    out.extend_from_slice(&block_size.to_le_bytes());
    out.extend_from_slice(key.expose());
    out.extend_from_slice(&to_ticks(policy.expires_at())?.to_le_bytes());
    write_varint(&mut out, descriptor_len);
    out.extend_from_slice(descriptor.as_bytes());
    Ok(out)
}

struct RecordReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> RecordReader<'a> {
    fn take(&mut self, len: usize, field: &str) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.buf.len())
            .ok_or_else(|| malformed(format!("truncated at {field}")))?;
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self, field: &str) -> Result<[u8; N]> {
        let mut bytes = [0u8; N];
        bytes.copy_from_slice(self.take(N, field)?);
        Ok(bytes)
    }

    fn varint(&mut self) -> Result<u32> {
        let mut value = 0u32;
        for shift in (0..35).step_by(7) {
            let [byte] = self.array::<1>("string length")?;
            value |= u32::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(malformed("string length prefix is too long"))
    }

    fn finish(&self) -> Result<()> {
        if self.pos == self.buf.len() {
            Ok(())
        } else {
            Err(malformed(format!("{} trailing bytes", self.buf.len() - self.pos)))
        }
    }
}

/// Parse a plaintext record back into the key with identifier `id`
pub fn decode_record(id: Uuid, record: &[u8]) -> Result<Key> {
    let mut reader = RecordReader { buf: record, pos: 0 };

    let key_size = i32::from_le_bytes(reader.array("key size")?);
    let block_size = i32::from_le_bytes(reader.array("block size")?);
    let key_size = u32::try_from(key_size)
        .ok()
        .filter(|bits| *bits > 0 && bits % 8 == 0)
        .ok_or_else(|| malformed(format!("invalid key size {key_size}")))?;
    let block_size = u32::try_from(block_size)
        .map_err(|_| malformed(format!("invalid block size {block_size}")))?;

    let key_bytes = reader.take((key_size / 8) as usize, "key bytes")?;
    let expires_at = from_ticks(i64::from_le_bytes(reader.array("expiration")?))?;
    let descriptor_len = reader.varint()? as usize;
    let descriptor = std::str::from_utf8(reader.take(descriptor_len, "descriptor")?)
        .map_err(|_| malformed("descriptor is not UTF-8"))?;
    reader.finish()?;

    let mut parts = descriptor.split(';');
    let (Some(padding), Some(mode), Some(algorithm), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(malformed(format!("descriptor '{descriptor}' is not padding;mode;algorithm")));
    };

    let policy = Policy::builder()
        .id(id)
        .algorithm(algorithm.parse()?)
        .key_size(key_size)
        .block_size(block_size)
        .padding(padding.parse()?)
        .mode(mode.parse()?)
        .expires_at(expires_at)
        .build()?;

    Key::new(policy, key_bytes.to_vec())
}

/// Keys persisted through a [`BlobStore`], encrypted with an at-rest encryptor
pub struct KeyStore {
    name: String,
    blobs: Arc<dyn BlobStore>,
    at_rest: Arc<dyn Encryptor>,
}

impl KeyStore {
    /// Store named `name` (used in logs)
    pub fn new(
        name: impl Into<String>,
        blobs: Arc<dyn BlobStore>,
        at_rest: Arc<dyn Encryptor>,
    ) -> Self {
        Self { name: name.into(), blobs, at_rest }
    }

    /// Store name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Load and decrypt the key with `id`
    ///
    /// Fails with `KeyNotFound` when the blob store has no such id.
    #[instrument(skip(self), fields(store = %self.name, key_id = %id))]
    pub async fn get(&self, id: Uuid) -> Result<Key> {
        let encoded = match self.blobs.get(&blob_id(id)).await {
            Ok(bytes) => Zeroizing::new(bytes),
            Err(StoreError::NotFound(_)) => return Err(EncryptionError::KeyNotFound(id)),
            Err(err) => return Err(err.into()),
        };
        let sealed = Zeroizing::new(
            BASE64.decode(encoded.as_slice()).map_err(|e| malformed(format!("base64: {e}")))?,
        );
        let record = self.at_rest.decrypt(&sealed).await?;
        let key = decode_record(id, &record)?;
        debug!("loaded key");
        Ok(key)
    }

    /// Encrypt and persist `key` under its id
    #[instrument(skip(self, key), fields(store = %self.name, key_id = %key.id()))]
    pub async fn add(&self, key: &Key) -> Result<()> {
        let record = encode_record(key)?;
        let sealed = Zeroizing::new(self.at_rest.encrypt(&record).await?);
        let encoded = Zeroizing::new(BASE64.encode(sealed.as_slice()).into_bytes());
        self.blobs.put(&blob_id(key.id()), &encoded).await?;
        debug!("stored key");
        Ok(())
    }

    /// Identifiers of every stored key
    ///
    /// Blob ids that are not UUIDs are skipped.
    pub async fn ids(&self) -> Result<Vec<Uuid>> {
        let ids = self.blobs.find("*").await?;
        Ok(ids
            .into_iter()
            .filter_map(|raw| match Uuid::parse_str(&raw) {
                Ok(id) => Some(id),
                Err(_) => {
                    warn!(store = %self.name, blob_id = %raw, "skipping blob with non-key id");
                    None
                }
            })
            .collect())
    }

    /// Materialize every stored key
    ///
    /// Keys deleted between listing and loading are skipped.
    #[instrument(skip(self), fields(store = %self.name))]
    pub async fn get_all(&self) -> Result<Vec<Key>> {
        let mut keys = Vec::new();
        for id in self.ids().await? {
            match self.get(id).await {
                Ok(key) => keys.push(key),
                Err(EncryptionError::KeyNotFound(_)) => {
                    debug!(key_id = %id, "key removed while listing");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(keys)
    }

    /// Number of stored keys
    pub async fn len(&self) -> Result<usize> {
        Ok(self.ids().await?.len())
    }

    /// Whether the store holds no keys
    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Delete the key with `id`; already absent counts as success
    #[instrument(skip(self), fields(store = %self.name, key_id = %id))]
    pub async fn remove(&self, id: Uuid) -> Result<()> {
        match self.blobs.delete(&blob_id(id)).await {
            Ok(()) | Err(StoreError::NotFound(_)) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

impl fmt::Debug for KeyStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyStore").field("name", &self.name).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for key_store record encoding.
    use chrono::TimeZone;

    use super::*;
    use crate::policy::Algorithm;

    fn sample_key() -> Key {
        let policy = Policy::builder()
            .key_size(128)
            .expires_at(Utc.with_ymd_and_hms(2026, 7, 1, 8, 30, 0).unwrap())
            .build()
            .unwrap();
        Key::new(policy, (0u8..16).collect()).unwrap()
    }

    /// Validates the exact byte layout of a record.
    ///
    /// Assertions:
    /// - Confirms sizes, key bytes, ticks and descriptor at their offsets.
    #[test]
    fn test_record_layout() {
        let key = sample_key();
        let record = encode_record(&key).unwrap();

        assert_eq!(&record[0..4], &128i32.to_le_bytes());
        assert_eq!(&record[4..8], &128i32.to_le_bytes());
        assert_eq!(&record[8..24], key.expose());

        let ticks = i64::from_le_bytes(record[24..32].try_into().unwrap());
        assert_eq!(ticks, to_ticks(key.policy().expires_at()).unwrap());

        let descriptor = b"None;GCM;AES";
        assert_eq!(record[32] as usize, descriptor.len());
        assert_eq!(&record[33..], descriptor);
    }

    /// Validates the tick epoch against a known date.
    ///
    /// Assertions:
    /// - Confirms the UNIX epoch maps to `TICKS_AT_UNIX_EPOCH`.
    /// - Confirms ticks round-trip at microsecond precision.
    #[test]
    fn test_ticks() {
        let epoch = DateTime::from_timestamp(0, 0).unwrap();
        assert_eq!(to_ticks(epoch).unwrap(), TICKS_AT_UNIX_EPOCH);

        let at = Utc.with_ymd_and_hms(2030, 12, 31, 23, 59, 59).unwrap();
        assert_eq!(from_ticks(to_ticks(at).unwrap()).unwrap(), at);
    }

    /// Validates decoding restores the policy under the given id.
    ///
    /// Assertions:
    /// - Confirms id, algorithm, sizes, expiry and key bytes.
    #[test]
    fn test_decode_restores_key() {
        let key = sample_key();
        let record = encode_record(&key).unwrap();
        let decoded = decode_record(key.id(), &record).unwrap();

        assert_eq!(decoded.policy(), key.policy());
        assert_eq!(decoded.policy().algorithm(), Algorithm::Aes);
        assert_eq!(decoded.expose(), key.expose());
    }

    /// Validates multi-byte varint prefixes.
    ///
    /// Assertions:
    /// - Confirms 300 encodes as `[0xac, 0x02]` and reads back.
    #[test]
    fn test_varint() {
        let mut out = Vec::new();
        write_varint(&mut out, 300);
        assert_eq!(out, vec![0xac, 0x02]);

        let mut reader = RecordReader { buf: &out, pos: 0 };
        assert_eq!(reader.varint().unwrap(), 300);
        reader.finish().unwrap();
    }

    /// Validates rejection of corrupt records.
    ///
    /// Assertions:
    /// - Ensures truncation, trailing bytes and a bad descriptor are all
    ///   `MalformedKeyRecord`.
    #[test]
    fn test_decode_rejects_corruption() {
        let key = sample_key();
        let record = encode_record(&key).unwrap();

        let truncated = decode_record(key.id(), &record[..20]);
        assert!(matches!(truncated, Err(EncryptionError::MalformedKeyRecord(_))));

        let mut trailing = record.to_vec();
        trailing.push(0);
        let trailing = decode_record(key.id(), &trailing);
        assert!(matches!(trailing, Err(EncryptionError::MalformedKeyRecord(_))));

        let mut bad = record[..32].to_vec();
        bad.push(7);
        bad.extend_from_slice(b"GCM;AES");
        let bad = decode_record(key.id(), &bad);
        assert!(matches!(bad, Err(EncryptionError::MalformedKeyRecord(_))));
    }
}
