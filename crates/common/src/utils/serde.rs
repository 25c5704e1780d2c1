//! Serialization utilities for common data types
//!
//! Configuration files express lifetimes and TTLs as integer counts, so
//! these helpers map `Duration` fields onto plain numbers.

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serializer};

/// Serde serialization result type
type SerializeResult<S> = Result<<S as Serializer>::Ok, <S as Serializer>::Error>;

/// Duration as whole seconds (u64)
///
/// # Usage
/// ```rust
/// use std::time::Duration;
///
/// use keyturn_common::duration_secs;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Example {
///     #[serde(with = "duration_secs")]
///     key_lifetime: Duration,
/// }
/// ```
pub mod duration_secs {
    use super::*;

    /// Serialize a Duration as whole seconds, truncating sub-second parts
    pub fn serialize<S>(duration: &Duration, serializer: S) -> SerializeResult<S>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    /// Deserialize seconds (u64) into a Duration
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for serialization utilities.

    use serde::{Deserialize, Serialize};

    use super::*;

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct CacheSection {
        #[serde(with = "duration_secs")]
        ttl: Duration,
        max_entries: usize,
    }

    /// Validates that durations serialize as plain integers.
    ///
    /// Assertions:
    /// - Ensures the JSON holds `1800` seconds.
    #[test]
    fn test_duration_serialize() {
        let data = CacheSection { ttl: Duration::from_secs(1800), max_entries: 8 };

        let json = serde_json::to_string(&data).expect("Should serialize valid struct");
        assert_eq!(json, r#"{"ttl":1800,"max_entries":8}"#);
    }

    /// Validates deserialization from integer counts.
    ///
    /// Assertions:
    /// - Confirms `data.ttl` equals 90 days.
    #[test]
    fn test_duration_deserialize() {
        let json = r#"{"ttl":7776000,"max_entries":0}"#;
        let data: CacheSection = serde_json::from_str(json).expect("Should deserialize");

        assert_eq!(data.ttl, Duration::from_secs(90 * 24 * 60 * 60));
    }

    /// Validates sub-second truncation for `duration_secs`.
    ///
    /// Assertions:
    /// - Confirms `1.9s` serializes as `1`.
    #[test]
    fn test_duration_secs_truncates() {
        let data = CacheSection { ttl: Duration::from_millis(1900), max_entries: 1 };
        let json = serde_json::to_string(&data).unwrap();
        assert!(json.contains(r#""ttl":1"#));
    }

    /// Validates rejection of non-numeric input.
    ///
    /// Assertions:
    /// - Ensures `result.is_err()` evaluates to true.
    #[test]
    fn test_duration_deserialize_invalid_json() {
        let invalid_json = r#"{"ttl":"not_a_number","max_entries":1}"#;
        let result: Result<CacheSection, _> = serde_json::from_str(invalid_json);
        assert!(result.is_err());
    }
}
