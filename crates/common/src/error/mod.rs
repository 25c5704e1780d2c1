//! Common error types and classification shared by every keyturn crate.
//!
//! Layer-specific errors (`EncryptionError` in `keyturn-core`, `InfraError` in
//! `keyturn-infra`) implement [`ErrorClassification`] so callers can make
//! retry/alert decisions without matching on concrete types. Configuration
//! failures are shared and surface as [`CommonError::Config`].
//!
//! ```rust
//! use keyturn_common::error::{CommonError, ErrorClassification, ErrorSeverity};
//!
//! let err = CommonError::config_field("cache.ttl_secs", "must be greater than 0");
//! assert_eq!(err.severity(), ErrorSeverity::Error);
//! assert!(!err.is_retryable());
//! ```

use std::fmt;

use thiserror::Error;

/// Standard result type using CommonError
pub type CommonResult<T> = Result<T, CommonError>;

/// Error variants shared across crates
#[derive(Debug, Clone, Error)]
pub enum CommonError {
    /// Configuration-related errors
    #[error("Configuration error{}: {message}", fmt_field(.field))]
    Config { message: String, field: Option<String> },
}

fn fmt_field(field: &Option<String>) -> String {
    field.as_ref().map(|f| format!(" in field '{f}'")).unwrap_or_default()
}

impl ErrorClassification for CommonError {
    fn is_retryable(&self) -> bool {
        false
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Config { .. } => ErrorSeverity::Error,
        }
    }

    fn is_critical(&self) -> bool {
        false
    }
}

impl CommonError {
    /// Create a simple configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into(), field: None }
    }

    /// Create a configuration error for a specific field
    pub fn config_field<F: Into<String>, S: Into<String>>(field: F, message: S) -> Self {
        Self::Config { message: message.into(), field: Some(field.into()) }
    }
}

/// Standard interface for classifying errors by their characteristics
///
/// Implemented by every error enum in the workspace so retry and alerting
/// logic can stay generic.
pub trait ErrorClassification {
    /// Check if this error is retryable
    ///
    /// Retryable errors are transient (timeouts, flaky backends) and may
    /// succeed if attempted again.
    fn is_retryable(&self) -> bool;

    /// Get the error severity level
    fn severity(&self) -> ErrorSeverity;

    /// Check if this is a critical error requiring immediate attention
    ///
    /// Critical errors indicate data corruption, key material problems or
    /// internal invariant violations.
    fn is_critical(&self) -> bool;
}

/// Unified severity level used for logging and alerting
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorSeverity {
    /// Informational, typically for debugging
    Info,
    /// Warning, should be monitored but not critical
    Warning,
    /// Error, requires attention and action
    Error,
    /// Critical, immediate action required
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for error.
    use super::*;

    /// Validates display formatting with and without optional context.
    ///
    /// Assertions:
    /// - Confirms the field name is embedded when present.
    /// - Confirms the bare message form when absent.
    #[test]
    fn test_config_display() {
        let with_field = CommonError::config_field("cache.ttl_secs", "must be positive");
        assert_eq!(
            with_field.to_string(),
            "Configuration error in field 'cache.ttl_secs': must be positive"
        );

        let bare = CommonError::config("missing file");
        assert_eq!(bare.to_string(), "Configuration error: missing file");
    }

    /// Validates configuration errors are permanent.
    ///
    /// Assertions:
    /// - Ensures config errors are neither retryable nor critical.
    #[test]
    fn test_classification() {
        let err = CommonError::config("bad");
        assert!(!err.is_retryable());
        assert!(!err.is_critical());
        assert_eq!(err.severity(), ErrorSeverity::Error);
    }

    /// Validates severity ordering.
    ///
    /// Assertions:
    /// - Ensures `Critical > Error > Warning > Info`.
    #[test]
    fn test_severity_ordering() {
        assert!(ErrorSeverity::Critical > ErrorSeverity::Error);
        assert!(ErrorSeverity::Error > ErrorSeverity::Warning);
        assert!(ErrorSeverity::Warning > ErrorSeverity::Info);
        assert_eq!(ErrorSeverity::Warning.to_string(), "WARN");
    }
}
