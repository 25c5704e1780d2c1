//! Integration tests for `keyturn_common::error`.
//!
//! Validates classification and the composition pattern that layer errors
//! follow when wrapping [`CommonError`].

use keyturn_common::error::{CommonError, CommonResult, ErrorClassification, ErrorSeverity};
use thiserror::Error;

#[derive(Debug, Error)]
enum LayerError {
    #[error("layer specific: {0}")]
    Specific(String),
    #[error(transparent)]
    Common(#[from] CommonError),
}

impl ErrorClassification for LayerError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Specific(_) => true,
            Self::Common(err) => err.is_retryable(),
        }
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Specific(_) => ErrorSeverity::Warning,
            Self::Common(err) => err.severity(),
        }
    }

    fn is_critical(&self) -> bool {
        matches!(self, Self::Common(err) if err.is_critical())
    }
}

fn load(fail: bool) -> CommonResult<u8> {
    if fail {
        Err(CommonError::config_field("cache.max_entries", "must be positive"))
    } else {
        Ok(1)
    }
}

fn layer_op(fail: bool) -> Result<u8, LayerError> {
    Ok(load(fail)?)
}

/// Validates `?` conversion and delegated classification.
///
/// Assertions:
/// - Confirms a wrapped config error stays permanent.
/// - Confirms transparent display keeps the common message.
#[test]
fn layer_errors_delegate_to_common() {
    assert_eq!(layer_op(false).unwrap(), 1);

    let err = layer_op(true).unwrap_err();
    assert!(!err.is_retryable());
    assert!(!err.is_critical());
    assert_eq!(err.severity(), ErrorSeverity::Error);
    assert_eq!(
        err.to_string(),
        "Configuration error in field 'cache.max_entries': must be positive"
    );

    let specific = LayerError::Specific("bad".into());
    assert!(specific.is_retryable());
    assert_eq!(specific.severity(), ErrorSeverity::Warning);
}
