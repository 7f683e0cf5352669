//! Index error types
//!
//! Error codes:
//! - RELCORE_INDEX_UNSUPPORTED_KIND (REJECT)
//! - RELCORE_INDEX_INCOMPATIBLE (REJECT)
//! - RELCORE_INDEX_INVALID_KEY (REJECT)
//! - RELCORE_INDEX_NOT_FOUND (FATAL)
//! - RELCORE_INDEX_ORPHAN_ROW (FATAL)
//! - RELCORE_INDEX_READ_FAILED (FATAL)

use std::fmt;

use crate::error::Severity;
use crate::tuple::TupleError;

/// Index-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexErrorCode {
    /// Virtual index flags do not name exactly one supported kind
    UnsupportedKind,
    /// Composed indexes disagree on descriptor or key order
    Incompatible,
    /// Seek key or range bound does not fit the key descriptor
    InvalidKey,
    /// Physical index missing from storage
    NotFound,
    /// Inheritor row without a root counterpart
    OrphanRow,
    /// Underlying reader failed
    ReadFailed,
}

impl IndexErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            IndexErrorCode::UnsupportedKind => "RELCORE_INDEX_UNSUPPORTED_KIND",
            IndexErrorCode::Incompatible => "RELCORE_INDEX_INCOMPATIBLE",
            IndexErrorCode::InvalidKey => "RELCORE_INDEX_INVALID_KEY",
            IndexErrorCode::NotFound => "RELCORE_INDEX_NOT_FOUND",
            IndexErrorCode::OrphanRow => "RELCORE_INDEX_ORPHAN_ROW",
            IndexErrorCode::ReadFailed => "RELCORE_INDEX_READ_FAILED",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            IndexErrorCode::UnsupportedKind
            | IndexErrorCode::Incompatible
            | IndexErrorCode::InvalidKey => Severity::Reject,
            IndexErrorCode::NotFound | IndexErrorCode::OrphanRow | IndexErrorCode::ReadFailed => {
                Severity::Fatal
            }
        }
    }
}

impl fmt::Display for IndexErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Index error type with full context
#[derive(Debug, Clone)]
pub struct IndexError {
    code: IndexErrorCode,
    message: String,
    index: Option<String>,
}

impl IndexError {
    /// Create an unsupported virtual index kind error
    pub fn unsupported_kind(index: impl Into<String>, flags: impl fmt::Display) -> Self {
        let index = index.into();
        Self {
            code: IndexErrorCode::UnsupportedKind,
            message: format!("Unsupported index kind for '{}': {}", index, flags),
            index: Some(index),
        }
    }

    /// Create an incompatible composition error
    pub fn incompatible(index: impl Into<String>, reason: impl Into<String>) -> Self {
        let index = index.into();
        Self {
            code: IndexErrorCode::Incompatible,
            message: format!("Index '{}': {}", index, reason.into()),
            index: Some(index),
        }
    }

    /// Create an invalid key error
    pub fn invalid_key(reason: impl Into<String>) -> Self {
        Self {
            code: IndexErrorCode::InvalidKey,
            message: reason.into(),
            index: None,
        }
    }

    /// Create an index not found error
    pub fn not_found(index: impl Into<String>) -> Self {
        let index = index.into();
        Self {
            code: IndexErrorCode::NotFound,
            message: format!("Physical index '{}' not found", index),
            index: Some(index),
        }
    }

    /// Create an orphan inheritor row error
    pub fn orphan_row(index: impl Into<String>, key: impl fmt::Display) -> Self {
        let index = index.into();
        Self {
            code: IndexErrorCode::OrphanRow,
            message: format!(
                "Inheritor '{}' has row with key {} missing from root",
                index, key
            ),
            index: Some(index),
        }
    }

    /// Create a read failed error
    pub fn read_failed(index: impl Into<String>, reason: impl Into<String>) -> Self {
        let index = index.into();
        Self {
            code: IndexErrorCode::ReadFailed,
            message: format!("Reading '{}' failed: {}", index, reason.into()),
            index: Some(index),
        }
    }

    /// Returns the error code
    pub fn code(&self) -> IndexErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the index name if applicable
    pub fn index(&self) -> Option<&str> {
        self.index.as_deref()
    }

    /// Returns whether this is a fatal error
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for IndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )
    }
}

impl std::error::Error for IndexError {}

impl From<TupleError> for IndexError {
    fn from(err: TupleError) -> Self {
        IndexError::invalid_key(err.to_string())
    }
}

/// Result type for index operations
pub type IndexResult<T> = Result<T, IndexError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            IndexErrorCode::UnsupportedKind.code(),
            "RELCORE_INDEX_UNSUPPORTED_KIND"
        );
        assert_eq!(IndexErrorCode::NotFound.code(), "RELCORE_INDEX_NOT_FOUND");
    }

    #[test]
    fn test_resource_errors_are_fatal() {
        assert!(IndexError::not_found("t").is_fatal());
        assert!(IndexError::read_failed("t", "io").is_fatal());
        assert!(!IndexError::unsupported_kind("t", "UNION | JOIN").is_fatal());
    }

    #[test]
    fn test_error_display() {
        let err = IndexError::unsupported_kind("Animal.PK", "VIRTUAL | UNION | JOIN");
        let display = format!("{}", err);
        assert!(display.contains("RELCORE_INDEX_UNSUPPORTED_KIND"));
        assert!(display.contains("Animal.PK"));
        assert_eq!(err.index(), Some("Animal.PK"));
    }
}
