//! Tuple error types
//!
//! Error codes:
//! - RELCORE_TUPLE_ARITY_MISMATCH (REJECT)
//! - RELCORE_TUPLE_TYPE_MISMATCH (REJECT)
//! - RELCORE_TUPLE_FIELD_OUT_OF_RANGE (REJECT)
//! - RELCORE_TUPLE_INVALID_TRANSFORM (REJECT)

use std::fmt;

use crate::error::Severity;

use super::value::FieldType;

/// Tuple-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TupleErrorCode {
    /// Field count differs from the descriptor
    ArityMismatch,
    /// Field value type differs from the descriptor
    TypeMismatch,
    /// Field index outside the descriptor
    FieldOutOfRange,
    /// Transform map inconsistent with its descriptors
    InvalidTransform,
}

impl TupleErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            TupleErrorCode::ArityMismatch => "RELCORE_TUPLE_ARITY_MISMATCH",
            TupleErrorCode::TypeMismatch => "RELCORE_TUPLE_TYPE_MISMATCH",
            TupleErrorCode::FieldOutOfRange => "RELCORE_TUPLE_FIELD_OUT_OF_RANGE",
            TupleErrorCode::InvalidTransform => "RELCORE_TUPLE_INVALID_TRANSFORM",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        Severity::Reject
    }
}

impl fmt::Display for TupleErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Tuple error type with full context
#[derive(Debug, Clone)]
pub struct TupleError {
    code: TupleErrorCode,
    message: String,
    field: Option<usize>,
}

impl TupleError {
    /// Create an arity mismatch error
    pub fn arity_mismatch(expected: usize, actual: usize) -> Self {
        Self {
            code: TupleErrorCode::ArityMismatch,
            message: format!("Expected {} fields, got {}", expected, actual),
            field: None,
        }
    }

    /// Create a type mismatch error
    pub fn type_mismatch(field: usize, expected: FieldType, actual: FieldType) -> Self {
        Self {
            code: TupleErrorCode::TypeMismatch,
            message: format!(
                "Field {} expects {}, got {}",
                field, expected, actual
            ),
            field: Some(field),
        }
    }

    /// Create a field out of range error
    pub fn field_out_of_range(field: usize, len: usize) -> Self {
        Self {
            code: TupleErrorCode::FieldOutOfRange,
            message: format!("Field {} is out of range for {} fields", field, len),
            field: Some(field),
        }
    }

    /// Create an invalid transform error
    pub fn invalid_transform(reason: impl Into<String>) -> Self {
        Self {
            code: TupleErrorCode::InvalidTransform,
            message: reason.into(),
            field: None,
        }
    }

    /// Returns the error code
    pub fn code(&self) -> TupleErrorCode {
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

    /// Returns the offending field if applicable
    pub fn field(&self) -> Option<usize> {
        self.field
    }
}

impl fmt::Display for TupleError {
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

impl std::error::Error for TupleError {}

/// Result type for tuple operations
pub type TupleResult<T> = Result<T, TupleError>;
