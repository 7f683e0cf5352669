//! Plan error types
//!
//! Error codes:
//! - RELCORE_PLAN_INVALID_COLUMN (REJECT)
//! - RELCORE_PLAN_TYPE_MISMATCH (REJECT)
//! - RELCORE_PLAN_INVALID_PARAMETER (REJECT)
//! - RELCORE_PLAN_ORDER_REQUIRED (REJECT)
//! - RELCORE_PLAN_UNBOUND_PARAMETER (REJECT)
//! - RELCORE_PLAN_ARITHMETIC (ERROR)

use std::fmt;

use crate::error::Severity;
use crate::tuple::{FieldType, TupleError, TupleErrorCode};

/// Plan-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanErrorCode {
    /// Column index outside the source header
    InvalidColumn,
    /// Expression or column type not accepted by the operator
    TypeMismatch,
    /// Operator parameter outside its domain
    InvalidParameter,
    /// Operator needs an ordered source
    OrderRequired,
    /// Apply parameter read outside the scope that binds it
    UnboundParameter,
    /// Arithmetic overflow or division during evaluation
    Arithmetic,
}

impl PlanErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            PlanErrorCode::InvalidColumn => "RELCORE_PLAN_INVALID_COLUMN",
            PlanErrorCode::TypeMismatch => "RELCORE_PLAN_TYPE_MISMATCH",
            PlanErrorCode::InvalidParameter => "RELCORE_PLAN_INVALID_PARAMETER",
            PlanErrorCode::OrderRequired => "RELCORE_PLAN_ORDER_REQUIRED",
            PlanErrorCode::UnboundParameter => "RELCORE_PLAN_UNBOUND_PARAMETER",
            PlanErrorCode::Arithmetic => "RELCORE_PLAN_ARITHMETIC",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            PlanErrorCode::Arithmetic => Severity::Error,
            _ => Severity::Reject,
        }
    }
}

impl fmt::Display for PlanErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Plan error type with full context
#[derive(Debug, Clone)]
pub struct PlanError {
    code: PlanErrorCode,
    message: String,
    column: Option<usize>,
}

impl PlanError {
    /// Create an invalid column error
    pub fn invalid_column(column: usize, len: usize) -> Self {
        Self {
            code: PlanErrorCode::InvalidColumn,
            message: format!("Column {} out of range for header of {} columns", column, len),
            column: Some(column),
        }
    }

    /// Create a type mismatch error
    pub fn type_mismatch(context: impl Into<String>, expected: &str, actual: FieldType) -> Self {
        Self {
            code: PlanErrorCode::TypeMismatch,
            message: format!("{}: expected {}, found {}", context.into(), expected, actual),
            column: None,
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter(reason: impl Into<String>) -> Self {
        Self {
            code: PlanErrorCode::InvalidParameter,
            message: reason.into(),
            column: None,
        }
    }

    /// Create an order required error
    pub fn order_required(operator: &str) -> Self {
        Self {
            code: PlanErrorCode::OrderRequired,
            message: format!("{} requires an ordered source", operator),
            column: None,
        }
    }

    /// Create an unbound apply parameter error
    pub fn unbound_parameter(parameter: impl fmt::Display) -> Self {
        Self {
            code: PlanErrorCode::UnboundParameter,
            message: format!("Apply parameter {} is not bound in this scope", parameter),
            column: None,
        }
    }

    /// Create an arithmetic error
    pub fn arithmetic(reason: impl Into<String>) -> Self {
        Self {
            code: PlanErrorCode::Arithmetic,
            message: reason.into(),
            column: None,
        }
    }

    /// Returns the error code
    pub fn code(&self) -> PlanErrorCode {
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

    /// Returns the column if applicable
    pub fn column(&self) -> Option<usize> {
        self.column
    }
}

impl fmt::Display for PlanError {
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

impl std::error::Error for PlanError {}

impl From<TupleError> for PlanError {
    fn from(err: TupleError) -> Self {
        let code = match err.code() {
            TupleErrorCode::FieldOutOfRange => PlanErrorCode::InvalidColumn,
            TupleErrorCode::TypeMismatch => PlanErrorCode::TypeMismatch,
            TupleErrorCode::ArityMismatch | TupleErrorCode::InvalidTransform => {
                PlanErrorCode::InvalidParameter
            }
        };
        Self {
            code,
            message: err.message().to_string(),
            column: err.field(),
        }
    }
}

/// Result type for plan construction and expression evaluation
pub type PlanResult<T> = Result<T, PlanError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            PlanErrorCode::InvalidColumn.code(),
            "RELCORE_PLAN_INVALID_COLUMN"
        );
        assert_eq!(PlanErrorCode::OrderRequired.severity(), Severity::Reject);
        assert_eq!(PlanErrorCode::Arithmetic.severity(), Severity::Error);
    }

    #[test]
    fn test_error_display() {
        let err = PlanError::invalid_column(4, 2);
        let display = format!("{}", err);
        assert!(display.contains("RELCORE_PLAN_INVALID_COLUMN"));
        assert!(display.contains("REJECT"));
        assert_eq!(err.column(), Some(4));
    }
}
