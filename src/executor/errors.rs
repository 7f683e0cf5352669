//! Executor error types
//!
//! Error codes:
//! - RELCORE_EXEC_MORE_THAN_ONE_ELEMENT (ERROR)
//! - RELCORE_EXEC_NO_ELEMENTS (ERROR)
//! - RELCORE_EXEC_CONTEXT_CLOSED (ERROR)
//! - RELCORE_EXEC_DEPTH_EXCEEDED (ERROR)
//! - RELCORE_EXEC_EVALUATION (severity of the expression error)
//! - RELCORE_EXEC_INDEX (severity of the index error)

use std::fmt;

use crate::error::Severity;
use crate::index::IndexError;
use crate::plan::PlanError;
use crate::tuple::TupleError;

/// Executor-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorErrorCode {
    /// Single apply saw a second right row
    SequenceMoreThanOneElement,
    /// First or Single apply saw no right row
    SequenceEmpty,
    /// Enumeration context used after it was closed
    ContextClosed,
    /// Correlated evaluation nested deeper than configured
    DepthExceeded,
    /// Expression evaluation failed
    Evaluation,
    /// Underlying index failed
    Index,
}

impl ExecutorErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            ExecutorErrorCode::SequenceMoreThanOneElement => "RELCORE_EXEC_MORE_THAN_ONE_ELEMENT",
            ExecutorErrorCode::SequenceEmpty => "RELCORE_EXEC_NO_ELEMENTS",
            ExecutorErrorCode::ContextClosed => "RELCORE_EXEC_CONTEXT_CLOSED",
            ExecutorErrorCode::DepthExceeded => "RELCORE_EXEC_DEPTH_EXCEEDED",
            ExecutorErrorCode::Evaluation => "RELCORE_EXEC_EVALUATION",
            ExecutorErrorCode::Index => "RELCORE_EXEC_INDEX",
        }
    }
}

impl fmt::Display for ExecutorErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Executor error type with full context
#[derive(Debug, Clone)]
pub struct ExecutorError {
    code: ExecutorErrorCode,
    severity: Severity,
    message: String,
}

impl ExecutorError {
    fn new(code: ExecutorErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            severity: Severity::Error,
            message: message.into(),
        }
    }

    /// Create a cardinality error for Single applies
    pub fn sequence_has_more_than_one_element() -> Self {
        Self::new(
            ExecutorErrorCode::SequenceMoreThanOneElement,
            "Sequence contains more than one element",
        )
    }

    /// Create a cardinality error for First and Single applies
    pub fn sequence_is_empty() -> Self {
        Self::new(
            ExecutorErrorCode::SequenceEmpty,
            "Sequence contains no elements",
        )
    }

    /// Create a closed context error
    pub fn context_closed(depth: usize) -> Self {
        Self::new(
            ExecutorErrorCode::ContextClosed,
            format!("Enumeration context at depth {} is closed", depth),
        )
    }

    /// Create a nesting depth error
    pub fn depth_exceeded(max_depth: usize) -> Self {
        Self::new(
            ExecutorErrorCode::DepthExceeded,
            format!("Correlated evaluation nested deeper than {}", max_depth),
        )
    }

    /// Returns the error code
    pub fn code(&self) -> ExecutorErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns whether this is a fatal error
    pub fn is_fatal(&self) -> bool {
        self.severity == Severity::Fatal
    }
}

impl fmt::Display for ExecutorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.code.code(), self.message)
    }
}

impl std::error::Error for ExecutorError {}

impl From<PlanError> for ExecutorError {
    fn from(err: PlanError) -> Self {
        Self {
            code: ExecutorErrorCode::Evaluation,
            severity: err.severity(),
            message: err.to_string(),
        }
    }
}

impl From<IndexError> for ExecutorError {
    fn from(err: IndexError) -> Self {
        Self {
            code: ExecutorErrorCode::Index,
            severity: err.severity(),
            message: err.to_string(),
        }
    }
}

impl From<TupleError> for ExecutorError {
    fn from(err: TupleError) -> Self {
        ExecutorError::from(PlanError::from(err))
    }
}

/// Result type for executor operations
pub type ExecutorResult<T> = Result<T, ExecutorError>;
