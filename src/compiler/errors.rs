//! Compiler error types
//!
//! Error codes:
//! - RELCORE_COMPILE_NOT_COMPILED (REJECT)
//! - RELCORE_COMPILE_INCOMPATIBLE (REJECT)
//! - RELCORE_COMPILE_INVALID_PLAN (REJECT)
//! - RELCORE_COMPILE_INDEX (severity of the index error)

use std::fmt;

use crate::error::Severity;
use crate::index::IndexError;
use crate::plan::{PlanError, ProviderId};
use crate::tuple::TupleError;

/// Compiler-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileErrorCode {
    /// No strategy compiled the whole plan
    NotCompiled,
    /// Declared header does not match the compiled source
    Incompatible,
    /// Operator parameters rejected while building an executable
    InvalidPlan,
    /// Building an index failed
    Index,
}

impl CompileErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            CompileErrorCode::NotCompiled => "RELCORE_COMPILE_NOT_COMPILED",
            CompileErrorCode::Incompatible => "RELCORE_COMPILE_INCOMPATIBLE",
            CompileErrorCode::InvalidPlan => "RELCORE_COMPILE_INVALID_PLAN",
            CompileErrorCode::Index => "RELCORE_COMPILE_INDEX",
        }
    }
}

impl fmt::Display for CompileErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Compiler error type with full context
#[derive(Debug, Clone)]
pub struct CompileError {
    code: CompileErrorCode,
    severity: Severity,
    message: String,
    provider: Option<ProviderId>,
}

impl CompileError {
    fn new(code: CompileErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            severity: Severity::Reject,
            message: message.into(),
            provider: None,
        }
    }

    /// Create an error for a plan no strategy could compile
    pub fn not_compiled(root: ProviderId, strategies: &[&str]) -> Self {
        let mut err = Self::new(
            CompileErrorCode::NotCompiled,
            format!(
                "Plan {} was not compiled by any strategy ({})",
                root,
                strategies.join(", ")
            ),
        );
        err.provider = Some(root);
        err
    }

    /// Create a header/source mismatch error
    pub fn incompatible(provider: ProviderId, reason: impl Into<String>) -> Self {
        let mut err = Self::new(
            CompileErrorCode::Incompatible,
            format!("Node {}: {}", provider, reason.into()),
        );
        err.provider = Some(provider);
        err
    }

    /// Returns the error code
    pub fn code(&self) -> CompileErrorCode {
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

    /// Returns the plan node the error is about, if known
    pub fn provider(&self) -> Option<ProviderId> {
        self.provider
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.code.code(), self.message)
    }
}

impl std::error::Error for CompileError {}

impl From<IndexError> for CompileError {
    fn from(err: IndexError) -> Self {
        Self {
            code: CompileErrorCode::Index,
            severity: err.severity(),
            message: err.to_string(),
            provider: None,
        }
    }
}

impl From<PlanError> for CompileError {
    fn from(err: PlanError) -> Self {
        Self::new(CompileErrorCode::InvalidPlan, err.to_string())
    }
}

impl From<TupleError> for CompileError {
    fn from(err: TupleError) -> Self {
        Self::new(CompileErrorCode::InvalidPlan, err.to_string())
    }
}

/// Result type for compilation
pub type CompileResult<T> = Result<T, CompileError>;
