//! Crate-level error type
//!
//! Every subsystem reports failures through its own coded error
//! (`TupleError`, `IndexError`, `PlanError`, `CompileError`, `ExecutorError`).
//! `Error` unifies them for callers that drive the whole pipeline.

use std::fmt;

use thiserror::Error;

use crate::compiler::CompileError;
use crate::config::ConfigError;
use crate::executor::ExecutorError;
use crate::index::IndexError;
use crate::plan::PlanError;
use crate::tuple::TupleError;

/// Severity levels shared by all subsystem error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Caller mistake detected before or at first use
    Reject,
    /// Enumeration aborted, the engine remains usable
    Error,
    /// Storage or consistency failure below the engine
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Any failure surfaced by the engine
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Tuple(#[from] TupleError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Executor(#[from] ExecutorError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl Error {
    /// Returns the severity of the underlying failure
    pub fn severity(&self) -> Severity {
        match self {
            Error::Tuple(e) => e.severity(),
            Error::Index(e) => e.severity(),
            Error::Plan(e) => e.severity(),
            Error::Compile(e) => e.severity(),
            Error::Executor(e) => e.severity(),
            Error::Config(_) => Severity::Reject,
        }
    }
}

/// Result type for engine-level operations
pub type Result<T> = std::result::Result<T, Error>;
