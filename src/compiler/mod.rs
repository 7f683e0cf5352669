//! Compiler subsystem for relcore
//!
//! Turns a logical plan into an executable tree. Compilation is bottom-up
//! and strategy-driven: a `ProviderCompiler` has a rule per node kind, the
//! `Compiler` driver applies one strategy to a whole plan, and the
//! `CompilationService` tries its strategies in order until one compiles
//! every node.
//!
//! # Invariants
//!
//! - A node is compiled only after all of its sources were
//! - A node shared by several parents yields a single executable
//! - An executable only reads sources running at its own site; others are
//!   wrapped in a transfer
//! - A plan no strategy fully compiles is rejected, never half-compiled

mod compiler;
mod errors;
mod local;
mod service;

pub use compiler::{Compiled, Compiler, ProviderCompiler};
pub use errors::{CompileError, CompileErrorCode, CompileResult};
pub use local::LocalCompiler;
pub use service::CompilationService;
