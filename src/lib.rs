//! relcore - A relational query compiler and ordered-index execution engine
//!
//! Logical plans are trees of `CompilableProvider` nodes. A chain of
//! compilation strategies turns them into `ExecutableProvider` trees that
//! enumerate rows lazily from ordered indexes, including virtual indexes
//! composed from inheritance mappings.

pub mod compiler;
pub mod config;
pub mod engine;
pub mod error;
pub mod executor;
pub mod index;
pub mod plan;
pub mod tuple;
pub mod virtual_index;

pub use compiler::{CompilationService, LocalCompiler, ProviderCompiler};
pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{Error, Result, Severity};
pub use executor::{ExecutableProvider, RecordSet};
pub use plan::{CompilableProvider, ExplainPlan, RecordHeader};
pub use tuple::{FieldType, FieldValue, Tuple, TupleDescriptor, Value};
