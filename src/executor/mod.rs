//! Executor subsystem for relcore
//!
//! Compiled plans are trees of `ExecutableProvider`s. Enumeration is lazy
//! and pull-based: each `enumerate` call returns a fresh row stream, and
//! all per-enumeration state lives in an explicit `EnumerationContext`.
//!
//! # Execution Flow
//!
//! 1. `RecordSet` runs the before-enumeration hooks on the first read
//! 2. Rows are pulled through the operator tree
//! 3. Apply operators evaluate their right subtree per left row in a child
//!    context and close it before moving on
//! 4. After-enumeration hooks release cached items; the context is closed
//!
//! # Invariants
//!
//! - Operators preserve the order their header declares
//! - A closed context is never read from
//! - Errors abort the enumeration and surface from the row stream

mod aggregate;
mod apply;
mod context;
mod errors;
mod filters;
mod join;
mod provider;
mod range;
mod recordset;
mod shape;
mod sorter;
mod source;

#[cfg(test)]
pub(crate) mod testing;

pub use aggregate::AggregateExec;
pub use apply::{ApplyExec, ExistenceExec};
pub use context::{ContextItem, EnumerationContext};
pub use errors::{ExecutorError, ExecutorErrorCode, ExecutorResult};
pub use filters::{DistinctExec, FilterExec, SkipExec, TakeExec};
pub use join::JoinExec;
pub use provider::{Capability, ExecutableProvider, NodeInfo, RowStream};
pub use range::{RangeExec, SeekExec};
pub use recordset::RecordSet;
pub use shape::{AliasExec, CalculateExec, RowNumberExec, SelectExec, SiteExec};
pub use sorter::{RowSorter, SortExec};
pub use source::{IndexExec, RawExec, ReindexExec, StoreExec, TransferExec};
