//! Logical plan subsystem for relcore
//!
//! A plan is a DAG of immutable `CompilableProvider` nodes built bottom-up
//! by the caller. Each node derives its `RecordHeader` from its sources when
//! it is built and carries its operator parameters in `ProviderKind`.
//! Nothing executes until the plan is compiled.
//!
//! # Invariants
//!
//! - A node's header order matches the order its executable emits rows in
//! - Builders reject invalid columns, types and parameters up front
//! - Nodes are never mutated after construction

mod errors;
mod explain;
mod expr;
mod header;
mod provider;

pub use errors::{PlanError, PlanErrorCode, PlanResult};
pub use explain::{ExplainNode, ExplainPlan};
pub use expr::{ApplyParameter, ArithOp, CompareOp, Expr, NoParameters, ParameterSource};
pub use header::{Column, RecordHeader, SortOrder};
pub use provider::{
    AggregateColumn, AggregateKind, ApplySequenceType, ApplyType, BoundSpec, CalculatedColumn,
    CompilableProvider, ExecutionSite, JoinAlgorithm, JoinType, ProviderId, ProviderKind,
    RangeSpec,
};
