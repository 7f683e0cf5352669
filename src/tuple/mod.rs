//! Tuple & Transform layer
//!
//! Fixed-arity rows of typed fields. Every field tracks availability
//! separately from its value: a field can be "not loaded" rather than null.
//!
//! # Invariants
//!
//! - A tuple always conforms to its descriptor (arity + per-field type)
//! - Descriptors are immutable and shared via `Arc`
//! - Transforms are pure: they never mutate their inputs

mod descriptor;
mod errors;
mod transform;
mod tuple;
mod value;

pub use descriptor::TupleDescriptor;
pub use errors::{TupleError, TupleErrorCode, TupleResult};
pub use transform::{CombineTransform, MapTransform};
pub use tuple::Tuple;
pub use value::{FieldType, FieldValue, Value};
