//! Ordered index subsystem for relcore
//!
//! Every data source the engine reads is an `OrderedIndex`: a lazily
//! enumerable, key-ordered sequence of tuples that supports range reads
//! and directional seeks.
//!
//! # Invariants
//!
//! - Rows from `get_items` are monotonic under the index comparer in the
//!   traversal direction
//! - Every `get_items` call returns an independent stream
//! - Merge and join consume ordered inputs and emit ordered outputs
//!
//! Physical indexes come from an `IndexStorage`; `MemoryIndex` is the
//! in-process implementation used by the engine and its tests.

mod comparer;
mod contract;
mod entire;
mod errors;
mod join;
mod memory;
mod merge;
mod range;
mod reader;
mod storage;

pub use comparer::{Direction, KeyComparer, KeyExtractor};
pub use contract::{collect_range, create_reader, OrderedIndex, TupleStream};
pub use entire::{Entire, EntireField, Infinity, Shift};
pub use errors::{IndexError, IndexErrorCode, IndexResult};
pub use join::{InheritanceJoinStream, Inheritor};
pub use memory::MemoryIndex;
pub use merge::MergeStream;
pub use range::{Range, Ray, SeekResult};
pub use reader::{IndexReader, RangeReader};
pub use storage::{IndexStorage, MemoryStorage};
