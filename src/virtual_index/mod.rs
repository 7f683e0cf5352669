//! Virtual index composer
//!
//! Composite ordered indexes mirroring inheritance mapping schemes:
//!
//! - Union: subtype partitions of an abstract type, merged by key
//! - Join: class-table inheritance rows reassembled from root and inheritors
//! - Filter: rows whose discriminator is in an allowed set
//! - View: narrowed or reordered columns
//! - Typed: rows tagged with a constant type identifier
//!
//! Every composed index satisfies the `OrderedIndex` contract, so kinds nest
//! freely (a union of joins of filters). A declaration whose flags do not
//! name exactly one kind is rejected with `RELCORE_INDEX_UNSUPPORTED_KIND`.

mod builder;
mod filter;
mod info;
mod join;
mod typed;
mod union;
mod view;

pub use builder::VirtualIndexBuilder;
pub use filter::FilterIndex;
pub use info::{FilterSpec, IndexAttributes, IndexInfo, IndexKind, TypeSpec};
pub use join::JoinIndex;
pub use typed::TypedIndex;
pub use union::UnionIndex;
pub use view::ViewIndex;
