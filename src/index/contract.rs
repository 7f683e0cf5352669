//! Ordered index contract
//!
//! Every data source the engine reads, physical or virtual, implements
//! `OrderedIndex`. Items produced by `get_items` and by readers are
//! monotonic under the index comparer in the traversal direction. This is
//! a precondition of the merge and join algorithms and is never re-checked.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::tuple::{Tuple, TupleDescriptor};

use super::comparer::{Direction, KeyComparer, KeyExtractor};
use super::entire::Entire;
use super::errors::IndexResult;
use super::range::{Range, Ray, SeekResult};
use super::reader::{IndexReader, RangeReader};

/// Lazy, owned stream of index rows.
///
/// Each call to `get_items` yields a fresh stream; streams share no cursor
/// state.
pub type TupleStream = Box<dyn Iterator<Item = IndexResult<Tuple>>>;

/// An ordered data source
pub trait OrderedIndex: fmt::Debug {
    /// Index name for diagnostics
    fn name(&self) -> &str;

    /// Descriptor of the rows this index yields
    fn descriptor(&self) -> &Arc<TupleDescriptor>;

    /// Projection from a row to its key
    fn key_extractor(&self) -> &KeyExtractor;

    /// Comparer consistent with the index order
    fn comparer(&self) -> &KeyComparer;

    /// Rows within `range`, in the range's traversal direction
    fn get_items(&self, range: &Range) -> IndexResult<TupleStream>;

    /// Number of rows, when known without enumerating
    fn count(&self) -> Option<u64> {
        None
    }

    fn key_descriptor(&self) -> &Arc<TupleDescriptor> {
        self.key_extractor().descriptor()
    }

    fn extract_key(&self, row: &Tuple) -> Tuple {
        self.key_extractor().extract(row)
    }

    /// First row at or past `ray.point` in `ray.direction`
    fn seek(&self, ray: &Ray) -> IndexResult<SeekResult> {
        let mut items = self.get_items(&ray.to_range())?;
        match items.next().transpose()? {
            Some(row) => {
                let key = self.extract_key(&row);
                if self.comparer().compare_entire_key(&ray.point, &key) == Ordering::Equal {
                    Ok(SeekResult::Exact(row))
                } else {
                    Ok(SeekResult::Nearest(row))
                }
            }
            None => Ok(SeekResult::None),
        }
    }

    /// Seek for an exact key, forward
    fn seek_key(&self, key: &Tuple) -> IndexResult<SeekResult> {
        self.seek(&Ray::new(Entire::key(key), Direction::Positive))
    }

    /// Cursor over `range`
    fn create_reader(&self, range: &Range) -> IndexResult<Box<dyn IndexReader + '_>>
    where
        Self: Sized,
    {
        Ok(Box::new(RangeReader::new(self, range.clone())))
    }
}

/// Reader over any index, including trait objects
pub fn create_reader<'a>(
    index: &'a dyn OrderedIndex,
    range: &Range,
) -> Box<dyn IndexReader + 'a> {
    Box::new(RangeReader::new(index, range.clone()))
}

/// Collects every row in `range`; used by tests and materialising operators
pub fn collect_range(index: &dyn OrderedIndex, range: &Range) -> IndexResult<Vec<Tuple>> {
    index.get_items(range)?.collect()
}
