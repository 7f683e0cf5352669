//! Index readers
//!
//! A reader is a repositionable cursor over one range of an index. Dropping
//! the reader releases its stream.

use crate::tuple::Tuple;

use super::contract::{OrderedIndex, TupleStream};
use super::entire::Entire;
use super::errors::IndexResult;
use super::range::Range;

/// Cursor over an index range
pub trait IndexReader {
    /// Range this reader was created for
    fn range(&self) -> &Range;

    /// Advances to the next row; returns false when exhausted
    fn move_next(&mut self) -> IndexResult<bool>;

    /// Row under the cursor, if positioned on one
    fn current(&self) -> Option<&Tuple>;

    /// Repositions so the next `move_next` lands on the first row at or
    /// past `key`, staying within the reader's range
    fn move_to(&mut self, key: &Entire) -> IndexResult<()>;

    /// Returns to the start of the range
    fn reset(&mut self);
}

/// Generic reader built on `OrderedIndex::get_items`
pub struct RangeReader<'a> {
    index: &'a dyn OrderedIndex,
    range: Range,
    /// Range still to traverse; `None` once repositioned past the end
    active: Option<Range>,
    stream: Option<TupleStream>,
    current: Option<Tuple>,
}

impl<'a> RangeReader<'a> {
    pub fn new(index: &'a dyn OrderedIndex, range: Range) -> Self {
        Self {
            index,
            active: Some(range.clone()),
            range,
            stream: None,
            current: None,
        }
    }
}

impl IndexReader for RangeReader<'_> {
    fn range(&self) -> &Range {
        &self.range
    }

    fn move_next(&mut self) -> IndexResult<bool> {
        if self.stream.is_none() {
            match &self.active {
                Some(active) => self.stream = Some(self.index.get_items(active)?),
                None => {
                    self.current = None;
                    return Ok(false);
                }
            }
        }
        let next = match self.stream.as_mut() {
            Some(stream) => stream.next().transpose()?,
            None => None,
        };
        self.current = next;
        Ok(self.current.is_some())
    }

    fn current(&self) -> Option<&Tuple> {
        self.current.as_ref()
    }

    fn move_to(&mut self, key: &Entire) -> IndexResult<()> {
        self.active = self.range.starting_at(key, self.index.comparer());
        self.stream = None;
        self.current = None;
        Ok(())
    }

    fn reset(&mut self) {
        self.active = Some(self.range.clone());
        self.stream = None;
        self.current = None;
    }
}
