//! In-memory physical index
//!
//! Rows are kept in a sorted vector under the index comparer. Inserts use
//! binary search so the order is maintained without re-sorting; rows with
//! equal keys keep insertion order.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::tuple::{Tuple, TupleDescriptor};

use super::comparer::{Direction, KeyComparer, KeyExtractor};
use super::contract::{OrderedIndex, TupleStream};
use super::errors::{IndexError, IndexResult};
use super::range::{Range, Ray, SeekResult};

/// Sorted, in-memory ordered index.
#[derive(Debug, Clone)]
pub struct MemoryIndex {
    name: String,
    descriptor: Arc<TupleDescriptor>,
    extractor: KeyExtractor,
    comparer: KeyComparer,
    unique: bool,
    rows: Arc<Vec<Tuple>>,
}

impl MemoryIndex {
    /// Creates an empty index keyed by `key_columns`.
    ///
    /// Unique indexes replace rows with an equal key on insert.
    pub fn new(
        name: impl Into<String>,
        descriptor: Arc<TupleDescriptor>,
        key_columns: &[(usize, Direction)],
        unique: bool,
    ) -> IndexResult<Self> {
        let columns = key_columns.iter().map(|&(c, _)| c).collect();
        let directions = key_columns.iter().map(|&(_, d)| d).collect();
        let extractor = KeyExtractor::new(&descriptor, columns)?;
        Ok(Self {
            name: name.into(),
            descriptor,
            extractor,
            comparer: KeyComparer::new(directions),
            unique,
            rows: Arc::new(Vec::new()),
        })
    }

    /// Creates a non-unique index holding `rows`
    pub fn from_rows(
        name: impl Into<String>,
        descriptor: Arc<TupleDescriptor>,
        key_columns: &[(usize, Direction)],
        rows: impl IntoIterator<Item = Tuple>,
    ) -> IndexResult<Self> {
        let mut index = Self::new(name, descriptor, key_columns, false)?;
        for row in rows {
            index.insert(row)?;
        }
        Ok(index)
    }

    /// Inserts a row, maintaining key order.
    pub fn insert(&mut self, row: Tuple) -> IndexResult<()> {
        if row.descriptor() != &self.descriptor {
            return Err(IndexError::incompatible(
                &self.name,
                format!(
                    "row {} does not match descriptor {}",
                    row.descriptor(),
                    self.descriptor
                ),
            ));
        }
        let key = self.extractor.extract(&row);
        let pos = self.upper_bound(&key);
        let rows = Arc::make_mut(&mut self.rows);

        if self.unique && pos > 0 {
            let previous = self.extractor.extract(&rows[pos - 1]);
            if self.comparer.compare(&previous, &key) == Ordering::Equal {
                rows[pos - 1] = row;
                return Ok(());
            }
        }
        rows.insert(pos, row);
        Ok(())
    }

    /// Removes every row whose key equals `key`, returning how many went.
    pub fn remove(&mut self, key: &Tuple) -> usize {
        let start = self.lower_bound(key);
        let end = self.upper_bound(key);
        if start < end {
            Arc::make_mut(&mut self.rows).drain(start..end);
        }
        end - start
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    /// First position whose key is not less than `key`
    fn lower_bound(&self, key: &Tuple) -> usize {
        self.rows.partition_point(|r| {
            self.comparer.compare(&self.extractor.extract(r), key) == Ordering::Less
        })
    }

    /// First position whose key is greater than `key`
    fn upper_bound(&self, key: &Tuple) -> usize {
        self.rows.partition_point(|r| {
            self.comparer.compare(&self.extractor.extract(r), key) != Ordering::Greater
        })
    }

    /// Half-open position span covered by `range`
    fn span(&self, range: &Range) -> (usize, usize) {
        let (low, high) = range.bounds(&self.comparer);
        let start = self.rows.partition_point(|r| {
            low.compare_key(&self.extractor.extract(r), &self.comparer) == Ordering::Greater
        });
        let end = self.rows.partition_point(|r| {
            high.compare_key(&self.extractor.extract(r), &self.comparer) != Ordering::Less
        });
        (start, end.max(start))
    }
}

impl OrderedIndex for MemoryIndex {
    fn name(&self) -> &str {
        &self.name
    }

    fn descriptor(&self) -> &Arc<TupleDescriptor> {
        &self.descriptor
    }

    fn key_extractor(&self) -> &KeyExtractor {
        &self.extractor
    }

    fn comparer(&self) -> &KeyComparer {
        &self.comparer
    }

    fn count(&self) -> Option<u64> {
        Some(self.rows.len() as u64)
    }

    fn get_items(&self, range: &Range) -> IndexResult<TupleStream> {
        let (start, end) = self.span(range);
        let rows = self.rows.clone();
        let stream: TupleStream = match range.direction(&self.comparer) {
            Direction::Positive => Box::new((start..end).map(move |i| Ok(rows[i].clone()))),
            Direction::Negative => {
                Box::new((start..end).rev().map(move |i| Ok(rows[i].clone())))
            }
        };
        Ok(stream)
    }

    fn seek(&self, ray: &Ray) -> IndexResult<SeekResult> {
        let found = match ray.direction {
            Direction::Positive => {
                let pos = self.rows.partition_point(|r| {
                    ray.point.compare_key(&self.extractor.extract(r), &self.comparer)
                        == Ordering::Greater
                });
                self.rows.get(pos)
            }
            Direction::Negative => {
                let pos = self.rows.partition_point(|r| {
                    ray.point.compare_key(&self.extractor.extract(r), &self.comparer)
                        != Ordering::Less
                });
                pos.checked_sub(1).and_then(|p| self.rows.get(p))
            }
        };

        Ok(match found {
            Some(row) => {
                let key = self.extractor.extract(row);
                if ray.point.compare_key(&key, &self.comparer) == Ordering::Equal {
                    SeekResult::Exact(row.clone())
                } else {
                    SeekResult::Nearest(row.clone())
                }
            }
            None => SeekResult::None,
        })
    }
}
