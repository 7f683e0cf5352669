//! K-way union merge over ordered streams
//!
//! Every source must already be ordered under the shared comparer in the
//! merge direction. One cursor per source; each step yields the smallest
//! current row and advances its cursor. A linear scan picks the minimum for
//! small fan-outs, a binary heap for larger ones. Rows with equal keys in
//! different sources come out lowest source index first.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;

use crate::tuple::Tuple;

use super::comparer::{Direction, KeyComparer, KeyExtractor};
use super::contract::TupleStream;
use super::errors::IndexResult;

struct Cursor {
    stream: TupleStream,
    current: Option<(Tuple, Tuple)>,
}

struct HeapEntry {
    key: Tuple,
    source: usize,
    comparer: Arc<KeyComparer>,
    direction: Direction,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    // BinaryHeap is a max-heap: invert so the smallest key pops first
    fn cmp(&self, other: &Self) -> Ordering {
        self.direction
            .apply(self.comparer.compare(&self.key, &other.key))
            .then(self.source.cmp(&other.source))
            .reverse()
    }
}

/// Ordered union of several ordered streams
pub struct MergeStream {
    cursors: Vec<Cursor>,
    extractor: KeyExtractor,
    comparer: Arc<KeyComparer>,
    direction: Direction,
    heap: Option<BinaryHeap<HeapEntry>>,
    started: bool,
    failed: bool,
}

impl MergeStream {
    /// Creates a merge; a heap is used once `sources.len() >= heap_threshold`.
    pub fn new(
        sources: Vec<TupleStream>,
        extractor: KeyExtractor,
        comparer: KeyComparer,
        direction: Direction,
        heap_threshold: usize,
    ) -> Self {
        let heap = (sources.len() >= heap_threshold).then(BinaryHeap::new);
        let cursors = sources
            .into_iter()
            .map(|stream| Cursor {
                stream,
                current: None,
            })
            .collect();
        Self {
            cursors,
            extractor,
            comparer: Arc::new(comparer),
            direction,
            heap,
            started: false,
            failed: false,
        }
    }

    pub fn uses_heap(&self) -> bool {
        self.heap.is_some()
    }

    /// Advances one cursor and, in heap mode, re-queues it
    fn advance(&mut self, source: usize) -> IndexResult<()> {
        let cursor = &mut self.cursors[source];
        cursor.current = match cursor.stream.next().transpose()? {
            Some(row) => Some((self.extractor.extract(&row), row)),
            None => None,
        };
        if let (Some(heap), Some((key, _))) = (self.heap.as_mut(), cursor.current.as_ref()) {
            heap.push(HeapEntry {
                key: key.clone(),
                source,
                comparer: self.comparer.clone(),
                direction: self.direction,
            });
        }
        Ok(())
    }

    fn start(&mut self) -> IndexResult<()> {
        self.started = true;
        for source in 0..self.cursors.len() {
            self.advance(source)?;
        }
        Ok(())
    }

    fn pick_linear(&self) -> Option<usize> {
        let mut best: Option<(usize, &Tuple)> = None;
        for (source, cursor) in self.cursors.iter().enumerate() {
            let Some((key, _)) = &cursor.current else {
                continue;
            };
            let better = match best {
                None => true,
                Some((_, best_key)) => {
                    self.direction.apply(self.comparer.compare(key, best_key)) == Ordering::Less
                }
            };
            if better {
                best = Some((source, key));
            }
        }
        best.map(|(source, _)| source)
    }

    fn pick(&mut self) -> Option<usize> {
        match self.heap.as_mut() {
            Some(heap) => heap.pop().map(|entry| entry.source),
            None => self.pick_linear(),
        }
    }

    fn next_row(&mut self) -> IndexResult<Option<Tuple>> {
        if !self.started {
            self.start()?;
        }
        let Some(source) = self.pick() else {
            return Ok(None);
        };
        let row = self.cursors[source].current.take().map(|(_, row)| row);
        self.advance(source)?;
        Ok(row)
    }
}

impl Iterator for MergeStream {
    type Item = IndexResult<Tuple>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.next_row() {
            Ok(row) => row.map(Ok),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuple::Value;
    use proptest::prelude::*;

    fn stream(keys: Vec<i64>) -> TupleStream {
        Box::new(
            keys.into_iter()
                .map(|k| Ok(Tuple::from_values([Value::Int(k)]))),
        )
    }

    fn merge(sources: Vec<Vec<i64>>, direction: Direction, threshold: usize) -> Vec<i64> {
        let extractor = KeyExtractor::new(
            Tuple::from_values([Value::Int(0)]).descriptor(),
            vec![0],
        )
        .unwrap();
        let streams = sources.into_iter().map(stream).collect();
        MergeStream::new(streams, extractor, KeyComparer::ascending(1), direction, threshold)
            .map(|r| r.unwrap().value(0).and_then(Value::as_int).unwrap())
            .collect()
    }

    #[test]
    fn test_linear_merge() {
        let out = merge(vec![vec![1, 4, 7], vec![2, 5], vec![3, 6, 8, 9]], Direction::Positive, 8);
        assert_eq!(out, vec![1, 2, 3, 4, 5, 6, 7, 8, 9]);
    }

    #[test]
    fn test_heap_merge() {
        let out = merge(vec![vec![1, 4, 7], vec![2, 5], vec![3, 6, 8, 9]], Direction::Positive, 1);
        assert_eq!(out, vec![1, 2, 3, 4, 5, 6, 7, 8, 9]);
    }

    #[test]
    fn test_backward_merge() {
        let out = merge(vec![vec![9, 3], vec![8, 4, 1]], Direction::Negative, 8);
        assert_eq!(out, vec![9, 8, 4, 3, 1]);
    }

    #[test]
    fn test_empty_sources() {
        assert!(merge(vec![], Direction::Positive, 8).is_empty());
        assert_eq!(merge(vec![vec![], vec![2]], Direction::Positive, 8), vec![2]);
    }

    #[test]
    fn test_error_ends_stream() {
        let extractor = KeyExtractor::new(
            Tuple::from_values([Value::Int(0)]).descriptor(),
            vec![0],
        )
        .unwrap();
        let failing: TupleStream = Box::new(std::iter::once(Err(
            crate::index::IndexError::read_failed("broken", "disk gone"),
        )));
        let mut merged = MergeStream::new(
            vec![stream(vec![1]), failing],
            extractor,
            KeyComparer::ascending(1),
            Direction::Positive,
            8,
        );
        assert!(merged.next().unwrap().is_err());
        assert!(merged.next().is_none());
    }

    fn sorted_disjoint_sources() -> impl Strategy<Value = Vec<Vec<i64>>> {
        (1usize..6, prop::collection::btree_set(-1000i64..1000, 0..60)).prop_flat_map(
            |(n, keys)| {
                let keys: Vec<i64> = keys.into_iter().collect();
                let len = keys.len();
                (Just(n), Just(keys), prop::collection::vec(0..n, len))
            },
        )
        .prop_map(|(n, keys, owners)| {
            let mut sources = vec![Vec::new(); n];
            for (key, owner) in keys.into_iter().zip(owners) {
                sources[owner].push(key);
            }
            sources
        })
    }

    proptest! {
        #[test]
        fn prop_merge_is_sorted_union(sources in sorted_disjoint_sources(), threshold in 1usize..8) {
            let mut expected: Vec<i64> = sources.iter().flatten().copied().collect();
            expected.sort_unstable();

            let out = merge(sources, Direction::Positive, threshold);
            prop_assert!(out.windows(2).all(|w| w[0] <= w[1]));
            prop_assert_eq!(out, expected);
        }
    }
}
