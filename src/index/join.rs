//! Inheritance join over ordered streams
//!
//! Reassembles class-table-inheritance rows: one output row per root row,
//! holding the root columns followed by each inheritor's extra columns.
//! Inheritors are keyed by a leading prefix shared with the root and are
//! expected to be subsets of the root key space. When an inheritor has no
//! row for a root key, a blank (all-unavailable) tuple stands in for it.

use std::cmp::Ordering;

use tracing::debug;

use crate::config::OrphanPolicy;
use crate::tuple::{MapTransform, Tuple};

use super::comparer::{Direction, KeyComparer, KeyExtractor};
use super::contract::TupleStream;
use super::errors::{IndexError, IndexResult};

/// One inheritor input of the join
pub struct Inheritor {
    pub name: String,
    pub stream: TupleStream,
    pub extractor: KeyExtractor,
    pub blank: Tuple,
}

struct InheritorCursor {
    input: Inheritor,
    current: Option<(Tuple, Tuple)>,
}

impl InheritorCursor {
    fn advance(&mut self) -> IndexResult<()> {
        self.current = match self.input.stream.next().transpose()? {
            Some(row) => Some((self.input.extractor.extract(&row), row)),
            None => None,
        };
        Ok(())
    }
}

/// Streaming inheritance join
pub struct InheritanceJoinStream {
    root: TupleStream,
    root_extractor: KeyExtractor,
    inheritors: Vec<InheritorCursor>,
    comparer: KeyComparer,
    direction: Direction,
    transform: MapTransform,
    orphan_policy: OrphanPolicy,
    started: bool,
    done: bool,
}

impl InheritanceJoinStream {
    /// `transform` takes the root row in slot 0 and inheritor `i` in slot
    /// `i + 1`.
    pub fn new(
        root: TupleStream,
        root_extractor: KeyExtractor,
        inheritors: Vec<Inheritor>,
        comparer: KeyComparer,
        direction: Direction,
        transform: MapTransform,
        orphan_policy: OrphanPolicy,
    ) -> Self {
        let inheritors = inheritors
            .into_iter()
            .map(|input| InheritorCursor {
                input,
                current: None,
            })
            .collect();
        Self {
            root,
            root_extractor,
            inheritors,
            comparer,
            direction,
            transform,
            orphan_policy,
            started: false,
            done: false,
        }
    }

    fn orphan(policy: OrphanPolicy, cursor: &InheritorCursor, key: &Tuple) -> IndexResult<()> {
        match policy {
            OrphanPolicy::Drop => {
                debug!(
                    inheritor = %cursor.input.name,
                    key = %key,
                    "dropping inheritor row without root row"
                );
                Ok(())
            }
            OrphanPolicy::Error => Err(IndexError::orphan_row(&cursor.input.name, key)),
        }
    }

    /// Drains inheritor rows left after the root is exhausted
    fn finish(&mut self) -> IndexResult<()> {
        for cursor in &mut self.inheritors {
            while let Some((key, _)) = cursor.current.take() {
                Self::orphan(self.orphan_policy, cursor, &key)?;
                cursor.advance()?;
            }
        }
        Ok(())
    }

    fn next_row(&mut self) -> IndexResult<Option<Tuple>> {
        if !self.started {
            self.started = true;
            for cursor in &mut self.inheritors {
                cursor.advance()?;
            }
        }

        let Some(root) = self.root.next().transpose()? else {
            self.finish()?;
            return Ok(None);
        };
        let root_key = self.root_extractor.extract(&root);

        let mut parts: Vec<Tuple> = Vec::with_capacity(self.inheritors.len());
        for cursor in &mut self.inheritors {
            let mut matched = None;
            while let Some((key, _)) = &cursor.current {
                match self.direction.apply(self.comparer.compare(key, &root_key)) {
                    Ordering::Less => {
                        let key = key.clone();
                        Self::orphan(self.orphan_policy, cursor, &key)?;
                        cursor.advance()?;
                    }
                    Ordering::Equal => {
                        matched = cursor.current.take().map(|(_, row)| row);
                        cursor.advance()?;
                        break;
                    }
                    Ordering::Greater => break,
                }
            }
            parts.push(matched.unwrap_or_else(|| cursor.input.blank.clone()));
        }

        let mut sources: Vec<&Tuple> = Vec::with_capacity(parts.len() + 1);
        sources.push(&root);
        sources.extend(parts.iter());
        Ok(Some(self.transform.apply(&sources)))
    }
}

impl Iterator for InheritanceJoinStream {
    type Item = IndexResult<Tuple>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_row() {
            Ok(Some(row)) => Some(Ok(row)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexErrorCode;
    use crate::tuple::{FieldType, TupleDescriptor, Value};

    fn root_rows(keys: &[i64]) -> TupleStream {
        let rows: Vec<_> = keys
            .iter()
            .map(|&k| Ok(Tuple::from_values([Value::Int(k), Value::Text(format!("r{}", k))])))
            .collect();
        Box::new(rows.into_iter())
    }

    fn child_rows(keys: &[i64]) -> TupleStream {
        let rows: Vec<_> = keys
            .iter()
            .map(|&k| Ok(Tuple::from_values([Value::Int(k), Value::Float(k as f64 * 10.0)])))
            .collect();
        Box::new(rows.into_iter())
    }

    fn join(root: &[i64], child: &[i64], policy: OrphanPolicy) -> InheritanceJoinStream {
        let root_desc = TupleDescriptor::create(vec![FieldType::Int, FieldType::Text]);
        let child_desc = TupleDescriptor::create(vec![FieldType::Int, FieldType::Float]);
        let output = TupleDescriptor::create(vec![FieldType::Int, FieldType::Text, FieldType::Float]);
        let transform = MapTransform::new(
            output,
            vec![root_desc.clone(), child_desc.clone()],
            vec![(0, 0), (0, 1), (1, 1)],
        )
        .unwrap();

        InheritanceJoinStream::new(
            root_rows(root),
            KeyExtractor::new(&root_desc, vec![0]).unwrap(),
            vec![Inheritor {
                name: "child".into(),
                stream: child_rows(child),
                extractor: KeyExtractor::new(&child_desc, vec![0]).unwrap(),
                blank: Tuple::blank(child_desc),
            }],
            KeyComparer::ascending(1),
            Direction::Positive,
            transform,
            policy,
        )
    }

    #[test]
    fn test_join_completeness() {
        let rows: Vec<Tuple> = join(&[1, 2, 3], &[2], OrphanPolicy::Drop)
            .collect::<IndexResult<_>>()
            .unwrap();

        assert_eq!(rows.len(), 3);
        assert!(!rows[0].is_available(2));
        assert_eq!(rows[1].value(2), Some(&Value::Float(20.0)));
        assert!(!rows[2].is_available(2));
        assert_eq!(rows[2].value(1), Some(&Value::Text("r3".into())));
    }

    #[test]
    fn test_orphans_dropped_by_default() {
        let rows: Vec<Tuple> = join(&[2, 4], &[1, 2, 3, 5], OrphanPolicy::Drop)
            .collect::<IndexResult<_>>()
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].value(2), Some(&Value::Float(20.0)));
        assert!(!rows[1].is_available(2));
    }

    #[test]
    fn test_orphan_error_policy() {
        let err = join(&[2], &[1, 2], OrphanPolicy::Error)
            .collect::<IndexResult<Vec<_>>>()
            .unwrap_err();
        assert_eq!(err.code(), IndexErrorCode::OrphanRow);
    }

    #[test]
    fn test_trailing_orphan_error_policy() {
        let mut stream = join(&[1], &[1, 9], OrphanPolicy::Error);
        assert!(stream.next().unwrap().is_ok());
        assert!(stream.next().unwrap().is_err());
        assert!(stream.next().is_none());
    }
}
