//! Key comparison and extraction

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::tuple::{Tuple, TupleDescriptor, TupleResult};

use super::entire::Entire;

/// Sort or traversal direction.
///
/// `Positive` is ascending order (or forward traversal of an index),
/// `Negative` is descending order (or backward traversal).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Positive,
    Negative,
}

impl Direction {
    /// Applies this direction to an ascending comparison result
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Direction::Positive => ordering,
            Direction::Negative => ordering.reverse(),
        }
    }

    pub fn reverse(self) -> Self {
        match self {
            Direction::Positive => Direction::Negative,
            Direction::Negative => Direction::Positive,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Positive => "asc",
            Direction::Negative => "desc",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Compares key tuples field-by-field, each field in its own direction.
///
/// Keys shorter than the comparer compare as equal on the missing
/// trailing fields, which makes prefix keys usable for seeks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyComparer {
    directions: Vec<Direction>,
}

impl KeyComparer {
    pub fn new(directions: Vec<Direction>) -> Self {
        Self { directions }
    }

    /// Comparer with every field ascending
    pub fn ascending(len: usize) -> Self {
        Self::new(vec![Direction::Positive; len])
    }

    pub fn directions(&self) -> &[Direction] {
        &self.directions
    }

    pub fn len(&self) -> usize {
        self.directions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directions.is_empty()
    }

    /// Direction of a key field; fields past the declared ones are ascending
    pub fn direction(&self, field: usize) -> Direction {
        self.directions
            .get(field)
            .copied()
            .unwrap_or(Direction::Positive)
    }

    /// Compares two key tuples
    pub fn compare(&self, a: &Tuple, b: &Tuple) -> Ordering {
        for (i, (x, y)) in a.fields().iter().zip(b.fields()).enumerate() {
            let ordering = self.direction(i).apply(x.cmp(y));
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }

    /// Compares a range bound against a key tuple
    pub fn compare_entire_key(&self, bound: &Entire, key: &Tuple) -> Ordering {
        bound.compare_key(key, self)
    }

    /// Compares two range bounds
    pub fn compare_entire(&self, a: &Entire, b: &Entire) -> Ordering {
        a.compare(b, self)
    }
}

/// Projects a full row onto its key fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyExtractor {
    columns: Vec<usize>,
    descriptor: Arc<TupleDescriptor>,
}

impl KeyExtractor {
    pub fn new(row: &TupleDescriptor, columns: Vec<usize>) -> TupleResult<Self> {
        let descriptor = row.project(&columns)?;
        Ok(Self {
            columns,
            descriptor,
        })
    }

    pub fn columns(&self) -> &[usize] {
        &self.columns
    }

    /// Key tuple descriptor
    pub fn descriptor(&self) -> &Arc<TupleDescriptor> {
        &self.descriptor
    }

    pub fn extract(&self, row: &Tuple) -> Tuple {
        let fields = self
            .columns
            .iter()
            .map(|&c| row.fields()[c].clone())
            .collect();
        Tuple::from_parts(self.descriptor.clone(), fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuple::{FieldType, Value};

    fn key(values: &[i64]) -> Tuple {
        Tuple::from_values(values.iter().map(|&v| Value::Int(v)))
    }

    #[test]
    fn test_mixed_directions() {
        let comparer = KeyComparer::new(vec![Direction::Positive, Direction::Negative]);
        assert_eq!(comparer.compare(&key(&[1, 5]), &key(&[2, 0])), Ordering::Less);
        assert_eq!(comparer.compare(&key(&[1, 5]), &key(&[1, 9])), Ordering::Greater);
        assert_eq!(comparer.compare(&key(&[1, 5]), &key(&[1, 5])), Ordering::Equal);
    }

    #[test]
    fn test_prefix_compares_equal() {
        let comparer = KeyComparer::ascending(2);
        assert_eq!(comparer.compare(&key(&[3]), &key(&[3, 7])), Ordering::Equal);
    }

    #[test]
    fn test_extractor_projects_key() {
        let row = Tuple::from_values([Value::Text("a".into()), Value::Int(9)]);
        let extractor = KeyExtractor::new(row.descriptor(), vec![1]).unwrap();

        let k = extractor.extract(&row);
        assert_eq!(k, key(&[9]));
        assert_eq!(extractor.descriptor().fields(), &[FieldType::Int]);
    }

    #[test]
    fn test_extractor_rejects_bad_column() {
        let desc = TupleDescriptor::create(vec![FieldType::Int]);
        assert!(KeyExtractor::new(&desc, vec![2]).is_err());
    }
}
