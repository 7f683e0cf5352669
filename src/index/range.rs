//! Ranges, rays and seek results

use std::cmp::Ordering;
use std::fmt;

use crate::tuple::Tuple;

use super::comparer::{Direction, KeyComparer};
use super::entire::Entire;

/// Closed interval of `Entire` bounds.
///
/// A range whose `first` bound lies after `second` enumerates backward.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Range {
    pub first: Entire,
    pub second: Entire,
}

impl Range {
    pub fn new(first: Entire, second: Entire) -> Self {
        Self { first, second }
    }

    /// Every key, forward
    pub fn full() -> Self {
        Self::new(Entire::negative_infinity(), Entire::positive_infinity())
    }

    /// Every key, backward
    pub fn full_backward() -> Self {
        Self::new(Entire::positive_infinity(), Entire::negative_infinity())
    }

    /// Keys equal to `key` (or starting with it, for prefix keys)
    pub fn point(key: &Tuple) -> Self {
        Self::new(Entire::key(key), Entire::key(key))
    }

    /// Traversal direction implied by the bound order
    pub fn direction(&self, comparer: &KeyComparer) -> Direction {
        match comparer.compare_entire(&self.first, &self.second) {
            Ordering::Greater => Direction::Negative,
            _ => Direction::Positive,
        }
    }

    /// Lower and upper bound in index order
    pub fn bounds(&self, comparer: &KeyComparer) -> (&Entire, &Entire) {
        match self.direction(comparer) {
            Direction::Positive => (&self.first, &self.second),
            Direction::Negative => (&self.second, &self.first),
        }
    }

    /// Returns true if `key` lies within the range
    pub fn contains(&self, key: &Tuple, comparer: &KeyComparer) -> bool {
        let (low, high) = self.bounds(comparer);
        low.compare_key(key, comparer) != Ordering::Greater
            && high.compare_key(key, comparer) != Ordering::Less
    }

    /// Narrows the range so traversal starts at `from`, never leaving the
    /// original bounds. Returns `None` when `from` lies past `second`.
    pub fn starting_at(&self, from: &Entire, comparer: &KeyComparer) -> Option<Range> {
        let direction = self.direction(comparer);
        if direction.apply(comparer.compare_entire(from, &self.second)) == Ordering::Greater {
            return None;
        }
        let before_first =
            direction.apply(comparer.compare_entire(from, &self.first)) == Ordering::Less;
        let first = if before_first {
            self.first.clone()
        } else {
            from.clone()
        };
        Some(Range::new(first, self.second.clone()))
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} .. {}]", self.first, self.second)
    }
}

/// Directional bound: "first key at or after `point` in `direction`"
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ray {
    pub point: Entire,
    pub direction: Direction,
}

impl Ray {
    pub fn new(point: Entire, direction: Direction) -> Self {
        Self { point, direction }
    }

    /// Range from the ray's point to the end of the index in its direction
    pub fn to_range(&self) -> Range {
        let end = match self.direction {
            Direction::Positive => Entire::positive_infinity(),
            Direction::Negative => Entire::negative_infinity(),
        };
        Range::new(self.point.clone(), end)
    }
}

/// Outcome of a seek
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeekResult {
    /// A row whose key equals the sought key
    Exact(Tuple),
    /// The nearest row past the sought key
    Nearest(Tuple),
    /// Nothing at or past the sought key
    None,
}

impl SeekResult {
    pub fn is_exact(&self) -> bool {
        matches!(self, SeekResult::Exact(_))
    }

    /// Row found by the seek, exact or nearest
    pub fn tuple(&self) -> Option<&Tuple> {
        match self {
            SeekResult::Exact(t) | SeekResult::Nearest(t) => Some(t),
            SeekResult::None => None,
        }
    }
}
