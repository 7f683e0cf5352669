//! Extended key values for range boundaries
//!
//! An `Entire` is a key whose fields may be infinite or shifted by an
//! infinitesimal amount. `(5, -inf)` is the lowest key starting with 5,
//! so `key >= (5, *)` is the ray starting at `Entire::prefix((5), NegativeInfinity)`.
//! Fields after an infinity never influence comparison.

use std::cmp::Ordering;
use std::fmt;

use crate::tuple::{FieldValue, Tuple};

use super::comparer::KeyComparer;

/// Infinitesimal offset applied to an exact field value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shift {
    /// Exactly the value
    Exact,
    /// Just before the value (exclusive upper bound)
    NegativeInfinitesimal,
    /// Just after the value (exclusive lower bound)
    PositiveInfinitesimal,
}

impl Shift {
    fn rank(self) -> u8 {
        match self {
            Shift::NegativeInfinitesimal => 0,
            Shift::Exact => 1,
            Shift::PositiveInfinitesimal => 2,
        }
    }
}

/// Which infinity closes a partially bound key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Infinity {
    Negative,
    Positive,
}

/// One field of an `Entire`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntireField {
    NegativeInfinity,
    Value(FieldValue, Shift),
    PositiveInfinity,
}

impl EntireField {
    fn rank(&self) -> u8 {
        match self {
            EntireField::NegativeInfinity => 0,
            EntireField::Value(..) => 1,
            EntireField::PositiveInfinity => 2,
        }
    }
}

/// Extended key used as a range or ray boundary.
///
/// Infinities are expressed in index order: `NegativeInfinity` precedes
/// every key of the index whatever the field directions are.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Entire {
    fields: Vec<EntireField>,
}

impl Entire {
    pub fn new(fields: Vec<EntireField>) -> Self {
        Self { fields }
    }

    /// Exact key
    pub fn key(key: &Tuple) -> Self {
        Self::shifted(key, Shift::Exact)
    }

    /// Key whose last field carries the given shift
    pub fn shifted(key: &Tuple, shift: Shift) -> Self {
        let last = key.len().saturating_sub(1);
        let fields = key
            .fields()
            .iter()
            .enumerate()
            .map(|(i, f)| {
                let s = if i == last { shift } else { Shift::Exact };
                EntireField::Value(f.clone(), s)
            })
            .collect();
        Self { fields }
    }

    /// Bound-prefix key followed by an infinity, e.g. `(5, *)`
    pub fn prefix(prefix: &Tuple, tail: Infinity) -> Self {
        let mut fields: Vec<EntireField> = prefix
            .fields()
            .iter()
            .map(|f| EntireField::Value(f.clone(), Shift::Exact))
            .collect();
        fields.push(match tail {
            Infinity::Negative => EntireField::NegativeInfinity,
            Infinity::Positive => EntireField::PositiveInfinity,
        });
        Self { fields }
    }

    pub fn negative_infinity() -> Self {
        Self {
            fields: vec![EntireField::NegativeInfinity],
        }
    }

    pub fn positive_infinity() -> Self {
        Self {
            fields: vec![EntireField::PositiveInfinity],
        }
    }

    pub fn fields(&self) -> &[EntireField] {
        &self.fields
    }

    /// Compares this bound against a key tuple under `comparer`
    pub fn compare_key(&self, key: &Tuple, comparer: &KeyComparer) -> Ordering {
        for (i, field) in self.fields.iter().enumerate() {
            match field {
                EntireField::NegativeInfinity => return Ordering::Less,
                EntireField::PositiveInfinity => return Ordering::Greater,
                EntireField::Value(value, shift) => {
                    let Some(other) = key.field(i) else {
                        return Ordering::Equal;
                    };
                    let ordering = comparer.direction(i).apply(value.cmp(other));
                    if ordering != Ordering::Equal {
                        return ordering;
                    }
                    match shift {
                        Shift::Exact => continue,
                        Shift::NegativeInfinitesimal => return Ordering::Less,
                        Shift::PositiveInfinitesimal => return Ordering::Greater,
                    }
                }
            }
        }
        Ordering::Equal
    }

    /// Compares two bounds under `comparer`
    pub fn compare(&self, other: &Entire, comparer: &KeyComparer) -> Ordering {
        for (i, (a, b)) in self.fields.iter().zip(&other.fields).enumerate() {
            let rank = a.rank().cmp(&b.rank());
            if rank != Ordering::Equal {
                return rank;
            }
            let (EntireField::Value(va, sa), EntireField::Value(vb, sb)) = (a, b) else {
                // Same infinity on both sides
                return Ordering::Equal;
            };
            let ordering = comparer.direction(i).apply(va.cmp(vb));
            if ordering != Ordering::Equal {
                return ordering;
            }
            if sa != sb {
                return sa.rank().cmp(&sb.rank());
            }
            if *sa != Shift::Exact {
                return Ordering::Equal;
            }
        }
        Ordering::Equal
    }
}

impl fmt::Display for Entire {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match field {
                EntireField::NegativeInfinity => write!(f, "-inf")?,
                EntireField::PositiveInfinity => write!(f, "+inf")?,
                EntireField::Value(v, Shift::Exact) => write!(f, "{}", v)?,
                EntireField::Value(v, Shift::NegativeInfinitesimal) => write!(f, "{}-e", v)?,
                EntireField::Value(v, Shift::PositiveInfinitesimal) => write!(f, "{}+e", v)?,
            }
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::Direction;
    use crate::tuple::Value;

    fn key(values: &[i64]) -> Tuple {
        Tuple::from_values(values.iter().map(|&v| Value::Int(v)))
    }

    #[test]
    fn test_infinities_bracket_everything() {
        let comparer = KeyComparer::ascending(1);
        let k = key(&[i64::MIN]);
        assert_eq!(Entire::negative_infinity().compare_key(&k, &comparer), Ordering::Less);
        assert_eq!(Entire::positive_infinity().compare_key(&k, &comparer), Ordering::Greater);
    }

    #[test]
    fn test_partial_prefix_bounds() {
        let comparer = KeyComparer::ascending(2);
        let lower = Entire::prefix(&key(&[5]), Infinity::Negative);
        let upper = Entire::prefix(&key(&[5]), Infinity::Positive);

        assert_eq!(lower.compare_key(&key(&[5, i64::MIN]), &comparer), Ordering::Less);
        assert_eq!(lower.compare_key(&key(&[4, i64::MAX]), &comparer), Ordering::Greater);
        assert_eq!(upper.compare_key(&key(&[5, i64::MAX]), &comparer), Ordering::Greater);
        assert_eq!(upper.compare_key(&key(&[6, i64::MIN]), &comparer), Ordering::Less);
    }

    #[test]
    fn test_shift_makes_bound_exclusive() {
        let comparer = KeyComparer::ascending(1);
        let after = Entire::shifted(&key(&[3]), Shift::PositiveInfinitesimal);
        let before = Entire::shifted(&key(&[3]), Shift::NegativeInfinitesimal);

        assert_eq!(after.compare_key(&key(&[3]), &comparer), Ordering::Greater);
        assert_eq!(after.compare_key(&key(&[4]), &comparer), Ordering::Less);
        assert_eq!(before.compare_key(&key(&[3]), &comparer), Ordering::Less);
        assert_eq!(before.compare_key(&key(&[2]), &comparer), Ordering::Greater);
    }

    #[test]
    fn test_descending_field_direction() {
        let comparer = KeyComparer::new(vec![Direction::Negative]);
        let bound = Entire::key(&key(&[10]));
        // In descending order 20 comes before 10
        assert_eq!(bound.compare_key(&key(&[20]), &comparer), Ordering::Greater);
    }

    #[test]
    fn test_entire_total_order() {
        let comparer = KeyComparer::ascending(2);
        let ordered = vec![
            Entire::negative_infinity(),
            Entire::prefix(&key(&[5]), Infinity::Negative),
            Entire::shifted(&key(&[5, 1]), Shift::NegativeInfinitesimal),
            Entire::key(&key(&[5, 1])),
            Entire::shifted(&key(&[5, 1]), Shift::PositiveInfinitesimal),
            Entire::prefix(&key(&[5]), Infinity::Positive),
            Entire::key(&key(&[6, 0])),
            Entire::positive_infinity(),
        ];

        for i in 0..ordered.len() {
            for j in 0..ordered.len() {
                assert_eq!(
                    ordered[i].compare(&ordered[j], &comparer),
                    i.cmp(&j),
                    "{} vs {}",
                    ordered[i],
                    ordered[j]
                );
            }
        }
    }
}
