//! Fixed-arity rows

use std::fmt;
use std::sync::Arc;

use super::descriptor::TupleDescriptor;
use super::errors::{TupleError, TupleResult};
use super::value::{FieldValue, Value};

/// A row conforming to a `TupleDescriptor`.
///
/// Equality and hashing cover both the descriptor and every field state,
/// so an unavailable field never equals a null one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tuple {
    descriptor: Arc<TupleDescriptor>,
    fields: Vec<FieldValue>,
}

impl Tuple {
    /// Creates a tuple, validating arity and field types.
    pub fn new(descriptor: Arc<TupleDescriptor>, fields: Vec<FieldValue>) -> TupleResult<Self> {
        if fields.len() != descriptor.len() {
            return Err(TupleError::arity_mismatch(descriptor.len(), fields.len()));
        }
        for (i, field) in fields.iter().enumerate() {
            if let Some(actual) = field.value_type() {
                let expected = descriptor.fields()[i];
                if actual != expected {
                    return Err(TupleError::type_mismatch(i, expected, actual));
                }
            }
        }
        Ok(Self { descriptor, fields })
    }

    /// Creates a tuple whose fields are all unavailable.
    pub fn blank(descriptor: Arc<TupleDescriptor>) -> Self {
        let fields = vec![FieldValue::Unavailable; descriptor.len()];
        Self { descriptor, fields }
    }

    /// Creates a tuple from non-null values, inferring the descriptor.
    pub fn from_values(values: impl IntoIterator<Item = Value>) -> Self {
        let fields: Vec<FieldValue> = values.into_iter().map(FieldValue::Value).collect();
        let types: Vec<_> = fields.iter().filter_map(FieldValue::value_type).collect();
        Self {
            descriptor: TupleDescriptor::create(types),
            fields,
        }
    }

    /// Assembles a tuple whose fields are already known to conform.
    pub(crate) fn from_parts(descriptor: Arc<TupleDescriptor>, fields: Vec<FieldValue>) -> Self {
        debug_assert_eq!(descriptor.len(), fields.len());
        Self { descriptor, fields }
    }

    pub fn descriptor(&self) -> &Arc<TupleDescriptor> {
        &self.descriptor
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &[FieldValue] {
        &self.fields
    }

    pub fn into_fields(self) -> Vec<FieldValue> {
        self.fields
    }

    /// Returns the field state at `index`
    pub fn field(&self, index: usize) -> Option<&FieldValue> {
        self.fields.get(index)
    }

    /// Returns the value at `index` if it is available and not null
    pub fn value(&self, index: usize) -> Option<&Value> {
        self.fields.get(index).and_then(FieldValue::value)
    }

    pub fn is_available(&self, index: usize) -> bool {
        self.fields
            .get(index)
            .map(FieldValue::is_available)
            .unwrap_or(false)
    }

    pub fn is_null(&self, index: usize) -> bool {
        self.fields
            .get(index)
            .map(FieldValue::is_null)
            .unwrap_or(false)
    }

    /// Replaces a field, validating its type against the descriptor.
    pub fn set(&mut self, index: usize, field: FieldValue) -> TupleResult<()> {
        let expected = self.descriptor.field_type(index)?;
        if let Some(actual) = field.value_type() {
            if actual != expected {
                return Err(TupleError::type_mismatch(index, expected, actual));
            }
        }
        self.fields[index] = field;
        Ok(())
    }

    /// Projects the given fields into a new tuple.
    pub fn project(&self, indexes: &[usize]) -> TupleResult<Self> {
        let descriptor = self.descriptor.project(indexes)?;
        let fields = indexes.iter().map(|&i| self.fields[i].clone()).collect();
        Ok(Self { descriptor, fields })
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", field)?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuple::{FieldType, TupleErrorCode};

    fn int_text() -> Arc<TupleDescriptor> {
        TupleDescriptor::create(vec![FieldType::Int, FieldType::Text])
    }

    #[test]
    fn test_new_validates_arity() {
        let err = Tuple::new(int_text(), vec![FieldValue::from(1i64)]).unwrap_err();
        assert_eq!(err.code(), TupleErrorCode::ArityMismatch);
    }

    #[test]
    fn test_new_validates_types() {
        let err = Tuple::new(
            int_text(),
            vec![FieldValue::from("x"), FieldValue::from("y")],
        )
        .unwrap_err();
        assert_eq!(err.code(), TupleErrorCode::TypeMismatch);
        assert_eq!(err.field(), Some(0));
    }

    #[test]
    fn test_null_and_unavailable_accepted_anywhere() {
        let t = Tuple::new(int_text(), vec![FieldValue::Null, FieldValue::Unavailable]).unwrap();
        assert!(t.is_null(0));
        assert!(t.is_available(0));
        assert!(!t.is_available(1));
        assert_eq!(t.value(0), None);
    }

    #[test]
    fn test_blank_is_unavailable() {
        let t = Tuple::blank(int_text());
        assert_eq!(t.len(), 2);
        assert!((0..2).all(|i| !t.is_available(i)));
    }

    #[test]
    fn test_set_checks_type() {
        let mut t = Tuple::blank(int_text());
        t.set(0, FieldValue::from(42i64)).unwrap();
        assert_eq!(t.value(0), Some(&Value::Int(42)));
        assert!(t.set(1, FieldValue::from(1i64)).is_err());
        assert!(t.set(5, FieldValue::Null).is_err());
    }

    #[test]
    fn test_from_values_infers_descriptor() {
        let t = Tuple::from_values([Value::Int(1), Value::Text("a".into())]);
        assert_eq!(t.descriptor().as_ref(), int_text().as_ref());
        assert_eq!(t.to_string(), "(1, 'a')");
    }
}
