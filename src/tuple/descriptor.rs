//! Tuple descriptors

use std::fmt;
use std::sync::Arc;

use super::errors::{TupleError, TupleResult};
use super::value::FieldType;

/// Immutable ordered list of field types.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TupleDescriptor {
    fields: Vec<FieldType>,
}

impl TupleDescriptor {
    /// Creates a shared descriptor
    pub fn create(fields: impl Into<Vec<FieldType>>) -> Arc<Self> {
        Arc::new(Self {
            fields: fields.into(),
        })
    }

    /// Descriptor with no fields
    pub fn empty() -> Arc<Self> {
        Self::create(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &[FieldType] {
        &self.fields
    }

    /// Returns the type of a field
    pub fn field_type(&self, index: usize) -> TupleResult<FieldType> {
        self.fields
            .get(index)
            .copied()
            .ok_or_else(|| TupleError::field_out_of_range(index, self.fields.len()))
    }

    /// Ordered union of both descriptors
    pub fn concat(&self, other: &TupleDescriptor) -> Arc<Self> {
        let mut fields = Vec::with_capacity(self.len() + other.len());
        fields.extend_from_slice(&self.fields);
        fields.extend_from_slice(&other.fields);
        Self::create(fields)
    }

    /// Descriptor made of the given fields, in the given order
    pub fn project(&self, indexes: &[usize]) -> TupleResult<Arc<Self>> {
        let fields = indexes
            .iter()
            .map(|&i| self.field_type(i))
            .collect::<TupleResult<Vec<_>>>()?;
        Ok(Self::create(fields))
    }
}

impl fmt::Display for TupleDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, t) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", t)?;
        }
        write!(f, ")")
    }
}
