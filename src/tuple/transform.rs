//! Tuple-reshaping transforms
//!
//! `CombineTransform` concatenates two rows; `MapTransform` builds a row by
//! copying each output field from a (source slot, field index) pair.
//! Both are validated once at construction; `apply` assumes its inputs
//! conform to the descriptors given there.

use std::sync::Arc;

use super::descriptor::TupleDescriptor;
use super::errors::{TupleError, TupleResult};
use super::tuple::Tuple;

/// Concatenates a left and a right tuple field-by-field.
#[derive(Debug, Clone)]
pub struct CombineTransform {
    left: Arc<TupleDescriptor>,
    right: Arc<TupleDescriptor>,
    output: Arc<TupleDescriptor>,
}

impl CombineTransform {
    pub fn new(left: Arc<TupleDescriptor>, right: Arc<TupleDescriptor>) -> Self {
        let output = left.concat(&right);
        Self {
            left,
            right,
            output,
        }
    }

    pub fn left(&self) -> &Arc<TupleDescriptor> {
        &self.left
    }

    pub fn right(&self) -> &Arc<TupleDescriptor> {
        &self.right
    }

    pub fn output(&self) -> &Arc<TupleDescriptor> {
        &self.output
    }

    pub fn apply(&self, left: &Tuple, right: &Tuple) -> Tuple {
        debug_assert_eq!(left.len(), self.left.len());
        debug_assert_eq!(right.len(), self.right.len());

        let mut fields = Vec::with_capacity(self.output.len());
        fields.extend_from_slice(left.fields());
        fields.extend_from_slice(right.fields());
        Tuple::from_parts(self.output.clone(), fields)
    }
}

/// Builds an output tuple from fields of one or more source tuples.
#[derive(Debug, Clone)]
pub struct MapTransform {
    output: Arc<TupleDescriptor>,
    sources: Vec<Arc<TupleDescriptor>>,
    map: Vec<(usize, usize)>,
}

impl MapTransform {
    /// Creates a transform.
    ///
    /// Fails when `map.len() != output.len()`, when a slot or field index is
    /// out of range, or when a mapped field type differs from the output.
    pub fn new(
        output: Arc<TupleDescriptor>,
        sources: Vec<Arc<TupleDescriptor>>,
        map: Vec<(usize, usize)>,
    ) -> TupleResult<Self> {
        if map.len() != output.len() {
            return Err(TupleError::invalid_transform(format!(
                "Map has {} entries for {} output fields",
                map.len(),
                output.len()
            )));
        }
        for (target, &(slot, field)) in map.iter().enumerate() {
            let source = sources.get(slot).ok_or_else(|| {
                TupleError::invalid_transform(format!(
                    "Source slot {} out of range ({} sources)",
                    slot,
                    sources.len()
                ))
            })?;
            let actual = source.field_type(field)?;
            let expected = output.fields()[target];
            if actual != expected {
                return Err(TupleError::type_mismatch(target, expected, actual));
            }
        }
        Ok(Self {
            output,
            sources,
            map,
        })
    }

    /// Single-source projection of the given fields.
    pub fn select(source: Arc<TupleDescriptor>, columns: &[usize]) -> TupleResult<Self> {
        if columns.iter().copied().eq(0..source.len()) {
            return Ok(Self::identity(source));
        }
        let output = source.project(columns)?;
        let map = columns.iter().map(|&c| (0, c)).collect();
        Self::new(output, vec![source], map)
    }

    /// Transform that copies every field in place.
    pub fn identity(descriptor: Arc<TupleDescriptor>) -> Self {
        let map = (0..descriptor.len()).map(|i| (0, i)).collect();
        Self {
            output: descriptor.clone(),
            sources: vec![descriptor],
            map,
        }
    }

    pub fn output(&self) -> &Arc<TupleDescriptor> {
        &self.output
    }

    pub fn map(&self) -> &[(usize, usize)] {
        &self.map
    }

    /// Applies the map. Panics if `sources` does not match the construction
    /// descriptors; that is a programming error, not a data condition.
    pub fn apply(&self, sources: &[&Tuple]) -> Tuple {
        let fields = self
            .map
            .iter()
            .map(|&(slot, field)| sources[slot].fields()[field].clone())
            .collect();
        Tuple::from_parts(self.output.clone(), fields)
    }

    /// Shorthand for single-source transforms
    pub fn apply_one(&self, source: &Tuple) -> Tuple {
        self.apply(&[source])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuple::{FieldType, FieldValue, TupleErrorCode, Value};
    use proptest::prelude::*;

    fn row(id: i64, name: &str) -> Tuple {
        Tuple::from_values([Value::Int(id), Value::Text(name.into())])
    }

    #[test]
    fn test_combine_concatenates() {
        let left = row(1, "a");
        let right = Tuple::from_values([Value::Bool(true)]);
        let combine = CombineTransform::new(left.descriptor().clone(), right.descriptor().clone());

        let out = combine.apply(&left, &right);
        assert_eq!(out.len(), 3);
        assert_eq!(out.value(2), Some(&Value::Bool(true)));
        assert_eq!(out.descriptor().fields()[2], FieldType::Bool);
    }

    #[test]
    fn test_map_reorders_across_sources() {
        let a = row(7, "x");
        let b = Tuple::from_values([Value::Float(1.5)]);
        let output = TupleDescriptor::create(vec![FieldType::Float, FieldType::Int]);
        let map = MapTransform::new(
            output,
            vec![a.descriptor().clone(), b.descriptor().clone()],
            vec![(1, 0), (0, 0)],
        )
        .unwrap();

        let out = map.apply(&[&a, &b]);
        assert_eq!(out.value(0), Some(&Value::Float(1.5)));
        assert_eq!(out.value(1), Some(&Value::Int(7)));
    }

    #[test]
    fn test_map_length_mismatch_rejected() {
        let a = row(1, "a");
        let output = TupleDescriptor::create(vec![FieldType::Int]);
        let err = MapTransform::new(output, vec![a.descriptor().clone()], vec![]).unwrap_err();
        assert_eq!(err.code(), TupleErrorCode::InvalidTransform);
    }

    #[test]
    fn test_map_bad_slot_rejected() {
        let a = row(1, "a");
        let output = TupleDescriptor::create(vec![FieldType::Int]);
        let err =
            MapTransform::new(output, vec![a.descriptor().clone()], vec![(3, 0)]).unwrap_err();
        assert_eq!(err.code(), TupleErrorCode::InvalidTransform);
    }

    #[test]
    fn test_map_type_mismatch_rejected() {
        let a = row(1, "a");
        let output = TupleDescriptor::create(vec![FieldType::Int]);
        let err =
            MapTransform::new(output, vec![a.descriptor().clone()], vec![(0, 1)]).unwrap_err();
        assert_eq!(err.code(), TupleErrorCode::TypeMismatch);
    }

    #[test]
    fn test_map_preserves_availability() {
        let desc = TupleDescriptor::create(vec![FieldType::Int, FieldType::Text]);
        let t = Tuple::new(desc.clone(), vec![FieldValue::Unavailable, FieldValue::Null]).unwrap();
        let out = MapTransform::select(desc, &[1, 0]).unwrap().apply_one(&t);
        assert!(out.is_null(0));
        assert!(!out.is_available(1));
    }

    #[test]
    fn test_combine_then_view_restores_left() {
        let left = row(3, "left");
        let right = row(4, "right");
        let combine = CombineTransform::new(left.descriptor().clone(), right.descriptor().clone());
        let combined = combine.apply(&left, &right);

        let view = MapTransform::select(combine.output().clone(), &[0, 1]).unwrap();
        assert_eq!(view.apply_one(&combined), left);
    }

    #[test]
    fn test_select_all_columns_is_identity() {
        let a = row(5, "same");
        let select = MapTransform::select(a.descriptor().clone(), &[0, 1]).unwrap();
        assert_eq!(select.map(), MapTransform::identity(a.descriptor().clone()).map());
        assert_eq!(select.apply_one(&a), a);
    }

    /// A field of any type in any availability state
    fn field() -> impl Strategy<Value = (FieldType, FieldValue)> {
        let value = prop_oneof![
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::Int),
            (-1.0e6f64..1.0e6).prop_map(Value::Float),
            "[a-z]{0,8}".prop_map(Value::Text),
        ];
        (value, 0u8..4).prop_map(|(value, state)| {
            let field_type = value.field_type();
            let field = match state {
                0 => FieldValue::Unavailable,
                1 => FieldValue::Null,
                _ => FieldValue::Value(value),
            };
            (field_type, field)
        })
    }

    proptest! {
        #[test]
        fn prop_identity_is_noop(fields in prop::collection::vec(field(), 0..10)) {
            let (types, values): (Vec<_>, Vec<_>) = fields.into_iter().unzip();
            let desc = TupleDescriptor::create(types);
            let t = Tuple::new(desc.clone(), values).unwrap();

            let identity = MapTransform::identity(desc.clone());
            prop_assert_eq!(identity.output(), &desc);
            prop_assert_eq!(identity.apply_one(&t), t);
        }
    }
}
