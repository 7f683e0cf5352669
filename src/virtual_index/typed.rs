//! Typed index: tags rows with a constant type identifier

use std::sync::Arc;

use crate::index::{
    IndexError, IndexResult, KeyComparer, KeyExtractor, OrderedIndex, Range, TupleStream,
};
use crate::tuple::{FieldType, MapTransform, Tuple, TupleDescriptor, Value};

use super::info::TypeSpec;

/// Adds an `Int` type-id column to rows that carry no explicit type column
#[derive(Debug)]
pub struct TypedIndex {
    name: String,
    inner: Arc<dyn OrderedIndex>,
    spec: TypeSpec,
    transform: Arc<MapTransform>,
    type_tuple: Tuple,
    extractor: KeyExtractor,
}

impl TypedIndex {
    pub fn new(
        name: impl Into<String>,
        inner: Arc<dyn OrderedIndex>,
        spec: TypeSpec,
    ) -> IndexResult<Self> {
        let name = name.into();
        let width = inner.descriptor().len();
        if spec.column > width {
            return Err(IndexError::incompatible(
                &name,
                format!("type column {} past row width {}", spec.column, width),
            ));
        }

        let type_tuple = Tuple::from_values([Value::Int(spec.type_id)]);
        let mut fields = inner.descriptor().fields().to_vec();
        fields.insert(spec.column, FieldType::Int);
        let mut map: Vec<(usize, usize)> = (0..width).map(|i| (0, i)).collect();
        map.insert(spec.column, (1, 0));

        let output = TupleDescriptor::create(fields);
        let transform = MapTransform::new(
            output.clone(),
            vec![inner.descriptor().clone(), type_tuple.descriptor().clone()],
            map,
        )?;

        let shift = |c: usize| if c >= spec.column { c + 1 } else { c };
        let key_columns = inner.key_extractor().columns().iter().map(|&c| shift(c)).collect();
        let extractor = KeyExtractor::new(&output, key_columns)?;

        Ok(Self {
            name,
            inner,
            spec,
            transform: Arc::new(transform),
            type_tuple,
            extractor,
        })
    }

    pub fn type_id(&self) -> i64 {
        self.spec.type_id
    }
}

impl OrderedIndex for TypedIndex {
    fn name(&self) -> &str {
        &self.name
    }

    fn descriptor(&self) -> &Arc<TupleDescriptor> {
        self.transform.output()
    }

    fn key_extractor(&self) -> &KeyExtractor {
        &self.extractor
    }

    fn comparer(&self) -> &KeyComparer {
        self.inner.comparer()
    }

    fn count(&self) -> Option<u64> {
        self.inner.count()
    }

    fn get_items(&self, range: &Range) -> IndexResult<TupleStream> {
        let transform = self.transform.clone();
        let type_tuple = self.type_tuple.clone();
        let items = self.inner.get_items(range)?;
        Ok(Box::new(
            items.map(move |row| row.map(|r| transform.apply(&[&r, &type_tuple]))),
        ))
    }
}
