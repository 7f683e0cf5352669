//! Discriminator filter index

use std::sync::Arc;

use crate::index::{
    IndexError, IndexResult, KeyComparer, KeyExtractor, OrderedIndex, Range, TupleStream,
};
use crate::tuple::TupleDescriptor;

use super::info::FilterSpec;

/// Keeps the rows of one index whose discriminator is in an allowed set
#[derive(Debug)]
pub struct FilterIndex {
    name: String,
    inner: Arc<dyn OrderedIndex>,
    spec: Arc<FilterSpec>,
}

impl FilterIndex {
    pub fn new(
        name: impl Into<String>,
        inner: Arc<dyn OrderedIndex>,
        spec: FilterSpec,
    ) -> IndexResult<Self> {
        let name = name.into();
        let column_type = inner
            .descriptor()
            .field_type(spec.column)
            .map_err(|e| IndexError::incompatible(&name, e.message()))?;
        if let Some(value) = spec.values.iter().find(|v| v.field_type() != column_type) {
            return Err(IndexError::incompatible(
                &name,
                format!(
                    "filter value {} does not match {} column {}",
                    value, column_type, spec.column
                ),
            ));
        }
        Ok(Self {
            name,
            inner,
            spec: Arc::new(spec),
        })
    }

    pub fn spec(&self) -> &FilterSpec {
        &self.spec
    }
}

impl OrderedIndex for FilterIndex {
    fn name(&self) -> &str {
        &self.name
    }

    fn descriptor(&self) -> &Arc<TupleDescriptor> {
        self.inner.descriptor()
    }

    fn key_extractor(&self) -> &KeyExtractor {
        self.inner.key_extractor()
    }

    fn comparer(&self) -> &KeyComparer {
        self.inner.comparer()
    }

    fn get_items(&self, range: &Range) -> IndexResult<TupleStream> {
        let spec = self.spec.clone();
        let items = self.inner.get_items(range)?;
        Ok(Box::new(items.filter(move |row| match row {
            Ok(row) => row
                .value(spec.column)
                .is_some_and(|v| spec.values.contains(v)),
            Err(_) => true,
        })))
    }
}
