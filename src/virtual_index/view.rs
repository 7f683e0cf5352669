//! Column view index

use std::sync::Arc;

use crate::index::{
    IndexError, IndexResult, KeyComparer, KeyExtractor, OrderedIndex, Range, TupleStream,
};
use crate::tuple::{MapTransform, TupleDescriptor};

/// Narrowed or reordered projection of one index.
///
/// Every key column of the underlying index must be part of the view, so
/// the projection preserves order.
#[derive(Debug)]
pub struct ViewIndex {
    name: String,
    inner: Arc<dyn OrderedIndex>,
    transform: Arc<MapTransform>,
    extractor: KeyExtractor,
}

impl ViewIndex {
    pub fn new(
        name: impl Into<String>,
        inner: Arc<dyn OrderedIndex>,
        columns: &[usize],
    ) -> IndexResult<Self> {
        let name = name.into();
        let transform = MapTransform::select(inner.descriptor().clone(), columns)
            .map_err(|e| IndexError::incompatible(&name, e.message()))?;

        let mut key_columns = Vec::with_capacity(inner.key_extractor().columns().len());
        for &key_column in inner.key_extractor().columns() {
            let position = columns.iter().position(|&c| c == key_column).ok_or_else(|| {
                IndexError::incompatible(
                    &name,
                    format!("view drops key column {} of '{}'", key_column, inner.name()),
                )
            })?;
            key_columns.push(position);
        }
        let extractor = KeyExtractor::new(transform.output(), key_columns)?;

        Ok(Self {
            name,
            inner,
            transform: Arc::new(transform),
            extractor,
        })
    }
}

impl OrderedIndex for ViewIndex {
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
        let items = self.inner.get_items(range)?;
        Ok(Box::new(
            items.map(move |row| row.map(|r| transform.apply_one(&r))),
        ))
    }
}
