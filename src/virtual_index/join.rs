//! Class-table inheritance join index

use std::sync::Arc;

use crate::config::OrphanPolicy;
use crate::index::{
    IndexError, IndexResult, Inheritor, InheritanceJoinStream, KeyComparer, KeyExtractor,
    OrderedIndex, Range, TupleStream,
};
use crate::tuple::{FieldType, MapTransform, Tuple, TupleDescriptor};

/// Reassembles subtype rows from a root index and inheritor indexes.
///
/// Output rows hold every root column followed by the non-key columns of
/// each inheritor, in inheritor order. The key is the root key.
#[derive(Debug)]
pub struct JoinIndex {
    name: String,
    root: Arc<dyn OrderedIndex>,
    inheritors: Vec<Arc<dyn OrderedIndex>>,
    descriptor: Arc<TupleDescriptor>,
    transform: MapTransform,
    orphan_policy: OrphanPolicy,
}

impl JoinIndex {
    pub fn new(
        name: impl Into<String>,
        root: Arc<dyn OrderedIndex>,
        inheritors: Vec<Arc<dyn OrderedIndex>>,
        orphan_policy: OrphanPolicy,
    ) -> IndexResult<Self> {
        let name = name.into();
        let mut fields: Vec<FieldType> = root.descriptor().fields().to_vec();
        let mut map: Vec<(usize, usize)> = (0..fields.len()).map(|i| (0, i)).collect();
        let mut sources = vec![root.descriptor().clone()];

        for (slot, inheritor) in inheritors.iter().enumerate() {
            if inheritor.key_descriptor() != root.key_descriptor()
                || inheritor.comparer() != root.comparer()
            {
                return Err(IndexError::incompatible(
                    &name,
                    format!(
                        "inheritor '{}' is not keyed like root '{}'",
                        inheritor.name(),
                        root.name()
                    ),
                ));
            }
            let key_columns = inheritor.key_extractor().columns();
            for (field, field_type) in inheritor.descriptor().fields().iter().enumerate() {
                if !key_columns.contains(&field) {
                    fields.push(*field_type);
                    map.push((slot + 1, field));
                }
            }
            sources.push(inheritor.descriptor().clone());
        }

        let descriptor = TupleDescriptor::create(fields);
        let transform = MapTransform::new(descriptor.clone(), sources, map)?;

        Ok(Self {
            name,
            root,
            inheritors,
            descriptor,
            transform,
            orphan_policy,
        })
    }

    pub fn root(&self) -> &Arc<dyn OrderedIndex> {
        &self.root
    }

    pub fn inheritors(&self) -> &[Arc<dyn OrderedIndex>] {
        &self.inheritors
    }
}

impl OrderedIndex for JoinIndex {
    fn name(&self) -> &str {
        &self.name
    }

    fn descriptor(&self) -> &Arc<TupleDescriptor> {
        &self.descriptor
    }

    // Root columns keep their positions, so the root extractor applies
    fn key_extractor(&self) -> &KeyExtractor {
        self.root.key_extractor()
    }

    fn comparer(&self) -> &KeyComparer {
        self.root.comparer()
    }

    fn count(&self) -> Option<u64> {
        self.root.count()
    }

    fn get_items(&self, range: &Range) -> IndexResult<TupleStream> {
        let inheritors = self
            .inheritors
            .iter()
            .map(|index| {
                Ok(Inheritor {
                    name: index.name().to_string(),
                    stream: index.get_items(range)?,
                    extractor: index.key_extractor().clone(),
                    blank: Tuple::blank(index.descriptor().clone()),
                })
            })
            .collect::<IndexResult<Vec<_>>>()?;

        Ok(Box::new(InheritanceJoinStream::new(
            self.root.get_items(range)?,
            self.root.key_extractor().clone(),
            inheritors,
            self.root.comparer().clone(),
            range.direction(self.root.comparer()),
            self.transform.clone(),
            self.orphan_policy,
        )))
    }
}
