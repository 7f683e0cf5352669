//! Union of per-subtype indexes

use std::sync::Arc;

use crate::index::{
    IndexError, IndexResult, KeyComparer, KeyExtractor, MergeStream, OrderedIndex, Range,
    TupleStream,
};
use crate::tuple::TupleDescriptor;

/// Ordered union over indexes that partition one key space.
///
/// Members must yield the same row shape under the same key comparer.
#[derive(Debug)]
pub struct UnionIndex {
    name: String,
    members: Vec<Arc<dyn OrderedIndex>>,
    descriptor: Arc<TupleDescriptor>,
    extractor: KeyExtractor,
    comparer: KeyComparer,
    heap_threshold: usize,
}

impl UnionIndex {
    pub fn new(
        name: impl Into<String>,
        members: Vec<Arc<dyn OrderedIndex>>,
        heap_threshold: usize,
    ) -> IndexResult<Self> {
        let name = name.into();
        let Some(first) = members.first() else {
            return Err(IndexError::incompatible(&name, "union has no members"));
        };
        let descriptor = first.descriptor().clone();
        let extractor = first.key_extractor().clone();
        let comparer = first.comparer().clone();

        for member in &members[1..] {
            if member.descriptor() != &descriptor {
                return Err(IndexError::incompatible(
                    &name,
                    format!(
                        "member '{}' yields {} instead of {}",
                        member.name(),
                        member.descriptor(),
                        descriptor
                    ),
                ));
            }
            if member.key_extractor() != &extractor || member.comparer() != &comparer {
                return Err(IndexError::incompatible(
                    &name,
                    format!("member '{}' is ordered by a different key", member.name()),
                ));
            }
        }

        Ok(Self {
            name,
            members,
            descriptor,
            extractor,
            comparer,
            heap_threshold,
        })
    }

    pub fn members(&self) -> &[Arc<dyn OrderedIndex>] {
        &self.members
    }
}

impl OrderedIndex for UnionIndex {
    fn name(&self) -> &str {
        &self.name
    }

    fn descriptor(&self) -> &Arc<TupleDescriptor> {
        &self.descriptor
    }

    fn key_extractor(&self) -> &KeyExtractor {
        &self.extractor
    }

    fn comparer(&self) -> &KeyComparer {
        &self.comparer
    }

    fn count(&self) -> Option<u64> {
        self.members.iter().map(|m| m.count()).sum()
    }

    fn get_items(&self, range: &Range) -> IndexResult<TupleStream> {
        let sources = self
            .members
            .iter()
            .map(|m| m.get_items(range))
            .collect::<IndexResult<Vec<_>>>()?;
        Ok(Box::new(MergeStream::new(
            sources,
            self.extractor.clone(),
            self.comparer.clone(),
            range.direction(&self.comparer),
            self.heap_threshold,
        )))
    }
}
