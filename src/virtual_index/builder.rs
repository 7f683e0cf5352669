//! Recursive construction of virtual indexes

use std::sync::Arc;

use tracing::debug;

use crate::config::{EngineConfig, OrphanPolicy};
use crate::index::{IndexError, IndexResult, IndexStorage, OrderedIndex};

use super::filter::FilterIndex;
use super::info::{IndexInfo, IndexKind};
use super::join::JoinIndex;
use super::typed::TypedIndex;
use super::union::UnionIndex;
use super::view::ViewIndex;

/// Builds ordered indexes from `IndexInfo` declarations.
///
/// Physical indexes come from storage; virtual ones are composed from
/// their underlying declarations, which may themselves be virtual.
pub struct VirtualIndexBuilder<'a> {
    storage: &'a dyn IndexStorage,
    heap_threshold: usize,
    orphan_policy: OrphanPolicy,
}

impl<'a> VirtualIndexBuilder<'a> {
    pub fn new(storage: &'a dyn IndexStorage, config: &EngineConfig) -> Self {
        Self {
            storage,
            heap_threshold: config.merge.heap_threshold,
            orphan_policy: config.join.orphan_policy,
        }
    }

    pub fn build(&self, info: &IndexInfo) -> IndexResult<Arc<dyn OrderedIndex>> {
        let kind = info.kind()?;
        debug!(index = %info.name, attributes = %info.attributes, ?kind, "building index");

        let index: Arc<dyn OrderedIndex> = match kind {
            IndexKind::Physical => return self.storage.index(&info.name),
            IndexKind::Union => {
                let members = self.build_all(&info.underlying)?;
                Arc::new(UnionIndex::new(&info.name, members, self.heap_threshold)?)
            }
            IndexKind::Join => {
                let mut underlying = self.build_all(&info.underlying)?;
                if underlying.is_empty() {
                    return Err(IndexError::incompatible(&info.name, "join has no root index"));
                }
                let root = underlying.remove(0);
                Arc::new(JoinIndex::new(&info.name, root, underlying, self.orphan_policy)?)
            }
            IndexKind::Filter => {
                let inner = self.build_single(info)?;
                let spec = info.filter.clone().ok_or_else(|| {
                    IndexError::incompatible(&info.name, "filtered index without filter spec")
                })?;
                Arc::new(FilterIndex::new(&info.name, inner, spec)?)
            }
            IndexKind::View => {
                let inner = self.build_single(info)?;
                Arc::new(ViewIndex::new(&info.name, inner, &info.view_columns)?)
            }
            IndexKind::Typed => {
                let inner = self.build_single(info)?;
                let spec = info.type_spec.ok_or_else(|| {
                    IndexError::incompatible(&info.name, "typed index without type spec")
                })?;
                Arc::new(TypedIndex::new(&info.name, inner, spec)?)
            }
        };
        Ok(index)
    }

    fn build_all(&self, infos: &[IndexInfo]) -> IndexResult<Vec<Arc<dyn OrderedIndex>>> {
        infos.iter().map(|i| self.build(i)).collect()
    }

    fn build_single(&self, info: &IndexInfo) -> IndexResult<Arc<dyn OrderedIndex>> {
        match info.underlying.as_slice() {
            [inner] => self.build(inner),
            other => Err(IndexError::incompatible(
                &info.name,
                format!("expected one underlying index, found {}", other.len()),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{
        collect_range, Direction, Entire, IndexErrorCode, MemoryIndex, MemoryStorage, Range,
        SeekResult,
    };
    use crate::tuple::{FieldType, Tuple, TupleDescriptor, Value};
    use crate::virtual_index::{FilterSpec, IndexAttributes, TypeSpec};

    // Animal(id, name), Dog(id, breed), Cat(id, lives)
    fn storage() -> MemoryStorage {
        let animal = TupleDescriptor::create(vec![FieldType::Int, FieldType::Text]);
        let dog = TupleDescriptor::create(vec![FieldType::Int, FieldType::Text]);
        let cat = TupleDescriptor::create(vec![FieldType::Int, FieldType::Int]);
        let pk = [(0, Direction::Positive)];

        let animals = (1..=4).map(|i| {
            Tuple::from_values([Value::Int(i), Value::Text(format!("animal{}", i))])
        });
        MemoryStorage::new()
            .with_index(MemoryIndex::from_rows("Animal", animal, &pk, animals).unwrap())
            .with_index(
                MemoryIndex::from_rows(
                    "Dog",
                    dog,
                    &pk,
                    [Tuple::from_values([Value::Int(2), Value::Text("collie".into())])],
                )
                .unwrap(),
            )
            .with_index(
                MemoryIndex::from_rows(
                    "Cat",
                    cat,
                    &pk,
                    [
                        Tuple::from_values([Value::Int(3), Value::Int(9)]),
                        Tuple::from_values([Value::Int(4), Value::Int(7)]),
                    ],
                )
                .unwrap(),
            )
    }

    fn ints(rows: &[Tuple], column: usize) -> Vec<Option<i64>> {
        rows.iter()
            .map(|r| r.value(column).and_then(Value::as_int))
            .collect()
    }

    #[test]
    fn test_physical_passthrough() {
        let storage = storage();
        let builder = VirtualIndexBuilder::new(&storage, &EngineConfig::default());
        let index = builder.build(&IndexInfo::physical("Animal")).unwrap();
        assert_eq!(index.count(), Some(4));
    }

    #[test]
    fn test_join_reassembles_subtype_rows() {
        let storage = storage();
        let builder = VirtualIndexBuilder::new(&storage, &EngineConfig::default());
        let info = IndexInfo::join(
            "Animal.Full",
            IndexInfo::physical("Animal"),
            vec![IndexInfo::physical("Dog"), IndexInfo::physical("Cat")],
        );
        let index = builder.build(&info).unwrap();
        assert_eq!(
            index.descriptor().fields(),
            &[FieldType::Int, FieldType::Text, FieldType::Text, FieldType::Int]
        );

        let rows = collect_range(index.as_ref(), &Range::full()).unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[1].value(2), Some(&Value::Text("collie".into())));
        assert!(!rows[0].is_available(2));
        assert_eq!(ints(&rows, 3), vec![None, None, Some(9), Some(7)]);

        let backward = collect_range(index.as_ref(), &Range::full_backward()).unwrap();
        assert_eq!(ints(&backward, 0), vec![Some(4), Some(3), Some(2), Some(1)]);
        assert_eq!(ints(&backward, 3), vec![Some(7), Some(9), None, None]);
    }

    #[test]
    fn test_union_of_views_is_ordered() {
        let storage = storage();
        let builder = VirtualIndexBuilder::new(&storage, &EngineConfig::default());
        let info = IndexInfo::union(
            "Pet.Ids",
            vec![
                IndexInfo::view("Dog.Ids", IndexInfo::physical("Dog"), vec![0]),
                IndexInfo::view("Cat.Ids", IndexInfo::physical("Cat"), vec![0]),
            ],
        );
        let index = builder.build(&info).unwrap();
        let rows = collect_range(index.as_ref(), &Range::full()).unwrap();
        assert_eq!(ints(&rows, 0), vec![Some(2), Some(3), Some(4)]);
        assert_eq!(index.count(), Some(3));

        let key = Tuple::from_values([Value::Int(3)]);
        assert!(index.seek_key(&key).unwrap().is_exact());
    }

    #[test]
    fn test_union_rejects_mismatched_members() {
        let storage = storage();
        let builder = VirtualIndexBuilder::new(&storage, &EngineConfig::default());
        let info = IndexInfo::union(
            "Bad",
            vec![IndexInfo::physical("Dog"), IndexInfo::physical("Cat")],
        );
        let err = builder.build(&info).unwrap_err();
        assert_eq!(err.code(), IndexErrorCode::Incompatible);
    }

    #[test]
    fn test_filter_and_typed() {
        let storage = storage();
        let builder = VirtualIndexBuilder::new(&storage, &EngineConfig::default());
        let info = IndexInfo::typed(
            "Cat.Typed",
            IndexInfo::filter(
                "Cat.Lively",
                IndexInfo::physical("Cat"),
                FilterSpec::new(1, [Value::Int(9)]),
            ),
            TypeSpec {
                type_id: 42,
                column: 1,
            },
        );
        let index = builder.build(&info).unwrap();
        let rows = collect_range(index.as_ref(), &Range::full()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(ints(&rows, 0), vec![Some(3)]);
        assert_eq!(ints(&rows, 1), vec![Some(42)]);
        assert_eq!(ints(&rows, 2), vec![Some(9)]);

        let found = index
            .seek(&crate::index::Ray::new(
                Entire::key(&Tuple::from_values([Value::Int(1)])),
                Direction::Positive,
            ))
            .unwrap();
        assert!(matches!(found, SeekResult::Nearest(_)));
    }

    #[test]
    fn test_view_must_keep_key() {
        let storage = storage();
        let builder = VirtualIndexBuilder::new(&storage, &EngineConfig::default());
        let err = builder
            .build(&IndexInfo::view("Dog.Breed", IndexInfo::physical("Dog"), vec![1]))
            .unwrap_err();
        assert_eq!(err.code(), IndexErrorCode::Incompatible);
    }

    #[test]
    fn test_unsupported_kind_fails_fast() {
        let storage = storage();
        let builder = VirtualIndexBuilder::new(&storage, &EngineConfig::default());
        let info = IndexInfo::union("Odd", vec![IndexInfo::physical("Dog")])
            .with_attributes(IndexAttributes::JOIN);
        let err = builder.build(&info).unwrap_err();
        assert_eq!(err.code(), IndexErrorCode::UnsupportedKind);
    }

    #[test]
    fn test_missing_physical_index() {
        let storage = storage();
        let builder = VirtualIndexBuilder::new(&storage, &EngineConfig::default());
        let err = builder.build(&IndexInfo::physical("Fish")).unwrap_err();
        assert_eq!(err.code(), IndexErrorCode::NotFound);
    }
}
