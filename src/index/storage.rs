//! Storage-layer boundary
//!
//! The engine never touches pages; it asks `IndexStorage` for the physical
//! ordered index backing a name.

use std::collections::HashMap;
use std::sync::Arc;

use super::contract::OrderedIndex;
use super::errors::{IndexError, IndexResult};
use super::memory::MemoryIndex;

/// Resolves physical indexes by name
pub trait IndexStorage {
    fn index(&self, name: &str) -> IndexResult<Arc<dyn OrderedIndex>>;
}

/// Storage made of in-memory indexes
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    indexes: HashMap<String, Arc<MemoryIndex>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an index under its own name, replacing any previous one
    pub fn register(&mut self, index: MemoryIndex) {
        let name = index.name().to_string();
        self.indexes.insert(name, Arc::new(index));
    }

    pub fn with_index(mut self, index: MemoryIndex) -> Self {
        self.register(index);
        self
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.indexes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl IndexStorage for MemoryStorage {
    fn index(&self, name: &str) -> IndexResult<Arc<dyn OrderedIndex>> {
        self.indexes
            .get(name)
            .map(|i| i.clone() as Arc<dyn OrderedIndex>)
            .ok_or_else(|| IndexError::not_found(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{Direction, IndexErrorCode};
    use crate::tuple::{FieldType, TupleDescriptor};

    #[test]
    fn test_lookup_registered() {
        let desc = TupleDescriptor::create(vec![FieldType::Int]);
        let index = MemoryIndex::new("b", desc.clone(), &[(0, Direction::Positive)], true).unwrap();
        let other = MemoryIndex::new("a", desc, &[(0, Direction::Positive)], true).unwrap();
        let storage = MemoryStorage::new().with_index(index).with_index(other);

        assert_eq!(storage.index("b").unwrap().name(), "b");
        assert_eq!(storage.names(), vec!["a", "b"]);
    }

    #[test]
    fn test_missing_index_is_fatal() {
        let storage = MemoryStorage::new();
        let err = storage.index("missing").unwrap_err();
        assert_eq!(err.code(), IndexErrorCode::NotFound);
        assert!(err.is_fatal());
    }
}
