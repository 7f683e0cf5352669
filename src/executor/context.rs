//! Enumeration context
//!
//! Per-enumeration state threaded explicitly through every executable:
//! apply parameter bindings, materialised rows cached by providers, and a
//! closed flag. Correlated evaluation runs in a child context so nested
//! applies never see each other's bindings. A context is single-threaded
//! and must not be used after it is closed.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use tracing::trace;

use crate::index::OrderedIndex;
use crate::plan::{ApplyParameter, ParameterSource, ProviderId};
use crate::tuple::Tuple;

use super::errors::{ExecutorError, ExecutorResult};

/// Value a provider caches for the lifetime of an enumeration
#[derive(Debug, Clone)]
pub enum ContextItem {
    Rows(Rc<Vec<Tuple>>),
    Index(Arc<dyn OrderedIndex>),
}

#[derive(Debug)]
struct ContextState {
    parent: Option<EnumerationContext>,
    depth: usize,
    max_depth: usize,
    parameters: RefCell<HashMap<u64, Tuple>>,
    items: RefCell<HashMap<ProviderId, ContextItem>>,
    closed: Cell<bool>,
}

/// Handle to an enumeration scope; clones share the scope
#[derive(Debug, Clone)]
pub struct EnumerationContext {
    state: Rc<ContextState>,
}

impl EnumerationContext {
    /// Root context for one top-level enumeration
    pub fn new(max_depth: usize) -> Self {
        Self::with_parent(None, 0, max_depth)
    }

    fn with_parent(parent: Option<EnumerationContext>, depth: usize, max_depth: usize) -> Self {
        Self {
            state: Rc::new(ContextState {
                parent,
                depth,
                max_depth,
                parameters: RefCell::new(HashMap::new()),
                items: RefCell::new(HashMap::new()),
                closed: Cell::new(false),
            }),
        }
    }

    /// Nested scope for one correlated evaluation
    pub fn create_child(&self) -> ExecutorResult<EnumerationContext> {
        self.ensure_open()?;
        let depth = self.state.depth + 1;
        if depth > self.state.max_depth {
            return Err(ExecutorError::depth_exceeded(self.state.max_depth));
        }
        trace!(depth, "entering correlated scope");
        Ok(Self::with_parent(Some(self.clone()), depth, self.state.max_depth))
    }

    pub fn depth(&self) -> usize {
        self.state.depth
    }

    pub fn is_closed(&self) -> bool {
        self.state.closed.get()
    }

    pub fn ensure_open(&self) -> ExecutorResult<()> {
        if self.is_closed() {
            return Err(ExecutorError::context_closed(self.state.depth));
        }
        Ok(())
    }

    /// Ends the scope, dropping its bindings and cached items
    pub fn close(&self) {
        if !self.state.closed.replace(true) {
            self.state.parameters.borrow_mut().clear();
            self.state.items.borrow_mut().clear();
            trace!(depth = self.state.depth, "closed enumeration scope");
        }
    }

    /// Binds `parameter` in this scope
    pub fn bind(&self, parameter: &ApplyParameter, row: Tuple) -> ExecutorResult<()> {
        self.ensure_open()?;
        self.state.parameters.borrow_mut().insert(parameter.id(), row);
        Ok(())
    }

    /// Cached item of `provider`, searching enclosing scopes
    pub fn item(&self, provider: ProviderId) -> Option<ContextItem> {
        if self.is_closed() {
            return None;
        }
        if let Some(item) = self.state.items.borrow().get(&provider) {
            return Some(item.clone());
        }
        self.state.parent.as_ref().and_then(|p| p.item(provider))
    }

    pub fn set_item(&self, provider: ProviderId, item: ContextItem) -> ExecutorResult<()> {
        self.ensure_open()?;
        self.state.items.borrow_mut().insert(provider, item);
        Ok(())
    }

    /// Drops an item cached in this scope
    pub fn remove_item(&self, provider: ProviderId) {
        self.state.items.borrow_mut().remove(&provider);
    }
}

impl ParameterSource for EnumerationContext {
    fn parameter(&self, parameter: &ApplyParameter) -> Option<Tuple> {
        if self.is_closed() {
            return None;
        }
        if let Some(row) = self.state.parameters.borrow().get(&parameter.id()) {
            return Some(row.clone());
        }
        self.state
            .parent
            .as_ref()
            .and_then(|p| p.parameter(parameter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ExecutorErrorCode;
    use crate::tuple::{TupleDescriptor, Value};

    fn parameter() -> ApplyParameter {
        ApplyParameter::new("p", Tuple::from_values([Value::Int(0)]).descriptor().clone())
    }

    #[test]
    fn test_child_sees_parent_bindings() {
        let root = EnumerationContext::new(4);
        let p = parameter();
        root.bind(&p, Tuple::from_values([Value::Int(1)])).unwrap();

        let child = root.create_child().unwrap();
        assert_eq!(child.parameter(&p), Some(Tuple::from_values([Value::Int(1)])));

        child.bind(&p, Tuple::from_values([Value::Int(2)])).unwrap();
        assert_eq!(child.parameter(&p), Some(Tuple::from_values([Value::Int(2)])));
        assert_eq!(root.parameter(&p), Some(Tuple::from_values([Value::Int(1)])));
    }

    #[test]
    fn test_closed_context_rejects_use() {
        let root = EnumerationContext::new(4);
        let child = root.create_child().unwrap();
        let p = parameter();
        child.bind(&p, Tuple::from_values([Value::Int(2)])).unwrap();
        child.close();

        assert!(child.parameter(&p).is_none());
        let err = child.bind(&p, Tuple::blank(TupleDescriptor::empty())).unwrap_err();
        assert_eq!(err.code(), ExecutorErrorCode::ContextClosed);
        assert!(child.create_child().is_err());
    }

    #[test]
    fn test_depth_limit() {
        let root = EnumerationContext::new(1);
        let child = root.create_child().unwrap();
        let err = child.create_child().unwrap_err();
        assert_eq!(err.code(), ExecutorErrorCode::DepthExceeded);
    }

    #[test]
    fn test_items_scoped() {
        let root = EnumerationContext::new(4);
        let id = crate::plan::CompilableProvider::raw(
            crate::plan::RecordHeader::new(Vec::<(String, _)>::new()),
            vec![],
        )
        .unwrap()
        .id();
        let child = root.create_child().unwrap();
        child.set_item(id, ContextItem::Rows(Rc::new(vec![]))).unwrap();
        assert!(child.item(id).is_some());
        assert!(root.item(id).is_none());

        child.close();
        assert!(child.item(id).is_none());
    }
}
