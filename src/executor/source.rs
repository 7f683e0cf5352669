//! Leaf and materialising executables

use std::rc::Rc;
use std::sync::Arc;

use tracing::debug;

use crate::index::{Direction, MemoryIndex, OrderedIndex, Range};
use crate::tuple::Tuple;

use super::context::{ContextItem, EnumerationContext};
use super::errors::ExecutorResult;
use super::provider::{
    from_index_stream, materialize, node_accessors, Capability, ExecutableProvider, NodeInfo,
    RowStream,
};

fn stream_rows(rows: Rc<Vec<Tuple>>) -> RowStream {
    Box::new((0..rows.len()).map(move |i| Ok(rows[i].clone())))
}

/// Full scan of an ordered index in index order
#[derive(Debug)]
pub struct IndexExec {
    node: NodeInfo,
    index: Arc<dyn OrderedIndex>,
}

impl IndexExec {
    pub fn new(node: NodeInfo, index: Arc<dyn OrderedIndex>) -> Self {
        Self { node, index }
    }
}

impl ExecutableProvider for IndexExec {
    node_accessors!();

    fn name(&self) -> &'static str {
        "Index"
    }

    fn detail(&self) -> String {
        self.index.name().to_string()
    }

    fn enumerate(&self, ctx: &EnumerationContext) -> ExecutorResult<RowStream> {
        ctx.ensure_open()?;
        Ok(from_index_stream(self.index.get_items(&Range::full())?))
    }

    fn supports(&self, capability: Capability) -> bool {
        match capability {
            Capability::OrderedIndex => true,
            Capability::Count => self.index.count().is_some(),
        }
    }

    fn ordered_index(
        &self,
        _ctx: &EnumerationContext,
    ) -> ExecutorResult<Option<Arc<dyn OrderedIndex>>> {
        Ok(Some(self.index.clone()))
    }

    fn count(&self, _ctx: &EnumerationContext) -> ExecutorResult<Option<u64>> {
        Ok(self.index.count())
    }
}

/// Literal rows
#[derive(Debug)]
pub struct RawExec {
    node: NodeInfo,
    rows: Rc<Vec<Tuple>>,
}

impl RawExec {
    pub fn new(node: NodeInfo, rows: &[Tuple]) -> Self {
        Self {
            node,
            rows: Rc::new(rows.to_vec()),
        }
    }
}

impl ExecutableProvider for RawExec {
    node_accessors!();

    fn name(&self) -> &'static str {
        "Raw"
    }

    fn detail(&self) -> String {
        format!("{} rows", self.rows.len())
    }

    fn enumerate(&self, ctx: &EnumerationContext) -> ExecutorResult<RowStream> {
        ctx.ensure_open()?;
        Ok(stream_rows(self.rows.clone()))
    }

    fn supports(&self, capability: Capability) -> bool {
        capability == Capability::Count
    }

    fn count(&self, _ctx: &EnumerationContext) -> ExecutorResult<Option<u64>> {
        Ok(Some(self.rows.len() as u64))
    }
}

/// Materialises its source once per enumeration scope
#[derive(Debug)]
pub struct StoreExec {
    node: NodeInfo,
    name: String,
}

impl StoreExec {
    pub fn new(node: NodeInfo, name: String) -> Self {
        Self { node, name }
    }

    fn rows(&self, ctx: &EnumerationContext) -> ExecutorResult<Rc<Vec<Tuple>>> {
        if let Some(ContextItem::Rows(rows)) = ctx.item(self.node.id) {
            return Ok(rows);
        }
        let rows = Rc::new(materialize(self.node.source(), ctx)?);
        debug!(store = %self.name, rows = rows.len(), "materialised store");
        ctx.set_item(self.node.id, ContextItem::Rows(rows.clone()))?;
        Ok(rows)
    }
}

impl ExecutableProvider for StoreExec {
    node_accessors!();

    fn name(&self) -> &'static str {
        "Store"
    }

    fn detail(&self) -> String {
        self.name.clone()
    }

    fn enumerate(&self, ctx: &EnumerationContext) -> ExecutorResult<RowStream> {
        Ok(stream_rows(self.rows(ctx)?))
    }

    fn supports(&self, capability: Capability) -> bool {
        capability == Capability::Count
    }

    fn count(&self, ctx: &EnumerationContext) -> ExecutorResult<Option<u64>> {
        Ok(Some(self.rows(ctx)?.len() as u64))
    }
}

/// Materialises its source into an index ordered by a new key
#[derive(Debug)]
pub struct ReindexExec {
    node: NodeInfo,
    key: Vec<(usize, Direction)>,
}

impl ReindexExec {
    pub fn new(node: NodeInfo, key: Vec<(usize, Direction)>) -> Self {
        Self { node, key }
    }

    fn index(&self, ctx: &EnumerationContext) -> ExecutorResult<Arc<dyn OrderedIndex>> {
        if let Some(ContextItem::Index(index)) = ctx.item(self.node.id) {
            return Ok(index);
        }
        let rows = materialize(self.node.source(), ctx)?;
        let index: Arc<dyn OrderedIndex> = Arc::new(MemoryIndex::from_rows(
            format!("reindex{}", self.node.id),
            self.node.header.descriptor().clone(),
            &self.key,
            rows,
        )?);
        debug!(provider = %self.node.id, rows = ?index.count(), "materialised reindex");
        ctx.set_item(self.node.id, ContextItem::Index(index.clone()))?;
        Ok(index)
    }
}

impl ExecutableProvider for ReindexExec {
    node_accessors!();

    fn name(&self) -> &'static str {
        "Reindex"
    }

    fn detail(&self) -> String {
        self.node.header.order().to_string()
    }

    fn enumerate(&self, ctx: &EnumerationContext) -> ExecutorResult<RowStream> {
        Ok(from_index_stream(self.index(ctx)?.get_items(&Range::full())?))
    }

    fn supports(&self, _capability: Capability) -> bool {
        true
    }

    fn ordered_index(
        &self,
        ctx: &EnumerationContext,
    ) -> ExecutorResult<Option<Arc<dyn OrderedIndex>>> {
        self.index(ctx).map(Some)
    }

    fn count(&self, ctx: &EnumerationContext) -> ExecutorResult<Option<u64>> {
        Ok(self.index(ctx)?.count())
    }
}

/// Moves rows between execution sites by materialising them
#[derive(Debug)]
pub struct TransferExec {
    node: NodeInfo,
}

impl TransferExec {
    /// Wraps `source` so it can be consumed at `site`
    pub fn wrap(
        source: Arc<dyn ExecutableProvider>,
        site: crate::plan::ExecutionSite,
    ) -> Self {
        let node = NodeInfo::new(source.id(), source.header().clone(), vec![source], site);
        Self { node }
    }
}

impl ExecutableProvider for TransferExec {
    node_accessors!();

    fn name(&self) -> &'static str {
        "Transfer"
    }

    fn detail(&self) -> String {
        format!("from {}", self.node.source().site())
    }

    fn enumerate(&self, ctx: &EnumerationContext) -> ExecutorResult<RowStream> {
        let rows = materialize(self.node.source(), ctx)?;
        debug!(
            provider = %self.node.id,
            rows = rows.len(),
            from = %self.node.source().site(),
            to = %self.node.site,
            "transferred rows"
        );
        Ok(Box::new(rows.into_iter().map(Ok)))
    }

    fn supports(&self, capability: Capability) -> bool {
        capability == Capability::Count && self.node.source().supports(capability)
    }

    fn count(&self, ctx: &EnumerationContext) -> ExecutorResult<Option<u64>> {
        self.node.source().count(ctx)
    }
}
