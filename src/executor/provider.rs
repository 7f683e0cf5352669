//! Executable provider contract

use std::fmt;
use std::sync::Arc;

use crate::index::OrderedIndex;
use crate::plan::{ExecutionSite, ExplainNode, ProviderId, RecordHeader};
use crate::tuple::Tuple;

use super::context::EnumerationContext;
use super::errors::ExecutorResult;

/// Lazy, owned stream of result rows. Dropping it abandons the enumeration.
pub type RowStream = Box<dyn Iterator<Item = ExecutorResult<Tuple>>>;

/// Optional services an executable may offer to its consumers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Rows are available as an ordered index for seeks and ranges
    OrderedIndex,
    /// Row count is known without enumerating
    Count,
}

/// Compiled plan node.
///
/// `enumerate` is restartable: each call yields a fresh stream. Operators
/// that declare an order in their header emit rows in that order.
pub trait ExecutableProvider: fmt::Debug {
    /// Logical node this executable realises
    fn id(&self) -> ProviderId;

    fn name(&self) -> &'static str;

    /// Operator parameters for explain output
    fn detail(&self) -> String {
        String::new()
    }

    fn header(&self) -> &RecordHeader;

    fn sources(&self) -> &[Arc<dyn ExecutableProvider>];

    fn site(&self) -> ExecutionSite;

    fn enumerate(&self, ctx: &EnumerationContext) -> ExecutorResult<RowStream>;

    /// Called before enumeration in `ctx` starts
    fn on_before_enumerate(&self, ctx: &EnumerationContext) -> ExecutorResult<()> {
        for source in self.sources() {
            source.on_before_enumerate(ctx)?;
        }
        Ok(())
    }

    /// Called once enumeration in `ctx` is over; releases cached items
    fn on_after_enumerate(&self, ctx: &EnumerationContext) -> ExecutorResult<()> {
        ctx.remove_item(self.id());
        for source in self.sources() {
            source.on_after_enumerate(ctx)?;
        }
        Ok(())
    }

    fn supports(&self, _capability: Capability) -> bool {
        false
    }

    /// Rows as an ordered index, when `supports(Capability::OrderedIndex)`
    fn ordered_index(
        &self,
        _ctx: &EnumerationContext,
    ) -> ExecutorResult<Option<Arc<dyn OrderedIndex>>> {
        Ok(None)
    }

    /// Row count, when `supports(Capability::Count)`
    fn count(&self, _ctx: &EnumerationContext) -> ExecutorResult<Option<u64>> {
        Ok(None)
    }
}

impl ExplainNode for Arc<dyn ExecutableProvider> {
    fn explain_name(&self) -> String {
        self.name().to_string()
    }

    fn explain_detail(&self) -> String {
        let detail = self.detail();
        if detail.is_empty() {
            format!("@{}", self.site())
        } else {
            format!("{} @{}", detail, self.site())
        }
    }

    fn explain_children(&self) -> Vec<&dyn ExplainNode> {
        self.sources()
            .iter()
            .map(|s| s as &dyn ExplainNode)
            .collect()
    }
}

/// Wraps a stream of index rows as result rows
pub(crate) fn from_index_stream(stream: crate::index::TupleStream) -> RowStream {
    Box::new(stream.map(|row| row.map_err(Into::into)))
}

/// State shared by every executable: identity, schema, inputs and site
#[derive(Debug)]
pub struct NodeInfo {
    pub(crate) id: ProviderId,
    pub(crate) header: RecordHeader,
    pub(crate) sources: Vec<Arc<dyn ExecutableProvider>>,
    pub(crate) site: ExecutionSite,
}

impl NodeInfo {
    pub fn new(
        id: ProviderId,
        header: RecordHeader,
        sources: Vec<Arc<dyn ExecutableProvider>>,
        site: ExecutionSite,
    ) -> Self {
        Self {
            id,
            header,
            sources,
            site,
        }
    }

    pub fn id(&self) -> ProviderId {
        self.id
    }

    pub fn header(&self) -> &RecordHeader {
        &self.header
    }

    pub fn site(&self) -> ExecutionSite {
        self.site
    }

    pub fn sources(&self) -> &[Arc<dyn ExecutableProvider>] {
        &self.sources
    }

    /// First input of unary operators
    pub(crate) fn source(&self) -> &Arc<dyn ExecutableProvider> {
        &self.sources[0]
    }
}

/// Implements the identity accessors of `ExecutableProvider` from a
/// `node: NodeInfo` field
macro_rules! node_accessors {
    () => {
        fn id(&self) -> $crate::plan::ProviderId {
            self.node.id
        }

        fn header(&self) -> &$crate::plan::RecordHeader {
            &self.node.header
        }

        fn sources(&self) -> &[std::sync::Arc<dyn $crate::executor::ExecutableProvider>] {
            &self.node.sources
        }

        fn site(&self) -> $crate::plan::ExecutionSite {
            self.node.site
        }
    };
}

pub(crate) use node_accessors;

/// Fully enumerates `source` in `ctx`
pub(crate) fn materialize(
    source: &Arc<dyn ExecutableProvider>,
    ctx: &EnumerationContext,
) -> ExecutorResult<Vec<Tuple>> {
    source.enumerate(ctx)?.collect()
}
