//! Per-node compilation rules and the bottom-up driver
//!
//! A `ProviderCompiler` has one rule per plan node kind. Every rule
//! defaults to "not compiled", so a strategy only implements the kinds it
//! specialises and the service falls back to the next strategy for the
//! rest. The driver compiles sources first and never calls a rule for a
//! node whose sources were not compiled.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::executor::{ExecutableProvider, NodeInfo, TransferExec};
use crate::index::Direction;
use crate::plan::{
    AggregateColumn, ApplyParameter, ApplySequenceType, ApplyType, CalculatedColumn,
    CompilableProvider, ExecutionSite, Expr, JoinAlgorithm, JoinType, ProviderId, ProviderKind,
    RangeSpec, SortOrder,
};
use crate::tuple::Tuple;
use crate::virtual_index::IndexInfo;

use super::errors::CompileResult;

/// Outcome of one rule: `None` means the strategy does not handle the node
pub type Compiled = Option<Arc<dyn ExecutableProvider>>;

/// Compilation strategy: one rule per node kind.
///
/// `node` carries the node identity, its header, its already compiled and
/// site-compatible sources, and the site the executable runs at.
#[allow(unused_variables)]
pub trait ProviderCompiler {
    /// Strategy name for diagnostics
    fn name(&self) -> &'static str;

    /// Site the caller consumes the root at
    fn target_site(&self) -> ExecutionSite {
        ExecutionSite::Local
    }

    /// Site a node runs at. Index leaves run at storage and raw leaves
    /// locally; an execution-site node runs where it says; every other node
    /// runs where its first source runs.
    fn node_site(
        &self,
        node: &CompilableProvider,
        sources: &[Arc<dyn ExecutableProvider>],
    ) -> ExecutionSite {
        match node.kind() {
            ProviderKind::Index { .. } => ExecutionSite::Storage,
            ProviderKind::Raw { .. } => ExecutionSite::Local,
            ProviderKind::ExecutionSite { site } => *site,
            _ => sources
                .first()
                .map(|s| s.site())
                .unwrap_or(ExecutionSite::Local),
        }
    }

    /// Whether `source` can feed an executable running at `site`
    fn is_compatible(&self, source: &Arc<dyn ExecutableProvider>, site: ExecutionSite) -> bool {
        source.site() == site
    }

    /// Rewrites `source` so it can feed an executable running at `site`
    fn to_compatible(
        &self,
        source: Arc<dyn ExecutableProvider>,
        site: ExecutionSite,
    ) -> CompileResult<Arc<dyn ExecutableProvider>> {
        Ok(Arc::new(TransferExec::wrap(source, site)))
    }

    fn compile_index(&self, node: NodeInfo, info: &IndexInfo) -> CompileResult<Compiled> {
        Ok(None)
    }

    fn compile_raw(&self, node: NodeInfo, rows: &[Tuple]) -> CompileResult<Compiled> {
        Ok(None)
    }

    fn compile_reindex(
        &self,
        node: NodeInfo,
        key: &[(usize, Direction)],
    ) -> CompileResult<Compiled> {
        Ok(None)
    }

    fn compile_store(&self, node: NodeInfo, name: &str) -> CompileResult<Compiled> {
        Ok(None)
    }

    fn compile_aggregate(
        &self,
        node: NodeInfo,
        group_by: &[usize],
        columns: &[AggregateColumn],
    ) -> CompileResult<Compiled> {
        Ok(None)
    }

    fn compile_alias(&self, node: NodeInfo, alias: &str) -> CompileResult<Compiled> {
        Ok(None)
    }

    fn compile_calculate(
        &self,
        node: NodeInfo,
        columns: &[CalculatedColumn],
    ) -> CompileResult<Compiled> {
        Ok(None)
    }

    fn compile_distinct(&self, node: NodeInfo) -> CompileResult<Compiled> {
        Ok(None)
    }

    fn compile_filter(&self, node: NodeInfo, predicate: &Expr) -> CompileResult<Compiled> {
        Ok(None)
    }

    fn compile_join(
        &self,
        node: NodeInfo,
        algorithm: JoinAlgorithm,
        join_type: JoinType,
        equal_columns: &[(usize, usize)],
    ) -> CompileResult<Compiled> {
        Ok(None)
    }

    fn compile_sort(&self, node: NodeInfo, order: &SortOrder) -> CompileResult<Compiled> {
        Ok(None)
    }

    fn compile_range(&self, node: NodeInfo, range: &RangeSpec) -> CompileResult<Compiled> {
        Ok(None)
    }

    fn compile_seek(&self, node: NodeInfo, key: &[Expr]) -> CompileResult<Compiled> {
        Ok(None)
    }

    fn compile_select(&self, node: NodeInfo, columns: &[usize]) -> CompileResult<Compiled> {
        Ok(None)
    }

    fn compile_skip(&self, node: NodeInfo, count: &Expr) -> CompileResult<Compiled> {
        Ok(None)
    }

    fn compile_take(&self, node: NodeInfo, count: &Expr) -> CompileResult<Compiled> {
        Ok(None)
    }

    fn compile_execution_site(&self, node: NodeInfo) -> CompileResult<Compiled> {
        Ok(None)
    }

    fn compile_apply(
        &self,
        node: NodeInfo,
        parameter: &ApplyParameter,
        apply_type: ApplyType,
        sequence_type: ApplySequenceType,
    ) -> CompileResult<Compiled> {
        Ok(None)
    }

    fn compile_existence(&self, node: NodeInfo, name: &str) -> CompileResult<Compiled> {
        Ok(None)
    }

    fn compile_row_number(&self, node: NodeInfo, name: &str) -> CompileResult<Compiled> {
        Ok(None)
    }
}

/// Bottom-up compilation of one plan with one strategy.
///
/// Nodes shared by several parents are compiled once.
pub struct Compiler<'a> {
    strategy: &'a dyn ProviderCompiler,
    compiled: HashMap<ProviderId, Compiled>,
}

impl<'a> Compiler<'a> {
    pub fn new(strategy: &'a dyn ProviderCompiler) -> Self {
        Self {
            strategy,
            compiled: HashMap::new(),
        }
    }

    /// Compiles `root`, made compatible with the strategy's target site
    pub fn compile(mut self, root: &Arc<CompilableProvider>) -> CompileResult<Compiled> {
        let Some(executable) = self.compile_node(root)? else {
            return Ok(None);
        };
        let target = self.strategy.target_site();
        if self.strategy.is_compatible(&executable, target) {
            return Ok(Some(executable));
        }
        debug!(
            strategy = self.strategy.name(),
            root = %root.id(),
            from = %executable.site(),
            to = %target,
            "rewriting root for target site"
        );
        self.strategy.to_compatible(executable, target).map(Some)
    }

    fn compile_node(&mut self, node: &Arc<CompilableProvider>) -> CompileResult<Compiled> {
        if let Some(done) = self.compiled.get(&node.id()) {
            return Ok(done.clone());
        }

        let mut sources = Vec::with_capacity(node.sources().len());
        for source in node.sources() {
            match self.compile_node(source)? {
                Some(executable) => sources.push(executable),
                None => {
                    self.compiled.insert(node.id(), None);
                    return Ok(None);
                }
            }
        }

        let site = self.strategy.node_site(node, &sources);
        let sources = sources
            .into_iter()
            .map(|source| {
                if self.strategy.is_compatible(&source, site) {
                    Ok(source)
                } else {
                    debug!(
                        strategy = self.strategy.name(),
                        source = %source.id(),
                        from = %source.site(),
                        to = %site,
                        "rewriting source for consumer site"
                    );
                    self.strategy.to_compatible(source, site)
                }
            })
            .collect::<CompileResult<Vec<_>>>()?;

        let info = NodeInfo::new(node.id(), node.header().clone(), sources, site);
        let compiled = self.dispatch(node.kind(), info)?;
        match &compiled {
            Some(executable) => trace!(
                strategy = self.strategy.name(),
                node = %node.id(),
                executable = executable.name(),
                %site,
                "compiled node"
            ),
            None => debug!(
                strategy = self.strategy.name(),
                node = %node.id(),
                kind = node.kind().name(),
                "node not compiled"
            ),
        }
        self.compiled.insert(node.id(), compiled.clone());
        Ok(compiled)
    }

    fn dispatch(&self, kind: &ProviderKind, node: NodeInfo) -> CompileResult<Compiled> {
        let s = self.strategy;
        match kind {
            ProviderKind::Index { info } => s.compile_index(node, info),
            ProviderKind::Raw { rows } => s.compile_raw(node, rows),
            ProviderKind::Reindex { key } => s.compile_reindex(node, key),
            ProviderKind::Store { name } => s.compile_store(node, name),
            ProviderKind::Aggregate { group_by, columns } => {
                s.compile_aggregate(node, group_by, columns)
            }
            ProviderKind::Alias { alias } => s.compile_alias(node, alias),
            ProviderKind::Calculate { columns } => s.compile_calculate(node, columns),
            ProviderKind::Distinct => s.compile_distinct(node),
            ProviderKind::Filter { predicate } => s.compile_filter(node, predicate),
            ProviderKind::Join {
                algorithm,
                join_type,
                equal_columns,
            } => s.compile_join(node, *algorithm, *join_type, equal_columns),
            ProviderKind::Sort { order } => s.compile_sort(node, order),
            ProviderKind::Range { range } => s.compile_range(node, range),
            ProviderKind::Seek { key } => s.compile_seek(node, key),
            ProviderKind::Select { columns } => s.compile_select(node, columns),
            ProviderKind::Skip { count } => s.compile_skip(node, count),
            ProviderKind::Take { count } => s.compile_take(node, count),
            ProviderKind::ExecutionSite { .. } => s.compile_execution_site(node),
            ProviderKind::Apply {
                parameter,
                apply_type,
                sequence_type,
            } => s.compile_apply(node, parameter, *apply_type, *sequence_type),
            ProviderKind::Existence { name } => s.compile_existence(node, name),
            ProviderKind::RowNumber { name } => s.compile_row_number(node, name),
        }
    }
}
