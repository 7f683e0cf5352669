//! In-process compilation strategy
//!
//! `LocalCompiler` has a rule for every node kind and maps each logical
//! node onto the executor operator of the same name. It is the last
//! strategy of the default chain.

use std::sync::Arc;

use crate::config::EngineConfig;
use crate::executor::{
    AggregateExec, AliasExec, ApplyExec, CalculateExec, DistinctExec, ExistenceExec,
    FilterExec, IndexExec, JoinExec, NodeInfo, RangeExec, RawExec, ReindexExec, RowNumberExec,
    SeekExec, SelectExec, SiteExec, SkipExec, SortExec, StoreExec, TakeExec,
};
use crate::index::{Direction, IndexStorage, OrderedIndex};
use crate::plan::{
    AggregateColumn, ApplyParameter, ApplySequenceType, ApplyType, CalculatedColumn, Expr,
    JoinAlgorithm, JoinType, RangeSpec, SortOrder,
};
use crate::tuple::Tuple;
use crate::virtual_index::{IndexInfo, VirtualIndexBuilder};

use super::compiler::{Compiled, ProviderCompiler};
use super::errors::{CompileError, CompileResult};

/// Compiles every node kind into in-process executables
pub struct LocalCompiler {
    storage: Arc<dyn IndexStorage>,
    config: EngineConfig,
}

impl LocalCompiler {
    pub fn new(storage: Arc<dyn IndexStorage>, config: EngineConfig) -> Self {
        Self { storage, config }
    }

    /// Checks that the declared header describes the built index
    fn check_index_header(node: &NodeInfo, index: &dyn OrderedIndex) -> CompileResult<()> {
        let header = node.header();
        if index.descriptor() != header.descriptor() {
            return Err(CompileError::incompatible(
                node.id(),
                format!(
                    "index {} yields {} but the header declares {}",
                    index.name(),
                    index.descriptor(),
                    header.descriptor()
                ),
            ));
        }
        let order = header.order();
        if order.is_empty() {
            return Ok(());
        }
        let key: Vec<(usize, Direction)> = index
            .key_extractor()
            .columns()
            .iter()
            .zip(index.comparer().directions())
            .map(|(&c, &d)| (c, d))
            .collect();
        if order.columns() != key.as_slice() {
            return Err(CompileError::incompatible(
                node.id(),
                format!(
                    "index {} is ordered by {} but the header declares {}",
                    index.name(),
                    SortOrder::new(key),
                    order
                ),
            ));
        }
        Ok(())
    }
}

fn done(executable: impl crate::executor::ExecutableProvider + 'static) -> CompileResult<Compiled> {
    Ok(Some(Arc::new(executable)))
}

impl ProviderCompiler for LocalCompiler {
    fn name(&self) -> &'static str {
        "local"
    }

    fn compile_index(&self, node: NodeInfo, info: &IndexInfo) -> CompileResult<Compiled> {
        let index = VirtualIndexBuilder::new(self.storage.as_ref(), &self.config).build(info)?;
        Self::check_index_header(&node, index.as_ref())?;
        done(IndexExec::new(node, index))
    }

    fn compile_raw(&self, node: NodeInfo, rows: &[Tuple]) -> CompileResult<Compiled> {
        done(RawExec::new(node, rows))
    }

    fn compile_reindex(
        &self,
        node: NodeInfo,
        key: &[(usize, Direction)],
    ) -> CompileResult<Compiled> {
        done(ReindexExec::new(node, key.to_vec()))
    }

    fn compile_store(&self, node: NodeInfo, name: &str) -> CompileResult<Compiled> {
        done(StoreExec::new(node, name.to_string()))
    }

    fn compile_aggregate(
        &self,
        node: NodeInfo,
        group_by: &[usize],
        columns: &[AggregateColumn],
    ) -> CompileResult<Compiled> {
        done(AggregateExec::new(node, group_by.to_vec(), columns.to_vec()))
    }

    fn compile_alias(&self, node: NodeInfo, alias: &str) -> CompileResult<Compiled> {
        done(AliasExec::new(node, alias.to_string()))
    }

    fn compile_calculate(
        &self,
        node: NodeInfo,
        columns: &[CalculatedColumn],
    ) -> CompileResult<Compiled> {
        done(CalculateExec::new(node, columns.to_vec()))
    }

    fn compile_distinct(&self, node: NodeInfo) -> CompileResult<Compiled> {
        done(DistinctExec::new(node))
    }

    fn compile_filter(&self, node: NodeInfo, predicate: &Expr) -> CompileResult<Compiled> {
        done(FilterExec::new(node, predicate.clone()))
    }

    fn compile_join(
        &self,
        node: NodeInfo,
        algorithm: JoinAlgorithm,
        join_type: JoinType,
        equal_columns: &[(usize, usize)],
    ) -> CompileResult<Compiled> {
        done(JoinExec::new(
            node,
            algorithm,
            join_type,
            equal_columns.to_vec(),
        ))
    }

    fn compile_sort(&self, node: NodeInfo, order: &SortOrder) -> CompileResult<Compiled> {
        done(SortExec::new(node, order.clone()))
    }

    fn compile_range(&self, node: NodeInfo, range: &RangeSpec) -> CompileResult<Compiled> {
        done(RangeExec::new(node, range.clone()))
    }

    fn compile_seek(&self, node: NodeInfo, key: &[Expr]) -> CompileResult<Compiled> {
        done(SeekExec::new(node, key.to_vec()))
    }

    fn compile_select(&self, node: NodeInfo, columns: &[usize]) -> CompileResult<Compiled> {
        done(SelectExec::new(node, columns)?)
    }

    fn compile_skip(&self, node: NodeInfo, count: &Expr) -> CompileResult<Compiled> {
        done(SkipExec::new(node, count.clone()))
    }

    fn compile_take(&self, node: NodeInfo, count: &Expr) -> CompileResult<Compiled> {
        done(TakeExec::new(node, count.clone()))
    }

    fn compile_execution_site(&self, node: NodeInfo) -> CompileResult<Compiled> {
        done(SiteExec::new(node))
    }

    fn compile_apply(
        &self,
        node: NodeInfo,
        parameter: &ApplyParameter,
        apply_type: ApplyType,
        sequence_type: ApplySequenceType,
    ) -> CompileResult<Compiled> {
        done(ApplyExec::new(
            node,
            parameter.clone(),
            apply_type,
            sequence_type,
        ))
    }

    fn compile_existence(&self, node: NodeInfo, _name: &str) -> CompileResult<Compiled> {
        done(ExistenceExec::new(node))
    }

    fn compile_row_number(&self, node: NodeInfo, _name: &str) -> CompileResult<Compiled> {
        done(RowNumberExec::new(node))
    }
}
