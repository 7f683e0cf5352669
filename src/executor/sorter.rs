//! Row sorting for query execution
//!
//! Sorts rows by the columns of a `SortOrder`, deterministically. Field
//! states order as unavailable < null < value, so nulls sort first in
//! ascending order.

use std::cmp::Ordering;

use tracing::trace;

use crate::plan::SortOrder;
use crate::tuple::Tuple;

use super::context::EnumerationContext;
use super::errors::ExecutorResult;
use super::provider::{materialize, node_accessors, ExecutableProvider, NodeInfo, RowStream};

/// Sorts rows
pub struct RowSorter;

impl RowSorter {
    /// Sorts rows according to `order`.
    ///
    /// Sort is stable: rows comparing equal keep their input order.
    pub fn sort(rows: &mut [Tuple], order: &SortOrder) {
        rows.sort_by(|a, b| Self::compare(a, b, order));
    }

    /// Compares two rows column by column
    pub fn compare(a: &Tuple, b: &Tuple, order: &SortOrder) -> Ordering {
        for &(column, direction) in order.columns() {
            let ordering = direction.apply(a.field(column).cmp(&b.field(column)));
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}

/// Materialises and sorts its source
#[derive(Debug)]
pub struct SortExec {
    node: NodeInfo,
    order: SortOrder,
}

impl SortExec {
    pub fn new(node: NodeInfo, order: SortOrder) -> Self {
        Self { node, order }
    }
}

impl ExecutableProvider for SortExec {
    node_accessors!();

    fn name(&self) -> &'static str {
        "Sort"
    }

    fn detail(&self) -> String {
        self.order.to_string()
    }

    fn enumerate(&self, ctx: &EnumerationContext) -> ExecutorResult<RowStream> {
        let mut rows = materialize(self.node.source(), ctx)?;
        RowSorter::sort(&mut rows, &self.order);
        trace!(provider = %self.node.id, rows = rows.len(), "sorted rows");
        Ok(Box::new(rows.into_iter().map(Ok)))
    }
}
