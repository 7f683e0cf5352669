//! Row filtering for query execution
//!
//! Operators that keep or drop source rows without reshaping them.
//! Predicates use three-valued logic: a row is kept only when its
//! predicate is true, never when it is null.

use std::collections::HashSet;

use crate::plan::Expr;
use crate::tuple::{Tuple, TupleDescriptor};

use super::context::EnumerationContext;
use super::errors::ExecutorResult;
use super::provider::{node_accessors, ExecutableProvider, NodeInfo, RowStream};

/// Keeps rows matching a predicate
#[derive(Debug)]
pub struct FilterExec {
    node: NodeInfo,
    predicate: Expr,
}

impl FilterExec {
    pub fn new(node: NodeInfo, predicate: Expr) -> Self {
        Self { node, predicate }
    }
}

impl ExecutableProvider for FilterExec {
    node_accessors!();

    fn name(&self) -> &'static str {
        "Filter"
    }

    fn detail(&self) -> String {
        self.predicate.to_string()
    }

    fn enumerate(&self, ctx: &EnumerationContext) -> ExecutorResult<RowStream> {
        let rows = self.node.source().enumerate(ctx)?;
        let predicate = self.predicate.clone();
        let params = ctx.clone();
        Ok(Box::new(rows.filter_map(move |row| {
            let row = match row {
                Ok(row) => row,
                Err(e) => return Some(Err(e)),
            };
            match predicate.matches(&row, &params) {
                Ok(true) => Some(Ok(row)),
                Ok(false) => None,
                Err(e) => Some(Err(e.into())),
            }
        })))
    }
}

/// Drops repeated rows, keeping the first occurrence
#[derive(Debug)]
pub struct DistinctExec {
    node: NodeInfo,
}

impl DistinctExec {
    pub fn new(node: NodeInfo) -> Self {
        Self { node }
    }
}

impl ExecutableProvider for DistinctExec {
    node_accessors!();

    fn name(&self) -> &'static str {
        "Distinct"
    }

    fn enumerate(&self, ctx: &EnumerationContext) -> ExecutorResult<RowStream> {
        let rows = self.node.source().enumerate(ctx)?;
        let mut seen: HashSet<Tuple> = HashSet::new();
        Ok(Box::new(rows.filter(move |row| match row {
            Ok(row) => seen.insert(row.clone()),
            Err(_) => true,
        })))
    }
}

/// Evaluates a row count argument; null and negative counts are zero
fn eval_count(count: &Expr, ctx: &EnumerationContext) -> ExecutorResult<usize> {
    let value = count.eval(&Tuple::blank(TupleDescriptor::empty()), ctx)?;
    let n = value.value().and_then(|v| v.as_int()).unwrap_or(0);
    Ok(usize::try_from(n).unwrap_or(0))
}

/// Drops the first `count` rows
#[derive(Debug)]
pub struct SkipExec {
    node: NodeInfo,
    count: Expr,
}

impl SkipExec {
    pub fn new(node: NodeInfo, count: Expr) -> Self {
        Self { node, count }
    }
}

impl ExecutableProvider for SkipExec {
    node_accessors!();

    fn name(&self) -> &'static str {
        "Skip"
    }

    fn detail(&self) -> String {
        self.count.to_string()
    }

    fn enumerate(&self, ctx: &EnumerationContext) -> ExecutorResult<RowStream> {
        let mut remaining = eval_count(&self.count, ctx)?;
        let rows = self.node.source().enumerate(ctx)?;
        // Errors pass through and do not count toward the skip
        Ok(Box::new(rows.filter(move |row| match row {
            Ok(_) if remaining > 0 => {
                remaining -= 1;
                false
            }
            _ => true,
        })))
    }
}

/// Keeps the first `count` rows
#[derive(Debug)]
pub struct TakeExec {
    node: NodeInfo,
    count: Expr,
}

impl TakeExec {
    pub fn new(node: NodeInfo, count: Expr) -> Self {
        Self { node, count }
    }
}

impl ExecutableProvider for TakeExec {
    node_accessors!();

    fn name(&self) -> &'static str {
        "Take"
    }

    fn detail(&self) -> String {
        self.count.to_string()
    }

    fn enumerate(&self, ctx: &EnumerationContext) -> ExecutorResult<RowStream> {
        let n = eval_count(&self.count, ctx)?;
        if n == 0 {
            return Ok(Box::new(std::iter::empty()));
        }
        Ok(Box::new(self.node.source().enumerate(ctx)?.take(n)))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::executor::testing::{collect, int_rows, ints, node};
    use crate::tuple::Value;

    #[test]
    fn test_filter_keeps_matching_rows() {
        let source = ints(&["a", "b"], &[&[1, 10], &[2, 20], &[3, 30]]);
        let filter = FilterExec::new(
            node(source.header().clone(), vec![source]),
            Expr::column(1).greater_or_equal(Expr::literal(20i64)),
        );

        let rows = collect(&filter);

        assert_eq!(
            int_rows(&rows),
            vec![vec![Some(2), Some(20)], vec![Some(3), Some(30)]]
        );
    }

    #[test]
    fn test_null_predicate_drops_row() {
        let source = ints(&["a"], &[&[1]]);
        let filter = FilterExec::new(
            node(source.header().clone(), vec![source]),
            Expr::column(0).equal(Expr::Null(crate::tuple::FieldType::Int)),
        );

        assert!(collect(&filter).is_empty());
    }

    #[test]
    fn test_distinct_keeps_first_occurrence() {
        let source = ints(&["a"], &[&[3], &[1], &[3], &[2], &[1]]);
        let distinct = DistinctExec::new(node(source.header().clone(), vec![source]));

        let rows = collect(&distinct);

        assert_eq!(
            int_rows(&rows),
            vec![vec![Some(3)], vec![Some(1)], vec![Some(2)]]
        );
    }

    #[test]
    fn test_skip_take() {
        let source = ints(&["a"], &[&[1], &[2], &[3], &[4]]);
        let skip: Arc<dyn ExecutableProvider> = Arc::new(SkipExec::new(
            node(source.header().clone(), vec![source]),
            Expr::literal(1i64),
        ));
        let take = TakeExec::new(
            node(skip.header().clone(), vec![skip]),
            Expr::literal(2i64),
        );

        assert_eq!(int_rows(&collect(&take)), vec![vec![Some(2)], vec![Some(3)]]);
    }

    #[test]
    fn test_skip_passes_source_errors_through() {
        let source = ints(&["a"], &[&[i64::MAX], &[1], &[2]]);
        let overflowing: Arc<dyn ExecutableProvider> = Arc::new(FilterExec::new(
            node(source.header().clone(), vec![source]),
            Expr::column(0).times(Expr::literal(2i64)).greater(Expr::literal(0i64)),
        ));
        let skip = SkipExec::new(
            node(overflowing.header().clone(), vec![overflowing]),
            Expr::literal(1i64),
        );

        let ctx = EnumerationContext::new(8);
        let rows: Vec<_> = skip.enumerate(&ctx).unwrap().collect();

        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0].as_ref().unwrap_err().code(),
            crate::executor::ExecutorErrorCode::Evaluation
        );
        assert_eq!(rows[1].as_ref().unwrap().value(0), Some(&Value::Int(2)));
    }

    #[test]
    fn test_negative_count_is_zero() {
        let source = ints(&["a"], &[&[1], &[2]]);
        let take = TakeExec::new(
            node(source.header().clone(), vec![source]),
            Expr::literal(-5i64),
        );

        assert!(collect(&take).is_empty());
    }
}
