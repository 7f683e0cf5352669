//! Row-shaping operators
//!
//! Streaming operators that rename, project or extend source rows one at a
//! time. None of them change row order.

use crate::plan::CalculatedColumn;
use crate::tuple::{FieldValue, MapTransform, Tuple, TupleResult};

use super::context::EnumerationContext;
use super::errors::ExecutorResult;
use super::provider::{node_accessors, ExecutableProvider, NodeInfo, RowStream};

/// Renames columns; rows pass through unchanged
#[derive(Debug)]
pub struct AliasExec {
    node: NodeInfo,
    alias: String,
}

impl AliasExec {
    pub fn new(node: NodeInfo, alias: String) -> Self {
        Self { node, alias }
    }
}

impl ExecutableProvider for AliasExec {
    node_accessors!();

    fn name(&self) -> &'static str {
        "Alias"
    }

    fn detail(&self) -> String {
        self.alias.clone()
    }

    fn enumerate(&self, ctx: &EnumerationContext) -> ExecutorResult<RowStream> {
        self.node.source().enumerate(ctx)
    }
}

/// Marks where a subtree runs; rows pass through unchanged
#[derive(Debug)]
pub struct SiteExec {
    node: NodeInfo,
}

impl SiteExec {
    pub fn new(node: NodeInfo) -> Self {
        Self { node }
    }
}

impl ExecutableProvider for SiteExec {
    node_accessors!();

    fn name(&self) -> &'static str {
        "ExecutionSite"
    }

    fn detail(&self) -> String {
        self.node.site.to_string()
    }

    fn enumerate(&self, ctx: &EnumerationContext) -> ExecutorResult<RowStream> {
        self.node.source().enumerate(ctx)
    }
}

/// Appends computed columns
#[derive(Debug)]
pub struct CalculateExec {
    node: NodeInfo,
    columns: Vec<CalculatedColumn>,
}

impl CalculateExec {
    pub fn new(node: NodeInfo, columns: Vec<CalculatedColumn>) -> Self {
        Self { node, columns }
    }
}

impl ExecutableProvider for CalculateExec {
    node_accessors!();

    fn name(&self) -> &'static str {
        "Calculate"
    }

    fn detail(&self) -> String {
        self.columns
            .iter()
            .map(|c| format!("{} = {}", c.name, c.expr))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn enumerate(&self, ctx: &EnumerationContext) -> ExecutorResult<RowStream> {
        let rows = self.node.source().enumerate(ctx)?;
        let columns = self.columns.clone();
        let descriptor = self.node.header.descriptor().clone();
        let params = ctx.clone();
        Ok(Box::new(rows.map(move |row| -> ExecutorResult<Tuple> {
            let row = row?;
            let mut fields = row.fields().to_vec();
            for column in &columns {
                fields.push(column.expr.eval(&row, &params)?);
            }
            Ok(Tuple::new(descriptor.clone(), fields)?)
        })))
    }
}

/// Projects and reorders columns
#[derive(Debug)]
pub struct SelectExec {
    node: NodeInfo,
    transform: MapTransform,
}

impl SelectExec {
    pub fn new(node: NodeInfo, columns: &[usize]) -> TupleResult<Self> {
        let transform = MapTransform::select(node.source().header().descriptor().clone(), columns)?;
        Ok(Self { node, transform })
    }
}

impl ExecutableProvider for SelectExec {
    node_accessors!();

    fn name(&self) -> &'static str {
        "Select"
    }

    fn detail(&self) -> String {
        self.transform
            .map()
            .iter()
            .map(|&(_, c)| format!("#{}", c))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn enumerate(&self, ctx: &EnumerationContext) -> ExecutorResult<RowStream> {
        let rows = self.node.source().enumerate(ctx)?;
        let transform = self.transform.clone();
        Ok(Box::new(rows.map(move |row| -> ExecutorResult<Tuple> {
            Ok(transform.apply_one(&row?))
        })))
    }
}

/// Appends a 1-based row number
#[derive(Debug)]
pub struct RowNumberExec {
    node: NodeInfo,
}

impl RowNumberExec {
    pub fn new(node: NodeInfo) -> Self {
        Self { node }
    }
}

impl ExecutableProvider for RowNumberExec {
    node_accessors!();

    fn name(&self) -> &'static str {
        "RowNumber"
    }

    fn enumerate(&self, ctx: &EnumerationContext) -> ExecutorResult<RowStream> {
        let rows = self.node.source().enumerate(ctx)?;
        let descriptor = self.node.header.descriptor().clone();
        Ok(Box::new(rows.zip(1i64..).map(move |(row, number)| -> ExecutorResult<Tuple> {
            let mut fields = row?.into_fields();
            fields.push(FieldValue::from(number));
            Ok(Tuple::new(descriptor.clone(), fields)?)
        })))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::executor::testing::{collect, int_rows, ints, node};
    use crate::plan::Expr;

    #[test]
    fn test_calculate_appends_columns() {
        let source = ints(&["a", "b"], &[&[1, 10], &[2, 20]]);
        let header = source.header().extend([("sum", crate::tuple::FieldType::Int)]);
        let calculate = CalculateExec::new(
            node(header, vec![source]),
            vec![CalculatedColumn {
                name: "sum".to_string(),
                expr: Expr::column(0).plus(Expr::column(1)),
            }],
        );

        assert_eq!(
            int_rows(&collect(&calculate)),
            vec![
                vec![Some(1), Some(10), Some(11)],
                vec![Some(2), Some(20), Some(22)]
            ]
        );
    }

    #[test]
    fn test_select_reorders() {
        let source = ints(&["a", "b", "c"], &[&[1, 2, 3]]);
        let header = source.header().select(&[2, 0]).unwrap();
        let select = SelectExec::new(node(header, vec![source]), &[2, 0]).unwrap();

        assert_eq!(int_rows(&collect(&select)), vec![vec![Some(3), Some(1)]]);
    }

    #[test]
    fn test_row_number_restarts_per_enumeration() {
        let source = ints(&["a"], &[&[7], &[8]]);
        let header = source.header().extend([("n", crate::tuple::FieldType::Int)]);
        let numbered: Arc<dyn ExecutableProvider> =
            Arc::new(RowNumberExec::new(node(header, vec![source])));

        let expected = vec![vec![Some(7), Some(1)], vec![Some(8), Some(2)]];
        assert_eq!(int_rows(&collect(numbered.as_ref())), expected);
        assert_eq!(int_rows(&collect(numbered.as_ref())), expected);
    }
}
