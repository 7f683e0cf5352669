//! Equality joins
//!
//! The right input is materialised once per enumeration and the left
//! input is streamed, so output follows left order. For each left row the
//! matching right rows are emitted in right input order. Null and
//! unavailable key fields never match.

use std::collections::HashMap;
use std::rc::Rc;

use tracing::trace;

use crate::plan::{JoinAlgorithm, JoinType};
use crate::tuple::{CombineTransform, FieldValue, Tuple};

use super::context::EnumerationContext;
use super::errors::ExecutorResult;
use super::provider::{materialize, node_accessors, ExecutableProvider, NodeInfo, RowStream};

/// Key of `row` over `columns`, or None when a key field has no value
fn join_key(row: &Tuple, columns: &[usize]) -> Option<Vec<FieldValue>> {
    columns
        .iter()
        .map(|&c| match row.field(c) {
            Some(field @ FieldValue::Value(_)) => Some(field.clone()),
            _ => None,
        })
        .collect()
}

enum Matcher {
    Hash(HashMap<Vec<FieldValue>, Vec<usize>>),
    NestedLoop,
}

struct JoinState {
    right: Vec<Tuple>,
    matcher: Matcher,
    left_columns: Vec<usize>,
    right_columns: Vec<usize>,
    join_type: JoinType,
    combine: CombineTransform,
    blank: Tuple,
}

impl JoinState {
    fn matches(&self, left: &Tuple) -> Vec<ExecutorResult<Tuple>> {
        let mut out = Vec::new();
        if let Some(key) = join_key(left, &self.left_columns) {
            match &self.matcher {
                Matcher::Hash(table) => {
                    for &i in table.get(&key).into_iter().flatten() {
                        out.push(Ok(self.combine.apply(left, &self.right[i])));
                    }
                }
                Matcher::NestedLoop => {
                    for right in &self.right {
                        if join_key(right, &self.right_columns).as_ref() == Some(&key) {
                            out.push(Ok(self.combine.apply(left, right)));
                        }
                    }
                }
            }
        }
        if out.is_empty() && self.join_type == JoinType::LeftOuter {
            out.push(Ok(self.combine.apply(left, &self.blank)));
        }
        out
    }
}

/// Hash or nested-loop equality join
#[derive(Debug)]
pub struct JoinExec {
    node: NodeInfo,
    algorithm: JoinAlgorithm,
    join_type: JoinType,
    equal_columns: Vec<(usize, usize)>,
}

impl JoinExec {
    pub fn new(
        node: NodeInfo,
        algorithm: JoinAlgorithm,
        join_type: JoinType,
        equal_columns: Vec<(usize, usize)>,
    ) -> Self {
        Self {
            node,
            algorithm,
            join_type,
            equal_columns,
        }
    }

    fn left(&self) -> &std::sync::Arc<dyn ExecutableProvider> {
        &self.node.sources[0]
    }

    fn right(&self) -> &std::sync::Arc<dyn ExecutableProvider> {
        &self.node.sources[1]
    }
}

impl ExecutableProvider for JoinExec {
    node_accessors!();

    fn name(&self) -> &'static str {
        "Join"
    }

    fn detail(&self) -> String {
        let pairs: Vec<String> = self
            .equal_columns
            .iter()
            .map(|(l, r)| format!("#{} = #{}", l, r))
            .collect();
        format!(
            "{:?} {:?} on {}",
            self.algorithm,
            self.join_type,
            pairs.join(" and ")
        )
    }

    fn enumerate(&self, ctx: &EnumerationContext) -> ExecutorResult<RowStream> {
        let right = materialize(self.right(), ctx)?;
        let left_columns: Vec<usize> = self.equal_columns.iter().map(|&(l, _)| l).collect();
        let right_columns: Vec<usize> = self.equal_columns.iter().map(|&(_, r)| r).collect();

        let matcher = match self.algorithm {
            JoinAlgorithm::Hash => {
                let mut table: HashMap<Vec<FieldValue>, Vec<usize>> = HashMap::new();
                for (i, row) in right.iter().enumerate() {
                    if let Some(key) = join_key(row, &right_columns) {
                        table.entry(key).or_default().push(i);
                    }
                }
                trace!(provider = %self.node.id, keys = table.len(), "built join table");
                Matcher::Hash(table)
            }
            JoinAlgorithm::NestedLoop => Matcher::NestedLoop,
        };

        let right_descriptor = self.right().header().descriptor().clone();
        let state = Rc::new(JoinState {
            right,
            matcher,
            left_columns,
            right_columns,
            join_type: self.join_type,
            combine: CombineTransform::new(
                self.left().header().descriptor().clone(),
                right_descriptor.clone(),
            ),
            blank: Tuple::blank(right_descriptor),
        });

        let left = self.left().enumerate(ctx)?;
        Ok(Box::new(left.flat_map(move |row| match row {
            Ok(row) => state.matches(&row),
            Err(e) => vec![Err(e)],
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::testing::{collect, int_rows, ints, node};

    fn join(algorithm: JoinAlgorithm, join_type: JoinType) -> JoinExec {
        let left = ints(&["id", "x"], &[&[1, 100], &[2, 200], &[3, 300]]);
        let right = ints(&["owner", "y"], &[&[3, 31], &[1, 11], &[3, 32]]);
        let header = left.header().join(right.header());
        JoinExec::new(
            node(header, vec![left, right]),
            algorithm,
            join_type,
            vec![(0, 0)],
        )
    }

    #[test]
    fn test_inner_join_keeps_left_order() {
        for algorithm in [JoinAlgorithm::Hash, JoinAlgorithm::NestedLoop] {
            let rows = collect(&join(algorithm, JoinType::Inner));
            assert_eq!(
                int_rows(&rows),
                vec![
                    vec![Some(1), Some(100), Some(1), Some(11)],
                    vec![Some(3), Some(300), Some(3), Some(31)],
                    vec![Some(3), Some(300), Some(3), Some(32)],
                ],
                "{:?}",
                algorithm
            );
        }
    }

    #[test]
    fn test_left_outer_join_pads_unavailable() {
        for algorithm in [JoinAlgorithm::Hash, JoinAlgorithm::NestedLoop] {
            let rows = collect(&join(algorithm, JoinType::LeftOuter));
            assert_eq!(rows.len(), 4);
            assert_eq!(int_rows(&rows[1..2]), vec![vec![Some(2), Some(200), None, None]]);
            assert!(!rows[1].is_available(2));
            assert!(!rows[1].is_available(3));
        }
    }
}
