//! Grouping and aggregation
//!
//! Groups are emitted in the order their first row was seen. Null and
//! unavailable inputs are ignored by every aggregate except a row count.
//! Without group columns an empty source still yields one row.

use std::collections::HashMap;

use tracing::trace;

use crate::plan::{AggregateColumn, AggregateKind, PlanError};
use crate::tuple::{FieldValue, Tuple, Value};

use super::context::EnumerationContext;
use super::errors::ExecutorResult;
use super::provider::{node_accessors, ExecutableProvider, NodeInfo, RowStream};

/// State for a single group's aggregate.
trait AggregateState: std::fmt::Debug {
    /// Update this state with one input field.
    fn update(&mut self, input: &FieldValue) -> ExecutorResult<()>;

    /// Produce the output field.
    fn finalize(&self) -> FieldValue;
}

#[derive(Debug, Default)]
struct CountState {
    rows: bool,
    count: i64,
}

impl AggregateState for CountState {
    fn update(&mut self, input: &FieldValue) -> ExecutorResult<()> {
        if self.rows || input.value().is_some() {
            self.count += 1;
        }
        Ok(())
    }

    fn finalize(&self) -> FieldValue {
        FieldValue::from(self.count)
    }
}

#[derive(Debug, Default)]
struct SumState {
    sum: Option<Value>,
}

impl AggregateState for SumState {
    fn update(&mut self, input: &FieldValue) -> ExecutorResult<()> {
        let Some(value) = input.value() else {
            return Ok(());
        };
        self.sum = Some(match (self.sum.take(), value) {
            (None, v) => v.clone(),
            (Some(Value::Int(a)), Value::Int(b)) => Value::Int(a.checked_add(*b).ok_or_else(
                || PlanError::arithmetic(format!("sum overflows at {} + {}", a, b)),
            )?),
            (Some(a), b) => Value::Float(a.as_float().unwrap_or(0.0) + b.as_float().unwrap_or(0.0)),
        });
        Ok(())
    }

    fn finalize(&self) -> FieldValue {
        match &self.sum {
            Some(v) => FieldValue::Value(v.clone()),
            None => FieldValue::Null,
        }
    }
}

#[derive(Debug, Default)]
struct AvgState {
    count: u64,
    mean: f64,
}

impl AggregateState for AvgState {
    fn update(&mut self, input: &FieldValue) -> ExecutorResult<()> {
        if let Some(x) = input.value().and_then(Value::as_float) {
            self.count += 1;
            self.mean += (x - self.mean) / self.count as f64;
        }
        Ok(())
    }

    fn finalize(&self) -> FieldValue {
        if self.count == 0 {
            FieldValue::Null
        } else {
            FieldValue::from(self.mean)
        }
    }
}

#[derive(Debug)]
struct ExtremeState {
    max: bool,
    value: Option<Value>,
}

impl AggregateState for ExtremeState {
    fn update(&mut self, input: &FieldValue) -> ExecutorResult<()> {
        let Some(value) = input.value() else {
            return Ok(());
        };
        let replace = match &self.value {
            None => true,
            Some(current) if self.max => value > current,
            Some(current) => value < current,
        };
        if replace {
            self.value = Some(value.clone());
        }
        Ok(())
    }

    fn finalize(&self) -> FieldValue {
        match &self.value {
            Some(v) => FieldValue::Value(v.clone()),
            None => FieldValue::Null,
        }
    }
}

fn new_state(column: &AggregateColumn) -> Box<dyn AggregateState> {
    match column.kind {
        AggregateKind::Count => Box::new(CountState {
            rows: column.column.is_none(),
            count: 0,
        }),
        AggregateKind::Sum => Box::<SumState>::default(),
        AggregateKind::Avg => Box::<AvgState>::default(),
        AggregateKind::Min => Box::new(ExtremeState {
            max: false,
            value: None,
        }),
        AggregateKind::Max => Box::new(ExtremeState {
            max: true,
            value: None,
        }),
    }
}

/// Hash aggregation over group columns
#[derive(Debug)]
pub struct AggregateExec {
    node: NodeInfo,
    group_by: Vec<usize>,
    columns: Vec<AggregateColumn>,
}

impl AggregateExec {
    pub fn new(node: NodeInfo, group_by: Vec<usize>, columns: Vec<AggregateColumn>) -> Self {
        Self {
            node,
            group_by,
            columns,
        }
    }

    fn states(&self) -> Vec<Box<dyn AggregateState>> {
        self.columns.iter().map(new_state).collect()
    }

    fn update(&self, states: &mut [Box<dyn AggregateState>], row: &Tuple) -> ExecutorResult<()> {
        for (state, column) in states.iter_mut().zip(&self.columns) {
            match column.column {
                Some(c) => state.update(row.field(c).unwrap_or(&FieldValue::Unavailable))?,
                None => state.update(&FieldValue::Null)?,
            }
        }
        Ok(())
    }
}

impl ExecutableProvider for AggregateExec {
    node_accessors!();

    fn name(&self) -> &'static str {
        "Aggregate"
    }

    fn detail(&self) -> String {
        let aggregates: Vec<String> = self
            .columns
            .iter()
            .map(|a| match a.column {
                Some(c) => format!("{}(#{}) as {}", a.kind.as_str(), c, a.name),
                None => format!("{}(*) as {}", a.kind.as_str(), a.name),
            })
            .collect();
        let groups: Vec<String> = self.group_by.iter().map(|c| format!("#{}", c)).collect();
        format!("group by [{}] {}", groups.join(", "), aggregates.join(", "))
    }

    fn enumerate(&self, ctx: &EnumerationContext) -> ExecutorResult<RowStream> {
        let mut positions: HashMap<Vec<FieldValue>, usize> = HashMap::new();
        let mut groups: Vec<(Vec<FieldValue>, Vec<Box<dyn AggregateState>>)> = Vec::new();

        for row in self.node.source().enumerate(ctx)? {
            let row = row?;
            let key: Vec<FieldValue> = self
                .group_by
                .iter()
                .map(|&c| row.field(c).cloned().unwrap_or(FieldValue::Unavailable))
                .collect();
            let position = match positions.get(&key) {
                Some(&p) => p,
                None => {
                    positions.insert(key.clone(), groups.len());
                    groups.push((key, self.states()));
                    groups.len() - 1
                }
            };
            self.update(&mut groups[position].1, &row)?;
        }

        if groups.is_empty() && self.group_by.is_empty() {
            groups.push((Vec::new(), self.states()));
        }
        trace!(provider = %self.node.id, groups = groups.len(), "aggregated");

        let descriptor = self.node.header.descriptor().clone();
        let rows = groups
            .into_iter()
            .map(|(mut fields, states)| -> ExecutorResult<Tuple> {
                fields.extend(states.iter().map(|s| s.finalize()));
                Ok(Tuple::new(descriptor.clone(), fields)?)
            })
            .collect::<ExecutorResult<Vec<_>>>()?;
        Ok(Box::new(rows.into_iter().map(Ok)))
    }
}
