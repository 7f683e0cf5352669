//! Correlated evaluation
//!
//! `ApplyExec` evaluates its right subtree once per left row, in a child
//! enumeration context where the apply parameter is bound to that row.
//! The child context is closed as soon as the right rows for the left row
//! have been collected, so nothing the right subtree cached outlives it.

use std::rc::Rc;
use std::sync::Arc;

use tracing::trace;

use crate::plan::{ApplyParameter, ApplySequenceType, ApplyType};
use crate::tuple::{CombineTransform, FieldValue, Tuple};

use super::context::EnumerationContext;
use super::errors::{ExecutorError, ExecutorResult};
use super::provider::{node_accessors, ExecutableProvider, NodeInfo, RowStream};

struct ApplyState {
    ctx: EnumerationContext,
    right: Arc<dyn ExecutableProvider>,
    parameter: ApplyParameter,
    apply_type: ApplyType,
    sequence_type: ApplySequenceType,
    combine: CombineTransform,
    blank: Tuple,
}

impl ApplyState {
    /// Right rows pulled per left row; one extra row detects a second
    /// element for single sequences
    fn limit(&self) -> usize {
        match self.sequence_type {
            ApplySequenceType::All => usize::MAX,
            ApplySequenceType::First | ApplySequenceType::FirstOrDefault => 1,
            ApplySequenceType::Single | ApplySequenceType::SingleOrDefault => 2,
        }
    }

    fn right_rows(&self, left: &Tuple) -> ExecutorResult<Vec<Tuple>> {
        let child = self.ctx.create_child()?;
        let rows = self.enumerate_in(&child, left);
        child.close();
        rows
    }

    fn enumerate_in(&self, child: &EnumerationContext, left: &Tuple) -> ExecutorResult<Vec<Tuple>> {
        child.bind(&self.parameter, left.clone())?;
        self.right.on_before_enumerate(child)?;
        let rows = self
            .right
            .enumerate(child)?
            .take(self.limit())
            .collect::<ExecutorResult<Vec<_>>>()?;
        self.right.on_after_enumerate(child)?;
        Ok(rows)
    }

    fn apply(&self, left: Tuple) -> ExecutorResult<Vec<Tuple>> {
        let right = self.right_rows(&left)?;
        if self.sequence_type.is_single() && right.len() > 1 {
            return Err(ExecutorError::sequence_has_more_than_one_element());
        }
        if right.is_empty() {
            if self.sequence_type.requires_row() {
                return Err(ExecutorError::sequence_is_empty());
            }
            return Ok(match self.apply_type {
                ApplyType::LeftOuter => vec![self.combine.apply(&left, &self.blank)],
                ApplyType::Inner => Vec::new(),
            });
        }
        Ok(right.iter().map(|r| self.combine.apply(&left, r)).collect())
    }
}

/// Per-row correlated evaluation of a right subtree
#[derive(Debug)]
pub struct ApplyExec {
    node: NodeInfo,
    parameter: ApplyParameter,
    apply_type: ApplyType,
    sequence_type: ApplySequenceType,
}

impl ApplyExec {
    pub fn new(
        node: NodeInfo,
        parameter: ApplyParameter,
        apply_type: ApplyType,
        sequence_type: ApplySequenceType,
    ) -> Self {
        Self {
            node,
            parameter,
            apply_type,
            sequence_type,
        }
    }

    fn left(&self) -> &Arc<dyn ExecutableProvider> {
        &self.node.sources[0]
    }

    fn right(&self) -> &Arc<dyn ExecutableProvider> {
        &self.node.sources[1]
    }
}

impl ExecutableProvider for ApplyExec {
    node_accessors!();

    fn name(&self) -> &'static str {
        "Apply"
    }

    fn detail(&self) -> String {
        format!(
            "{} {:?} {:?}",
            self.parameter, self.apply_type, self.sequence_type
        )
    }

    fn enumerate(&self, ctx: &EnumerationContext) -> ExecutorResult<RowStream> {
        let right_descriptor = self.right().header().descriptor().clone();
        let state = Rc::new(ApplyState {
            ctx: ctx.clone(),
            right: self.right().clone(),
            parameter: self.parameter.clone(),
            apply_type: self.apply_type,
            sequence_type: self.sequence_type,
            combine: CombineTransform::new(
                self.left().header().descriptor().clone(),
                right_descriptor.clone(),
            ),
            blank: Tuple::blank(right_descriptor),
        });
        trace!(provider = %self.node.id, parameter = %self.parameter, "starting apply");

        let left = self.left().enumerate(ctx)?;
        let rows = left.flat_map(move |row| match row.and_then(|row| state.apply(row)) {
            Ok(rows) => rows.into_iter().map(Ok).collect::<Vec<_>>(),
            Err(e) => vec![Err(e)],
        });
        // Nothing follows the first error
        Ok(Box::new(rows.scan(false, |failed, row| {
            if *failed {
                return None;
            }
            *failed = row.is_err();
            Some(row)
        })))
    }

    /// The right subtree gets its hooks per left row, in the child scope
    fn on_before_enumerate(&self, ctx: &EnumerationContext) -> ExecutorResult<()> {
        self.left().on_before_enumerate(ctx)
    }

    fn on_after_enumerate(&self, ctx: &EnumerationContext) -> ExecutorResult<()> {
        ctx.remove_item(self.node.id);
        self.left().on_after_enumerate(ctx)
    }
}

/// Single boolean row telling whether the source yields any row
#[derive(Debug)]
pub struct ExistenceExec {
    node: NodeInfo,
}

impl ExistenceExec {
    pub fn new(node: NodeInfo) -> Self {
        Self { node }
    }
}

impl ExecutableProvider for ExistenceExec {
    node_accessors!();

    fn name(&self) -> &'static str {
        "Existence"
    }

    fn enumerate(&self, ctx: &EnumerationContext) -> ExecutorResult<RowStream> {
        let source = self.node.source().clone();
        let descriptor = self.node.header.descriptor().clone();
        let ctx = ctx.clone();
        Ok(Box::new(std::iter::once_with(move || -> ExecutorResult<Tuple> {
            let exists = source.enumerate(&ctx)?.next().transpose()?.is_some();
            Ok(Tuple::new(descriptor, vec![FieldValue::from(exists)])?)
        })))
    }
}
