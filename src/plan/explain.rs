//! Explain output for plans
//!
//! Produces a deterministic, indented rendering of a node tree. Both
//! logical plans and compiled executables can be explained.

use std::fmt;
use std::sync::Arc;

use super::provider::CompilableProvider;

/// A node that can appear in explain output
pub trait ExplainNode {
    /// Operator name
    fn explain_name(&self) -> String;

    /// Operator parameters, possibly empty
    fn explain_detail(&self) -> String;

    fn explain_children(&self) -> Vec<&dyn ExplainNode>;
}

impl ExplainNode for CompilableProvider {
    fn explain_name(&self) -> String {
        self.kind().name().to_string()
    }

    fn explain_detail(&self) -> String {
        let detail = self.kind().describe();
        if detail.is_empty() {
            format!("-> {}", self.header())
        } else {
            format!("{} -> {}", detail, self.header())
        }
    }

    fn explain_children(&self) -> Vec<&dyn ExplainNode> {
        self.sources()
            .iter()
            .map(|s| s.as_ref() as &dyn ExplainNode)
            .collect()
    }
}

/// Rendered explain output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplainPlan {
    /// One entry per node, depth-first, sources in order
    pub lines: Vec<(usize, String)>,
}

impl ExplainPlan {
    pub fn from_node(root: &dyn ExplainNode) -> Self {
        let mut lines = Vec::new();
        Self::walk(root, 0, &mut lines);
        Self { lines }
    }

    pub fn from_plan(plan: &Arc<CompilableProvider>) -> Self {
        Self::from_node(plan.as_ref())
    }

    fn walk(node: &dyn ExplainNode, depth: usize, lines: &mut Vec<(usize, String)>) {
        let detail = node.explain_detail();
        let line = if detail.is_empty() {
            node.explain_name()
        } else {
            format!("{} {}", node.explain_name(), detail)
        };
        lines.push((depth, line));
        for child in node.explain_children() {
            Self::walk(child, depth + 1, lines);
        }
    }
}

impl fmt::Display for ExplainPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== EXPLAIN PLAN ===")?;
        for (depth, line) in &self.lines {
            writeln!(f, "{}{}", "  ".repeat(*depth), line)?;
        }
        Ok(())
    }
}
