//! Operations should carry a `summary`.

use crate::parser::ParseNode;
use crate::rules::RuleVisitor;
use crate::walker::{ReportSpec, VisitContext};

/// Reports operations without a `summary` field.
pub struct OperationSummary;

impl RuleVisitor for OperationSummary {
    fn targets(&self) -> Vec<&str> {
        vec!["Operation"]
    }

    fn enter(&mut self, node: &ParseNode, ctx: &mut VisitContext<'_>) {
        if node.entries().is_some() && !node.has_key("summary") {
            ctx.report(
                ReportSpec::new("Operation object should contain `summary` field.").on_key(),
            );
        }
    }
}
