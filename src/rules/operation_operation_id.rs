//! Operations should carry an `operationId`.

use crate::parser::ParseNode;
use crate::rules::RuleVisitor;
use crate::walker::{ReportSpec, VisitContext};

/// Reports operations without an `operationId` field.
pub struct OperationOperationId;

impl RuleVisitor for OperationOperationId {
    fn targets(&self) -> Vec<&str> {
        vec!["Operation"]
    }

    fn enter(&mut self, node: &ParseNode, ctx: &mut VisitContext<'_>) {
        if node.entries().is_some() && !node.has_key("operationId") {
            ctx.report(
                ReportSpec::new("Operation object should contain `operationId` field.").on_key(),
            );
        }
    }
}
