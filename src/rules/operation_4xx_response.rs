//! Every operation should describe at least one client-error response.

use crate::parser::ParseNode;
use crate::rules::RuleVisitor;
use crate::walker::{ReportSpec, VisitContext};

/// Reports operations whose `responses` lists no `4xx` code.
pub struct Operation4xxResponse;

impl RuleVisitor for Operation4xxResponse {
    fn targets(&self) -> Vec<&str> {
        vec!["Responses"]
    }

    fn enter(&mut self, node: &ParseNode, ctx: &mut VisitContext<'_>) {
        let Some(entries) = node.entries() else {
            return;
        };
        if !entries.iter().any(|e| e.key.starts_with('4')) {
            ctx.report(
                ReportSpec::new("Operation must have at least one `4xx` response.").on_key(),
            );
        }
    }
}
