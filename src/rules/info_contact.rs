//! The info object should name a contact.

use crate::parser::ParseNode;
use crate::rules::RuleVisitor;
use crate::walker::{ReportSpec, VisitContext};

/// Reports an `info` object without a `contact` field.
pub struct InfoContact;

impl RuleVisitor for InfoContact {
    fn targets(&self) -> Vec<&str> {
        vec!["Info"]
    }

    fn enter(&mut self, node: &ParseNode, ctx: &mut VisitContext<'_>) {
        if node.entries().is_some() && !node.has_key("contact") {
            ctx.report(ReportSpec::new("Info object should contain `contact` field.").on_key());
        }
    }
}
