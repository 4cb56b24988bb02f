//! Paths should not end with a trailing slash.
//!
//! `/pets` and `/pets/` are different paths to most routers; mixing them
//! is almost always unintentional.

use crate::parser::ParseNode;
use crate::rules::RuleVisitor;
use crate::walker::{ReportSpec, VisitContext};

/// Reports path keys that end with `/` (the bare `/` root is allowed).
pub struct NoPathTrailingSlash;

impl RuleVisitor for NoPathTrailingSlash {
    fn targets(&self) -> Vec<&str> {
        vec!["Paths"]
    }

    fn enter(&mut self, node: &ParseNode, ctx: &mut VisitContext<'_>) {
        let Some(entries) = node.entries() else {
            return;
        };
        for entry in entries {
            if entry.key != "/" && entry.key.ends_with('/') {
                ctx.report(
                    ReportSpec::new(format!(
                        "Path `{}` should not end with a slash.",
                        entry.key
                    ))
                    .at(ctx.child_location(&entry.key))
                    .on_key(),
                );
            }
        }
    }
}
