//! Tags should be described.

use crate::parser::ParseNode;
use crate::rules::RuleVisitor;
use crate::walker::{ReportSpec, VisitContext};

/// Reports tags without a `description` field.
pub struct TagDescription;

impl RuleVisitor for TagDescription {
    fn targets(&self) -> Vec<&str> {
        vec!["Tag"]
    }

    fn enter(&mut self, node: &ParseNode, ctx: &mut VisitContext<'_>) {
        if node.entries().is_some() && !node.has_key("description") {
            ctx.report(ReportSpec::new("Tag object should contain `description` field.").on_key());
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::test_util::lint_yaml;

    const RULES: &[(&str, &str)] = &[("tag-description", "warn")];

    #[test]
    fn reports_undescribed_tag() {
        let problems = lint_yaml(
            "openapi: 3.0.0\ninfo: {title: T, version: '1'}\ntags:\n  - name: pets\npaths: {}\n",
            RULES,
        );
        assert_eq!(problems.len(), 1);
        assert_eq!(problems[0].location[0].pointer, "#/tags/0");
    }

    #[test]
    fn accepts_described_tag() {
        let problems = lint_yaml(
            "openapi: 3.0.0\ninfo: {title: T, version: '1'}\ntags:\n  - name: pets\n    description: Pet things\npaths: {}\n",
            RULES,
        );
        assert!(problems.is_empty());
    }
}
