//! The info object should name a license.

use crate::parser::ParseNode;
use crate::rules::RuleVisitor;
use crate::walker::{ReportSpec, VisitContext};

/// Reports an `info` object without a `license` field.
pub struct InfoLicense;

impl RuleVisitor for InfoLicense {
    fn targets(&self) -> Vec<&str> {
        vec!["Info"]
    }

    fn enter(&mut self, node: &ParseNode, ctx: &mut VisitContext<'_>) {
        if node.entries().is_some() && !node.has_key("license") {
            ctx.report(ReportSpec::new("Info object should contain `license` field.").on_key());
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::test_util::lint_yaml;

    const RULES: &[(&str, &str)] = &[("info-license", "warn")];

    #[test]
    fn reports_missing_license() {
        let problems = lint_yaml(
            "openapi: 3.0.0\ninfo: {title: T, version: '1'}\npaths: {}\n",
            RULES,
        );
        assert_eq!(problems.len(), 1);
        assert_eq!(
            problems[0].message,
            "Info object should contain `license` field."
        );
    }

    #[test]
    fn accepts_info_with_license() {
        let problems = lint_yaml(
            "openapi: 3.0.0\ninfo:\n  title: T\n  version: '1'\n  license:\n    name: MIT\npaths: {}\n",
            RULES,
        );
        assert!(problems.is_empty());
    }
}
