//! OAS 3 documents should declare their servers.

use crate::parser::{NodeKind, ParseNode};
use crate::rules::RuleVisitor;
use crate::schema::OasVersion;
use crate::walker::{ReportSpec, VisitContext};

/// Reports a missing or empty `servers` array on the root.
pub struct NoEmptyServers;

impl RuleVisitor for NoEmptyServers {
    fn targets(&self) -> Vec<&str> {
        vec!["Root"]
    }

    fn enter(&mut self, node: &ParseNode, ctx: &mut VisitContext<'_>) {
        if ctx.oas_version == OasVersion::Oas2 {
            return;
        }
        match node.get("servers") {
            None => {
                ctx.report(ReportSpec::new("Servers must be present.").on_key());
            }
            Some(servers) => {
                if matches!(&servers.kind, NodeKind::Sequence(items) if items.is_empty()) {
                    ctx.report(
                        ReportSpec::new("Servers must be a non-empty array.")
                            .at(ctx.child_location("servers")),
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::test_util::lint_yaml;

    const RULES: &[(&str, &str)] = &[("no-empty-servers", "warn")];

    #[test]
    fn reports_missing_servers() {
        let problems = lint_yaml(
            "openapi: 3.0.0\ninfo: {title: T, version: '1'}\npaths: {}\n",
            RULES,
        );
        assert_eq!(problems.len(), 1);
        assert_eq!(problems[0].message, "Servers must be present.");
    }

    #[test]
    fn reports_empty_servers_array() {
        let problems = lint_yaml(
            "openapi: 3.0.0\ninfo: {title: T, version: '1'}\nservers: []\npaths: {}\n",
            RULES,
        );
        assert_eq!(problems.len(), 1);
        assert_eq!(problems[0].location[0].pointer, "#/servers");
    }

    #[test]
    fn accepts_declared_servers() {
        let problems = lint_yaml(
            "openapi: 3.0.0\ninfo: {title: T, version: '1'}\nservers:\n  - url: https://api.example.com\npaths: {}\n",
            RULES,
        );
        assert!(problems.is_empty());
    }

    #[test]
    fn skips_swagger_documents() {
        let problems = lint_yaml(
            "swagger: '2.0'\ninfo: {title: T, version: '1'}\npaths: {}\n",
            RULES,
        );
        assert!(problems.is_empty());
    }
}
