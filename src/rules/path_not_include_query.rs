//! Query strings do not belong in path keys.

use crate::parser::ParseNode;
use crate::rules::RuleVisitor;
use crate::walker::{ReportSpec, VisitContext};

/// Reports path keys that contain a `?`.
pub struct PathNotIncludeQuery;

impl RuleVisitor for PathNotIncludeQuery {
    fn targets(&self) -> Vec<&str> {
        vec!["Paths"]
    }

    fn enter(&mut self, node: &ParseNode, ctx: &mut VisitContext<'_>) {
        let Some(entries) = node.entries() else {
            return;
        };
        for entry in entries {
            if entry.key.contains('?') {
                ctx.report(
                    ReportSpec::new(
                        "Don't put query string items in the path, they belong in parameters with `in: query`.",
                    )
                    .at(ctx.child_location(&entry.key))
                    .on_key(),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::test_util::lint_yaml;

    const RULES: &[(&str, &str)] = &[("path-not-include-query", "warn")];

    #[test]
    fn reports_query_in_path() {
        let problems = lint_yaml(
            r#"
openapi: 3.0.0
info: {title: T, version: '1'}
paths:
  /pets?sort=asc:
    get:
      responses:
        '200': {description: ok}
"#,
            RULES,
        );
        assert_eq!(problems.len(), 1);
        assert!(problems[0].message.contains("in: query"));
    }

    #[test]
    fn accepts_plain_paths() {
        let problems = lint_yaml(
            r#"
openapi: 3.0.0
info: {title: T, version: '1'}
paths:
  /pets:
    get:
      responses:
        '200': {description: ok}
"#,
            RULES,
        );
        assert!(problems.is_empty());
    }
}
