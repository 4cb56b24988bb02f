//! Paths must not collide up to path-parameter renaming.
//!
//! `/pets/{id}` and `/pets/{petId}` address the same route; routers pick
//! one arbitrarily.

use std::collections::HashMap;

use crate::parser::ParseNode;
use crate::rules::RuleVisitor;
use crate::walker::{ReportSpec, VisitContext};

/// Reports path keys identical after `{param}` segments are unified.
pub struct NoIdenticalPaths;

impl RuleVisitor for NoIdenticalPaths {
    fn targets(&self) -> Vec<&str> {
        vec!["Paths"]
    }

    fn enter(&mut self, node: &ParseNode, ctx: &mut VisitContext<'_>) {
        let Some(entries) = node.entries() else {
            return;
        };
        let mut seen: HashMap<String, &str> = HashMap::new();
        for entry in entries {
            let normalized = normalize(&entry.key);
            match seen.get(normalized.as_str()) {
                Some(first) => {
                    ctx.report(
                        ReportSpec::new(format!(
                            "The path already exists which differs only by path parameter name(s): `{}` and `{}`.",
                            first, entry.key
                        ))
                        .at(ctx.child_location(&entry.key))
                        .on_key(),
                    );
                }
                None => {
                    seen.insert(normalized, &entry.key);
                }
            }
        }
    }
}

fn normalize(path: &str) -> String {
    let mut result = String::with_capacity(path.len());
    let mut in_param = false;
    for ch in path.chars() {
        match ch {
            '{' => {
                in_param = true;
                result.push('{');
            }
            '}' => {
                in_param = false;
                result.push('}');
            }
            _ if in_param => {}
            _ => result.push(ch),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::normalize;
    use crate::test_util::lint_yaml;

    const RULES: &[(&str, &str)] = &[("no-identical-paths", "error")];

    #[test]
    fn normalizes_parameter_names_away() {
        assert_eq!(normalize("/pets/{id}"), "/pets/{}");
        assert_eq!(normalize("/pets/{petId}/toys"), "/pets/{}/toys");
        assert_eq!(normalize("/plain"), "/plain");
    }

    #[test]
    fn reports_paths_differing_only_by_parameter_name() {
        let problems = lint_yaml(
            r#"
openapi: 3.0.0
info: {title: T, version: '1'}
paths:
  /pets/{id}:
    get:
      responses:
        '200': {description: ok}
  /pets/{petId}:
    get:
      responses:
        '200': {description: ok}
"#,
            RULES,
        );
        assert_eq!(problems.len(), 1);
        assert!(problems[0]
            .message
            .contains("`/pets/{id}` and `/pets/{petId}`"));
    }

    #[test]
    fn accepts_genuinely_different_paths() {
        let problems = lint_yaml(
            r#"
openapi: 3.0.0
info: {title: T, version: '1'}
paths:
  /pets/{id}:
    get:
      responses:
        '200': {description: ok}
  /stores/{id}:
    get:
      responses:
        '200': {description: ok}
"#,
            RULES,
        );
        assert!(problems.is_empty());
    }
}
