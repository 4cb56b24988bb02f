//! `operationId` values must be unique across a document.

use std::collections::HashSet;

use crate::parser::ParseNode;
use crate::rules::RuleVisitor;
use crate::walker::{ReportSpec, VisitContext};

/// Reports repeated `operationId` values. Seen ids are per-walk state,
/// so the visitor is constructed fresh for every document.
pub struct OperationOperationIdUnique {
    seen: HashSet<String>,
}

impl OperationOperationIdUnique {
    pub fn new() -> Self {
        Self {
            seen: HashSet::new(),
        }
    }
}

impl Default for OperationOperationIdUnique {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleVisitor for OperationOperationIdUnique {
    fn targets(&self) -> Vec<&str> {
        vec!["Operation"]
    }

    fn enter(&mut self, node: &ParseNode, ctx: &mut VisitContext<'_>) {
        let Some(id) = node.get("operationId").and_then(|n| n.as_str()) else {
            return;
        };
        if !self.seen.insert(id.to_string()) {
            ctx.report(
                ReportSpec::new("Every operation must have a unique `operationId`.")
                    .at(ctx.child_location("operationId")),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::test_util::lint_yaml;

    const RULES: &[(&str, &str)] = &[("operation-operation-id-unique", "error")];

    #[test]
    fn reports_duplicate_ids() {
        let problems = lint_yaml(
            r#"
openapi: 3.0.0
info: {title: T, version: '1'}
paths:
  /pets:
    get:
      operationId: listPets
      responses:
        '200': {description: ok}
    post:
      operationId: listPets
      responses:
        '200': {description: ok}
"#,
            RULES,
        );
        assert_eq!(problems.len(), 1);
        assert_eq!(
            problems[0].location[0].pointer,
            "#/paths/~1pets/post/operationId"
        );
    }

    #[test]
    fn accepts_unique_ids() {
        let problems = lint_yaml(
            r#"
openapi: 3.0.0
info: {title: T, version: '1'}
paths:
  /pets:
    get:
      operationId: listPets
      responses:
        '200': {description: ok}
    post:
      operationId: createPet
      responses:
        '200': {description: ok}
"#,
            RULES,
        );
        assert!(problems.is_empty());
    }
}
