//! Integration tests for config resolution: extends chains, preset
//! fallback, per-API overrides, plugins, and assertions.

use std::path::Path;
use std::sync::Arc;

use oaslint::config::{
    preset, resolve_config, Plugin, PluginRegistry, RawConfig, ResolvedStyleguide,
};
use oaslint::problems::Severity;
use oaslint::resolver::RefResolver;
use oaslint::source::SourceStore;
use oaslint::{lint_document, Document};

fn resolve(yaml: &str) -> oaslint::Result<oaslint::config::ResolvedConfig> {
    let raw = RawConfig::parse(yaml, Path::new("oaslint.yaml")).unwrap();
    let plugins = PluginRegistry::new();
    resolve_config(&raw, None, &plugins)
}

fn severities(styleguide: &ResolvedStyleguide) -> Vec<(String, Option<Severity>)> {
    let mut pairs: Vec<_> = styleguide
        .rules
        .iter()
        .map(|(id, decl)| (id.clone(), decl.severity))
        .collect();
    pairs.sort();
    pairs
}

#[test]
fn extends_minimal_then_recommended_equals_recommended() {
    let merged = resolve("styleguide:\n  extends: [minimal, recommended]\n").unwrap();
    let recommended = resolve("styleguide:\n  extends: [recommended]\n").unwrap();
    assert_eq!(
        severities(&merged.styleguide),
        severities(&recommended.styleguide)
    );

    let reversed = resolve("styleguide:\n  extends: [recommended, minimal]\n").unwrap();
    let minimal = resolve("styleguide:\n  extends: [minimal]\n").unwrap();
    assert_eq!(
        severities(&reversed.styleguide),
        severities(&minimal.styleguide)
    );
}

#[test]
fn api_rules_merge_over_root_rules() {
    let resolved = resolve(
        r#"
apis:
  main:
    root: openapi.yaml
    styleguide:
      rules:
        operation-4xx-response: error
styleguide:
  rules:
    operation-2xx-response: warn
"#,
    )
    .unwrap();

    let api = &resolved.apis["main"].styleguide;
    assert_eq!(
        severities(api),
        vec![
            (
                "operation-2xx-response".to_string(),
                Some(Severity::Warn)
            ),
            (
                "operation-4xx-response".to_string(),
                Some(Severity::Error)
            ),
        ]
    );
    assert!(!api.recommended_fallback);
}

#[test]
fn preset_fallback_when_nothing_is_configured() {
    let resolved = resolve("apis:\n  main:\n    root: openapi.yaml\n").unwrap();
    assert!(resolved.styleguide.recommended_fallback);

    // The fallback equals the recommended preset, rule for rule.
    let recommended_raw = preset("recommended").unwrap();
    for (key, value) in &recommended_raw.rules {
        let id = key.as_str().unwrap();
        let expected = match value.as_str().unwrap() {
            "error" => Some(Severity::Error),
            "warn" => Some(Severity::Warn),
            _ => None,
        };
        assert_eq!(
            resolved.styleguide.severity_of(id),
            expected,
            "rule {}",
            id
        );
    }
}

#[test]
fn any_user_rule_suppresses_the_fallback() {
    let resolved = resolve(
        "styleguide:\n  rules:\n    operation-2xx-response: warn\n",
    )
    .unwrap();
    assert!(!resolved.styleguide.recommended_fallback);
    assert_eq!(resolved.styleguide.rules.len(), 1);
}

#[test]
fn extends_precedence_between_files() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("a.yaml"),
        "rules:\n  tag-description: warn\n  info-license: warn\n",
    )
    .unwrap();
    std::fs::write(dir.path().join("b.yaml"), "rules:\n  tag-description: error\n").unwrap();

    let raw = RawConfig::parse(
        "styleguide:\n  extends: [a.yaml, b.yaml]\n",
        Path::new("oaslint.yaml"),
    )
    .unwrap();
    let plugins = PluginRegistry::new();
    let config_uri = dir.path().join("oaslint.yaml");
    let resolved = resolve_config(&raw, Some(config_uri.to_str().unwrap()), &plugins).unwrap();

    // B's value wins where both define the rule; A's survives elsewhere.
    assert_eq!(
        resolved.styleguide.severity_of("tag-description"),
        Some(Severity::Error)
    );
    assert_eq!(
        resolved.styleguide.severity_of("info-license"),
        Some(Severity::Warn)
    );
    assert_eq!(resolved.styleguide.extend_paths.len(), 2);
}

#[test]
fn missing_assertion_predicate_names_the_function() {
    let mut plugins = PluginRegistry::new();
    plugins.register(
        Plugin::new("test-plugin").with_assertion("checkWordsCount", Arc::new(|_, _| Ok(()))),
    );

    let raw = RawConfig::parse(
        r#"
styleguide:
  plugins: [test-plugin]
  assertions:
    - subject: Operation
      property: summary
      test-plugin/checkWordsCount2: 3
"#,
        Path::new("oaslint.yaml"),
    )
    .unwrap();

    let err = resolve_config(&raw, None, &plugins).unwrap_err();
    assert!(
        err.to_string().contains(
            "Plugin test-plugin doesn't export assertions function with name checkWordsCount2"
        ),
        "message: {}",
        err
    );
}

#[test]
fn plugin_assertion_predicate_runs_during_lint() {
    let mut plugins = PluginRegistry::new();
    plugins.register(Plugin::new("test-plugin").with_assertion(
        "checkWordsCount",
        Arc::new(|node, options| {
            let min = options.as_u64().unwrap_or(0) as usize;
            let words = node.as_str().map(|s| s.split_whitespace().count());
            match words {
                Some(count) if count < min => {
                    Err(format!("Summary has {} words, expected at least {}", count, min))
                }
                _ => Ok(()),
            }
        }),
    ));

    let raw = RawConfig::parse(
        r#"
styleguide:
  plugins: [test-plugin]
  rules:
    spec: off
  assertions:
    - subject: Operation
      property: summary
      assertionId: summary-word-count
      test-plugin/checkWordsCount: 3
"#,
        Path::new("oaslint.yaml"),
    )
    .unwrap();
    let resolved = resolve_config(&raw, None, &plugins).unwrap();

    let store = SourceStore::new();
    let source = store
        .open_inline(
            "openapi.yaml",
            r#"
openapi: 3.0.0
info: {title: T, version: '1'}
paths:
  /pets:
    get:
      summary: Too short
      responses:
        '200': {description: ok}
"#,
        )
        .unwrap();
    let document = Document::from_source(source);
    let resolver = RefResolver::new(&store);
    let result = lint_document(&document, &resolved.styleguide, &resolver, None).unwrap();

    assert_eq!(result.problems.len(), 1, "problems: {:?}", result.problems);
    assert_eq!(result.problems[0].rule_id, "summary-word-count");
    assert_eq!(
        result.problems[0].location[0].pointer,
        "#/paths/~1pets/get/summary"
    );
}

#[test]
fn plugin_rules_bind_under_namespaced_ids() {
    use oaslint::parser::ParseNode;
    use oaslint::rules::RuleVisitor;
    use oaslint::walker::{ReportSpec, VisitContext};

    struct NoDeleteRule;
    impl RuleVisitor for NoDeleteRule {
        fn targets(&self) -> Vec<&str> {
            vec!["PathItem"]
        }
        fn enter(&mut self, node: &ParseNode, ctx: &mut VisitContext<'_>) {
            if node.has_key("delete") {
                ctx.report(ReportSpec::new("DELETE operations are not allowed.").on_key());
            }
        }
    }

    let mut plugins = PluginRegistry::new();
    plugins.register(Plugin::new("acme").with_rule(
        "no-delete",
        Severity::Warn,
        Arc::new(|| Box::new(NoDeleteRule) as Box<dyn RuleVisitor>),
    ));

    let raw = RawConfig::parse(
        "styleguide:\n  plugins: [acme]\n  rules:\n    acme/no-delete: error\n",
        Path::new("oaslint.yaml"),
    )
    .unwrap();
    let resolved = resolve_config(&raw, None, &plugins).unwrap();

    let store = SourceStore::new();
    let source = store
        .open_inline(
            "openapi.yaml",
            r#"
openapi: 3.0.0
info: {title: T, version: '1'}
paths:
  /pets:
    delete:
      responses:
        '200': {description: ok}
"#,
        )
        .unwrap();
    let document = Document::from_source(source);
    let resolver = RefResolver::new(&store);
    let result = lint_document(&document, &resolved.styleguide, &resolver, None).unwrap();

    assert_eq!(result.problems.len(), 1);
    assert_eq!(result.problems[0].rule_id, "acme/no-delete");
    assert_eq!(result.problems[0].severity, Severity::Error);
}

#[test]
fn assertions_with_builtin_predicates_run() {
    let raw = RawConfig::parse(
        r#"
styleguide:
  rules:
    spec: off
  assertions:
    - subject: Operation
      property: operationId
      assertionId: operation-id-casing
      severity: warn
      casing: camelCase
"#,
        Path::new("oaslint.yaml"),
    )
    .unwrap();
    let plugins = PluginRegistry::new();
    let resolved = resolve_config(&raw, None, &plugins).unwrap();

    let store = SourceStore::new();
    let source = store
        .open_inline(
            "openapi.yaml",
            r#"
openapi: 3.0.0
info: {title: T, version: '1'}
paths:
  /pets:
    get:
      operationId: ListPets
      responses:
        '200': {description: ok}
"#,
        )
        .unwrap();
    let document = Document::from_source(source);
    let resolver = RefResolver::new(&store);
    let result = lint_document(&document, &resolved.styleguide, &resolver, None).unwrap();

    assert_eq!(result.problems.len(), 1);
    assert_eq!(result.problems[0].rule_id, "operation-id-casing");
    assert_eq!(result.problems[0].severity, Severity::Warn);
    assert!(result.problems[0].message.contains("camelCase"));
}
