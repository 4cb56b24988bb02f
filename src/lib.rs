//! oaslint - Linter and transformation engine for OpenAPI documents.
//!
//! oaslint parses OpenAPI 2.0 / 3.0 / 3.1 documents with full source
//! spans, resolves external `$ref`s, walks the document along a typed
//! schema, and reports problems from configurable rules. It can also emit
//! bundled, dereferenced, and normalized artifacts.
//!
//! # Modules
//!
//! - [`source`] - Source store and spans
//! - [`parser`] - YAML/JSON parsing into span-tagged trees
//! - [`schema`] - Typed node registries per OAS version
//! - [`resolver`] - `$ref` resolution with cycle detection
//! - [`walker`] - Schema-guided traversal and rule dispatch
//! - [`rules`] - Built-in rules and the rule registry
//! - [`assertions`] - Declarative assertions compiled to rules
//! - [`config`] - Config loading, `extends` resolution, plugins
//! - [`problems`] - Problem records and the collector
//! - [`bundler`] - Bundle / dereference / normalize emission
//! - [`output`] - Problem formatters (stylish, JSON, checkstyle)
//! - [`error`] - Error types and result alias
//!
//! # Example
//!
//! ```no_run
//! use oaslint::{lint_document, Document};
//! use oaslint::config::{resolve_config, PluginRegistry, RawConfig};
//! use oaslint::resolver::RefResolver;
//! use oaslint::source::SourceStore;
//!
//! let store = SourceStore::new();
//! let document = Document::open(&store, "openapi.yaml").unwrap();
//! let plugins = PluginRegistry::new();
//! let config = resolve_config(&RawConfig::default(), None, &plugins).unwrap();
//! let resolver = RefResolver::new(&store);
//! let result = lint_document(&document, &config.styleguide, &resolver, None).unwrap();
//! for problem in &result.problems {
//!     println!("{}: {}", problem.rule_id, problem.message);
//! }
//! ```

pub mod assertions;
pub mod bundler;
pub mod cli;
pub mod config;
pub mod error;
pub mod output;
pub mod parser;
pub mod problems;
pub mod resolver;
pub mod rules;
pub mod schema;
pub mod source;
pub mod walker;

use std::sync::Arc;

use config::ResolvedStyleguide;
use problems::{IgnoreFile, Problem, ProblemCollector, Severity, Totals};
use resolver::RefResolver;
use rules::{BoundRuleSet, RuleRegistry};
use schema::OasVersion;
use source::{Source, SourceStore};
use walker::Walker;

pub use error::{OaslintError, Result};

/// A root document: its source plus the version tag derived from the
/// `openapi`/`swagger` field. The version is fixed at first inspection
/// and selects the type registry for the whole walk.
pub struct Document {
    pub source: Arc<Source>,
    pub version: Option<OasVersion>,
}

impl Document {
    /// Open a root document through the store.
    pub fn open(store: &SourceStore, uri: &str) -> Result<Self> {
        Ok(Self::from_source(store.open(uri)?))
    }

    /// Wrap an already-opened source.
    pub fn from_source(source: Arc<Source>) -> Self {
        let version = OasVersion::detect(&source.root);
        Self { source, version }
    }
}

/// The outcome of linting one document.
pub struct LintResult {
    /// Problems, deduplicated and sorted.
    pub problems: Vec<Problem>,
    /// Error/warning/ignored counts.
    pub totals: Totals,
    /// Rule callbacks that panicked; each was logged and skipped.
    pub rule_errors: usize,
}

/// Lint one document against a resolved styleguide.
///
/// Parse irregularities of the root source are surfaced first, then the
/// walker runs the bound rule set. Resolution failures inside the walk
/// report under `no-unresolved-refs` and never abort.
pub fn lint_document(
    document: &Document,
    styleguide: &ResolvedStyleguide,
    resolver: &RefResolver<'_>,
    ignore: Option<IgnoreFile>,
) -> Result<LintResult> {
    let registry = RuleRegistry::with_builtins();
    let rule_set = BoundRuleSet::bind(styleguide, &registry)?;
    let mut collector = match ignore {
        Some(ignore) => ProblemCollector::new().with_ignore(ignore),
        None => ProblemCollector::new(),
    };

    let source = &document.source;
    if let Some(spec_severity) = rule_set.spec_severity {
        for diagnostic in &source.diagnostics {
            collector.push(Problem {
                rule_id: "spec".to_string(),
                severity: spec_severity,
                message: diagnostic.message.clone(),
                suggest: Vec::new(),
                location: vec![problems::LocationStep::new(
                    &source.uri,
                    source.pointer_at(diagnostic.span.start),
                )],
                from: None,
            });
        }
    }

    let rule_errors = match document.version {
        Some(version) => {
            Walker::new(version, rule_set, resolver, &mut collector).walk(source)
        }
        None => {
            if let Some(severity) = rule_set.spec_severity {
                collector.push(Problem {
                    rule_id: "spec".to_string(),
                    severity,
                    message:
                        "Unsupported version: every document must have a valid `openapi` or `swagger` field"
                            .to_string(),
                    suggest: Vec::new(),
                    location: vec![problems::LocationStep::new(&source.uri, "#/").on_key()],
                    from: None,
                });
            }
            0
        }
    };

    let (problems, totals) = collector.finish(resolver.store());
    Ok(LintResult {
        problems,
        totals,
        rule_errors,
    })
}

/// Whether a lint result should fail the enclosing process.
pub fn has_errors(result: &LintResult) -> bool {
    result.totals.errors > 0
}

impl LintResult {
    /// Problems of a given severity.
    pub fn by_severity(&self, severity: Severity) -> impl Iterator<Item = &Problem> {
        self.problems.iter().filter(move |p| p.severity == severity)
    }
}

#[cfg(test)]
pub(crate) mod test_util {
    use super::*;

    /// Lint an inline document with explicit rule settings.
    pub fn lint_yaml(yaml: &str, rules: &[(&str, &str)]) -> Vec<Problem> {
        let store = SourceStore::new();
        let source = store.open_inline("test.yaml", yaml).unwrap();
        let document = Document::from_source(source);
        let styleguide = ResolvedStyleguide::with_rules(rules).unwrap();
        let resolver = RefResolver::new(&store);
        lint_document(&document, &styleguide, &resolver, None)
            .unwrap()
            .problems
    }

    /// Lint a multi-file fixture; `files[0]` is the root.
    pub fn lint_files(files: &[(&str, &str)], rules: &[(&str, &str)]) -> Vec<Problem> {
        let store = SourceStore::new();
        for (uri, text) in files {
            store.open_inline(uri, text).unwrap();
        }
        let document = Document::from_source(store.get(files[0].0).unwrap());
        let styleguide = ResolvedStyleguide::with_rules(rules).unwrap();
        let resolver = RefResolver::new(&store);
        lint_document(&document, &styleguide, &resolver, None)
            .unwrap()
            .problems
    }
}

#[cfg(test)]
mod tests {
    use super::test_util::lint_yaml;
    use super::*;

    #[test]
    fn lints_a_valid_document_cleanly() {
        let problems = lint_yaml(
            r#"
openapi: 3.0.0
info:
  title: Test
  version: '1.0'
paths: {}
"#,
            &[("spec", "error")],
        );
        assert!(problems.is_empty(), "unexpected: {:?}", problems);
    }

    #[test]
    fn missing_info_is_reported_on_root() {
        let problems = lint_yaml("openapi: 3.0.0\npaths: {}\n", &[("spec", "error")]);
        assert_eq!(problems.len(), 1);
        assert_eq!(
            problems[0].message,
            "The field `info` must be present on this level."
        );
        assert_eq!(problems[0].location[0].pointer, "#/");
        assert!(problems[0].location[0].report_on_key);
    }

    #[test]
    fn unsupported_version_is_reported() {
        let problems = lint_yaml("openapi: 4.0.0\n", &[("spec", "error")]);
        assert_eq!(problems.len(), 1);
        assert!(problems[0].message.contains("Unsupported version"));
    }

    #[test]
    fn unknown_configured_rule_is_fatal() {
        let store = SourceStore::new();
        let source = store.open_inline("t.yaml", "openapi: 3.0.0\n").unwrap();
        let document = Document::from_source(source);
        let styleguide = ResolvedStyleguide::with_rules(&[("no-such-rule", "error")]).unwrap();
        let resolver = RefResolver::new(&store);
        let result = lint_document(&document, &styleguide, &resolver, None);
        assert!(result.is_err());
    }

    #[test]
    fn duplicate_keys_surface_as_spec_problems() {
        let problems = lint_yaml(
            "openapi: 3.0.0\ninfo:\n  title: A\n  title: B\n  version: '1'\npaths: {}\n",
            &[("spec", "error")],
        );
        assert!(problems
            .iter()
            .any(|p| p.message.contains("Duplicate mapping key `title`")));
    }
}
