//! Lint rules.
//!
//! A rule is a visitor over the document graph: it declares the node type
//! names it cares about and receives enter/leave callbacks from the walker
//! with a [`VisitContext`]. The [`RuleRegistry`] holds the built-in rules;
//! plugins contribute theirs under namespaced ids.
//!
//! Visitors are instantiated fresh for every walk, so a rule that needs
//! per-walk state (e.g. operation-id uniqueness) keeps it in `&mut self`.

pub mod info_contact;
pub mod info_license;
pub mod no_empty_servers;
pub mod no_identical_paths;
pub mod no_path_trailing_slash;
pub mod operation_2xx_response;
pub mod operation_4xx_response;
pub mod operation_operation_id;
pub mod operation_operation_id_unique;
pub mod operation_summary;
pub mod path_not_include_query;
pub mod tag_description;

use std::collections::HashMap;

use crate::error::{OaslintError, Result};
use crate::parser::ParseNode;
use crate::problems::Severity;
use crate::walker::VisitContext;

pub use info_contact::InfoContact;
pub use info_license::InfoLicense;
pub use no_empty_servers::NoEmptyServers;
pub use no_identical_paths::NoIdenticalPaths;
pub use no_path_trailing_slash::NoPathTrailingSlash;
pub use operation_2xx_response::Operation2xxResponse;
pub use operation_4xx_response::Operation4xxResponse;
pub use operation_operation_id::OperationOperationId;
pub use operation_operation_id_unique::OperationOperationIdUnique;
pub use operation_summary::OperationSummary;
pub use path_not_include_query::PathNotIncludeQuery;
pub use tag_description::TagDescription;

/// Unique identifier for a lint rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleId(pub String);

impl RuleId {
    /// Create a new rule ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for RuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A visitor-based lint rule.
///
/// The walker calls `enter` before descending into a node of a targeted
/// type and `leave` after. Problems are filed through the context; the
/// walker fills in the rule id, bound severity, and current location.
pub trait RuleVisitor: Send {
    /// Node type names this rule wants callbacks for. `"any"` matches
    /// every node.
    fn targets(&self) -> Vec<&str>;

    /// Called before descending into a targeted node.
    fn enter(&mut self, node: &ParseNode, ctx: &mut VisitContext<'_>) {
        let _ = (node, ctx);
    }

    /// Called after the subtree of a targeted node has been walked.
    fn leave(&mut self, node: &ParseNode, ctx: &mut VisitContext<'_>) {
        let _ = (node, ctx);
    }

    /// When true, this rule receives no callbacks inside `$ref` targets.
    fn skip_refs(&self) -> bool {
        false
    }
}

/// Factory producing a fresh visitor for one walk.
pub type RuleFactory = fn() -> Box<dyn RuleVisitor>;

/// A registry entry: how to build the rule and its default severity.
pub struct RegisteredRule {
    pub factory: RuleFactory,
    pub default_severity: Severity,
}

/// Registry of available rules.
///
/// The ids `spec` and `no-unresolved-refs` are implemented by the walker
/// itself and are listed here only so configs can bind severities to them.
pub struct RuleRegistry {
    rules: HashMap<RuleId, RegisteredRule>,
}

/// Rule ids implemented inside the walker rather than as visitors.
pub const ENGINE_RULE_IDS: [&str; 2] = ["spec", "no-unresolved-refs"];

impl RuleRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    /// Create a registry with all built-in rules.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("operation-2xx-response", Severity::Warn, || {
            Box::new(Operation2xxResponse)
        });
        registry.register("operation-4xx-response", Severity::Warn, || {
            Box::new(Operation4xxResponse)
        });
        registry.register("operation-operation-id", Severity::Warn, || {
            Box::new(OperationOperationId)
        });
        registry.register("operation-operation-id-unique", Severity::Error, || {
            Box::new(OperationOperationIdUnique::new())
        });
        registry.register("operation-summary", Severity::Warn, || {
            Box::new(OperationSummary)
        });
        registry.register("no-path-trailing-slash", Severity::Warn, || {
            Box::new(NoPathTrailingSlash)
        });
        registry.register("path-not-include-query", Severity::Warn, || {
            Box::new(PathNotIncludeQuery)
        });
        registry.register("no-identical-paths", Severity::Error, || {
            Box::new(NoIdenticalPaths)
        });
        registry.register("no-empty-servers", Severity::Warn, || {
            Box::new(NoEmptyServers)
        });
        registry.register("tag-description", Severity::Warn, || {
            Box::new(TagDescription)
        });
        registry.register("info-contact", Severity::Warn, || Box::new(InfoContact));
        registry.register("info-license", Severity::Warn, || Box::new(InfoLicense));
        registry
    }

    /// Register a rule under an id.
    pub fn register(&mut self, id: &str, default_severity: Severity, factory: RuleFactory) {
        self.rules.insert(
            RuleId::new(id),
            RegisteredRule {
                factory,
                default_severity,
            },
        );
    }

    /// Look up a registered rule.
    pub fn get(&self, id: &RuleId) -> Option<&RegisteredRule> {
        self.rules.get(id)
    }

    /// Whether an id names a built-in (including the engine rules).
    pub fn is_known(&self, id: &RuleId) -> bool {
        self.rules.contains_key(id) || ENGINE_RULE_IDS.contains(&id.0.as_str())
    }

    /// All registered rule ids, sorted.
    pub fn ids(&self) -> Vec<RuleId> {
        let mut ids: Vec<_> = self.rules.keys().cloned().collect();
        ids.extend(ENGINE_RULE_IDS.iter().map(|id| RuleId::new(*id)));
        ids.sort();
        ids
    }

    /// Number of registered visitor rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the registry has no visitor rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// A rule bound to a severity for one walk.
pub struct BoundRule {
    pub id: RuleId,
    pub severity: Severity,
    pub visitor: Box<dyn RuleVisitor>,
}

/// The rule set a walk dispatches to, produced at config-bind time.
pub struct BoundRuleSet {
    /// Visitor rules in firing order: built-ins in config-declaration
    /// order, then plugin rules, then compiled assertions.
    pub rules: Vec<BoundRule>,
    /// Severity for the structural checks, if `spec` is enabled.
    pub spec_severity: Option<Severity>,
    /// Severity for unresolved-ref reports, if enabled.
    pub unresolved_refs_severity: Option<Severity>,
}

impl BoundRuleSet {
    /// Bind a resolved styleguide to concrete visitors.
    ///
    /// Every configured rule id must name a built-in or a plugin-exported
    /// rule; anything else is a fatal config error.
    pub fn bind(
        styleguide: &crate::config::ResolvedStyleguide,
        registry: &RuleRegistry,
    ) -> Result<Self> {
        let mut builtins = Vec::new();
        let mut plugin_rules = Vec::new();
        let mut spec_severity = None;
        let mut unresolved_refs_severity = None;

        for (id, decl) in &styleguide.rules {
            let Some(severity) = decl.severity else {
                continue;
            };
            match id.as_str() {
                "spec" => spec_severity = Some(severity),
                "no-unresolved-refs" => unresolved_refs_severity = Some(severity),
                _ => {
                    let rule_id = RuleId::new(id.clone());
                    if let Some(registered) = registry.get(&rule_id) {
                        builtins.push(BoundRule {
                            id: rule_id,
                            severity,
                            visitor: (registered.factory)(),
                        });
                    } else if let Some(factory) = styleguide.plugin_rule(id) {
                        plugin_rules.push(BoundRule {
                            id: rule_id,
                            severity,
                            visitor: factory(),
                        });
                    } else {
                        return Err(OaslintError::ConfigError {
                            message: format!(
                                "Rule {} is not a built-in rule and no plugin exports it",
                                crate::config::highlight(id)
                            ),
                        });
                    }
                }
            }
        }

        let mut rules = builtins;
        rules.append(&mut plugin_rules);
        for assertion in &styleguide.assertions {
            rules.push(BoundRule {
                id: RuleId::new(assertion.rule_id()),
                severity: assertion.severity,
                visitor: assertion.make_visitor(),
            });
        }

        Ok(Self {
            rules,
            spec_severity,
            unresolved_refs_severity,
        })
    }

    /// Index rules by the node type names they target.
    pub fn dispatch_table(&self) -> HashMap<String, Vec<usize>> {
        let mut table: HashMap<String, Vec<usize>> = HashMap::new();
        for (index, rule) in self.rules.iter().enumerate() {
            for target in rule.visitor.targets() {
                table.entry(target.to_string()).or_default().push(index);
            }
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockRule;

    impl RuleVisitor for MockRule {
        fn targets(&self) -> Vec<&str> {
            vec!["Operation"]
        }
    }

    #[test]
    fn registry_with_builtins_has_rules() {
        let registry = RuleRegistry::with_builtins();
        assert!(registry.len() >= 12);
        assert!(registry.get(&RuleId::new("operation-2xx-response")).is_some());
        assert!(registry.get(&RuleId::new("no-path-trailing-slash")).is_some());
        assert!(registry.get(&RuleId::new("info-license")).is_some());
        assert!(registry.get(&RuleId::new("nonexistent")).is_none());
    }

    #[test]
    fn engine_rules_are_known_but_not_visitors() {
        let registry = RuleRegistry::with_builtins();
        assert!(registry.is_known(&RuleId::new("spec")));
        assert!(registry.is_known(&RuleId::new("no-unresolved-refs")));
        assert!(registry.get(&RuleId::new("spec")).is_none());
    }

    #[test]
    fn registry_register_and_get() {
        let mut registry = RuleRegistry::new();
        registry.register("mock", Severity::Warn, || Box::new(MockRule));
        assert!(!registry.is_empty());
        let registered = registry.get(&RuleId::new("mock")).unwrap();
        assert_eq!(registered.default_severity, Severity::Warn);
    }

    #[test]
    fn dispatch_table_indexes_targets() {
        let set = BoundRuleSet {
            rules: vec![BoundRule {
                id: RuleId::new("mock"),
                severity: Severity::Error,
                visitor: Box::new(MockRule),
            }],
            spec_severity: None,
            unresolved_refs_severity: None,
        };
        let table = set.dispatch_table();
        assert_eq!(table.get("Operation"), Some(&vec![0]));
        assert!(table.get("Schema").is_none());
    }
}
