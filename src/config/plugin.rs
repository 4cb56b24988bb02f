//! Plugins.
//!
//! A plugin is untrusted user code registered with the engine through a
//! [`PluginRegistry`] (the host's module loader). It can export rules,
//! value-level preprocessors and decorators, named assertion predicates,
//! and reusable styleguide configs. Everything a plugin exports is
//! namespaced under its id: a rule `foo` from plugin `acme` binds as
//! `acme/foo`.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::schema::RawStyleguide;
use crate::parser::ParseNode;
use crate::problems::Severity;
use crate::rules::RuleVisitor;

/// Builds a fresh visitor for one walk.
pub type PluginRuleFactory = Arc<dyn Fn() -> Box<dyn RuleVisitor> + Send + Sync>;

/// A named assertion predicate: receives the selected node and the
/// predicate's configured options; returns a failure message on violation.
pub type AssertionFn =
    Arc<dyn Fn(&ParseNode, &serde_yaml::Value) -> Result<(), String> + Send + Sync>;

/// A value-level rewrite applied on the emission path.
pub type ValueTransform = Arc<dyn Fn(&mut serde_yaml::Value) + Send + Sync>;

/// A rule exported by a plugin.
pub struct PluginRule {
    pub name: String,
    pub default_severity: Severity,
    pub factory: PluginRuleFactory,
}

/// A preprocessor or decorator exported by a plugin.
pub struct PluginTransform {
    pub name: String,
    pub transform: ValueTransform,
}

/// A plugin's exports.
#[derive(Default)]
pub struct Plugin {
    pub id: String,
    pub rules: Vec<PluginRule>,
    pub preprocessors: Vec<PluginTransform>,
    pub decorators: Vec<PluginTransform>,
    pub assertions: HashMap<String, AssertionFn>,
    pub configs: HashMap<String, RawStyleguide>,
}

impl Plugin {
    /// Create an empty plugin with an id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Export a rule.
    pub fn with_rule(
        mut self,
        name: impl Into<String>,
        default_severity: Severity,
        factory: PluginRuleFactory,
    ) -> Self {
        self.rules.push(PluginRule {
            name: name.into(),
            default_severity,
            factory,
        });
        self
    }

    /// Export an assertion predicate.
    pub fn with_assertion(mut self, name: impl Into<String>, f: AssertionFn) -> Self {
        self.assertions.insert(name.into(), f);
        self
    }

    /// Export a decorator.
    pub fn with_decorator(mut self, name: impl Into<String>, transform: ValueTransform) -> Self {
        self.decorators.push(PluginTransform {
            name: name.into(),
            transform,
        });
        self
    }

    /// Export a preprocessor.
    pub fn with_preprocessor(mut self, name: impl Into<String>, transform: ValueTransform) -> Self {
        self.preprocessors.push(PluginTransform {
            name: name.into(),
            transform,
        });
        self
    }

    /// Export a reusable config, referenced as `"<id>/<name>"` in `extends`.
    pub fn with_config(mut self, name: impl Into<String>, config: RawStyleguide) -> Self {
        self.configs.insert(name.into(), config);
        self
    }

    /// Look up an exported rule by local name.
    pub fn rule(&self, name: &str) -> Option<&PluginRule> {
        self.rules.iter().find(|r| r.name == name)
    }
}

/// In-process registry of loaded plugins.
///
/// Config `plugins:` entries name plugins registered here; an entry that
/// names nothing registered is a fatal config error.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: HashMap<String, Arc<Plugin>>,
}

impl PluginRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin under its id.
    pub fn register(&mut self, plugin: Plugin) {
        self.plugins.insert(plugin.id.clone(), Arc::new(plugin));
    }

    /// Look up a plugin by id or by the path-like name a config used
    /// (`./plugins/acme.js` resolves by trailing file stem).
    pub fn get(&self, name: &str) -> Option<Arc<Plugin>> {
        if let Some(plugin) = self.plugins.get(name) {
            return Some(Arc::clone(plugin));
        }
        let stem = name
            .rsplit('/')
            .next()
            .map(|tail| tail.trim_end_matches(".js").trim_end_matches(".mjs"))
            .unwrap_or(name);
        self.plugins.get(stem).map(Arc::clone)
    }

    /// Number of registered plugins.
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}
