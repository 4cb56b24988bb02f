//! Configuration resolution.
//!
//! Turns raw configs into frozen, per-API rule sets. `extends` entries are
//! preset names, plugin config references (`<pluginId>/<name>`), or
//! file/URL paths; resolution is depth-first and memoised by absolute URI,
//! and a cycle is a fatal config error. The final rule set is the
//! right-fold of the chain: later entries override earlier ones, and a
//! level's own rules always apply last. API-level styleguides fold on top
//! of the resolved root.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use anyhow::Context;

use crate::assertions::CompiledAssertion;
use crate::config::plugin::{Plugin, PluginRegistry, PluginRuleFactory};
use crate::config::presets;
use crate::config::schema::{RawAssertion, RawConfig, RawStyleguide, RuleDecl};
use crate::error::{OaslintError, Result};
use crate::problems::Severity;
use crate::source::normalize_uri;

/// A fully resolved styleguide, frozen before any walk begins.
#[derive(Default)]
pub struct ResolvedStyleguide {
    /// Effective rule settings in declaration order.
    pub rules: Vec<(String, RuleDecl)>,
    /// Compiled assertions, in declaration order.
    pub assertions: Vec<CompiledAssertion>,
    /// Plugins in scope.
    pub plugins: Vec<Arc<Plugin>>,
    /// Absolute URIs of every config fetched through `extends`.
    pub extend_paths: Vec<String>,
    /// Plugin names as the config spelled them.
    pub plugin_paths: Vec<String>,
    /// Whether the `recommended` preset was synthesised as a fallback.
    pub recommended_fallback: bool,
    /// Configured preprocessors, resolved at emission time.
    pub preprocessors: Vec<(String, RuleDecl)>,
    /// Configured decorators, resolved at emission time.
    pub decorators: Vec<(String, RuleDecl)>,
}

impl ResolvedStyleguide {
    /// The effective severity for a rule id, if the rule is on.
    pub fn severity_of(&self, rule_id: &str) -> Option<Severity> {
        self.rules
            .iter()
            .find(|(id, _)| id == rule_id)
            .and_then(|(_, decl)| decl.severity)
    }

    /// Look up a plugin rule factory for a namespaced id.
    pub fn plugin_rule(&self, id: &str) -> Option<PluginRuleFactory> {
        let (plugin_id, rule_name) = id.split_once('/')?;
        let plugin = self.plugins.iter().find(|p| p.id == plugin_id)?;
        plugin.rule(rule_name).map(|r| Arc::clone(&r.factory))
    }

    /// Build a styleguide from plain rule settings; the programmatic
    /// equivalent of a config with only a `rules` table.
    pub fn with_rules(pairs: &[(&str, &str)]) -> Result<Self> {
        let mut rules = Vec::new();
        for (id, severity) in pairs {
            let value = serde_yaml::Value::String((*severity).to_string());
            rules.push(((*id).to_string(), RuleDecl::parse(id, &value)?));
        }
        Ok(Self {
            rules,
            ..Default::default()
        })
    }
}

/// A resolved config: the root styleguide plus one per API alias.
#[derive(Default)]
pub struct ResolvedConfig {
    pub styleguide: ResolvedStyleguide,
    pub apis: BTreeMap<String, ResolvedApi>,
}

impl std::fmt::Debug for ResolvedConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedConfig").finish_non_exhaustive()
    }
}

/// One API with its effective styleguide.
pub struct ResolvedApi {
    pub root: String,
    pub styleguide: ResolvedStyleguide,
}

/// Accumulated fold of an extends chain, before compilation.
#[derive(Debug, Clone, Default)]
struct FoldedStyleguide {
    rules: Vec<(String, RuleDecl)>,
    assertions: Vec<RawAssertion>,
    preprocessors: Vec<(String, RuleDecl)>,
    decorators: Vec<(String, RuleDecl)>,
    plugins: Vec<String>,
    extend_paths: Vec<String>,
}

impl FoldedStyleguide {
    fn set_rule(&mut self, id: &str, decl: RuleDecl) {
        match self.rules.iter_mut().find(|(existing, _)| existing == id) {
            Some((_, existing)) => *existing = decl,
            None => self.rules.push((id.to_string(), decl)),
        }
    }

    fn set_transform(list: &mut Vec<(String, RuleDecl)>, id: &str, decl: RuleDecl) {
        match list.iter_mut().find(|(existing, _)| existing == id) {
            Some((_, existing)) => *existing = decl,
            None => list.push((id.to_string(), decl)),
        }
    }

    fn merge(&mut self, other: FoldedStyleguide) {
        for (id, decl) in other.rules {
            self.set_rule(&id, decl);
        }
        self.assertions.extend(other.assertions);
        for (id, decl) in other.preprocessors {
            Self::set_transform(&mut self.preprocessors, &id, decl);
        }
        for (id, decl) in other.decorators {
            Self::set_transform(&mut self.decorators, &id, decl);
        }
        for plugin in other.plugins {
            if !self.plugins.contains(&plugin) {
                self.plugins.push(plugin);
            }
        }
        for path in other.extend_paths {
            if !self.extend_paths.contains(&path) {
                self.extend_paths.push(path);
            }
        }
    }
}

/// Resolves configs against a plugin registry.
pub struct ConfigResolver<'p> {
    plugins: &'p PluginRegistry,
    memo: HashMap<String, FoldedStyleguide>,
    visiting: Vec<String>,
    client: OnceLock<reqwest::blocking::Client>,
}

impl<'p> ConfigResolver<'p> {
    /// Create a resolver over registered plugins.
    pub fn new(plugins: &'p PluginRegistry) -> Self {
        Self {
            plugins,
            memo: HashMap::new(),
            visiting: Vec::new(),
            client: OnceLock::new(),
        }
    }

    /// Resolve a raw config file into per-API styleguides.
    pub fn resolve_config(
        &mut self,
        raw: &RawConfig,
        config_uri: Option<&str>,
    ) -> Result<ResolvedConfig> {
        let mut root_raw = raw.root_styleguide();

        let apis_define_anything = raw.apis.values().any(|api| {
            api.styleguide
                .as_ref()
                .map_or(false, |s| !s.extends.is_empty() || s.has_rules())
        });
        let fallback =
            root_raw.extends.is_empty() && !root_raw.has_rules() && !apis_define_anything;
        if fallback {
            tracing::debug!("no rules or extends configured; falling back to `recommended`");
            root_raw.extends = vec!["recommended".to_string()];
        }

        let root_folded = self.fold(&root_raw, config_uri)?;
        let mut apis = BTreeMap::new();
        for (alias, api) in &raw.apis {
            let mut folded = root_folded.clone();
            if let Some(api_raw) = &api.styleguide {
                folded.merge(self.fold(api_raw, config_uri)?);
            }
            apis.insert(
                alias.clone(),
                ResolvedApi {
                    root: api.root.clone(),
                    styleguide: self.compile(folded, fallback)?,
                },
            );
        }

        Ok(ResolvedConfig {
            styleguide: self.compile(root_folded, fallback)?,
            apis,
        })
    }

    /// Resolve a bare styleguide (no API table).
    pub fn resolve_styleguide(
        &mut self,
        raw: &RawStyleguide,
        base_uri: Option<&str>,
    ) -> Result<ResolvedStyleguide> {
        let folded = self.fold(raw, base_uri)?;
        self.compile(folded, false)
    }

    fn fold(&mut self, raw: &RawStyleguide, base_uri: Option<&str>) -> Result<FoldedStyleguide> {
        let mut acc = FoldedStyleguide::default();

        for entry in &raw.extends {
            if let Some(preset_raw) = presets::preset(entry) {
                let folded = self.fold(&preset_raw, None)?;
                acc.merge(folded);
                continue;
            }
            if let Some((plugin_id, config_name)) = entry.split_once('/') {
                if let Some(plugin) = self.plugins.get(plugin_id) {
                    let Some(plugin_config) = plugin.configs.get(config_name).cloned() else {
                        return Err(OaslintError::ConfigError {
                            message: format!(
                                "Plugin {} doesn't export a config with name {}",
                                plugin_id, config_name
                            ),
                        });
                    };
                    acc.merge(self.fold(&plugin_config, None)?);
                    continue;
                }
            }

            let uri = normalize_uri(base_uri, entry);
            if self.visiting.contains(&uri) {
                return Err(OaslintError::ConfigError {
                    message: format!(
                        "Circular `extends` chain detected at {}",
                        super::highlight(&uri)
                    ),
                });
            }
            let folded = if let Some(memoised) = self.memo.get(&uri) {
                memoised.clone()
            } else {
                tracing::debug!(uri = uri.as_str(), "fetching extended config");
                let text = self.fetch_config_text(&uri)?;
                let extended: RawStyleguide =
                    serde_yaml::from_str(&text).map_err(|e| OaslintError::ConfigError {
                        message: format!("Failed to parse extended config {}: {}", uri, e),
                    })?;
                self.visiting.push(uri.clone());
                let folded = self.fold(&extended, Some(&uri));
                self.visiting.pop();
                let mut folded = folded?;
                if !folded.extend_paths.contains(&uri) {
                    folded.extend_paths.push(uri.clone());
                }
                self.memo.insert(uri.clone(), folded.clone());
                folded
            };
            acc.merge(folded);
        }

        // This level's own declarations always win over anything extended.
        for (key, value) in &raw.rules {
            let Some(id) = key.as_str() else {
                return Err(OaslintError::ConfigError {
                    message: format!("Rule ids must be strings, got {:?}", key),
                });
            };
            acc.set_rule(id, RuleDecl::parse(id, value)?);
        }
        for (key, value) in &raw.preprocessors {
            if let Some(id) = key.as_str() {
                FoldedStyleguide::set_transform(
                    &mut acc.preprocessors,
                    id,
                    RuleDecl::parse(id, value)?,
                );
            }
        }
        for (key, value) in &raw.decorators {
            if let Some(id) = key.as_str() {
                FoldedStyleguide::set_transform(
                    &mut acc.decorators,
                    id,
                    RuleDecl::parse(id, value)?,
                );
            }
        }
        acc.assertions.extend(raw.assertions.iter().cloned());
        for plugin in &raw.plugins {
            if !acc.plugins.contains(plugin) {
                acc.plugins.push(plugin.clone());
            }
        }

        Ok(acc)
    }

    fn compile(&self, folded: FoldedStyleguide, fallback: bool) -> Result<ResolvedStyleguide> {
        let mut plugins = Vec::new();
        for name in &folded.plugins {
            let Some(plugin) = self.plugins.get(name) else {
                return Err(OaslintError::ConfigError {
                    message: format!("Plugin {} is not registered", super::highlight(name)),
                });
            };
            plugins.push(plugin);
        }

        let mut assertions = Vec::new();
        for (index, raw) in folded.assertions.iter().enumerate() {
            assertions.push(CompiledAssertion::compile(raw, index, &plugins)?);
        }

        Ok(ResolvedStyleguide {
            rules: folded.rules,
            assertions,
            plugins,
            extend_paths: folded.extend_paths,
            plugin_paths: folded.plugins,
            recommended_fallback: fallback,
            preprocessors: folded.preprocessors,
            decorators: folded.decorators,
        })
    }

    fn fetch_config_text(&self, uri: &str) -> Result<String> {
        if uri.starts_with("http://") || uri.starts_with("https://") {
            let client = self.client.get_or_init(|| {
                reqwest::blocking::Client::builder()
                    .timeout(Duration::from_secs(30))
                    .build()
                    .unwrap_or_default()
            });
            let text = client
                .get(uri)
                .send()
                .and_then(|r| r.error_for_status())
                .with_context(|| format!("Failed to fetch extended config {}", uri))
                .and_then(|r| {
                    r.text()
                        .with_context(|| format!("Failed to read extended config {}", uri))
                })
                .map_err(|e| OaslintError::ConfigError {
                    message: format!("{e:#}"),
                })?;
            return Ok(text);
        }
        std::fs::read_to_string(uri).map_err(|e| OaslintError::ConfigError {
            message: format!("Failed to read extended config {}: {}", uri, e),
        })
    }
}
