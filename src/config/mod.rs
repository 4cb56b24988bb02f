//! Configuration loading, resolution, and plugins.
//!
//! The config system turns an `oaslint.yaml` file (or a programmatic raw
//! config) into frozen per-API rule sets:
//!
//! - [`schema`] - Raw serde types for the config file
//! - [`presets`] - Built-in rule bundles (`minimal`, `recommended`, ...)
//! - [`resolver`] - `extends` chain resolution and per-API overrides
//! - [`plugin`] - Plugin exports and the in-process registry

pub mod plugin;
pub mod presets;
pub mod resolver;
pub mod schema;

use std::path::{Path, PathBuf};

use crate::error::Result;

pub use plugin::{AssertionFn, Plugin, PluginRegistry, PluginRule, ValueTransform};
pub use presets::{is_preset, preset};
pub use resolver::{ConfigResolver, ResolvedApi, ResolvedConfig, ResolvedStyleguide};
pub use schema::{ApiConfig, RawAssertion, RawConfig, RawStyleguide, RuleDecl};

/// File names probed by [`discover_config`], in priority order.
const CONFIG_FILE_NAMES: [&str; 2] = ["oaslint.yaml", "oaslint.yml"];

/// Find the config file in a directory, if present.
pub fn discover_config(dir: &Path) -> Option<PathBuf> {
    CONFIG_FILE_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.exists())
}

/// Resolve a raw config into per-API styleguides.
pub fn resolve_config(
    raw: &RawConfig,
    config_uri: Option<&str>,
    plugins: &PluginRegistry,
) -> Result<ResolvedConfig> {
    ConfigResolver::new(plugins).resolve_config(raw, config_uri)
}

/// Resolve a bare styleguide (no API table).
pub fn resolve_styleguide_config(
    raw: &RawStyleguide,
    base_uri: Option<&str>,
    plugins: &PluginRegistry,
) -> Result<ResolvedStyleguide> {
    ConfigResolver::new(plugins).resolve_styleguide(raw, base_uri)
}

/// The APIs of a resolved config, in alias order.
pub fn resolve_apis(config: &ResolvedConfig) -> Vec<(&str, &ResolvedApi)> {
    config
        .apis
        .iter()
        .map(|(alias, api)| (alias.as_str(), api))
        .collect()
}

/// Colorise an identifier for a fatal config error message. Styling is
/// dropped automatically when output is not a terminal.
pub fn highlight(text: &str) -> String {
    console::style(text).yellow().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discover_finds_yaml_then_yml() {
        let dir = tempfile::tempdir().unwrap();
        assert!(discover_config(dir.path()).is_none());
        std::fs::write(dir.path().join("oaslint.yml"), "{}\n").unwrap();
        assert!(discover_config(dir.path())
            .unwrap()
            .ends_with("oaslint.yml"));
        std::fs::write(dir.path().join("oaslint.yaml"), "{}\n").unwrap();
        assert!(discover_config(dir.path())
            .unwrap()
            .ends_with("oaslint.yaml"));
    }

    #[test]
    fn resolve_apis_lists_aliases_in_order() {
        let raw = RawConfig::parse(
            "apis:\n  b:\n    root: b.yaml\n  a:\n    root: a.yaml\nstyleguide:\n  rules:\n    spec: error\n",
            Path::new("oaslint.yaml"),
        )
        .unwrap();
        let plugins = PluginRegistry::new();
        let resolved = resolve_config(&raw, None, &plugins).unwrap();
        let apis = resolve_apis(&resolved);
        assert_eq!(apis.len(), 2);
        assert_eq!(apis[0].0, "a");
        assert_eq!(apis[1].0, "b");
    }
}
