//! Raw configuration schema.
//!
//! These are the serde types a config file (`oaslint.yaml`) deserializes
//! into before resolution. Rule maps stay as ordered YAML mappings so the
//! declaration order survives into rule firing order.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{OaslintError, Result};
use crate::problems::Severity;

/// Top-level raw config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawConfig {
    /// API roots by alias.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub apis: BTreeMap<String, ApiConfig>,

    /// Root styleguide.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub styleguide: Option<RawStyleguide>,

    /// Shorthand for `styleguide.extends` at the top level.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extends: Vec<String>,

    /// Shorthand for `styleguide.plugins` at the top level.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub plugins: Vec<String>,

    /// Passed through untouched for documentation tooling.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<serde_yaml::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

impl RawConfig {
    /// Parse a config file's text.
    pub fn parse(text: &str, path: &Path) -> Result<Self> {
        serde_yaml::from_str(text).map_err(|e| OaslintError::ConfigParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Load a config file from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                OaslintError::ConfigNotFound {
                    path: path.to_path_buf(),
                }
            } else {
                OaslintError::Io(e)
            }
        })?;
        Self::parse(&text, path)
    }

    /// The root styleguide with top-level `extends`/`plugins` folded in.
    pub fn root_styleguide(&self) -> RawStyleguide {
        let mut styleguide = self.styleguide.clone().unwrap_or_default();
        let mut extends = self.extends.clone();
        extends.extend(styleguide.extends.drain(..));
        styleguide.extends = extends;
        for plugin in &self.plugins {
            if !styleguide.plugins.contains(plugin) {
                styleguide.plugins.push(plugin.clone());
            }
        }
        styleguide
    }
}

/// One API entry: a root document plus an optional styleguide override.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Path or URL of the root document.
    pub root: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub styleguide: Option<RawStyleguide>,
}

/// A styleguide as written in config: extends chain, rule severities,
/// assertions, transforms, and plugins.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawStyleguide {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extends: Vec<String>,

    /// `ruleId -> "error" | "warn" | "off" | { severity, ...options }`,
    /// in declaration order.
    #[serde(default, skip_serializing_if = "serde_yaml::Mapping::is_empty")]
    pub rules: serde_yaml::Mapping,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assertions: Vec<RawAssertion>,

    #[serde(default, skip_serializing_if = "serde_yaml::Mapping::is_empty")]
    pub preprocessors: serde_yaml::Mapping,

    #[serde(default, skip_serializing_if = "serde_yaml::Mapping::is_empty")]
    pub decorators: serde_yaml::Mapping,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub plugins: Vec<String>,
}

impl RawStyleguide {
    /// Whether the user wrote any rules at this level.
    pub fn has_rules(&self) -> bool {
        !self.rules.is_empty()
    }

    /// Add one rule setting; used by programmatic configs and tests.
    pub fn set_rule(&mut self, id: &str, severity: &str) {
        self.rules.insert(
            serde_yaml::Value::String(id.to_string()),
            serde_yaml::Value::String(severity.to_string()),
        );
    }
}

/// A declarative assertion as written in config. Predicate fields are
/// kept raw and compiled at bind time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawAssertion {
    /// Node type name the assertion runs on.
    pub subject: String,

    /// Property of the subject to check; the subject itself when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property: Option<String>,

    /// Message overriding the predicate defaults.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// `"error"` or `"warn"`; assertions default to error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,

    /// Reported rule id; synthesised when absent.
    #[serde(
        rename = "assertionId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub assertion_id: Option<String>,

    /// The predicate fields (`defined`, `pattern`, `casing`, ...).
    #[serde(flatten)]
    pub predicates: serde_yaml::Mapping,
}

/// One rule's resolved setting: an effective severity (None = off) plus
/// any options from the object form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleDecl {
    pub severity: Option<Severity>,
    pub options: serde_yaml::Mapping,
}

impl RuleDecl {
    /// Parse a rule setting value from config.
    pub fn parse(rule_id: &str, value: &serde_yaml::Value) -> Result<Self> {
        match value {
            serde_yaml::Value::String(s) => Ok(Self {
                severity: parse_severity(rule_id, s)?,
                options: serde_yaml::Mapping::new(),
            }),
            serde_yaml::Value::Mapping(mapping) => {
                let severity = match mapping.get("severity") {
                    Some(serde_yaml::Value::String(s)) => parse_severity(rule_id, s)?,
                    Some(other) => {
                        return Err(OaslintError::ConfigError {
                            message: format!(
                                "Rule {} has a non-string severity: {:?}",
                                rule_id, other
                            ),
                        })
                    }
                    None => Some(Severity::Error),
                };
                let mut options = mapping.clone();
                options.remove("severity");
                Ok(Self { severity, options })
            }
            other => Err(OaslintError::ConfigError {
                message: format!("Rule {} has an invalid setting: {:?}", rule_id, other),
            }),
        }
    }
}

fn parse_severity(rule_id: &str, text: &str) -> Result<Option<Severity>> {
    match text {
        "error" => Ok(Some(Severity::Error)),
        "warn" => Ok(Some(Severity::Warn)),
        "off" => Ok(None),
        other => Err(OaslintError::ConfigError {
            message: format!(
                "Rule {} has unknown severity `{}`; expected \"error\", \"warn\" or \"off\"",
                rule_id, other
            ),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_config() {
        let config = RawConfig::parse(
            r#"
apis:
  main:
    root: openapi.yaml
    styleguide:
      rules:
        operation-4xx-response: error
styleguide:
  extends:
    - recommended
  rules:
    operation-2xx-response: warn
    no-path-trailing-slash:
      severity: error
"#,
            Path::new("oaslint.yaml"),
        )
        .unwrap();

        assert_eq!(config.apis["main"].root, "openapi.yaml");
        let styleguide = config.styleguide.unwrap();
        assert_eq!(styleguide.extends, vec!["recommended"]);
        assert_eq!(styleguide.rules.len(), 2);
    }

    #[test]
    fn top_level_extends_folds_into_root_styleguide() {
        let config = RawConfig::parse(
            "extends:\n  - minimal\nstyleguide:\n  extends:\n    - recommended\n",
            Path::new("oaslint.yaml"),
        )
        .unwrap();
        let root = config.root_styleguide();
        assert_eq!(root.extends, vec!["minimal", "recommended"]);
    }

    #[test]
    fn rule_decl_parses_severity_strings() {
        let decl = RuleDecl::parse("x", &serde_yaml::Value::String("error".into())).unwrap();
        assert_eq!(decl.severity, Some(Severity::Error));
        let decl = RuleDecl::parse("x", &serde_yaml::Value::String("off".into())).unwrap();
        assert_eq!(decl.severity, None);
    }

    #[test]
    fn rule_decl_parses_object_form() {
        let value: serde_yaml::Value =
            serde_yaml::from_str("severity: warn\nignoreLastPathSegment: true\n").unwrap();
        let decl = RuleDecl::parse("x", &value).unwrap();
        assert_eq!(decl.severity, Some(Severity::Warn));
        assert_eq!(decl.options.len(), 1);
    }

    #[test]
    fn rule_decl_object_without_severity_defaults_to_error() {
        let value: serde_yaml::Value = serde_yaml::from_str("someOption: 1\n").unwrap();
        let decl = RuleDecl::parse("x", &value).unwrap();
        assert_eq!(decl.severity, Some(Severity::Error));
    }

    #[test]
    fn rule_decl_rejects_unknown_severity() {
        let result = RuleDecl::parse("x", &serde_yaml::Value::String("fatal".into()));
        assert!(result.is_err());
    }

    #[test]
    fn assertion_predicates_are_collected_by_flatten() {
        let raw: RawAssertion = serde_yaml::from_str(
            r#"
subject: Operation
property: summary
defined: true
minLength: 10
"#,
        )
        .unwrap();
        assert_eq!(raw.subject, "Operation");
        assert_eq!(raw.predicates.len(), 2);
    }
}
