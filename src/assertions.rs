//! The assertion engine.
//!
//! Assertions are declarative rules written in config: a subject node
//! type, an optional property, and predicate fields. At config-bind time
//! each assertion compiles to a synthetic rule whose visitor is attached
//! to the subject; a failing predicate reports under the assertion's id
//! (or a synthesised one).

use regex::Regex;

use crate::config::plugin::{AssertionFn, Plugin};
use crate::config::schema::RawAssertion;
use crate::error::{OaslintError, Result};
use crate::parser::{NodeKind, ParseNode};
use crate::problems::Severity;
use crate::rules::RuleVisitor;
use crate::walker::{ReportSpec, VisitContext};

use std::sync::Arc;

/// Identifier casing styles accepted by the `casing` predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasingStyle {
    Camel,
    Pascal,
    Kebab,
    Snake,
    Macro,
}

impl CasingStyle {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "camelCase" => Some(Self::Camel),
            "PascalCase" => Some(Self::Pascal),
            "kebab-case" => Some(Self::Kebab),
            "snake_case" => Some(Self::Snake),
            "MACRO_CASE" => Some(Self::Macro),
            _ => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Camel => "camelCase",
            Self::Pascal => "PascalCase",
            Self::Kebab => "kebab-case",
            Self::Snake => "snake_case",
            Self::Macro => "MACRO_CASE",
        }
    }

    fn matches(&self, text: &str) -> bool {
        let pattern = match self {
            Self::Camel => r"^[a-z][a-zA-Z0-9]*$",
            Self::Pascal => r"^[A-Z][a-zA-Z0-9]*$",
            Self::Kebab => r"^[a-z0-9]+(-[a-z0-9]+)*$",
            Self::Snake => r"^[a-z0-9]+(_[a-z0-9]+)*$",
            Self::Macro => r"^[A-Z0-9]+(_[A-Z0-9]+)*$",
        };
        Regex::new(pattern).expect("casing patterns are valid").is_match(text)
    }
}

/// One compiled predicate.
#[derive(Clone)]
pub enum Predicate {
    Defined(bool),
    Pattern(Regex),
    MinLength(usize),
    MaxLength(usize),
    Enum(Vec<String>),
    Casing(CasingStyle),
    Ref(bool),
    Const(serde_yaml::Value),
    Custom {
        name: String,
        options: serde_yaml::Value,
        f: AssertionFn,
    },
}

/// A declarative assertion compiled to a synthetic rule.
#[derive(Clone)]
pub struct CompiledAssertion {
    pub subject: String,
    pub property: Option<String>,
    pub message: Option<String>,
    pub severity: Severity,
    assertion_id: Option<String>,
    synthetic_id: String,
    predicates: Vec<Predicate>,
}

impl std::fmt::Debug for CompiledAssertion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledAssertion")
            .field("subject", &self.subject)
            .field("property", &self.property)
            .field("message", &self.message)
            .field("severity", &self.severity)
            .finish_non_exhaustive()
    }
}

impl CompiledAssertion {
    /// Compile a raw assertion, resolving plugin predicates.
    ///
    /// A predicate named `"<pluginId>/<fn>"` must be exported by that
    /// plugin's `assertions`; a missing function is a fatal config error.
    pub fn compile(raw: &RawAssertion, index: usize, plugins: &[Arc<Plugin>]) -> Result<Self> {
        let severity = match raw.severity.as_deref() {
            None | Some("error") => Severity::Error,
            Some("warn") => Severity::Warn,
            Some(other) => {
                return Err(OaslintError::ConfigError {
                    message: format!(
                        "Assertion on {} has unknown severity `{}`",
                        raw.subject, other
                    ),
                })
            }
        };

        let mut predicates = Vec::new();
        for (key, value) in &raw.predicates {
            let Some(name) = key.as_str() else {
                return Err(OaslintError::ConfigError {
                    message: format!("Assertion predicate names must be strings, got {:?}", key),
                });
            };
            predicates.push(Self::compile_predicate(name, value, plugins)?);
        }
        if predicates.is_empty() {
            return Err(OaslintError::ConfigError {
                message: format!("Assertion on {} declares no predicates", raw.subject),
            });
        }

        Ok(Self {
            subject: raw.subject.clone(),
            property: raw.property.clone(),
            message: raw.message.clone(),
            severity,
            assertion_id: raw.assertion_id.clone(),
            synthetic_id: format!("assertion/{}-{}", raw.subject.to_lowercase(), index),
            predicates,
        })
    }

    fn compile_predicate(
        name: &str,
        value: &serde_yaml::Value,
        plugins: &[Arc<Plugin>],
    ) -> Result<Predicate> {
        let config_error = |message: String| OaslintError::ConfigError { message };
        match name {
            "defined" => value
                .as_bool()
                .map(Predicate::Defined)
                .ok_or_else(|| config_error("`defined` expects a boolean".into())),
            "pattern" => {
                let text = value
                    .as_str()
                    .ok_or_else(|| config_error("`pattern` expects a string".into()))?;
                let regex = Regex::new(text)
                    .map_err(|e| config_error(format!("`pattern` is not a valid regex: {}", e)))?;
                Ok(Predicate::Pattern(regex))
            }
            "minLength" => value
                .as_u64()
                .map(|n| Predicate::MinLength(n as usize))
                .ok_or_else(|| config_error("`minLength` expects a number".into())),
            "maxLength" => value
                .as_u64()
                .map(|n| Predicate::MaxLength(n as usize))
                .ok_or_else(|| config_error("`maxLength` expects a number".into())),
            "enum" => {
                let values = value
                    .as_sequence()
                    .ok_or_else(|| config_error("`enum` expects a list".into()))?
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect();
                Ok(Predicate::Enum(values))
            }
            "casing" => {
                let text = value
                    .as_str()
                    .ok_or_else(|| config_error("`casing` expects a string".into()))?;
                CasingStyle::parse(text).map(Predicate::Casing).ok_or_else(|| {
                    config_error(format!("`casing` does not support style `{}`", text))
                })
            }
            "ref" => value
                .as_bool()
                .map(Predicate::Ref)
                .ok_or_else(|| config_error("`ref` expects a boolean".into())),
            "const" => Ok(Predicate::Const(value.clone())),
            _ => {
                if let Some((plugin_id, fn_name)) = name.split_once('/') {
                    let Some(plugin) = plugins.iter().find(|p| p.id == plugin_id) else {
                        return Err(config_error(format!(
                            "Plugin {} is not listed in this styleguide's plugins",
                            plugin_id
                        )));
                    };
                    let Some(f) = plugin.assertions.get(fn_name) else {
                        return Err(config_error(format!(
                            "Plugin {} doesn't export assertions function with name {}",
                            plugin_id, fn_name
                        )));
                    };
                    return Ok(Predicate::Custom {
                        name: name.to_string(),
                        options: value.clone(),
                        f: Arc::clone(f),
                    });
                }
                Err(config_error(format!("Unknown assertion predicate `{}`", name)))
            }
        }
    }

    /// The rule id failures report under.
    pub fn rule_id(&self) -> String {
        self.assertion_id
            .clone()
            .unwrap_or_else(|| self.synthetic_id.clone())
    }

    /// Build the synthetic visitor for one walk.
    pub fn make_visitor(&self) -> Box<dyn RuleVisitor> {
        Box::new(AssertionVisitor {
            assertion: self.clone(),
        })
    }
}

struct AssertionVisitor {
    assertion: CompiledAssertion,
}

impl RuleVisitor for AssertionVisitor {
    fn targets(&self) -> Vec<&str> {
        vec![self.assertion.subject.as_str()]
    }

    fn enter(&mut self, node: &ParseNode, ctx: &mut VisitContext<'_>) {
        let assertion = &self.assertion;
        let value = match &assertion.property {
            Some(property) => node.get(property),
            None => Some(node),
        };

        for predicate in &assertion.predicates {
            if let Predicate::Defined(expected) = predicate {
                match (expected, value) {
                    (true, None) => {
                        let property = assertion.property.as_deref().unwrap_or("value");
                        let location = ctx.location().on_key();
                        self::report(
                            ctx,
                            assertion,
                            format!("`{}` must be defined", property),
                            location,
                        );
                    }
                    (false, Some(_)) => {
                        let property = assertion.property.as_deref().unwrap_or("value");
                        let location = match &assertion.property {
                            Some(p) => ctx.child_location(p).on_key(),
                            None => ctx.location(),
                        };
                        self::report(
                            ctx,
                            assertion,
                            format!("`{}` must not be defined", property),
                            location,
                        );
                    }
                    _ => {}
                }
            }
        }

        let Some(value) = value else {
            return;
        };
        let location = match &assertion.property {
            Some(property) => ctx.child_location(property),
            None => ctx.location(),
        };

        for predicate in &assertion.predicates {
            let failure = match predicate {
                Predicate::Defined(_) => None,
                Predicate::Pattern(regex) => check_strings(value, |text| {
                    (!regex.is_match(text))
                        .then(|| format!("\"{}\" should match the pattern `{}`", text, regex))
                }),
                Predicate::MinLength(min) => {
                    length_of(value).and_then(|len| {
                        (len < *min).then(|| {
                            format!("Length must be at least {} but it is {}", min, len)
                        })
                    })
                }
                Predicate::MaxLength(max) => {
                    length_of(value).and_then(|len| {
                        (len > *max).then(|| {
                            format!("Length must be at most {} but it is {}", max, len)
                        })
                    })
                }
                Predicate::Enum(allowed) => check_strings(value, |text| {
                    (!allowed.iter().any(|a| a == text)).then(|| {
                        format!(
                            "\"{}\" should be one of: {}",
                            text,
                            allowed.join(", ")
                        )
                    })
                }),
                Predicate::Casing(style) => check_strings_and_keys(value, |text| {
                    (!style.matches(text))
                        .then(|| format!("\"{}\" should use {}", text, style.name()))
                }),
                Predicate::Ref(expected) => {
                    let is_ref = crate::resolver::ref_target(value).is_some();
                    if is_ref != *expected {
                        Some(if *expected {
                            "Expected a $ref here".to_string()
                        } else {
                            "$ref is not allowed here".to_string()
                        })
                    } else {
                        None
                    }
                }
                Predicate::Const(expected) => {
                    let actual = value.to_yaml_value();
                    (&actual != expected).then(|| {
                        format!(
                            "Value must equal the configured constant but it is {:?}",
                            actual
                        )
                    })
                }
                Predicate::Custom { options, f, .. } => f(value, options).err(),
            };
            if let Some(message) = failure {
                self::report(ctx, assertion, message, location.clone());
            }
        }
    }
}

fn report(
    ctx: &mut VisitContext<'_>,
    assertion: &CompiledAssertion,
    default_message: String,
    location: crate::problems::LocationStep,
) {
    let message = assertion.message.clone().unwrap_or(default_message);
    ctx.report(ReportSpec::new(message).at(location));
}

/// Apply a check to a string scalar, or to every string item of a
/// sequence.
fn check_strings(node: &ParseNode, check: impl Fn(&str) -> Option<String>) -> Option<String> {
    match &node.kind {
        NodeKind::Scalar(_) => node.as_str().and_then(|text| check(text)),
        NodeKind::Sequence(items) => items
            .iter()
            .filter_map(|item| item.as_str())
            .find_map(|text| check(text)),
        NodeKind::Mapping(_) => None,
    }
}

/// Like [`check_strings`], but a mapping is checked by its keys (used by
/// `casing` on named maps).
fn check_strings_and_keys(
    node: &ParseNode,
    check: impl Fn(&str) -> Option<String>,
) -> Option<String> {
    match &node.kind {
        NodeKind::Mapping(entries) => entries.iter().find_map(|e| check(&e.key)),
        _ => check_strings(node, check),
    }
}

fn length_of(node: &ParseNode) -> Option<usize> {
    match &node.kind {
        NodeKind::Scalar(_) => node.as_str().map(|s| s.chars().count()),
        NodeKind::Sequence(items) => Some(items.len()),
        NodeKind::Mapping(entries) => Some(entries.len()),
    }
}
