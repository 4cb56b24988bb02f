//! Problem records and the per-walk collector.
//!
//! A [`Problem`] is the typed result of a lint run: a rule id, a severity,
//! a message, and a chain of [`LocationStep`]s ordered innermost-first. The
//! chain may span multiple sources when a `$ref` was followed; in that case
//! `from` records the ref site the problem was reached through.
//!
//! The [`ProblemCollector`] accumulates problems during a walk, drops
//! duplicates, applies the ignore file, and sorts the result so two runs
//! over the same inputs produce byte-identical output.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::Serialize;

use crate::error::{OaslintError, Result};
use crate::source::SourceStore;

/// Severity of a problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warn,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Warn => write!(f, "warn"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// One step of a problem's location chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationStep {
    /// Absolute URI of the source document.
    pub source: String,
    /// RFC 6901 pointer into that document (`#/...`, `~0`/`~1` escaped).
    pub pointer: String,
    /// Whether the problem is about the mapping key rather than the value.
    pub report_on_key: bool,
}

impl LocationStep {
    /// A step reporting on a value.
    pub fn new(source: impl Into<String>, pointer: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            pointer: pointer.into(),
            report_on_key: false,
        }
    }

    /// Switch the step to report on the key.
    pub fn on_key(mut self) -> Self {
        self.report_on_key = true;
        self
    }
}

/// A typed problem produced by a rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Problem {
    pub rule_id: String,
    pub severity: Severity,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggest: Vec<String>,
    /// Innermost-first location chain.
    pub location: Vec<LocationStep>,
    /// The `$ref` site this problem was reached through, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<LocationStep>,
}

/// Problem totals for a finished walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub errors: usize,
    pub warnings: usize,
    pub ignored: usize,
}

/// Locations to silence, loaded from an ignore file.
///
/// The file maps source names to rule ids to pointer lists:
///
/// ```yaml
/// openapi.yaml:
///   operation-summary:
///     - '#/paths/~1pets/get'
/// ```
#[derive(Debug, Clone, Default)]
pub struct IgnoreFile {
    entries: HashMap<String, HashMap<String, HashSet<String>>>,
}

impl IgnoreFile {
    /// Load an ignore file from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let raw: HashMap<String, HashMap<String, Vec<String>>> =
            serde_yaml::from_str(&text).map_err(|e| OaslintError::ConfigParseError {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        let entries = raw
            .into_iter()
            .map(|(file, rules)| {
                let rules = rules
                    .into_iter()
                    .map(|(rule, pointers)| (rule, pointers.into_iter().collect()))
                    .collect();
                (file, rules)
            })
            .collect();
        Ok(Self { entries })
    }

    /// Build an ignore table programmatically.
    pub fn insert(&mut self, file: &str, rule_id: &str, pointer: &str) {
        self.entries
            .entry(file.to_string())
            .or_default()
            .entry(rule_id.to_string())
            .or_default()
            .insert(pointer.to_string());
    }

    fn matches(&self, problem: &Problem) -> bool {
        let Some(step) = problem.location.first() else {
            return false;
        };
        self.entries.iter().any(|(file, rules)| {
            let source_matches =
                step.source == *file || step.source.ends_with(&format!("/{}", file));
            source_matches
                && rules
                    .get(&problem.rule_id)
                    .map_or(false, |pointers| pointers.contains(&step.pointer))
        })
    }
}

/// Accumulates problems for one walk.
#[derive(Default)]
pub struct ProblemCollector {
    problems: Vec<Problem>,
    ignore: Option<IgnoreFile>,
    ignored: usize,
}

impl ProblemCollector {
    /// Create an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach an ignore file; matching problems are dropped and counted.
    pub fn with_ignore(mut self, ignore: IgnoreFile) -> Self {
        self.ignore = Some(ignore);
        self
    }

    /// Record a problem.
    pub fn push(&mut self, problem: Problem) {
        if let Some(ignore) = &self.ignore {
            if ignore.matches(&problem) {
                self.ignored += 1;
                return;
            }
        }
        self.problems.push(problem);
    }

    /// Number of problems recorded so far (pre-dedup).
    pub fn len(&self) -> usize {
        self.problems.len()
    }

    /// Whether any problems were recorded.
    pub fn is_empty(&self) -> bool {
        self.problems.is_empty()
    }

    /// Deduplicate, sort, and hand back the problems with totals.
    ///
    /// Duplicates share `(ruleId, location chain, message)`; order is
    /// `(sourceUri, startOffset, ruleId)` with offsets read from the store.
    pub fn finish(self, store: &SourceStore) -> (Vec<Problem>, Totals) {
        let mut seen = HashSet::new();
        let mut unique = Vec::new();
        for problem in self.problems {
            let key = (
                problem.rule_id.clone(),
                problem
                    .location
                    .iter()
                    .map(|s| format!("{}\u{0}{}\u{0}{}", s.source, s.pointer, s.report_on_key))
                    .collect::<Vec<_>>()
                    .join("\u{1}"),
                problem.message.clone(),
            );
            if seen.insert(key) {
                unique.push(problem);
            }
        }

        unique.sort_by_cached_key(|problem| {
            let (source, offset) = problem
                .location
                .first()
                .map(|step| {
                    let offset = store
                        .get(&step.source)
                        .and_then(|src| {
                            if step.report_on_key {
                                src.key_span_at(&step.pointer)
                                    .or_else(|| src.node_at(&step.pointer).map(|n| n.span))
                            } else {
                                src.node_at(&step.pointer).map(|n| n.span)
                            }
                        })
                        .map(|span| span.start)
                        .unwrap_or(0);
                    (step.source.clone(), offset)
                })
                .unwrap_or_default();
            (source, offset, problem.rule_id.clone())
        });

        let mut totals = Totals {
            ignored: self.ignored,
            ..Default::default()
        };
        for problem in &unique {
            match problem.severity {
                Severity::Error => totals.errors += 1,
                Severity::Warn => totals.warnings += 1,
            }
        }
        (unique, totals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn problem(rule: &str, pointer: &str) -> Problem {
        Problem {
            rule_id: rule.to_string(),
            severity: Severity::Error,
            message: format!("problem at {}", pointer),
            suggest: vec![],
            location: vec![LocationStep::new("doc.yaml", pointer)],
            from: None,
        }
    }

    fn store_with(text: &str) -> SourceStore {
        let store = SourceStore::new();
        store.open_inline("doc.yaml", text).unwrap();
        store
    }

    #[test]
    fn deduplicates_identical_problems() {
        let store = store_with("a: 1\nb: 2\n");
        let mut collector = ProblemCollector::new();
        collector.push(problem("spec", "#/a"));
        collector.push(problem("spec", "#/a"));
        let (problems, totals) = collector.finish(&store);
        assert_eq!(problems.len(), 1);
        assert_eq!(totals.errors, 1);
    }

    #[test]
    fn sorts_by_offset_within_source() {
        let store = store_with("a: 1\nb: 2\n");
        let mut collector = ProblemCollector::new();
        collector.push(problem("spec", "#/b"));
        collector.push(problem("spec", "#/a"));
        let (problems, _) = collector.finish(&store);
        assert_eq!(problems[0].location[0].pointer, "#/a");
        assert_eq!(problems[1].location[0].pointer, "#/b");
    }

    #[test]
    fn sorts_by_rule_id_at_same_offset() {
        let store = store_with("a: 1\n");
        let mut collector = ProblemCollector::new();
        let mut second = problem("zzz", "#/a");
        second.message = "other".into();
        collector.push(second);
        collector.push(problem("aaa", "#/a"));
        let (problems, _) = collector.finish(&store);
        assert_eq!(problems[0].rule_id, "aaa");
    }

    #[test]
    fn ignore_file_suppresses_and_counts() {
        let store = store_with("a: 1\n");
        let mut ignore = IgnoreFile::default();
        ignore.insert("doc.yaml", "spec", "#/a");
        let mut collector = ProblemCollector::new().with_ignore(ignore);
        collector.push(problem("spec", "#/a"));
        collector.push(problem("spec", "#/b"));
        let (problems, totals) = collector.finish(&store);
        assert_eq!(problems.len(), 1);
        assert_eq!(totals.ignored, 1);
    }

    #[test]
    fn totals_count_severities() {
        let store = store_with("a: 1\nb: 2\n");
        let mut collector = ProblemCollector::new();
        collector.push(problem("spec", "#/a"));
        let mut warn = problem("spec", "#/b");
        warn.severity = Severity::Warn;
        collector.push(warn);
        let (_, totals) = collector.finish(&store);
        assert_eq!(totals.errors, 1);
        assert_eq!(totals.warnings, 1);
    }

    #[test]
    fn problem_serializes_with_camel_case_fields() {
        let json = serde_json::to_value(problem("spec", "#/a")).unwrap();
        assert_eq!(json["ruleId"], "spec");
        assert_eq!(json["location"][0]["reportOnKey"], false);
        assert!(json.get("from").is_none());
    }
}
