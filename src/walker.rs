//! The document walker.
//!
//! Walks a resolved document along the edges its [`TypeRegistry`] declares,
//! firing rule callbacks and performing the structural checks that report
//! under the `spec` rule id. `$ref` objects are resolved through the
//! [`RefResolver`]; every crossing pushes a `from` step so problems found
//! inside a target name the site they were reached through.
//!
//! Traversal order is deterministic: mapping entries in document order,
//! arrays by index, rules in config-declaration order with built-ins first.
//! A rule may skip the subtree below the current node for itself only.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use regex::Regex;

use crate::parser::{NodeKind, ParseNode};
use crate::problems::{LocationStep, Problem, ProblemCollector, Severity};
use crate::resolver::{ref_target, RefResolver, ResolveOutcome};
use crate::rules::{BoundRule, BoundRuleSet};
use crate::schema::{
    NodeShape, NodeType, OasVersion, ObjectShape, ShapeRule, TypeRegistry, UnionBy, UnionShape,
};
use crate::source::Source;

/// A problem filed by a rule, before the walker fills in rule id,
/// severity, and location.
#[derive(Debug, Clone)]
pub struct ReportSpec {
    pub message: String,
    /// Overrides the current location when set.
    pub location: Option<LocationStep>,
    pub report_on_key: bool,
    pub suggest: Vec<String>,
    /// Overrides the bound severity when set.
    pub severity: Option<Severity>,
}

impl ReportSpec {
    /// A report at the current location.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location: None,
            report_on_key: false,
            suggest: Vec::new(),
            severity: None,
        }
    }

    /// Report on the mapping key instead of the value.
    pub fn on_key(mut self) -> Self {
        self.report_on_key = true;
        self
    }

    /// Report at an explicit location.
    pub fn at(mut self, location: LocationStep) -> Self {
        self.location = Some(location);
        self
    }

    /// Attach a suggestion.
    pub fn suggest(mut self, suggestion: impl Into<String>) -> Self {
        self.suggest.push(suggestion.into());
        self
    }

    /// Override the bound severity.
    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }
}

/// Context handed to rule callbacks.
pub struct VisitContext<'a> {
    /// Name of the node's type in the registry.
    pub type_name: &'a str,
    /// The node's resolved type.
    pub node_type: &'a NodeType,
    /// Last pointer segment (`""` at the root).
    pub key: String,
    /// The enclosing node, when walking a child.
    pub parent: Option<&'a ParseNode>,
    /// Version of the document being walked.
    pub oas_version: OasVersion,
    /// URI of the source the node lives in.
    pub source_uri: &'a str,
    /// Pointer of the node within its source.
    pub pointer: &'a str,
    source: &'a Arc<Source>,
    resolver: &'a RefResolver<'a>,
    reports: Vec<ReportSpec>,
    skip_requested: bool,
}

impl<'a> VisitContext<'a> {
    /// File a problem. The walker fills in rule id, severity, and the
    /// current location unless the report overrides them.
    pub fn report(&mut self, report: ReportSpec) {
        self.reports.push(report);
    }

    /// Skip the subtree below this node for this rule only.
    pub fn skip(&mut self) {
        self.skip_requested = true;
    }

    /// The current location as a step.
    pub fn location(&self) -> LocationStep {
        LocationStep::new(self.source_uri, self.pointer)
    }

    /// A location for a child key of the current node.
    pub fn child_location(&self, key: &str) -> LocationStep {
        LocationStep::new(self.source_uri, join_pointer(self.pointer, key))
    }

    /// Resolve a `$ref` node through the run's resolver.
    pub fn resolve(&self, node: &ParseNode) -> Option<ResolveOutcome> {
        let reference = ref_target(node)?;
        Some(self.resolver.resolve(self.source, reference))
    }
}

/// Append a segment to a `#/`-style pointer, escaping it.
pub fn join_pointer(pointer: &str, segment: &str) -> String {
    let escaped = crate::source::escape_pointer_segment(segment);
    if pointer.ends_with('/') {
        format!("{}{}", pointer, escaped)
    } else {
        format!("{}/{}", pointer, escaped)
    }
}

/// Walks one document with a bound rule set, reporting into a collector.
pub struct Walker<'w> {
    registry: &'static TypeRegistry,
    resolver: &'w RefResolver<'w>,
    collector: &'w mut ProblemCollector,
    rules: Vec<BoundRule>,
    dispatch: HashMap<String, Vec<usize>>,
    spec_severity: Option<Severity>,
    unresolved_refs_severity: Option<Severity>,
    version: OasVersion,
    from_stack: Vec<LocationStep>,
    active_refs: Vec<(String, String)>,
    skips: Vec<Option<usize>>,
    ref_depth: usize,
    rule_errors: usize,
    patterns: HashMap<&'static str, Regex>,
}

impl<'w> Walker<'w> {
    /// Create a walker for one document version.
    pub fn new(
        version: OasVersion,
        rule_set: BoundRuleSet,
        resolver: &'w RefResolver<'w>,
        collector: &'w mut ProblemCollector,
    ) -> Self {
        let dispatch = rule_set.dispatch_table();
        let skips = vec![None; rule_set.rules.len()];
        Self {
            registry: crate::schema::registry(version),
            resolver,
            collector,
            rules: rule_set.rules,
            dispatch,
            spec_severity: rule_set.spec_severity,
            unresolved_refs_severity: rule_set.unresolved_refs_severity,
            version,
            from_stack: Vec::new(),
            active_refs: Vec::new(),
            skips,
            ref_depth: 0,
            rule_errors: 0,
            patterns: HashMap::new(),
        }
    }

    /// Walk a root source. Returns the number of rule callbacks that
    /// panicked (each is logged and the walk continues).
    pub fn walk(mut self, source: &Arc<Source>) -> usize {
        self.walk_node(source, &source.root, "Root", "#/", "", "", None, 0);
        self.rule_errors
    }

    #[allow(clippy::too_many_arguments)]
    fn walk_node(
        &mut self,
        source: &Arc<Source>,
        node: &ParseNode,
        type_name: &str,
        pointer: &str,
        key: &str,
        field: &str,
        parent: Option<&ParseNode>,
        depth: usize,
    ) {
        let Some(node_type) = self.registry.get(type_name) else {
            tracing::debug!(type_name, "unknown node type, stopping descent");
            return;
        };

        if let NodeShape::Union(union) = &node_type.shape {
            self.walk_union(source, node, node_type, union, pointer, key, field, parent, depth);
            return;
        }

        if !matches!(node_type.shape, NodeShape::Any | NodeShape::Scalar(_)) {
            if let Some(reference) = ref_target(node) {
                let reference = reference.to_string();
                self.walk_ref(source, node_type.name, pointer, key, field, &reference, depth);
                return;
            }
        }

        let descend = self.check_structure(source, node, node_type, pointer, field);

        self.fire(Phase::Enter, source, node, node_type, pointer, key, parent, depth);

        if descend {
            self.walk_children(source, node, node_type, pointer, field, depth);
        }

        self.fire(Phase::Leave, source, node, node_type, pointer, key, parent, depth);
    }

    #[allow(clippy::too_many_arguments)]
    fn walk_union(
        &mut self,
        source: &Arc<Source>,
        node: &ParseNode,
        node_type: &NodeType,
        union: &UnionShape,
        pointer: &str,
        key: &str,
        field: &str,
        parent: Option<&ParseNode>,
        depth: usize,
    ) {
        if let Some(variant) = union.pick(node) {
            self.walk_node(source, node, variant, pointer, key, field, parent, depth);
            return;
        }
        match union.by {
            UnionBy::Discriminator => {
                // Recover the discriminator field and its closed value set
                // from the probes for a precise message.
                let mut field_name = None;
                let mut values = Vec::new();
                for variant in &union.variants {
                    if let crate::schema::VariantMatch::FieldEquals(f, v) = &variant.when {
                        field_name = Some(*f);
                        values.push(*v);
                    }
                }
                if let Some(field_name) = field_name {
                    if node.has_key(field_name) {
                        let list = values
                            .iter()
                            .map(|v| format!("\"{}\"", v))
                            .collect::<Vec<_>>()
                            .join(", ");
                        self.report_spec(
                            LocationStep::new(&source.uri, join_pointer(pointer, field_name)),
                            format!("`{}` can be one of the following only: {}.", field_name, list),
                            Vec::new(),
                        );
                    } else {
                        self.report_spec(
                            LocationStep::new(&source.uri, pointer).on_key(),
                            format!("The field `{}` must be present on this level.", field_name),
                            Vec::new(),
                        );
                    }
                    return;
                }
            }
            UnionBy::Shape => {
                let shown = if field.is_empty() { node_type.name } else { field };
                self.report_spec(
                    LocationStep::new(&source.uri, pointer).on_key(),
                    format!("Property `{}` is not expected here", shown),
                    Vec::new(),
                );
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn walk_ref(
        &mut self,
        source: &Arc<Source>,
        type_name: &'static str,
        pointer: &str,
        key: &str,
        field: &str,
        reference: &str,
        depth: usize,
    ) {
        match self.resolver.resolve(source, reference) {
            ResolveOutcome::Resolved(resolved) => {
                let target_key = (resolved.source.uri.clone(), resolved.pointer.clone());
                if self.active_refs.contains(&target_key) {
                    // Already on this chain; a second descent would loop.
                    return;
                }
                let target_source = Arc::clone(&resolved.source);
                let target_pointer = resolved.pointer.clone();
                let Some(target) = target_source.node_at(&target_pointer) else {
                    return;
                };
                let ref_site = LocationStep::new(&source.uri, pointer);
                self.active_refs.push(target_key);
                self.from_stack.push(ref_site);
                self.ref_depth += 1;
                self.walk_node(
                    &target_source,
                    target,
                    type_name,
                    &target_pointer,
                    key,
                    field,
                    None,
                    depth + 1,
                );
                self.ref_depth -= 1;
                self.from_stack.pop();
                self.active_refs.pop();
            }
            ResolveOutcome::Circular { .. } => {
                // Sentinel: traversal stops, rules that care inspect the
                // marker through ctx.resolve().
            }
            ResolveOutcome::Failed(error) => {
                if let Some(severity) = self.unresolved_refs_severity {
                    let from = self.from_stack.last().cloned();
                    self.collector.push(Problem {
                        rule_id: "no-unresolved-refs".to_string(),
                        severity,
                        message: error.to_string(),
                        suggest: Vec::new(),
                        location: vec![LocationStep::new(&source.uri, pointer)],
                        from,
                    });
                }
            }
        }
    }

    /// Structural checks under the `spec` rule id. Returns whether the
    /// walker should descend into children.
    fn check_structure(
        &mut self,
        source: &Arc<Source>,
        node: &ParseNode,
        node_type: &NodeType,
        pointer: &str,
        field: &str,
    ) -> bool {
        match &node_type.shape {
            NodeShape::Any => false,
            NodeShape::Scalar(shape) => {
                let NodeKind::Scalar(value) = &node.kind else {
                    self.report_spec(
                        LocationStep::new(&source.uri, pointer),
                        format!(
                            "Expected type `{}` but got {}",
                            shape.kind.name(),
                            node.kind_name()
                        ),
                        Vec::new(),
                    );
                    return false;
                };
                if !shape.kind.matches(value) {
                    self.report_spec(
                        LocationStep::new(&source.uri, pointer),
                        format!(
                            "Expected type `{}` but got {}",
                            shape.kind.name(),
                            value.kind_name()
                        ),
                        Vec::new(),
                    );
                    return false;
                }
                if let (Some(values), Some(text)) = (&shape.enum_values, value.as_str()) {
                    if !values.contains(&text) {
                        let list = values
                            .iter()
                            .map(|v| format!("\"{}\"", v))
                            .collect::<Vec<_>>()
                            .join(", ");
                        let shown = if field.is_empty() { node_type.name } else { field };
                        self.report_spec(
                            LocationStep::new(&source.uri, pointer),
                            format!("`{}` can be one of the following only: {}.", shown, list),
                            Vec::new(),
                        );
                    }
                }
                false
            }
            NodeShape::Array(_) => {
                if !matches!(node.kind, NodeKind::Sequence(_)) {
                    self.report_spec(
                        LocationStep::new(&source.uri, pointer),
                        format!(
                            "Expected type `{}` (array) but got {}",
                            node_type.name,
                            node.kind_name()
                        ),
                        Vec::new(),
                    );
                    return false;
                }
                true
            }
            NodeShape::MapOf(shape) => {
                let Some(entries) = node.entries() else {
                    self.report_spec(
                        LocationStep::new(&source.uri, pointer),
                        format!(
                            "Expected type `{}` (object) but got {}",
                            node_type.name,
                            node.kind_name()
                        ),
                        Vec::new(),
                    );
                    return false;
                };
                if let Some(pattern) = shape.key_pattern {
                    let regex = self.pattern(pattern);
                    for entry in entries {
                        if !regex.is_match(&entry.key) {
                            self.report_spec(
                                LocationStep::new(&source.uri, join_pointer(pointer, &entry.key))
                                    .on_key(),
                                format!(
                                    "The key `{}` does not match the expected pattern `{}`",
                                    entry.key, pattern
                                ),
                                Vec::new(),
                            );
                        }
                    }
                }
                self.check_shape_rules(source, node, node_type, pointer);
                true
            }
            NodeShape::Object(shape) => {
                let Some(entries) = node.entries() else {
                    self.report_spec(
                        LocationStep::new(&source.uri, pointer),
                        format!(
                            "Expected type `{}` (object) but got {}",
                            node_type.name,
                            node.kind_name()
                        ),
                        Vec::new(),
                    );
                    return false;
                };
                for property in &shape.properties {
                    if property.required && !node.has_key(property.name) {
                        self.report_spec(
                            LocationStep::new(&source.uri, pointer).on_key(),
                            format!(
                                "The field `{}` must be present on this level.",
                                property.name
                            ),
                            Vec::new(),
                        );
                    }
                }
                for entry in entries {
                    if self.classify_property(shape, &entry.key).is_none() {
                        let suggest = closest_names(&entry.key, shape);
                        self.report_spec(
                            LocationStep::new(&source.uri, join_pointer(pointer, &entry.key))
                                .on_key(),
                            format!("Property `{}` is not expected here", entry.key),
                            suggest,
                        );
                    }
                }
                if self.version == OasVersion::Oas3_0
                    && node_type.name == "Schema"
                    && node.has_key("nullable")
                    && !node.has_key("type")
                {
                    self.report_spec(
                        LocationStep::new(&source.uri, join_pointer(pointer, "nullable")),
                        "The `type` field must be defined when the `nullable` field is used."
                            .to_string(),
                        Vec::new(),
                    );
                }
                self.check_shape_rules(source, node, node_type, pointer);
                true
            }
            NodeShape::Union(_) => true,
        }
    }

    fn check_shape_rules(
        &mut self,
        source: &Arc<Source>,
        node: &ParseNode,
        node_type: &NodeType,
        pointer: &str,
    ) {
        for rule in &node_type.shape_rules {
            match rule {
                ShapeRule::RequireAnyOf { fields, message } => {
                    if !fields.iter().any(|f| node.has_key(f)) {
                        self.report_spec(
                            LocationStep::new(&source.uri, pointer).on_key(),
                            message.clone(),
                            Vec::new(),
                        );
                    }
                }
                ShapeRule::NonEmpty { message } => {
                    let empty = node.entries().map_or(false, |e| e.is_empty());
                    if empty {
                        self.report_spec(
                            LocationStep::new(&source.uri, pointer).on_key(),
                            message.clone(),
                            Vec::new(),
                        );
                    }
                }
            }
        }
    }

    /// The type name for a property of an object, or `None` when the
    /// property is not expected.
    fn classify_property(&mut self, shape: &ObjectShape, key: &str) -> Option<&'static str> {
        if let Some(property) = shape.property(key) {
            return Some(property.type_name);
        }
        if key.starts_with("x-") {
            return shape.extensions_allowed.then_some("any");
        }
        for (pattern, type_name) in &shape.pattern_properties {
            if self.pattern(pattern).is_match(key) {
                return Some(type_name);
            }
        }
        shape.additional
    }

    fn walk_children(
        &mut self,
        source: &Arc<Source>,
        node: &ParseNode,
        node_type: &NodeType,
        pointer: &str,
        field: &str,
        depth: usize,
    ) {
        match (&node_type.shape, &node.kind) {
            (NodeShape::Object(shape), NodeKind::Mapping(entries)) => {
                let shape = shape.clone();
                for entry in entries {
                    let Some(child_type) = self.classify_property(&shape, &entry.key) else {
                        continue;
                    };
                    let child_pointer = join_pointer(pointer, &entry.key);
                    self.walk_node(
                        source,
                        &entry.value,
                        child_type,
                        &child_pointer,
                        &entry.key,
                        &entry.key,
                        Some(node),
                        depth + 1,
                    );
                }
            }
            (NodeShape::MapOf(shape), NodeKind::Mapping(entries)) => {
                for entry in entries {
                    let child_pointer = join_pointer(pointer, &entry.key);
                    self.walk_node(
                        source,
                        &entry.value,
                        shape.value_type,
                        &child_pointer,
                        &entry.key,
                        &entry.key,
                        Some(node),
                        depth + 1,
                    );
                }
            }
            (NodeShape::Array(item_type), NodeKind::Sequence(items)) => {
                for (index, item) in items.iter().enumerate() {
                    let key = index.to_string();
                    let child_pointer = join_pointer(pointer, &key);
                    self.walk_node(
                        source,
                        item,
                        item_type,
                        &child_pointer,
                        &key,
                        field,
                        Some(node),
                        depth + 1,
                    );
                }
            }
            _ => {}
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn fire(
        &mut self,
        phase: Phase,
        source: &Arc<Source>,
        node: &ParseNode,
        node_type: &NodeType,
        pointer: &str,
        key: &str,
        parent: Option<&ParseNode>,
        depth: usize,
    ) {
        let indices = self.dispatch_indices(node_type.name);
        for index in indices {
            if let Some(skip_depth) = self.skips[index] {
                if depth > skip_depth {
                    continue;
                }
            }
            if self.ref_depth > 0 && self.rules[index].visitor.skip_refs() {
                continue;
            }

            let mut ctx = VisitContext {
                type_name: node_type.name,
                node_type,
                key: key.to_string(),
                parent,
                oas_version: self.version,
                source_uri: &source.uri,
                pointer,
                source,
                resolver: self.resolver,
                reports: Vec::new(),
                skip_requested: false,
            };

            let rule = &mut self.rules[index];
            let outcome = catch_unwind(AssertUnwindSafe(|| match phase {
                Phase::Enter => rule.visitor.enter(node, &mut ctx),
                Phase::Leave => rule.visitor.leave(node, &mut ctx),
            }));
            if outcome.is_err() {
                tracing::error!(rule = %self.rules[index].id, pointer, "rule callback panicked");
                self.rule_errors += 1;
                continue;
            }

            let rule_id = self.rules[index].id.clone();
            let severity = self.rules[index].severity;
            let from = self.from_stack.last().cloned();
            if ctx.skip_requested && matches!(phase, Phase::Enter) {
                self.skips[index] = Some(depth);
            }
            if matches!(phase, Phase::Leave) && self.skips[index] == Some(depth) {
                self.skips[index] = None;
            }
            for report in ctx.reports {
                let location = report
                    .location
                    .unwrap_or_else(|| LocationStep::new(&source.uri, pointer));
                let location = if report.report_on_key {
                    location.on_key()
                } else {
                    location
                };
                self.collector.push(Problem {
                    rule_id: rule_id.0.clone(),
                    severity: report.severity.unwrap_or(severity),
                    message: report.message,
                    suggest: report.suggest,
                    location: vec![location],
                    from: from.clone(),
                });
            }
        }
    }

    fn dispatch_indices(&self, type_name: &str) -> Vec<usize> {
        let mut indices: Vec<usize> = Vec::new();
        if let Some(list) = self.dispatch.get(type_name) {
            indices.extend_from_slice(list);
        }
        if let Some(list) = self.dispatch.get("any") {
            indices.extend_from_slice(list);
        }
        indices.sort_unstable();
        indices.dedup();
        indices
    }

    fn report_spec(&mut self, location: LocationStep, message: String, suggest: Vec<String>) {
        let Some(severity) = self.spec_severity else {
            return;
        };
        let from = self.from_stack.last().cloned();
        self.collector.push(Problem {
            rule_id: "spec".to_string(),
            severity,
            message,
            suggest,
            location: vec![location],
            from,
        });
    }

    fn pattern(&mut self, source: &'static str) -> Regex {
        self.patterns
            .entry(source)
            .or_insert_with(|| Regex::new(source).expect("schema patterns are valid"))
            .clone()
    }
}

#[derive(Clone, Copy)]
enum Phase {
    Enter,
    Leave,
}

/// Suggestion candidates for an unexpected property: declared names within
/// a small edit distance.
fn closest_names(key: &str, shape: &ObjectShape) -> Vec<String> {
    let mut scored: Vec<(usize, &str)> = shape
        .properties
        .iter()
        .map(|p| (edit_distance(key, p.name), p.name))
        .filter(|(distance, _)| *distance <= 2)
        .collect();
    scored.sort();
    scored.into_iter().take(3).map(|(_, name)| name.to_string()).collect()
}

fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            current[j + 1] = substitution
                .min(previous[j + 1] + 1)
                .min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_pointer_handles_root() {
        assert_eq!(join_pointer("#/", "info"), "#/info");
        assert_eq!(join_pointer("#/info", "title"), "#/info/title");
        assert_eq!(join_pointer("#/paths", "/test"), "#/paths/~1test");
    }

    #[test]
    fn edit_distance_basics() {
        assert_eq!(edit_distance("summary", "summary"), 0);
        assert_eq!(edit_distance("sumary", "summary"), 1);
        assert_eq!(edit_distance("respnses", "responses"), 1);
        assert!(edit_distance("completely", "different") > 2);
    }

    #[test]
    fn closest_names_filters_by_distance() {
        let shape = ObjectShape {
            properties: vec![
                crate::schema::Property {
                    name: "summary",
                    type_name: "string",
                    required: false,
                },
                crate::schema::Property {
                    name: "description",
                    type_name: "string",
                    required: false,
                },
            ],
            extensions_allowed: true,
            pattern_properties: vec![],
            additional: None,
        };
        assert_eq!(closest_names("sumary", &shape), vec!["summary".to_string()]);
        assert!(closest_names("zzz", &shape).is_empty());
    }
}
