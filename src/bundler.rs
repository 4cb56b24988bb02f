//! Bundling, dereferencing, and normalization.
//!
//! All three modes rewrite the document graph into a single
//! `serde_yaml::Value` for emission, using the run's resolver cache:
//!
//! - **Bundle** moves every non-circular external ref target into the
//!   components section (`definitions` and friends on OAS 2), renaming on
//!   collision with a deterministic `-2`/`-3` suffix scheme, and rewrites
//!   use sites to local refs. Refs that cycle stay refs into the bundled
//!   components section.
//! - **Dereference** inlines every ref at its use site; a circular ref is
//!   fatal because the output could not be serialized.
//! - **Normalize** reorders the top-level keys into the canonical order
//!   without semantic change.
//!
//! Configured preprocessors run on the value before ref rewriting and
//! decorators after, so the lint walk never observes either.

use std::collections::HashMap;
use std::sync::Arc;

use regex::Regex;
use serde_yaml::Value;

use crate::config::{ResolvedStyleguide, ValueTransform};
use crate::error::{OaslintError, Result};
use crate::parser::{NodeKind, ParseNode};
use crate::resolver::{ref_target, RefResolver, ResolveOutcome};
use crate::schema::{registry, NodeShape, OasVersion, TypeRegistry};
use crate::source::Source;
use crate::Document;

/// Canonical top-level key order for OAS 3 documents.
const OAS3_KEY_ORDER: [&str; 11] = [
    "openapi",
    "info",
    "jsonSchemaDialect",
    "servers",
    "security",
    "tags",
    "externalDocs",
    "paths",
    "webhooks",
    "x-webhooks",
    "components",
];

/// Canonical top-level key order for OAS 2 documents.
const OAS2_KEY_ORDER: [&str; 15] = [
    "swagger",
    "info",
    "host",
    "basePath",
    "schemes",
    "consumes",
    "produces",
    "security",
    "tags",
    "externalDocs",
    "paths",
    "definitions",
    "parameters",
    "responses",
    "securityDefinitions",
];

/// Reorder a document's top-level keys into the canonical order.
/// Unlisted keys keep their relative order after the canonical ones.
pub fn normalize(document: &Document) -> Result<Value> {
    let version = require_version(document)?;
    let value = document.source.root.to_yaml_value();
    Ok(reorder_top_level(value, version))
}

fn reorder_top_level(value: Value, version: OasVersion) -> Value {
    let Value::Mapping(mapping) = value else {
        return value;
    };
    let order: &[&str] = match version {
        OasVersion::Oas2 => &OAS2_KEY_ORDER,
        OasVersion::Oas3_0 | OasVersion::Oas3_1 => &OAS3_KEY_ORDER,
    };
    let mut result = serde_yaml::Mapping::new();
    for key in order {
        if let Some(entry) = mapping.get(*key) {
            result.insert(Value::String((*key).to_string()), entry.clone());
        }
    }
    for (key, entry) in &mapping {
        let listed = key.as_str().map_or(false, |k| order.contains(&k));
        if !listed {
            result.insert(key.clone(), entry.clone());
        }
    }
    Value::Mapping(result)
}

/// Inline every ref at its use site. Circular refs are fatal.
pub fn dereference(document: &Document, resolver: &RefResolver<'_>) -> Result<Value> {
    require_version(document)?;
    let source = &document.source;
    let mut active = Vec::new();
    deref_node(&source.root, source, resolver, &mut active)
}

fn deref_node(
    node: &ParseNode,
    source: &Arc<Source>,
    resolver: &RefResolver<'_>,
    active: &mut Vec<(String, String)>,
) -> Result<Value> {
    if let Some(reference) = ref_target(node) {
        match resolver.resolve(source, reference) {
            ResolveOutcome::Resolved(resolved) => {
                let key = (resolved.source.uri.clone(), resolved.pointer.clone());
                if active.contains(&key) {
                    return Err(OaslintError::CircularJsonNotSupported {
                        pointer: resolved.pointer,
                    });
                }
                let Some(target) = resolved.node() else {
                    return Ok(node.to_yaml_value());
                };
                active.push(key);
                let value = deref_node(target, &resolved.source, resolver, active);
                active.pop();
                return value;
            }
            ResolveOutcome::Circular { pointer, .. } => {
                return Err(OaslintError::CircularJsonNotSupported { pointer });
            }
            // An unresolved ref is a lint problem, not an emission one;
            // emit the site verbatim.
            ResolveOutcome::Failed(_) => return Ok(node.to_yaml_value()),
        }
    }
    match &node.kind {
        NodeKind::Mapping(entries) => {
            let mut mapping = serde_yaml::Mapping::new();
            for entry in entries {
                mapping.insert(
                    Value::String(entry.key.clone()),
                    deref_node(&entry.value, source, resolver, active)?,
                );
            }
            Ok(Value::Mapping(mapping))
        }
        NodeKind::Sequence(items) => {
            let mut sequence = Vec::with_capacity(items.len());
            for item in items {
                sequence.push(deref_node(item, source, resolver, active)?);
            }
            Ok(Value::Sequence(sequence))
        }
        NodeKind::Scalar(_) => Ok(node.to_yaml_value()),
    }
}

/// Bundle external refs into the components section and rewrite use
/// sites to local refs. Optionally applies the styleguide's
/// preprocessors before and decorators after.
pub fn bundle(
    document: &Document,
    resolver: &RefResolver<'_>,
    styleguide: Option<&ResolvedStyleguide>,
) -> Result<Value> {
    let version = require_version(document)?;
    let source = &document.source;

    let mut bundler = Bundler {
        registry: registry(version),
        version,
        resolver,
        root_uri: source.uri.clone(),
        components: Vec::new(),
        allocated: HashMap::new(),
        taken_names: seed_taken_names(&source.root, version),
        patterns: HashMap::new(),
    };

    let mut value = bundler.rewrite(&source.root, source, "Root")?;

    for (section, name, component) in std::mem::take(&mut bundler.components) {
        insert_component(&mut value, version, &section, &name, component);
    }
    let mut value = reorder_top_level(value, version);

    if let Some(styleguide) = styleguide {
        for transform in transforms(styleguide, &styleguide.preprocessors)? {
            transform(&mut value);
        }
        for transform in transforms(styleguide, &styleguide.decorators)? {
            transform(&mut value);
        }
    }
    Ok(value)
}

fn require_version(document: &Document) -> Result<OasVersion> {
    document.version.ok_or_else(|| OaslintError::SourceError {
        uri: document.source.uri.clone(),
        message: "document has no supported `openapi` or `swagger` version".to_string(),
    })
}

/// Collect the configured transforms, resolving `<pluginId>/<name>`
/// entries against the styleguide's plugins. `off` entries are skipped.
fn transforms(
    styleguide: &ResolvedStyleguide,
    declarations: &[(String, crate::config::RuleDecl)],
) -> Result<Vec<ValueTransform>> {
    let mut result = Vec::new();
    for (id, decl) in declarations {
        if decl.severity.is_none() {
            continue;
        }
        let Some((plugin_id, name)) = id.split_once('/') else {
            return Err(OaslintError::ConfigError {
                message: format!(
                    "Transform {} is not namespaced; expected `<pluginId>/<name>`",
                    crate::config::highlight(id)
                ),
            });
        };
        let Some(plugin) = styleguide.plugins.iter().find(|p| p.id == plugin_id) else {
            return Err(OaslintError::ConfigError {
                message: format!(
                    "Plugin {} is not listed in this styleguide's plugins",
                    crate::config::highlight(plugin_id)
                ),
            });
        };
        let found = plugin
            .preprocessors
            .iter()
            .chain(plugin.decorators.iter())
            .find(|t| t.name == name);
        let Some(transform) = found else {
            return Err(OaslintError::ConfigError {
                message: format!(
                    "Plugin {} doesn't export a preprocessor or decorator with name {}",
                    plugin_id, name
                ),
            });
        };
        result.push(Arc::clone(&transform.transform));
    }
    Ok(result)
}

struct Bundler<'r> {
    registry: &'static TypeRegistry,
    version: OasVersion,
    resolver: &'r RefResolver<'r>,
    root_uri: String,
    /// Components to graft in, in allocation order.
    components: Vec<(String, String, Value)>,
    /// Target `(uri, pointer)` to its allocated `(section, name)`.
    allocated: HashMap<(String, String), (String, String)>,
    /// Names already used per section (seeded from the root document).
    taken_names: HashMap<String, Vec<String>>,
    patterns: HashMap<&'static str, Regex>,
}

impl Bundler<'_> {
    fn rewrite(&mut self, node: &ParseNode, source: &Arc<Source>, type_name: &str) -> Result<Value> {
        let shape = self.registry.get(type_name).map(|t| &t.shape);

        if let Some(shape) = shape {
            if !matches!(shape, NodeShape::Any | NodeShape::Scalar(_)) {
                if let Some(reference) = ref_target(node) {
                    // A local ref in the root document stays put.
                    if reference.starts_with('#') && source.uri == self.root_uri {
                        return Ok(node.to_yaml_value());
                    }
                    let reference = reference.to_string();
                    return self.rewrite_ref(node, source, type_name, &reference);
                }
            }
        }

        match (shape, &node.kind) {
            (Some(NodeShape::Union(union)), _) => match union.pick(node) {
                Some(variant) => self.rewrite(node, source, variant),
                None => Ok(node.to_yaml_value()),
            },
            (Some(NodeShape::Object(object)), NodeKind::Mapping(entries)) => {
                let mut mapping = serde_yaml::Mapping::new();
                for entry in entries {
                    let child_type = if let Some(p) = object.property(&entry.key) {
                        Some(p.type_name)
                    } else if entry.key.starts_with("x-") {
                        None
                    } else {
                        object
                            .pattern_properties
                            .iter()
                            .find(|(pattern, _)| self.pattern(pattern).is_match(&entry.key))
                            .map(|(_, t)| *t)
                            .or(object.additional)
                    };
                    let child = match child_type {
                        Some(child_type) => self.rewrite(&entry.value, source, child_type)?,
                        None => entry.value.to_yaml_value(),
                    };
                    mapping.insert(Value::String(entry.key.clone()), child);
                }
                Ok(Value::Mapping(mapping))
            }
            (Some(NodeShape::MapOf(map)), NodeKind::Mapping(entries)) => {
                let value_type = map.value_type;
                let mut mapping = serde_yaml::Mapping::new();
                for entry in entries {
                    mapping.insert(
                        Value::String(entry.key.clone()),
                        self.rewrite(&entry.value, source, value_type)?,
                    );
                }
                Ok(Value::Mapping(mapping))
            }
            (Some(NodeShape::Array(item_type)), NodeKind::Sequence(items)) => {
                let mut sequence = Vec::with_capacity(items.len());
                for item in items {
                    sequence.push(self.rewrite(item, source, item_type)?);
                }
                Ok(Value::Sequence(sequence))
            }
            _ => Ok(node.to_yaml_value()),
        }
    }

    fn rewrite_ref(
        &mut self,
        node: &ParseNode,
        source: &Arc<Source>,
        type_name: &str,
        reference: &str,
    ) -> Result<Value> {
        let resolved = match self.resolver.resolve(source, reference) {
            ResolveOutcome::Resolved(resolved) => resolved,
            // Unresolved and statically-circular refs are left verbatim.
            ResolveOutcome::Circular { .. } | ResolveOutcome::Failed(_) => {
                return Ok(node.to_yaml_value())
            }
        };

        let Some(section) = section_for(type_name, self.version) else {
            // No components home for this type; inline at the use site.
            let Some(target) = resolved.node() else {
                return Ok(node.to_yaml_value());
            };
            return self.rewrite(target, &resolved.source, type_name);
        };

        let target_key = (resolved.source.uri.clone(), resolved.pointer.clone());
        if let Some((section, name)) = self.allocated.get(&target_key) {
            return Ok(local_ref(section, name, self.version));
        }

        let name = self.allocate_name(&section, &resolved.pointer);
        self.allocated
            .insert(target_key, (section.clone(), name.clone()));

        let Some(target) = resolved.node() else {
            return Ok(node.to_yaml_value());
        };
        // A ref cycling back to this target mid-rewrite finds it in
        // `allocated` and emits the local ref instead of recursing.
        let content = self.rewrite(target, &resolved.source, type_name)?;
        self.components.push((section.clone(), name.clone(), content));

        Ok(local_ref(&section, &name, self.version))
    }

    fn allocate_name(&mut self, section: &str, pointer: &str) -> String {
        let base = pointer
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or("component")
            .replace(['~', '#'], "");
        let taken = self.taken_names.entry(section.to_string()).or_default();
        let mut candidate = base.clone();
        let mut counter = 2;
        while taken.contains(&candidate) {
            candidate = format!("{}-{}", base, counter);
            counter += 1;
        }
        taken.push(candidate.clone());
        candidate
    }

    fn pattern(&mut self, source: &'static str) -> Regex {
        self.patterns
            .entry(source)
            .or_insert_with(|| Regex::new(source).expect("schema patterns are valid"))
            .clone()
    }
}

/// Components section for a bundled target of the given type.
fn section_for(type_name: &str, version: OasVersion) -> Option<String> {
    let section = match version {
        OasVersion::Oas2 => match type_name {
            "Schema" => "definitions",
            "Parameter" | "BodyParameter" | "NonBodyParameter" => "parameters",
            "Response" => "responses",
            _ => return None,
        },
        OasVersion::Oas3_0 | OasVersion::Oas3_1 => match type_name {
            "Schema" => "schemas",
            "Response" => "responses",
            "Parameter" => "parameters",
            "Example" => "examples",
            "RequestBody" => "requestBodies",
            "Header" => "headers",
            "SecurityScheme"
            | "ApiKeySecurityScheme"
            | "HttpSecurityScheme"
            | "OAuth2SecurityScheme"
            | "OpenIdSecurityScheme"
            | "MutualTlsSecurityScheme" => "securitySchemes",
            "Link" => "links",
            "Callback" => "callbacks",
            "PathItem" if version == OasVersion::Oas3_1 => "pathItems",
            _ => return None,
        },
    };
    Some(section.to_string())
}

fn local_ref(section: &str, name: &str, version: OasVersion) -> Value {
    let pointer = match version {
        OasVersion::Oas2 => format!(
            "#/{}/{}",
            section,
            crate::source::escape_pointer_segment(name)
        ),
        _ => format!(
            "#/components/{}/{}",
            section,
            crate::source::escape_pointer_segment(name)
        ),
    };
    let mut mapping = serde_yaml::Mapping::new();
    mapping.insert(Value::String("$ref".to_string()), Value::String(pointer));
    Value::Mapping(mapping)
}

/// Names already present in the root's components, per section.
fn seed_taken_names(root: &ParseNode, version: OasVersion) -> HashMap<String, Vec<String>> {
    let mut taken: HashMap<String, Vec<String>> = HashMap::new();
    let mut record = |section: &str, container: Option<&ParseNode>| {
        if let Some(entries) = container.and_then(|n| n.entries()) {
            taken.insert(
                section.to_string(),
                entries.iter().map(|e| e.key.clone()).collect(),
            );
        }
    };
    match version {
        OasVersion::Oas2 => {
            for section in ["definitions", "parameters", "responses"] {
                record(section, root.get(section));
            }
        }
        _ => {
            if let Some(components) = root.get("components") {
                for section in [
                    "schemas",
                    "responses",
                    "parameters",
                    "examples",
                    "requestBodies",
                    "headers",
                    "securitySchemes",
                    "links",
                    "callbacks",
                    "pathItems",
                ] {
                    record(section, components.get(section));
                }
            }
        }
    }
    taken
}

fn insert_component(
    value: &mut Value,
    version: OasVersion,
    section: &str,
    name: &str,
    component: Value,
) {
    let Value::Mapping(root) = value else {
        return;
    };
    let section_map = match version {
        OasVersion::Oas2 => root
            .entry(Value::String(section.to_string()))
            .or_insert_with(|| Value::Mapping(Default::default())),
        _ => {
            let components = root
                .entry(Value::String("components".to_string()))
                .or_insert_with(|| Value::Mapping(Default::default()));
            let Value::Mapping(components) = components else {
                return;
            };
            components
                .entry(Value::String(section.to_string()))
                .or_insert_with(|| Value::Mapping(Default::default()))
        }
    };
    if let Value::Mapping(section_map) = section_map {
        section_map.insert(Value::String(name.to_string()), component);
    }
}

/// Serialize an emission value as YAML.
pub fn to_yaml_string(value: &Value) -> Result<String> {
    serde_yaml::to_string(value).map_err(|e| OaslintError::Other(e.into()))
}

/// Serialize an emission value as JSON, preserving key order.
pub fn to_json_string(value: &Value) -> Result<String> {
    let json = yaml_to_json(value);
    serde_json::to_string_pretty(&json).map_err(|e| OaslintError::Other(e.into()))
}

fn yaml_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                serde_json::Value::Number(i.into())
            } else if let Some(u) = n.as_u64() {
                serde_json::Value::Number(u.into())
            } else {
                serde_json::Number::from_f64(n.as_f64().unwrap_or(0.0))
                    .map(serde_json::Value::Number)
                    .unwrap_or(serde_json::Value::Null)
            }
        }
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Sequence(items) => {
            serde_json::Value::Array(items.iter().map(yaml_to_json).collect())
        }
        Value::Mapping(mapping) => {
            let mut object = serde_json::Map::new();
            for (key, entry) in mapping {
                let key = match key.as_str() {
                    Some(s) => s.to_string(),
                    None => serde_yaml::to_string(key).unwrap_or_default().trim().to_string(),
                };
                object.insert(key, yaml_to_json(entry));
            }
            serde_json::Value::Object(object)
        }
        Value::Tagged(tagged) => yaml_to_json(&tagged.value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceStore;

    fn document(store: &SourceStore, uri: &str, text: &str) -> Document {
        Document::from_source(store.open_inline(uri, text).unwrap())
    }

    #[test]
    fn normalize_orders_top_level_keys() {
        let store = SourceStore::new();
        let doc = document(
            &store,
            "doc.yaml",
            "paths: {}\ninfo: {title: T, version: '1'}\nopenapi: 3.0.0\nservers: []\n",
        );
        let value = normalize(&doc).unwrap();
        let keys: Vec<_> = value
            .as_mapping()
            .unwrap()
            .keys()
            .filter_map(|k| k.as_str())
            .collect();
        assert_eq!(keys, vec!["openapi", "info", "servers", "paths"]);
    }

    #[test]
    fn normalize_keeps_unlisted_keys_after_canonical_ones() {
        let store = SourceStore::new();
        let doc = document(
            &store,
            "doc.yaml",
            "x-custom: 1\nopenapi: 3.0.0\ninfo: {title: T, version: '1'}\npaths: {}\n",
        );
        let value = normalize(&doc).unwrap();
        let keys: Vec<_> = value
            .as_mapping()
            .unwrap()
            .keys()
            .filter_map(|k| k.as_str())
            .collect();
        assert_eq!(keys, vec!["openapi", "info", "paths", "x-custom"]);
    }

    #[test]
    fn dereference_inlines_external_refs() {
        let store = SourceStore::new();
        store
            .open_inline("common.yaml", "Pet:\n  type: object\n")
            .unwrap();
        let doc = document(
            &store,
            "root.yaml",
            r#"
openapi: 3.0.0
info: {title: T, version: '1'}
paths:
  /pets:
    get:
      responses:
        '200':
          description: ok
          content:
            application/json:
              schema:
                $ref: 'common.yaml#/Pet'
"#,
        );
        let resolver = RefResolver::new(&store);
        let value = dereference(&doc, &resolver).unwrap();
        let schema = &value["paths"]["/pets"]["get"]["responses"]["200"]["content"]
            ["application/json"]["schema"];
        assert_eq!(schema["type"], "object");
        assert!(schema.get("$ref").is_none());
    }

    #[test]
    fn dereference_rejects_circular_refs() {
        let store = SourceStore::new();
        let doc = document(
            &store,
            "root.yaml",
            r#"
openapi: 3.0.0
info: {title: T, version: '1'}
paths: {}
components:
  schemas:
    Node:
      type: object
      properties:
        next:
          $ref: '#/components/schemas/Node'
"#,
        );
        let resolver = RefResolver::new(&store);
        let result = dereference(&doc, &resolver);
        assert!(matches!(
            result,
            Err(OaslintError::CircularJsonNotSupported { .. })
        ));
    }

    #[test]
    fn bundle_moves_external_schema_into_components() {
        let store = SourceStore::new();
        store
            .open_inline("common.yaml", "Pet:\n  type: object\n")
            .unwrap();
        let doc = document(
            &store,
            "root.yaml",
            r#"
openapi: 3.0.0
info: {title: T, version: '1'}
paths:
  /pets:
    get:
      responses:
        '200':
          description: ok
          content:
            application/json:
              schema:
                $ref: 'common.yaml#/Pet'
"#,
        );
        let resolver = RefResolver::new(&store);
        let value = bundle(&doc, &resolver, None).unwrap();
        assert_eq!(
            value["paths"]["/pets"]["get"]["responses"]["200"]["content"]["application/json"]
                ["schema"]["$ref"],
            "#/components/schemas/Pet"
        );
        assert_eq!(value["components"]["schemas"]["Pet"]["type"], "object");
    }

    #[test]
    fn bundle_renames_on_collision() {
        let store = SourceStore::new();
        store
            .open_inline("other.yaml", "Pet:\n  type: string\n")
            .unwrap();
        let doc = document(
            &store,
            "root.yaml",
            r#"
openapi: 3.0.0
info: {title: T, version: '1'}
paths: {}
components:
  schemas:
    Pet:
      type: object
    External:
      $ref: 'other.yaml#/Pet'
"#,
        );
        let resolver = RefResolver::new(&store);
        let value = bundle(&doc, &resolver, None).unwrap();
        assert_eq!(
            value["components"]["schemas"]["External"]["$ref"],
            "#/components/schemas/Pet-2"
        );
        assert_eq!(value["components"]["schemas"]["Pet-2"]["type"], "string");
        assert_eq!(value["components"]["schemas"]["Pet"]["type"], "object");
    }

    #[test]
    fn bundle_shares_one_component_for_repeated_targets() {
        let store = SourceStore::new();
        store
            .open_inline("common.yaml", "Pet:\n  type: object\n")
            .unwrap();
        let doc = document(
            &store,
            "root.yaml",
            r#"
openapi: 3.0.0
info: {title: T, version: '1'}
paths: {}
components:
  schemas:
    A:
      $ref: 'common.yaml#/Pet'
    B:
      $ref: 'common.yaml#/Pet'
"#,
        );
        let resolver = RefResolver::new(&store);
        let value = bundle(&doc, &resolver, None).unwrap();
        assert_eq!(
            value["components"]["schemas"]["A"]["$ref"],
            value["components"]["schemas"]["B"]["$ref"]
        );
    }

    #[test]
    fn json_emission_preserves_key_order() {
        let value: Value = serde_yaml::from_str("b: 1\na: 2\n").unwrap();
        let json = to_json_string(&value).unwrap();
        assert!(json.find("\"b\"").unwrap() < json.find("\"a\"").unwrap());
    }
}
