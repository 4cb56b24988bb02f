//! Typed schema registry.
//!
//! For each OpenAPI version there is a table of [`NodeType`]s keyed by name.
//! A `NodeType` describes the *expected shape* of a value at a point in the
//! document: an object with known properties, a free-form map, an array, a
//! scalar, or a union. Child edges reference other types lazily *by name*, so
//! recursive types (`Schema` through `allOf`) need no special casing.
//!
//! Version tables live in [`oas2`], [`oas3_0`], and [`oas3_1`]; the 3.1 table
//! is derived from 3.0 by patching the handful of types that changed.

pub mod oas2;
pub mod oas3_0;
pub mod oas3_1;

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::parser::{NodeKind, ParseNode, ScalarValue};

/// OpenAPI specification version of a document.
///
/// Fixed at first inspection of the root and used to select the type
/// registry for the whole walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OasVersion {
    Oas2,
    Oas3_0,
    Oas3_1,
}

impl OasVersion {
    /// Detect the version from a parsed root node.
    pub fn detect(root: &ParseNode) -> Option<Self> {
        if let Some(swagger) = root.get("swagger") {
            // `swagger: 2.0` without quotes scans as a float.
            let is_2_0 = match &swagger.kind {
                NodeKind::Scalar(ScalarValue::String(s)) => s == "2.0",
                NodeKind::Scalar(ScalarValue::Float(f)) => *f == 2.0,
                _ => false,
            };
            return is_2_0.then_some(OasVersion::Oas2);
        }
        let openapi = root.get("openapi")?.as_str()?;
        if openapi.starts_with("3.0") {
            Some(OasVersion::Oas3_0)
        } else if openapi.starts_with("3.1") {
            Some(OasVersion::Oas3_1)
        } else {
            None
        }
    }

    /// Human-readable version name.
    pub fn name(&self) -> &'static str {
        match self {
            OasVersion::Oas2 => "OpenAPI 2.0",
            OasVersion::Oas3_0 => "OpenAPI 3.0",
            OasVersion::Oas3_1 => "OpenAPI 3.1",
        }
    }
}

/// Primitive kinds a scalar type can require.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    String,
    Number,
    Integer,
    Boolean,
    Any,
}

impl ScalarKind {
    /// Whether a parsed scalar satisfies this kind.
    pub fn matches(&self, value: &ScalarValue) -> bool {
        match self {
            ScalarKind::String => matches!(value, ScalarValue::String(_)),
            ScalarKind::Number => matches!(value, ScalarValue::Int(_) | ScalarValue::Float(_)),
            ScalarKind::Integer => matches!(value, ScalarValue::Int(_)),
            ScalarKind::Boolean => matches!(value, ScalarValue::Bool(_)),
            ScalarKind::Any => true,
        }
    }

    /// Name used in problem messages.
    pub fn name(&self) -> &'static str {
        match self {
            ScalarKind::String => "string",
            ScalarKind::Number => "number",
            ScalarKind::Integer => "integer",
            ScalarKind::Boolean => "boolean",
            ScalarKind::Any => "any",
        }
    }
}

/// A named property of an object type.
#[derive(Debug, Clone)]
pub struct Property {
    pub name: &'static str,
    pub type_name: &'static str,
    pub required: bool,
}

/// Shape of an object type: known properties, extension policy, and
/// optional pattern/additional property typing.
#[derive(Debug, Clone, Default)]
pub struct ObjectShape {
    pub properties: Vec<Property>,
    /// Whether `x-*` fields are allowed (typed `any` unless registered).
    pub extensions_allowed: bool,
    /// Pattern-matched properties: `(regex, value type)`.
    pub pattern_properties: Vec<(&'static str, &'static str)>,
    /// Type for properties not otherwise matched; `None` flags them.
    pub additional: Option<&'static str>,
}

impl ObjectShape {
    /// Find a declared property by name.
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }
}

/// Shape of a free-form map type.
#[derive(Debug, Clone)]
pub struct MapOfShape {
    pub value_type: &'static str,
    /// Optional regex every key must match.
    pub key_pattern: Option<&'static str>,
}

/// Shape of a scalar type.
#[derive(Debug, Clone)]
pub struct ScalarShape {
    pub kind: ScalarKind,
    /// Closed set of allowed string values, if any.
    pub enum_values: Option<Vec<&'static str>>,
}

/// How a union picks its variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnionBy {
    Discriminator,
    Shape,
}

/// One structural probe of a union variant. Probes run in order; the first
/// match selects the variant.
#[derive(Debug, Clone)]
pub enum VariantMatch {
    /// A named field equals a given string value.
    FieldEquals(&'static str, &'static str),
    /// A named field is present.
    FieldPresent(&'static str),
    /// The node is a sequence.
    NodeIsSequence,
    /// The node is a scalar.
    NodeIsScalar,
    /// Always matches.
    Fallback,
}

/// A union variant: a probe plus the type it selects.
#[derive(Debug, Clone)]
pub struct UnionVariant {
    pub when: VariantMatch,
    pub type_name: &'static str,
}

/// Shape of a union type.
#[derive(Debug, Clone)]
pub struct UnionShape {
    pub by: UnionBy,
    pub variants: Vec<UnionVariant>,
}

impl UnionShape {
    /// Pick the variant type for a node, if any probe matches.
    pub fn pick(&self, node: &ParseNode) -> Option<&'static str> {
        for variant in &self.variants {
            let matched = match &variant.when {
                VariantMatch::FieldEquals(field, value) => {
                    node.get(field).and_then(|n| n.as_str()) == Some(*value)
                }
                VariantMatch::FieldPresent(field) => node.has_key(field),
                VariantMatch::NodeIsSequence => matches!(node.kind, NodeKind::Sequence(_)),
                VariantMatch::NodeIsScalar => matches!(node.kind, NodeKind::Scalar(_)),
                VariantMatch::Fallback => true,
            };
            if matched {
                return Some(variant.type_name);
            }
        }
        None
    }
}

/// Expected shape of a value.
#[derive(Debug, Clone)]
pub enum NodeShape {
    Object(ObjectShape),
    MapOf(MapOfShape),
    Array(&'static str),
    Scalar(ScalarShape),
    Union(UnionShape),
    /// No expectations; traversal stops here.
    Any,
}

/// Presence constraints that go beyond per-property `required` flags,
/// reported with fixed messages.
#[derive(Debug, Clone)]
pub enum ShapeRule {
    /// At least one of the named fields must be present.
    RequireAnyOf {
        fields: Vec<&'static str>,
        message: String,
    },
    /// The mapping must have at least one entry.
    NonEmpty { message: String },
}

/// A named node type in a version's registry.
#[derive(Debug, Clone)]
pub struct NodeType {
    pub name: &'static str,
    pub shape: NodeShape,
    pub shape_rules: Vec<ShapeRule>,
}

impl NodeType {
    /// An object type; extensions allowed by default.
    pub fn object(name: &'static str) -> Self {
        Self {
            name,
            shape: NodeShape::Object(ObjectShape {
                extensions_allowed: true,
                ..Default::default()
            }),
            shape_rules: Vec::new(),
        }
    }

    /// A free-form map with typed values.
    pub fn map_of(name: &'static str, value_type: &'static str) -> Self {
        Self {
            name,
            shape: NodeShape::MapOf(MapOfShape {
                value_type,
                key_pattern: None,
            }),
            shape_rules: Vec::new(),
        }
    }

    /// An array with typed items.
    pub fn array_of(name: &'static str, item_type: &'static str) -> Self {
        Self {
            name,
            shape: NodeShape::Array(item_type),
            shape_rules: Vec::new(),
        }
    }

    /// A scalar of a primitive kind.
    pub fn scalar(name: &'static str, kind: ScalarKind) -> Self {
        Self {
            name,
            shape: NodeShape::Scalar(ScalarShape {
                kind,
                enum_values: None,
            }),
            shape_rules: Vec::new(),
        }
    }

    /// A string scalar restricted to a closed value set.
    pub fn string_enum(name: &'static str, values: &[&'static str]) -> Self {
        Self {
            name,
            shape: NodeShape::Scalar(ScalarShape {
                kind: ScalarKind::String,
                enum_values: Some(values.to_vec()),
            }),
            shape_rules: Vec::new(),
        }
    }

    /// A union type.
    pub fn union(name: &'static str, by: UnionBy, variants: Vec<UnionVariant>) -> Self {
        Self {
            name,
            shape: NodeShape::Union(UnionShape { by, variants }),
            shape_rules: Vec::new(),
        }
    }

    /// Add an optional property (object types only).
    pub fn field(mut self, name: &'static str, type_name: &'static str) -> Self {
        if let NodeShape::Object(shape) = &mut self.shape {
            shape.properties.push(Property {
                name,
                type_name,
                required: false,
            });
        }
        self
    }

    /// Add a required property (object types only).
    pub fn required(mut self, name: &'static str, type_name: &'static str) -> Self {
        if let NodeShape::Object(shape) = &mut self.shape {
            shape.properties.push(Property {
                name,
                type_name,
                required: true,
            });
        }
        self
    }

    /// Add a pattern property (object types only).
    pub fn pattern_field(mut self, pattern: &'static str, type_name: &'static str) -> Self {
        if let NodeShape::Object(shape) = &mut self.shape {
            shape.pattern_properties.push((pattern, type_name));
        }
        self
    }

    /// Type unmatched properties instead of flagging them.
    pub fn additional(mut self, type_name: &'static str) -> Self {
        if let NodeShape::Object(shape) = &mut self.shape {
            shape.additional = Some(type_name);
        }
        self
    }

    /// Disallow `x-*` extensions (object types only).
    pub fn no_extensions(mut self) -> Self {
        if let NodeShape::Object(shape) = &mut self.shape {
            shape.extensions_allowed = false;
        }
        self
    }

    /// Require every map key to match a regex (map types only).
    pub fn key_pattern(mut self, pattern: &'static str) -> Self {
        if let NodeShape::MapOf(shape) = &mut self.shape {
            shape.key_pattern = Some(pattern);
        }
        self
    }

    /// Require at least one of the named fields.
    pub fn require_any_of(mut self, fields: &[&'static str]) -> Self {
        let message = format!(
            "Must contain at least one of the following fields: {}.",
            fields.join(", ")
        );
        self.shape_rules.push(ShapeRule::RequireAnyOf {
            fields: fields.to_vec(),
            message,
        });
        self
    }

    /// Require the mapping to be non-empty.
    pub fn non_empty(mut self, message: &str) -> Self {
        self.shape_rules.push(ShapeRule::NonEmpty {
            message: message.to_string(),
        });
        self
    }
}

/// Table of node types for one OAS version.
pub struct TypeRegistry {
    version: OasVersion,
    types: HashMap<&'static str, NodeType>,
}

impl TypeRegistry {
    fn new(version: OasVersion, types: Vec<NodeType>) -> Self {
        let mut map = HashMap::new();
        for ty in primitives() {
            map.insert(ty.name, ty);
        }
        for ty in types {
            map.insert(ty.name, ty);
        }
        Self {
            version,
            types: map,
        }
    }

    /// The registry's version.
    pub fn version(&self) -> OasVersion {
        self.version
    }

    /// Resolve a type by name. Primitive names (`string`, `number`,
    /// `integer`, `boolean`, `any`) are always present.
    pub fn get(&self, name: &str) -> Option<&NodeType> {
        self.types.get(name)
    }

    /// The root document type.
    pub fn root_type(&self) -> &NodeType {
        self.types.get("Root").expect("registry has a Root type")
    }

    /// Replace (or add) a type; used by version tables that patch a base.
    pub(crate) fn replace(types: &mut Vec<NodeType>, replacement: NodeType) {
        if let Some(existing) = types.iter_mut().find(|t| t.name == replacement.name) {
            *existing = replacement;
        } else {
            types.push(replacement);
        }
    }
}

fn primitives() -> Vec<NodeType> {
    vec![
        NodeType::scalar("string", ScalarKind::String),
        NodeType::scalar("number", ScalarKind::Number),
        NodeType::scalar("integer", ScalarKind::Integer),
        NodeType::scalar("boolean", ScalarKind::Boolean),
        NodeType {
            name: "any",
            shape: NodeShape::Any,
            shape_rules: Vec::new(),
        },
    ]
}

static OAS2_REGISTRY: OnceLock<TypeRegistry> = OnceLock::new();
static OAS3_0_REGISTRY: OnceLock<TypeRegistry> = OnceLock::new();
static OAS3_1_REGISTRY: OnceLock<TypeRegistry> = OnceLock::new();

/// The registry for a version, built once per process.
pub fn registry(version: OasVersion) -> &'static TypeRegistry {
    match version {
        OasVersion::Oas2 => {
            OAS2_REGISTRY.get_or_init(|| TypeRegistry::new(version, oas2::types()))
        }
        OasVersion::Oas3_0 => {
            OAS3_0_REGISTRY.get_or_init(|| TypeRegistry::new(version, oas3_0::types()))
        }
        OasVersion::Oas3_1 => {
            OAS3_1_REGISTRY.get_or_init(|| TypeRegistry::new(version, oas3_1::types()))
        }
    }
}

/// Types shared verbatim between the version tables.
pub(crate) fn common_types() -> Vec<NodeType> {
    vec![
        NodeType::object("Info")
            .required("title", "string")
            .required("version", "string")
            .field("description", "string")
            .field("termsOfService", "string")
            .field("contact", "Contact")
            .field("license", "License"),
        NodeType::object("Contact")
            .field("name", "string")
            .field("url", "string")
            .field("email", "string"),
        NodeType::object("License")
            .required("name", "string")
            .field("url", "string"),
        NodeType::object("Tag")
            .required("name", "string")
            .field("description", "string")
            .field("externalDocs", "ExternalDocs"),
        NodeType::array_of("TagList", "Tag"),
        NodeType::object("ExternalDocs")
            .required("url", "string")
            .field("description", "string"),
        NodeType::map_of("SecurityRequirement", "StringList"),
        NodeType::array_of("SecurityRequirementList", "SecurityRequirement"),
        NodeType::array_of("StringList", "string"),
        NodeType::array_of("AnyList", "any"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn node(text: &str) -> ParseNode {
        parse(text).unwrap().0
    }

    #[test]
    fn detects_versions() {
        assert_eq!(
            OasVersion::detect(&node("swagger: '2.0'\n")),
            Some(OasVersion::Oas2)
        );
        assert_eq!(
            OasVersion::detect(&node("openapi: 3.0.3\n")),
            Some(OasVersion::Oas3_0)
        );
        assert_eq!(
            OasVersion::detect(&node("openapi: 3.1.0\n")),
            Some(OasVersion::Oas3_1)
        );
        assert_eq!(OasVersion::detect(&node("openapi: 4.0.0\n")), None);
        assert_eq!(OasVersion::detect(&node("title: nope\n")), None);
    }

    #[test]
    fn quoted_openapi_version_detects() {
        assert_eq!(
            OasVersion::detect(&node("openapi: '3.0.0'\n")),
            Some(OasVersion::Oas3_0)
        );
    }

    #[test]
    fn registries_expose_roots() {
        for version in [OasVersion::Oas2, OasVersion::Oas3_0, OasVersion::Oas3_1] {
            let reg = registry(version);
            assert_eq!(reg.root_type().name, "Root");
            assert!(reg.get("Schema").is_some());
            assert!(reg.get("string").is_some());
        }
    }

    #[test]
    fn scalar_kind_matching() {
        use crate::parser::ScalarValue;
        assert!(ScalarKind::Number.matches(&ScalarValue::Int(1)));
        assert!(ScalarKind::Number.matches(&ScalarValue::Float(1.5)));
        assert!(!ScalarKind::Integer.matches(&ScalarValue::Float(1.5)));
        assert!(!ScalarKind::String.matches(&ScalarValue::Bool(true)));
        assert!(ScalarKind::Any.matches(&ScalarValue::Null));
    }

    #[test]
    fn union_picks_by_field_value() {
        let union = UnionShape {
            by: UnionBy::Discriminator,
            variants: vec![
                UnionVariant {
                    when: VariantMatch::FieldEquals("in", "body"),
                    type_name: "BodyParameter",
                },
                UnionVariant {
                    when: VariantMatch::Fallback,
                    type_name: "NonBodyParameter",
                },
            ],
        };
        assert_eq!(
            union.pick(&node("in: body\nname: payload\n")),
            Some("BodyParameter")
        );
        assert_eq!(
            union.pick(&node("in: query\nname: q\n")),
            Some("NonBodyParameter")
        );
    }

    #[test]
    fn union_picks_by_node_shape() {
        let union = UnionShape {
            by: UnionBy::Shape,
            variants: vec![
                UnionVariant {
                    when: VariantMatch::NodeIsSequence,
                    type_name: "SchemaTypeList",
                },
                UnionVariant {
                    when: VariantMatch::NodeIsScalar,
                    type_name: "SchemaTypeValue",
                },
            ],
        };
        assert_eq!(union.pick(&node("- string\n- 'null'\n")), Some("SchemaTypeList"));
        assert_eq!(union.pick(&node("string")), Some("SchemaTypeValue"));
        assert_eq!(union.pick(&node("a: 1\n")), None);
    }
}
