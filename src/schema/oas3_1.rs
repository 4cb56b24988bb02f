//! Node type table for OpenAPI 3.1, derived from the 3.0 table.
//!
//! Differences that matter to linting: the root requires only one of
//! `paths`/`components`/`webhooks`; `type` accepts a list of primitive
//! names including `null`; `nullable` is gone; schemas gain the 2020-12
//! JSON Schema keywords; `license` accepts an SPDX `identifier`.

use super::oas3_0::{self, COMPONENT_KEY_PATTERN};
use super::{NodeType, TypeRegistry, UnionBy, UnionVariant, VariantMatch};

pub fn types() -> Vec<NodeType> {
    let mut types = oas3_0::types();

    TypeRegistry::replace(
        &mut types,
        NodeType::object("Root")
            .required("openapi", "string")
            .required("info", "Info")
            .field("jsonSchemaDialect", "string")
            .field("servers", "ServerList")
            .field("security", "SecurityRequirementList")
            .field("tags", "TagList")
            .field("externalDocs", "ExternalDocs")
            .field("paths", "Paths")
            .field("webhooks", "WebhooksMap")
            .field("components", "Components")
            .require_any_of(&["paths", "components", "webhooks"]),
    );
    TypeRegistry::replace(&mut types, NodeType::map_of("WebhooksMap", "PathItem"));

    TypeRegistry::replace(
        &mut types,
        NodeType::object("Info")
            .required("title", "string")
            .required("version", "string")
            .field("summary", "string")
            .field("description", "string")
            .field("termsOfService", "string")
            .field("contact", "Contact")
            .field("license", "License"),
    );
    TypeRegistry::replace(
        &mut types,
        NodeType::object("License")
            .required("name", "string")
            .field("identifier", "string")
            .field("url", "string"),
    );

    TypeRegistry::replace(
        &mut types,
        NodeType::object("Components")
            .field("schemas", "NamedSchemas")
            .field("responses", "NamedResponses")
            .field("parameters", "NamedParameters")
            .field("examples", "NamedExamples")
            .field("requestBodies", "NamedRequestBodies")
            .field("headers", "NamedHeaders")
            .field("securitySchemes", "NamedSecuritySchemes")
            .field("links", "NamedLinks")
            .field("callbacks", "NamedCallbacks")
            .field("pathItems", "NamedPathItems"),
    );
    TypeRegistry::replace(
        &mut types,
        NodeType::map_of("NamedPathItems", "PathItem").key_pattern(COMPONENT_KEY_PATTERN),
    );

    // `type` is a primitive name or a list of them, now including `null`.
    TypeRegistry::replace(
        &mut types,
        NodeType::union(
            "SchemaType",
            UnionBy::Shape,
            vec![
                UnionVariant {
                    when: VariantMatch::NodeIsSequence,
                    type_name: "SchemaTypeList",
                },
                UnionVariant {
                    when: VariantMatch::Fallback,
                    type_name: "SchemaTypeValue",
                },
            ],
        ),
    );
    TypeRegistry::replace(
        &mut types,
        NodeType::array_of("SchemaTypeList", "SchemaTypeValue"),
    );
    TypeRegistry::replace(
        &mut types,
        NodeType::string_enum(
            "SchemaTypeValue",
            &[
                "object", "array", "string", "number", "integer", "boolean", "null",
            ],
        ),
    );

    TypeRegistry::replace(&mut types, schema_3_1());
    TypeRegistry::replace(
        &mut types,
        NodeType::map_of("DependentSchemasMap", "Schema"),
    );
    TypeRegistry::replace(
        &mut types,
        NodeType::map_of("DependentRequiredMap", "StringList"),
    );

    // mutualTLS joins the security scheme discriminants.
    TypeRegistry::replace(
        &mut types,
        NodeType::union(
            "SecurityScheme",
            UnionBy::Discriminator,
            vec![
                UnionVariant {
                    when: VariantMatch::FieldEquals("type", "apiKey"),
                    type_name: "ApiKeySecurityScheme",
                },
                UnionVariant {
                    when: VariantMatch::FieldEquals("type", "http"),
                    type_name: "HttpSecurityScheme",
                },
                UnionVariant {
                    when: VariantMatch::FieldEquals("type", "oauth2"),
                    type_name: "OAuth2SecurityScheme",
                },
                UnionVariant {
                    when: VariantMatch::FieldEquals("type", "openIdConnect"),
                    type_name: "OpenIdSecurityScheme",
                },
                UnionVariant {
                    when: VariantMatch::FieldEquals("type", "mutualTLS"),
                    type_name: "MutualTlsSecurityScheme",
                },
            ],
        ),
    );
    TypeRegistry::replace(
        &mut types,
        NodeType::object("MutualTlsSecurityScheme")
            .required("type", "SecuritySchemeType31")
            .field("description", "string"),
    );
    TypeRegistry::replace(
        &mut types,
        NodeType::string_enum(
            "SecuritySchemeType31",
            &["apiKey", "http", "oauth2", "openIdConnect", "mutualTLS"],
        ),
    );

    types
}

fn schema_3_1() -> NodeType {
    NodeType::object("Schema")
        .field("$id", "string")
        .field("$schema", "string")
        .field("$defs", "SchemaMap")
        .field("$comment", "string")
        .field("title", "string")
        .field("multipleOf", "number")
        .field("maximum", "number")
        .field("exclusiveMaximum", "number")
        .field("minimum", "number")
        .field("exclusiveMinimum", "number")
        .field("maxLength", "integer")
        .field("minLength", "integer")
        .field("pattern", "string")
        .field("maxItems", "integer")
        .field("minItems", "integer")
        .field("uniqueItems", "boolean")
        .field("maxProperties", "integer")
        .field("minProperties", "integer")
        .field("required", "StringList")
        .field("enum", "AnyList")
        .field("const", "any")
        .field("type", "SchemaType")
        .field("allOf", "SchemaList")
        .field("oneOf", "SchemaList")
        .field("anyOf", "SchemaList")
        .field("not", "Schema")
        .field("if", "Schema")
        .field("then", "Schema")
        .field("else", "Schema")
        .field("items", "Schema")
        .field("prefixItems", "SchemaList")
        .field("contains", "Schema")
        .field("maxContains", "integer")
        .field("minContains", "integer")
        .field("properties", "SchemaMap")
        .field("patternProperties", "SchemaMap")
        .field("additionalProperties", "SchemaOrBool")
        .field("unevaluatedProperties", "SchemaOrBool")
        .field("unevaluatedItems", "SchemaOrBool")
        .field("propertyNames", "Schema")
        .field("dependentSchemas", "DependentSchemasMap")
        .field("dependentRequired", "DependentRequiredMap")
        .field("contentEncoding", "string")
        .field("contentMediaType", "string")
        .field("contentSchema", "Schema")
        .field("description", "string")
        .field("format", "string")
        .field("default", "any")
        .field("discriminator", "Discriminator")
        .field("readOnly", "boolean")
        .field("writeOnly", "boolean")
        .field("xml", "Xml")
        .field("externalDocs", "ExternalDocs")
        .field("example", "any")
        .field("examples", "AnyList")
        .field("deprecated", "boolean")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::NodeShape;

    fn find<'a>(types: &'a [NodeType], name: &str) -> &'a NodeType {
        types.iter().find(|t| t.name == name).unwrap()
    }

    #[test]
    fn root_allows_webhooks_only_documents() {
        let types = types();
        let root = find(&types, "Root");
        let NodeShape::Object(shape) = &root.shape else {
            panic!("Root is an object");
        };
        assert!(!shape.property("paths").map_or(false, |p| p.required));
        assert!(shape.property("webhooks").is_some());
        assert_eq!(root.shape_rules.len(), 1);
    }

    #[test]
    fn schema_type_allows_null_in_list() {
        let types = types();
        let value = find(&types, "SchemaTypeValue");
        let NodeShape::Scalar(shape) = &value.shape else {
            panic!("SchemaTypeValue is a scalar");
        };
        assert!(shape.enum_values.as_ref().unwrap().contains(&"null"));
    }

    #[test]
    fn schema_drops_nullable() {
        let types = types();
        let schema = find(&types, "Schema");
        let NodeShape::Object(shape) = &schema.shape else {
            panic!("Schema is an object");
        };
        assert!(shape.property("nullable").is_none());
        assert!(shape.property("const").is_some());
        assert!(shape.property("prefixItems").is_some());
    }
}
