//! Node type table for OpenAPI 2.0 (Swagger).

use super::oas3_0::RESPONSE_CODE_PATTERN;
use super::{common_types, NodeType, UnionBy, UnionVariant, VariantMatch};

pub fn types() -> Vec<NodeType> {
    let mut types = common_types();
    types.extend(vec![
        NodeType::object("Root")
            .required("swagger", "SwaggerVersion")
            .required("info", "Info")
            .required("paths", "Paths")
            .field("host", "string")
            .field("basePath", "string")
            .field("schemes", "SchemesList")
            .field("consumes", "StringList")
            .field("produces", "StringList")
            .field("definitions", "NamedSchemas")
            .field("parameters", "NamedParameters")
            .field("responses", "NamedResponses")
            .field("securityDefinitions", "NamedSecuritySchemes")
            .field("security", "SecurityRequirementList")
            .field("tags", "TagList")
            .field("externalDocs", "ExternalDocs"),
        NodeType::string_enum("SwaggerVersion", &["2.0"]),
        NodeType::array_of("SchemesList", "Scheme"),
        NodeType::string_enum("Scheme", &["http", "https", "ws", "wss"]),
        NodeType::object("Paths").pattern_field("^/", "PathItem"),
        NodeType::object("PathItem")
            .field("$ref", "string")
            .field("get", "Operation")
            .field("put", "Operation")
            .field("post", "Operation")
            .field("delete", "Operation")
            .field("options", "Operation")
            .field("head", "Operation")
            .field("patch", "Operation")
            .field("parameters", "ParameterList"),
        NodeType::object("Operation")
            .required("responses", "Responses")
            .field("tags", "StringList")
            .field("summary", "string")
            .field("description", "string")
            .field("externalDocs", "ExternalDocs")
            .field("operationId", "string")
            .field("consumes", "StringList")
            .field("produces", "StringList")
            .field("parameters", "ParameterList")
            .field("schemes", "SchemesList")
            .field("deprecated", "boolean")
            .field("security", "SecurityRequirementList"),
        NodeType::union(
            "Parameter",
            UnionBy::Shape,
            vec![
                UnionVariant {
                    when: VariantMatch::FieldEquals("in", "body"),
                    type_name: "BodyParameter",
                },
                UnionVariant {
                    when: VariantMatch::Fallback,
                    type_name: "NonBodyParameter",
                },
            ],
        ),
        NodeType::array_of("ParameterList", "Parameter"),
        NodeType::object("BodyParameter")
            .required("name", "string")
            .required("in", "ParameterLocation")
            .required("schema", "Schema")
            .field("description", "string")
            .field("required", "boolean"),
        NodeType::object("NonBodyParameter")
            .required("name", "string")
            .required("in", "ParameterLocation")
            .required("type", "ParameterType")
            .field("description", "string")
            .field("required", "boolean")
            .field("format", "string")
            .field("allowEmptyValue", "boolean")
            .field("items", "Items")
            .field("collectionFormat", "CollectionFormat")
            .field("default", "any")
            .field("maximum", "number")
            .field("exclusiveMaximum", "boolean")
            .field("minimum", "number")
            .field("exclusiveMinimum", "boolean")
            .field("maxLength", "integer")
            .field("minLength", "integer")
            .field("pattern", "string")
            .field("maxItems", "integer")
            .field("minItems", "integer")
            .field("uniqueItems", "boolean")
            .field("enum", "AnyList")
            .field("multipleOf", "number"),
        NodeType::string_enum(
            "ParameterLocation",
            &["query", "header", "path", "formData", "body"],
        ),
        NodeType::string_enum(
            "ParameterType",
            &["string", "number", "integer", "boolean", "array", "file"],
        ),
        NodeType::string_enum("CollectionFormat", &["csv", "ssv", "tsv", "pipes", "multi"]),
        NodeType::object("Items")
            .field("type", "ItemsType")
            .field("format", "string")
            .field("items", "Items")
            .field("collectionFormat", "CollectionFormat")
            .field("default", "any")
            .field("maximum", "number")
            .field("exclusiveMaximum", "boolean")
            .field("minimum", "number")
            .field("exclusiveMinimum", "boolean")
            .field("maxLength", "integer")
            .field("minLength", "integer")
            .field("pattern", "string")
            .field("maxItems", "integer")
            .field("minItems", "integer")
            .field("uniqueItems", "boolean")
            .field("enum", "AnyList")
            .field("multipleOf", "number"),
        NodeType::string_enum(
            "ItemsType",
            &["string", "number", "integer", "boolean", "array"],
        ),
        NodeType::object("Responses")
            .field("default", "Response")
            .pattern_field(RESPONSE_CODE_PATTERN, "Response")
            .non_empty("Must contain at least one response code."),
        NodeType::object("Response")
            .required("description", "string")
            .field("schema", "Schema")
            .field("headers", "HeadersMap")
            .field("examples", "AnyMap"),
        NodeType::map_of("HeadersMap", "Header"),
        NodeType::map_of("AnyMap", "any"),
        NodeType::object("Header")
            .required("type", "ItemsType")
            .field("description", "string")
            .field("format", "string")
            .field("items", "Items")
            .field("collectionFormat", "CollectionFormat")
            .field("default", "any")
            .field("maximum", "number")
            .field("exclusiveMaximum", "boolean")
            .field("minimum", "number")
            .field("exclusiveMinimum", "boolean")
            .field("maxLength", "integer")
            .field("minLength", "integer")
            .field("pattern", "string")
            .field("maxItems", "integer")
            .field("minItems", "integer")
            .field("uniqueItems", "boolean")
            .field("enum", "AnyList")
            .field("multipleOf", "number"),
        schema_2_0(),
        NodeType::string_enum(
            "SchemaType",
            &["object", "array", "string", "number", "integer", "boolean", "file"],
        ),
        NodeType::union(
            "SchemaOrBool",
            UnionBy::Shape,
            vec![
                UnionVariant {
                    when: VariantMatch::NodeIsScalar,
                    type_name: "boolean",
                },
                UnionVariant {
                    when: VariantMatch::Fallback,
                    type_name: "Schema",
                },
            ],
        ),
        NodeType::array_of("SchemaList", "Schema"),
        NodeType::map_of("SchemaMap", "Schema"),
        NodeType::map_of("NamedSchemas", "Schema"),
        NodeType::map_of("NamedParameters", "Parameter"),
        NodeType::map_of("NamedResponses", "Response"),
        NodeType::map_of("NamedSecuritySchemes", "SecurityScheme"),
        NodeType::object("Xml")
            .field("name", "string")
            .field("namespace", "string")
            .field("prefix", "string")
            .field("attribute", "boolean")
            .field("wrapped", "boolean"),
        NodeType::union(
            "SecurityScheme",
            UnionBy::Discriminator,
            vec![
                UnionVariant {
                    when: VariantMatch::FieldEquals("type", "basic"),
                    type_name: "BasicSecurityScheme",
                },
                UnionVariant {
                    when: VariantMatch::FieldEquals("type", "apiKey"),
                    type_name: "ApiKeySecurityScheme",
                },
                UnionVariant {
                    when: VariantMatch::FieldEquals("type", "oauth2"),
                    type_name: "OAuth2SecurityScheme",
                },
            ],
        ),
        NodeType::object("BasicSecurityScheme")
            .required("type", "SecuritySchemeType")
            .field("description", "string"),
        NodeType::object("ApiKeySecurityScheme")
            .required("type", "SecuritySchemeType")
            .required("name", "string")
            .required("in", "ApiKeyLocation")
            .field("description", "string"),
        NodeType::object("OAuth2SecurityScheme")
            .required("type", "SecuritySchemeType")
            .required("flow", "OAuthFlowKind")
            .required("scopes", "StringMap")
            .field("authorizationUrl", "string")
            .field("tokenUrl", "string")
            .field("description", "string"),
        NodeType::string_enum("SecuritySchemeType", &["basic", "apiKey", "oauth2"]),
        NodeType::string_enum("ApiKeyLocation", &["query", "header"]),
        NodeType::string_enum(
            "OAuthFlowKind",
            &["implicit", "password", "application", "accessCode"],
        ),
        NodeType::map_of("StringMap", "string"),
    ]);
    types
}

fn schema_2_0() -> NodeType {
    NodeType::object("Schema")
        .field("format", "string")
        .field("title", "string")
        .field("description", "string")
        .field("default", "any")
        .field("multipleOf", "number")
        .field("maximum", "number")
        .field("exclusiveMaximum", "boolean")
        .field("minimum", "number")
        .field("exclusiveMinimum", "boolean")
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
        .field("type", "SchemaType")
        .field("items", "Schema")
        .field("allOf", "SchemaList")
        .field("properties", "SchemaMap")
        .field("additionalProperties", "SchemaOrBool")
        .field("discriminator", "string")
        .field("readOnly", "boolean")
        .field("xml", "Xml")
        .field("externalDocs", "ExternalDocs")
        .field("example", "any")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::schema::NodeShape;

    #[test]
    fn parameter_union_routes_body_parameters() {
        let types = types();
        let parameter = types.iter().find(|t| t.name == "Parameter").unwrap();
        let NodeShape::Union(union) = &parameter.shape else {
            panic!("Parameter is a union");
        };
        let body = parse("name: payload\nin: body\nschema: {}\n").unwrap().0;
        assert_eq!(union.pick(&body), Some("BodyParameter"));
        let query = parse("name: q\nin: query\ntype: string\n").unwrap().0;
        assert_eq!(union.pick(&query), Some("NonBodyParameter"));
    }

    #[test]
    fn root_requires_swagger_field() {
        let types = types();
        let root = types.iter().find(|t| t.name == "Root").unwrap();
        let NodeShape::Object(shape) = &root.shape else {
            panic!("Root is an object");
        };
        assert!(shape.property("swagger").unwrap().required);
        assert!(shape.property("definitions").is_some());
    }
}
