//! Node type table for OpenAPI 3.0.

use super::{common_types, NodeType, UnionBy, UnionVariant, VariantMatch};

/// Response-code keys: `200`, `4XX`, and `default` (the latter a declared
/// property).
pub(crate) const RESPONSE_CODE_PATTERN: &str = "^([1-5][0-9][0-9]|[1-5]XX)$";

/// Component map keys.
pub(crate) const COMPONENT_KEY_PATTERN: &str = "^[a-zA-Z0-9._-]+$";

pub fn types() -> Vec<NodeType> {
    let mut types = common_types();
    types.extend(vec![
        NodeType::object("Root")
            .required("openapi", "string")
            .required("info", "Info")
            .required("paths", "Paths")
            .field("servers", "ServerList")
            .field("security", "SecurityRequirementList")
            .field("tags", "TagList")
            .field("externalDocs", "ExternalDocs")
            .field("components", "Components"),
        NodeType::object("Server")
            .required("url", "string")
            .field("description", "string")
            .field("variables", "ServerVariablesMap"),
        NodeType::array_of("ServerList", "Server"),
        NodeType::map_of("ServerVariablesMap", "ServerVariable"),
        NodeType::object("ServerVariable")
            .required("default", "string")
            .field("enum", "StringList")
            .field("description", "string"),
        NodeType::object("Paths").pattern_field("^/", "PathItem"),
        NodeType::object("PathItem")
            .field("$ref", "string")
            .field("summary", "string")
            .field("description", "string")
            .field("get", "Operation")
            .field("put", "Operation")
            .field("post", "Operation")
            .field("delete", "Operation")
            .field("options", "Operation")
            .field("head", "Operation")
            .field("patch", "Operation")
            .field("trace", "Operation")
            .field("servers", "ServerList")
            .field("parameters", "ParameterList"),
        NodeType::object("Operation")
            .required("responses", "Responses")
            .field("tags", "StringList")
            .field("summary", "string")
            .field("description", "string")
            .field("externalDocs", "ExternalDocs")
            .field("operationId", "string")
            .field("parameters", "ParameterList")
            .field("requestBody", "RequestBody")
            .field("callbacks", "CallbacksMap")
            .field("deprecated", "boolean")
            .field("security", "SecurityRequirementList")
            .field("servers", "ServerList"),
        NodeType::object("Parameter")
            .required("name", "string")
            .required("in", "ParameterLocation")
            .field("description", "string")
            .field("required", "boolean")
            .field("deprecated", "boolean")
            .field("allowEmptyValue", "boolean")
            .field("style", "string")
            .field("explode", "boolean")
            .field("allowReserved", "boolean")
            .field("schema", "Schema")
            .field("example", "any")
            .field("examples", "ExamplesMap")
            .field("content", "MediaTypesMap")
            .require_any_of(&["schema", "content"]),
        NodeType::string_enum("ParameterLocation", &["query", "header", "path", "cookie"]),
        NodeType::array_of("ParameterList", "Parameter"),
        NodeType::object("RequestBody")
            .required("content", "MediaTypesMap")
            .field("description", "string")
            .field("required", "boolean"),
        NodeType::map_of("MediaTypesMap", "MediaType"),
        NodeType::object("MediaType")
            .field("schema", "Schema")
            .field("example", "any")
            .field("examples", "ExamplesMap")
            .field("encoding", "EncodingMap"),
        NodeType::map_of("EncodingMap", "Encoding"),
        NodeType::object("Encoding")
            .field("contentType", "string")
            .field("headers", "HeadersMap")
            .field("style", "string")
            .field("explode", "boolean")
            .field("allowReserved", "boolean"),
        NodeType::object("Responses")
            .field("default", "Response")
            .pattern_field(RESPONSE_CODE_PATTERN, "Response")
            .non_empty("Must contain at least one response code."),
        NodeType::object("Response")
            .required("description", "string")
            .field("headers", "HeadersMap")
            .field("content", "MediaTypesMap")
            .field("links", "LinksMap"),
        NodeType::map_of("HeadersMap", "Header"),
        NodeType::object("Header")
            .field("description", "string")
            .field("required", "boolean")
            .field("deprecated", "boolean")
            .field("allowEmptyValue", "boolean")
            .field("style", "string")
            .field("explode", "boolean")
            .field("allowReserved", "boolean")
            .field("schema", "Schema")
            .field("example", "any")
            .field("examples", "ExamplesMap")
            .field("content", "MediaTypesMap"),
        NodeType::map_of("ExamplesMap", "Example"),
        NodeType::object("Example")
            .field("summary", "string")
            .field("description", "string")
            .field("value", "any")
            .field("externalValue", "string"),
        NodeType::map_of("LinksMap", "Link"),
        NodeType::object("Link")
            .field("operationRef", "string")
            .field("operationId", "string")
            .field("parameters", "AnyMap")
            .field("requestBody", "any")
            .field("description", "string")
            .field("server", "Server"),
        NodeType::map_of("AnyMap", "any"),
        NodeType::map_of("CallbacksMap", "Callback"),
        NodeType::map_of("Callback", "PathItem"),
        schema_3_0(),
        NodeType::string_enum(
            "SchemaType",
            &["object", "array", "string", "number", "integer", "boolean"],
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
        NodeType::object("Discriminator")
            .required("propertyName", "string")
            .field("mapping", "StringMap"),
        NodeType::map_of("StringMap", "string"),
        NodeType::object("Xml")
            .field("name", "string")
            .field("namespace", "string")
            .field("prefix", "string")
            .field("attribute", "boolean")
            .field("wrapped", "boolean"),
        NodeType::object("Components")
            .field("schemas", "NamedSchemas")
            .field("responses", "NamedResponses")
            .field("parameters", "NamedParameters")
            .field("examples", "NamedExamples")
            .field("requestBodies", "NamedRequestBodies")
            .field("headers", "NamedHeaders")
            .field("securitySchemes", "NamedSecuritySchemes")
            .field("links", "NamedLinks")
            .field("callbacks", "NamedCallbacks"),
        NodeType::map_of("NamedSchemas", "Schema").key_pattern(COMPONENT_KEY_PATTERN),
        NodeType::map_of("NamedResponses", "Response").key_pattern(COMPONENT_KEY_PATTERN),
        NodeType::map_of("NamedParameters", "Parameter").key_pattern(COMPONENT_KEY_PATTERN),
        NodeType::map_of("NamedExamples", "Example").key_pattern(COMPONENT_KEY_PATTERN),
        NodeType::map_of("NamedRequestBodies", "RequestBody").key_pattern(COMPONENT_KEY_PATTERN),
        NodeType::map_of("NamedHeaders", "Header").key_pattern(COMPONENT_KEY_PATTERN),
        NodeType::map_of("NamedSecuritySchemes", "SecurityScheme")
            .key_pattern(COMPONENT_KEY_PATTERN),
        NodeType::map_of("NamedLinks", "Link").key_pattern(COMPONENT_KEY_PATTERN),
        NodeType::map_of("NamedCallbacks", "Callback").key_pattern(COMPONENT_KEY_PATTERN),
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
            ],
        ),
        NodeType::object("ApiKeySecurityScheme")
            .required("type", "SecuritySchemeType")
            .required("name", "string")
            .required("in", "ApiKeyLocation")
            .field("description", "string"),
        NodeType::object("HttpSecurityScheme")
            .required("type", "SecuritySchemeType")
            .required("scheme", "string")
            .field("bearerFormat", "string")
            .field("description", "string"),
        NodeType::object("OAuth2SecurityScheme")
            .required("type", "SecuritySchemeType")
            .required("flows", "OAuthFlows")
            .field("description", "string"),
        NodeType::object("OpenIdSecurityScheme")
            .required("type", "SecuritySchemeType")
            .required("openIdConnectUrl", "string")
            .field("description", "string"),
        NodeType::string_enum(
            "SecuritySchemeType",
            &["apiKey", "http", "oauth2", "openIdConnect"],
        ),
        NodeType::string_enum("ApiKeyLocation", &["query", "header", "cookie"]),
        NodeType::object("OAuthFlows")
            .field("implicit", "OAuthFlow")
            .field("password", "OAuthFlow")
            .field("clientCredentials", "OAuthFlow")
            .field("authorizationCode", "OAuthFlow"),
        NodeType::object("OAuthFlow")
            .required("scopes", "StringMap")
            .field("authorizationUrl", "string")
            .field("tokenUrl", "string")
            .field("refreshUrl", "string"),
    ]);
    types
}

fn schema_3_0() -> NodeType {
    NodeType::object("Schema")
        .field("title", "string")
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
        .field("allOf", "SchemaList")
        .field("oneOf", "SchemaList")
        .field("anyOf", "SchemaList")
        .field("not", "Schema")
        .field("items", "Schema")
        .field("properties", "SchemaMap")
        .field("additionalProperties", "SchemaOrBool")
        .field("description", "string")
        .field("format", "string")
        .field("default", "any")
        .field("nullable", "boolean")
        .field("discriminator", "Discriminator")
        .field("readOnly", "boolean")
        .field("writeOnly", "boolean")
        .field("xml", "Xml")
        .field("externalDocs", "ExternalDocs")
        .field("example", "any")
        .field("deprecated", "boolean")
}
