//! Integration tests for emission: normalize round-trips, bundling
//! external refs, and dereference behaviour on cycles.

use oaslint::bundler::{bundle, dereference, normalize, to_yaml_string};
use oaslint::resolver::RefResolver;
use oaslint::source::SourceStore;
use oaslint::{Document, OaslintError};

fn open(store: &SourceStore, uri: &str, text: &str) -> Document {
    Document::from_source(store.open_inline(uri, text).unwrap())
}

#[test]
fn normalize_round_trip_is_semantic_identity() {
    let text = r#"
paths:
  /b:
    get:
      responses:
        '200': {description: ok}
  /a:
    get:
      responses:
        '200': {description: ok}
servers:
  - url: https://api.example.com
info:
  title: T
  version: '1'
openapi: 3.0.0
"#;
    let store = SourceStore::new();
    let document = open(&store, "openapi.yaml", text);
    let normalized = normalize(&document).unwrap();

    // Emit and parse back.
    let emitted = to_yaml_string(&normalized).unwrap();
    let store2 = SourceStore::new();
    let reparsed = open(&store2, "normalized.yaml", &emitted);
    let reparsed_value = reparsed.source.root.to_yaml_value();

    // Same mapping contents under every top-level key.
    let original = document.source.root.to_yaml_value();
    let original_map = original.as_mapping().unwrap();
    let reparsed_map = reparsed_value.as_mapping().unwrap();
    assert_eq!(original_map.len(), reparsed_map.len());
    for (key, value) in original_map {
        assert_eq!(reparsed_map.get(key), Some(value), "key {:?}", key);
    }

    // Only the top-level order changed, into the canonical order.
    let keys: Vec<_> = reparsed_map.keys().filter_map(|k| k.as_str()).collect();
    assert_eq!(keys, vec!["openapi", "info", "servers", "paths"]);

    // Nested mapping order is untouched: /b declared before /a.
    let path_keys: Vec<_> = reparsed_value["paths"]
        .as_mapping()
        .unwrap()
        .keys()
        .filter_map(|k| k.as_str())
        .collect();
    assert_eq!(path_keys, vec!["/b", "/a"]);
}

#[test]
fn normalizing_twice_is_stable() {
    let store = SourceStore::new();
    let document = open(
        &store,
        "openapi.yaml",
        "paths: {}\nopenapi: 3.0.0\ninfo: {title: T, version: '1'}\n",
    );
    let once = normalize(&document).unwrap();
    let emitted = to_yaml_string(&once).unwrap();
    let store2 = SourceStore::new();
    let again = normalize(&open(&store2, "o2.yaml", &emitted)).unwrap();
    assert_eq!(once, again);
}

#[test]
fn bundle_collects_external_targets_and_rewrites_sites() {
    let store = SourceStore::new();
    store
        .open_inline(
            "common.yaml",
            "Pet:\n  type: object\n  properties:\n    name:\n      type: string\n",
        )
        .unwrap();
    let document = open(
        &store,
        "openapi.yaml",
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
    let value = bundle(&document, &resolver, None).unwrap();

    assert_eq!(
        value["paths"]["/pets"]["get"]["responses"]["200"]["content"]["application/json"]
            ["schema"]["$ref"],
        "#/components/schemas/Pet"
    );
    assert_eq!(
        value["components"]["schemas"]["Pet"]["properties"]["name"]["type"],
        "string"
    );
}

#[test]
fn bundle_resolves_refs_inside_foreign_sources() {
    let store = SourceStore::new();
    store
        .open_inline(
            "common.yaml",
            r#"
Pet:
  type: object
  properties:
    owner:
      $ref: '#/Owner'
Owner:
  type: object
"#,
        )
        .unwrap();
    let document = open(
        &store,
        "openapi.yaml",
        r#"
openapi: 3.0.0
info: {title: T, version: '1'}
paths: {}
components:
  schemas:
    Pet:
      $ref: 'common.yaml#/Pet'
"#,
    );
    let resolver = RefResolver::new(&store);
    let value = bundle(&document, &resolver, None).unwrap();

    // common.yaml's own local ref is rehomed into the bundle.
    assert_eq!(
        value["components"]["schemas"]["Pet-2"]["properties"]["owner"]["$ref"],
        "#/components/schemas/Owner"
    );
    assert_eq!(value["components"]["schemas"]["Owner"]["type"], "object");
}

#[test]
fn bundle_keeps_circular_external_refs_as_component_refs() {
    let store = SourceStore::new();
    store
        .open_inline(
            "a.yaml",
            "Thing:\n  type: object\n  properties:\n    peer:\n      $ref: 'b.yaml#/Other'\n",
        )
        .unwrap();
    store
        .open_inline(
            "b.yaml",
            "Other:\n  type: object\n  properties:\n    back:\n      $ref: 'a.yaml#/Thing'\n",
        )
        .unwrap();
    let document = open(
        &store,
        "openapi.yaml",
        r#"
openapi: 3.0.0
info: {title: T, version: '1'}
paths: {}
components:
  schemas:
    Start:
      $ref: 'a.yaml#/Thing'
"#,
    );
    let resolver = RefResolver::new(&store);
    let value = bundle(&document, &resolver, None).unwrap();

    assert_eq!(
        value["components"]["schemas"]["Thing"]["properties"]["peer"]["$ref"],
        "#/components/schemas/Other"
    );
    assert_eq!(
        value["components"]["schemas"]["Other"]["properties"]["back"]["$ref"],
        "#/components/schemas/Thing"
    );
}

#[test]
fn dereference_rejects_cycles_with_a_typed_error() {
    let store = SourceStore::new();
    let document = open(
        &store,
        "openapi.yaml",
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
    let result = dereference(&document, &resolver);
    assert!(matches!(
        result,
        Err(OaslintError::CircularJsonNotSupported { .. })
    ));
}

#[test]
fn dereference_inlines_nested_external_chains() {
    let store = SourceStore::new();
    store
        .open_inline("b.yaml", "Inner:\n  type: string\n")
        .unwrap();
    store
        .open_inline(
            "a.yaml",
            "Outer:\n  type: object\n  properties:\n    inner:\n      $ref: 'b.yaml#/Inner'\n",
        )
        .unwrap();
    let document = open(
        &store,
        "openapi.yaml",
        r#"
openapi: 3.0.0
info: {title: T, version: '1'}
paths: {}
components:
  schemas:
    Thing:
      $ref: 'a.yaml#/Outer'
"#,
    );
    let resolver = RefResolver::new(&store);
    let value = dereference(&document, &resolver).unwrap();
    assert_eq!(
        value["components"]["schemas"]["Thing"]["properties"]["inner"]["type"],
        "string"
    );
}

#[test]
fn oas2_normalize_uses_the_swagger_key_order() {
    let store = SourceStore::new();
    let document = open(
        &store,
        "swagger.yaml",
        "paths: {}\nhost: api.example.com\nswagger: '2.0'\ninfo: {title: T, version: '1'}\n",
    );
    let value = normalize(&document).unwrap();
    let keys: Vec<_> = value
        .as_mapping()
        .unwrap()
        .keys()
        .filter_map(|k| k.as_str())
        .collect();
    assert_eq!(keys, vec!["swagger", "info", "host", "paths"]);
}
