//! External reference resolution.
//!
//! Resolves `$ref` strings against a base source: RFC 6901 pointer
//! parsing with `~0`/`~1` decoding, absolute-URI-prefixed targets opened
//! through the [`SourceStore`], nested refs chased with a visited set, and
//! cycles surfaced as a [`ResolveOutcome::Circular`] sentinel the walker
//! treats as a stop marker.
//!
//! Outcomes are cached by `(uri, pointer)` after URI normalisation, so a
//! target referenced from many sites is resolved once per run.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::parser::ParseNode;
use crate::source::{normalize_uri, pointer_segments, Source, SourceStore};

/// A typed resolution failure. These are reported as problems under
/// `no-unresolved-refs`, never as process errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// The target document could not be opened or parsed.
    OpenFailed { uri: String, message: String },
    /// The pointer does not address a node in the target document.
    PointerNotFound { uri: String, pointer: String },
    /// The `$ref` string itself is malformed.
    MalformedRef { reference: String },
}

impl std::fmt::Display for ResolveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolveError::OpenFailed { uri, message } => {
                write!(f, "Can't resolve $ref: failed to open {}: {}", uri, message)
            }
            ResolveError::PointerNotFound { uri, pointer } => {
                write!(f, "Can't resolve $ref: {} has no node at {}", uri, pointer)
            }
            ResolveError::MalformedRef { reference } => {
                write!(f, "Can't resolve $ref: malformed reference `{}`", reference)
            }
        }
    }
}

/// A successfully resolved reference.
#[derive(Debug, Clone)]
pub struct ResolvedRef {
    /// Source the target lives in.
    pub source: Arc<Source>,
    /// Normalised pointer of the target within that source.
    pub pointer: String,
    /// Ref strings traversed to reach the target, outermost first.
    pub resolved_via: Vec<String>,
}

impl ResolvedRef {
    /// The target node.
    pub fn node(&self) -> Option<&ParseNode> {
        if self.pointer == "#" || self.pointer == "#/" {
            Some(&self.source.root)
        } else {
            self.source.node_at(&self.pointer)
        }
    }
}

/// Result of resolving one `$ref` site.
#[derive(Debug, Clone)]
pub enum ResolveOutcome {
    Resolved(ResolvedRef),
    /// The chain of refs loops; traversal must stop here.
    Circular { uri: String, pointer: String },
    Failed(ResolveError),
}

/// If the node is a `$ref` object, its reference string.
pub fn ref_target(node: &ParseNode) -> Option<&str> {
    node.get("$ref")?.as_str()
}

/// Resolves and caches `$ref` targets for one run.
pub struct RefResolver<'s> {
    store: &'s SourceStore,
    cache: RwLock<HashMap<(String, String), ResolveOutcome>>,
}

impl<'s> RefResolver<'s> {
    /// Create a resolver over a source store. The cache is fresh; it must
    /// not outlive the run.
    pub fn new(store: &'s SourceStore) -> Self {
        Self {
            store,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// The backing store.
    pub fn store(&self) -> &SourceStore {
        self.store
    }

    /// Resolve a `$ref` string relative to the source it appears in.
    pub fn resolve(&self, base: &Arc<Source>, reference: &str) -> ResolveOutcome {
        let mut visited = Vec::new();
        let mut via = Vec::new();
        self.resolve_reference(base, reference, &mut visited, &mut via)
    }

    fn resolve_reference(
        &self,
        base: &Arc<Source>,
        reference: &str,
        visited: &mut Vec<(String, String)>,
        via: &mut Vec<String>,
    ) -> ResolveOutcome {
        if reference.is_empty() || reference.matches('#').count() > 1 {
            return ResolveOutcome::Failed(ResolveError::MalformedRef {
                reference: reference.to_string(),
            });
        }
        let (doc_part, fragment) = match reference.split_once('#') {
            Some((doc, frag)) => (doc, frag),
            None => (reference, ""),
        };
        if !fragment.is_empty() && !fragment.starts_with('/') {
            return ResolveOutcome::Failed(ResolveError::MalformedRef {
                reference: reference.to_string(),
            });
        }
        let uri = if doc_part.is_empty() {
            base.uri.clone()
        } else {
            normalize_uri(Some(&base.uri), doc_part)
        };
        let pointer = format!("#{}", fragment);
        via.push(reference.to_string());
        self.resolve_pointer(&uri, &pointer, visited, via)
    }

    fn resolve_pointer(
        &self,
        uri: &str,
        pointer: &str,
        visited: &mut Vec<(String, String)>,
        via: &mut Vec<String>,
    ) -> ResolveOutcome {
        let key = (uri.to_string(), pointer.to_string());
        if visited.contains(&key) {
            let outcome = ResolveOutcome::Circular {
                uri: uri.to_string(),
                pointer: pointer.to_string(),
            };
            self.cache.write().unwrap().insert(key, outcome.clone());
            return outcome;
        }
        visited.push(key.clone());

        if let Some(hit) = self.cache.read().unwrap().get(&key) {
            return hit.clone();
        }

        let source = match self.store.open(uri) {
            Ok(source) => source,
            Err(err) => {
                let outcome = ResolveOutcome::Failed(ResolveError::OpenFailed {
                    uri: uri.to_string(),
                    message: err.to_string(),
                });
                self.cache.write().unwrap().insert(key, outcome.clone());
                return outcome;
            }
        };

        let segments = pointer_segments(pointer);
        let mut node = &source.root;
        for (index, segment) in segments.iter().enumerate() {
            // A segment that lands on another `$ref` re-roots the rest of
            // the pointer at that ref's target.
            if let Some(nested) = ref_target(node) {
                let nested = nested.to_string();
                return match self.resolve_reference(&source, &nested, visited, via) {
                    ResolveOutcome::Resolved(target) => {
                        let rest: Vec<&str> = segments[index..]
                            .iter()
                            .map(|s| s.as_str())
                            .collect();
                        let joined = join_pointer(&target.pointer, &rest);
                        let outcome =
                            self.resolve_pointer(&target.source.uri, &joined, visited, via);
                        self.cache.write().unwrap().insert(key, outcome.clone());
                        outcome
                    }
                    other => other,
                };
            }
            node = match step_into(node, segment) {
                Some(child) => child,
                None => {
                    let outcome = ResolveOutcome::Failed(ResolveError::PointerNotFound {
                        uri: uri.to_string(),
                        pointer: pointer.to_string(),
                    });
                    self.cache.write().unwrap().insert(key, outcome.clone());
                    return outcome;
                }
            };
        }

        if let Some(nested) = ref_target(node) {
            let nested = nested.to_string();
            let outcome = self.resolve_reference(&source, &nested, visited, via);
            self.cache.write().unwrap().insert(key, outcome.clone());
            return outcome;
        }

        let outcome = ResolveOutcome::Resolved(ResolvedRef {
            source: Arc::clone(&source),
            pointer: pointer.to_string(),
            resolved_via: via.clone(),
        });
        self.cache.write().unwrap().insert(key, outcome.clone());
        outcome
    }
}

fn step_into<'a>(node: &'a ParseNode, segment: &str) -> Option<&'a ParseNode> {
    use crate::parser::NodeKind;
    match &node.kind {
        NodeKind::Mapping(_) => node.get(segment),
        NodeKind::Sequence(items) => items.get(segment.parse::<usize>().ok()?),
        NodeKind::Scalar(_) => None,
    }
}

fn join_pointer(base: &str, segments: &[&str]) -> String {
    let mut pointer = base.to_string();
    for segment in segments {
        pointer.push('/');
        pointer.push_str(&crate::source::escape_pointer_segment(segment));
    }
    pointer
}
