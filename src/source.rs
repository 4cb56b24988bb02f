//! Source documents and the span store.
//!
//! A [`Source`] owns the raw text of one fetched document together with its
//! parsed tree. The [`SourceStore`] opens sources by absolute URI (file path
//! or HTTP/S URL), caches them for the duration of a run, and computes
//! offset-to-position maps on demand.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock, RwLock};
use std::time::Duration;

use anyhow::{anyhow, Context};
use url::Url;

use crate::error::{OaslintError, Result};
use crate::parser::{self, NodeKind, ParseDiagnostic, ParseNode};

/// A half-open `[start, end)` range of offsets into a source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// Offset of the first character.
    pub start: usize,
    /// Offset one past the last character.
    pub end: usize,
}

impl Span {
    /// Create a span from start and end offsets.
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Whether the span contains the given offset.
    pub fn contains(&self, offset: usize) -> bool {
        offset >= self.start && offset < self.end
    }
}

/// Syntax flavour of a source, sniffed from the leading non-whitespace
/// character. JSON is a YAML superset here; the flavour only affects how
/// emission and diagnostics describe the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Yaml,
    Json,
}

/// One fetched document: its URI, raw text, and parsed tree.
#[derive(Debug)]
pub struct Source {
    /// Absolute URI this source was opened from.
    pub uri: String,
    /// Raw text, read verbatim.
    pub text: String,
    /// Sniffed syntax flavour.
    pub kind: SourceKind,
    /// Parsed tree. Immutable after parse.
    pub root: ParseNode,
    /// Tolerated parse irregularities (duplicate keys, tab indentation, ...).
    pub diagnostics: Vec<ParseDiagnostic>,
    line_starts: OnceLock<Vec<usize>>,
}

impl Source {
    fn new(uri: String, text: String) -> Result<Self> {
        let kind = sniff_kind(&text);
        let (root, diagnostics) = parser::parse(&text).map_err(|e| e.into_error(&uri))?;
        Ok(Self {
            uri,
            text,
            kind,
            root,
            diagnostics,
            line_starts: OnceLock::new(),
        })
    }

    /// Map an offset to a 1-indexed `(line, col)` pair.
    pub fn position_of(&self, offset: usize) -> (usize, usize) {
        let starts = self.line_starts.get_or_init(|| {
            let mut starts = vec![0];
            for (i, ch) in self.text.char_indices() {
                if ch == '\n' {
                    starts.push(i + 1);
                }
            }
            starts
        });
        let line = match starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        (line + 1, offset - starts[line] + 1)
    }

    /// Find the node addressed by an RFC 6901 pointer (`#/a/b/0` or `/a/b/0`).
    pub fn node_at(&self, pointer: &str) -> Option<&ParseNode> {
        let mut node = &self.root;
        for segment in pointer_segments(pointer) {
            match &node.kind {
                NodeKind::Mapping(entries) => {
                    node = &entries.iter().find(|e| e.key == segment)?.value;
                }
                NodeKind::Sequence(items) => {
                    let index: usize = segment.parse().ok()?;
                    node = items.get(index)?;
                }
                NodeKind::Scalar(_) => return None,
            }
        }
        Some(node)
    }

    /// Find the key span for the final segment of a pointer, when it names a
    /// mapping entry.
    pub fn key_span_at(&self, pointer: &str) -> Option<Span> {
        let segments = pointer_segments(pointer);
        let (last, parents) = segments.split_last()?;
        let mut node = &self.root;
        for segment in parents {
            match &node.kind {
                NodeKind::Mapping(entries) => {
                    node = &entries.iter().find(|e| &e.key == segment)?.value;
                }
                NodeKind::Sequence(items) => {
                    let index: usize = segment.parse().ok()?;
                    node = items.get(index)?;
                }
                NodeKind::Scalar(_) => return None,
            }
        }
        match &node.kind {
            NodeKind::Mapping(entries) => {
                entries.iter().find(|e| &e.key == last).map(|e| e.key_span)
            }
            _ => None,
        }
    }

    /// Map an offset back to the JSON pointer of the deepest enclosing node.
    pub fn pointer_at(&self, offset: usize) -> String {
        let mut pointer = String::from("#");
        let mut node = &self.root;
        'descend: loop {
            match &node.kind {
                NodeKind::Mapping(entries) => {
                    for entry in entries {
                        if entry.value.span.contains(offset) || entry.key_span.contains(offset) {
                            pointer.push('/');
                            pointer.push_str(&escape_pointer_segment(&entry.key));
                            node = &entry.value;
                            continue 'descend;
                        }
                    }
                }
                NodeKind::Sequence(items) => {
                    for (i, item) in items.iter().enumerate() {
                        if item.span.contains(offset) {
                            pointer.push('/');
                            pointer.push_str(&i.to_string());
                            node = item;
                            continue 'descend;
                        }
                    }
                }
                NodeKind::Scalar(_) => {}
            }
            return pointer;
        }
    }
}

/// Split an RFC 6901 pointer into decoded segments (`~1` then `~0`).
pub fn pointer_segments(pointer: &str) -> Vec<String> {
    let trimmed = pointer
        .trim_start_matches('#')
        .trim_start_matches('/');
    if trimmed.is_empty() {
        return Vec::new();
    }
    trimmed.split('/').map(unescape_pointer_segment).collect()
}

/// Decode one pointer segment (`~1` to `/`, then `~0` to `~`).
pub fn unescape_pointer_segment(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

/// Encode one pointer segment (`~` to `~0`, then `/` to `~1`).
pub fn escape_pointer_segment(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

fn sniff_kind(text: &str) -> SourceKind {
    match text.trim_start().chars().next() {
        Some('{') | Some('[') => SourceKind::Json,
        _ => SourceKind::Yaml,
    }
}

/// Resolve a reference against a base URI and return the normalised
/// absolute form used as a cache key.
///
/// HTTP(S) bases join per RFC 3986; filesystem bases join against the
/// base's parent directory.
pub fn normalize_uri(base: Option<&str>, reference: &str) -> String {
    if let Ok(url) = Url::parse(reference) {
        if !url.cannot_be_a_base() {
            return url.to_string();
        }
    }
    match base {
        Some(base_uri) => {
            if let Ok(base_url) = Url::parse(base_uri) {
                if let Ok(joined) = base_url.join(reference) {
                    return joined.to_string();
                }
            }
            let base_path = std::path::Path::new(base_uri);
            let dir = base_path.parent().unwrap_or_else(|| std::path::Path::new(""));
            normalize_path(&dir.join(reference))
        }
        None => reference.to_string(),
    }
}

fn normalize_path(path: &std::path::Path) -> String {
    let mut parts: Vec<&std::ffi::OsStr> = Vec::new();
    for component in path.components() {
        match component {
            std::path::Component::ParentDir => {
                if parts.pop().is_none() {
                    parts.push(component.as_os_str());
                }
            }
            std::path::Component::CurDir => {}
            other => parts.push(other.as_os_str()),
        }
    }
    let mut result = std::path::PathBuf::new();
    for part in parts {
        result.push(part);
    }
    result.to_string_lossy().into_owned()
}

/// Options controlling how external sources are fetched.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Per-fetch timeout. Defaults to 60 seconds.
    pub timeout: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
        }
    }
}

/// Opens and caches sources by absolute URI.
///
/// The store is the only shared state of a run besides the resolver cache.
/// It is append-only: a URI is fetched at most once per run and the parsed
/// source is pinned for span reporting.
pub struct SourceStore {
    sources: RwLock<HashMap<String, Arc<Source>>>,
    /// Per-URI gates so concurrent walks fetch a URI at most once.
    inflight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    client: OnceLock<reqwest::blocking::Client>,
    options: FetchOptions,
}

impl SourceStore {
    /// Create a store with default fetch options.
    pub fn new() -> Self {
        Self::with_options(FetchOptions::default())
    }

    /// Create a store with explicit fetch options.
    pub fn with_options(options: FetchOptions) -> Self {
        Self {
            sources: RwLock::new(HashMap::new()),
            inflight: Mutex::new(HashMap::new()),
            client: OnceLock::new(),
            options,
        }
    }

    /// Open a source by absolute URI. Idempotent: repeated opens return the
    /// cached source, and concurrent opens fetch the URI at most once.
    pub fn open(&self, uri: &str) -> Result<Arc<Source>> {
        if let Some(source) = self.sources.read().unwrap().get(uri) {
            return Ok(Arc::clone(source));
        }
        let gate = Arc::clone(
            self.inflight
                .lock()
                .unwrap()
                .entry(uri.to_string())
                .or_default(),
        );
        let _fetching = gate.lock().unwrap();
        // A concurrent walk may have finished the fetch while we waited.
        if let Some(source) = self.sources.read().unwrap().get(uri) {
            return Ok(Arc::clone(source));
        }
        tracing::debug!(uri, "opening source");
        let text = self.fetch_text(uri)?;
        let source = Arc::new(Source::new(uri.to_string(), text)?);
        self.sources
            .write()
            .unwrap()
            .insert(uri.to_string(), Arc::clone(&source));
        Ok(source)
    }

    /// Register an in-memory source under a synthetic URI, for drivers that
    /// lint strings rather than files.
    pub fn open_inline(&self, uri: &str, text: &str) -> Result<Arc<Source>> {
        if let Some(source) = self.sources.read().unwrap().get(uri) {
            return Ok(Arc::clone(source));
        }
        let source = Arc::new(Source::new(uri.to_string(), text.to_string())?);
        let mut sources = self.sources.write().unwrap();
        Ok(Arc::clone(
            sources
                .entry(uri.to_string())
                .or_insert_with(|| Arc::clone(&source)),
        ))
    }

    /// Look up an already-opened source without fetching.
    pub fn get(&self, uri: &str) -> Option<Arc<Source>> {
        self.sources.read().unwrap().get(uri).map(Arc::clone)
    }

    fn fetch_text(&self, uri: &str) -> Result<String> {
        if uri.starts_with("http://") || uri.starts_with("https://") {
            return self.fetch_remote(uri).map_err(|e| OaslintError::SourceError {
                uri: uri.to_string(),
                message: format!("{e:#}"),
            });
        }
        let path = uri.strip_prefix("file://").unwrap_or(uri);
        std::fs::read_to_string(path).map_err(|e| OaslintError::SourceError {
            uri: uri.to_string(),
            message: e.to_string(),
        })
    }

    fn fetch_remote(&self, url: &str) -> anyhow::Result<String> {
        let client = self.client.get_or_init(|| {
            reqwest::blocking::Client::builder()
                .timeout(self.options.timeout)
                .build()
                .unwrap_or_default()
        });
        let response = client
            .get(url)
            .send()
            .with_context(|| format!("Failed to fetch {}", url))?;
        if !response.status().is_success() {
            return Err(anyhow!("HTTP {} fetching {}", response.status(), url));
        }
        response
            .text()
            .with_context(|| format!("Failed to read response from {}", url))
    }
}

impl Default for SourceStore {
    fn default() -> Self {
        Self::new()
    }
}
