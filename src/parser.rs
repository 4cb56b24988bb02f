//! YAML/JSON parsing into span-tagged trees.
//!
//! The parser consumes `saphyr-parser` events and builds [`ParseNode`] trees
//! that keep a [`Span`] for every node and every mapping key. JSON input is
//! handled by the same event stream (YAML is a superset).
//!
//! Irregularities that a strict parser would reject are tolerated and
//! recorded as [`ParseDiagnostic`]s instead: duplicate mapping keys (first
//! binding wins), non-string keys, tabs used for indentation, and aliases to
//! anchors that are unknown or still under construction. Only unrecoverable
//! syntax failures abort the parse of a document.

use std::collections::HashMap;

use saphyr_parser::{Event, Parser, ScanError, Span as EventSpan, TScalarStyle};

use crate::error::OaslintError;
use crate::source::Span;

/// A scalar value with its YAML 1.2 core-schema resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl ScalarValue {
    /// The string contents, for string scalars only.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScalarValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Render the scalar the way it would appear as a mapping key.
    pub fn to_key_string(&self) -> String {
        match self {
            ScalarValue::Null => "null".to_string(),
            ScalarValue::Bool(b) => b.to_string(),
            ScalarValue::Int(i) => i.to_string(),
            ScalarValue::Float(f) => f.to_string(),
            ScalarValue::String(s) => s.clone(),
        }
    }

    /// Name of the scalar's primitive kind, used in problem messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            ScalarValue::Null => "null",
            ScalarValue::Bool(_) => "boolean",
            ScalarValue::Int(_) => "integer",
            ScalarValue::Float(_) => "number",
            ScalarValue::String(_) => "string",
        }
    }
}

/// One entry of a mapping, in document order.
#[derive(Debug, Clone, PartialEq)]
pub struct MapEntry {
    /// The key, coerced to a string.
    pub key: String,
    /// Span of the key token.
    pub key_span: Span,
    /// The value node.
    pub value: ParseNode,
}

/// Tagged node variants.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Scalar(ScalarValue),
    Sequence(Vec<ParseNode>),
    Mapping(Vec<MapEntry>),
}

/// A parsed node with its source span.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseNode {
    pub span: Span,
    pub kind: NodeKind,
}

impl ParseNode {
    fn scalar(value: ScalarValue, span: Span) -> Self {
        Self {
            span,
            kind: NodeKind::Scalar(value),
        }
    }

    /// Mapping entries, if this node is a mapping.
    pub fn entries(&self) -> Option<&[MapEntry]> {
        match &self.kind {
            NodeKind::Mapping(entries) => Some(entries),
            _ => None,
        }
    }

    /// Sequence items, if this node is a sequence.
    pub fn items(&self) -> Option<&[ParseNode]> {
        match &self.kind {
            NodeKind::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// Look up a mapping value by key.
    pub fn get(&self, key: &str) -> Option<&ParseNode> {
        self.entries()?.iter().find(|e| e.key == key).map(|e| &e.value)
    }

    /// Whether this mapping has the given key.
    pub fn has_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// The string value, if this node is a string scalar.
    pub fn as_str(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Scalar(v) => v.as_str(),
            _ => None,
        }
    }

    /// Name of this node's shape, used in problem messages.
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            NodeKind::Scalar(v) => v.kind_name(),
            NodeKind::Sequence(_) => "array",
            NodeKind::Mapping(_) => "object",
        }
    }

    /// Convert to a `serde_yaml` value, dropping spans. Mapping order is
    /// preserved.
    pub fn to_yaml_value(&self) -> serde_yaml::Value {
        match &self.kind {
            NodeKind::Scalar(ScalarValue::Null) => serde_yaml::Value::Null,
            NodeKind::Scalar(ScalarValue::Bool(b)) => serde_yaml::Value::Bool(*b),
            NodeKind::Scalar(ScalarValue::Int(i)) => serde_yaml::Value::Number((*i).into()),
            NodeKind::Scalar(ScalarValue::Float(f)) => serde_yaml::Value::Number((*f).into()),
            NodeKind::Scalar(ScalarValue::String(s)) => serde_yaml::Value::String(s.clone()),
            NodeKind::Sequence(items) => {
                serde_yaml::Value::Sequence(items.iter().map(|i| i.to_yaml_value()).collect())
            }
            NodeKind::Mapping(entries) => {
                let mut mapping = serde_yaml::Mapping::new();
                for entry in entries {
                    mapping.insert(
                        serde_yaml::Value::String(entry.key.clone()),
                        entry.value.to_yaml_value(),
                    );
                }
                serde_yaml::Value::Mapping(mapping)
            }
        }
    }
}

/// A tolerated parse irregularity.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseDiagnostic {
    pub message: String,
    pub span: Span,
}

/// An unrecoverable syntax failure. No partial tree is returned.
#[derive(Debug, Clone)]
pub struct ParseFailure {
    pub line: usize,
    pub col: usize,
    pub message: String,
}

impl ParseFailure {
    /// Attach the owning source URI to produce the engine error.
    pub fn into_error(self, uri: &str) -> OaslintError {
        OaslintError::ParseError {
            uri: uri.to_string(),
            line: self.line,
            col: self.col,
            message: self.message,
        }
    }

    fn from_scan(err: ScanError) -> Self {
        let marker = *err.marker();
        Self {
            line: marker.line(),
            col: marker.col() + 1,
            message: err.to_string(),
        }
    }
}

enum Frame {
    Sequence {
        start: usize,
        anchor: usize,
        items: Vec<ParseNode>,
    },
    Mapping {
        start: usize,
        anchor: usize,
        entries: Vec<MapEntry>,
        pending_key: Option<PendingKey>,
    },
}

struct PendingKey {
    key: String,
    span: Span,
    duplicate: bool,
}

struct Builder {
    stack: Vec<Frame>,
    anchors: HashMap<usize, ParseNode>,
    diagnostics: Vec<ParseDiagnostic>,
    root: Option<ParseNode>,
    documents_seen: usize,
}

/// Parse YAML or JSON text into a node tree plus tolerated diagnostics.
pub fn parse(text: &str) -> Result<(ParseNode, Vec<ParseDiagnostic>), ParseFailure> {
    let mut builder = Builder {
        stack: Vec::new(),
        anchors: HashMap::new(),
        diagnostics: Vec::new(),
        root: None,
        documents_seen: 0,
    };
    scan_tab_indentation(text, &mut builder.diagnostics);

    let mut parser = Parser::new_from_str(text);
    for event in &mut parser {
        let (event, span) = event.map_err(ParseFailure::from_scan)?;
        builder.handle(event, span);
    }

    let root = builder.root.unwrap_or_else(|| {
        // An empty document is a null scalar at the start of the text.
        ParseNode::scalar(ScalarValue::Null, Span::new(0, 0))
    });
    Ok((root, builder.diagnostics))
}

impl Builder {
    fn handle(&mut self, event: Event, span: EventSpan) {
        let span = to_span(span);
        match event {
            Event::Nothing
            | Event::StreamStart
            | Event::StreamEnd
            | Event::DocumentStart(..) => {}
            Event::DocumentEnd => {
                self.documents_seen += 1;
            }
            Event::Scalar(value, style, anchor, tag) => {
                let scalar = resolve_scalar(&value, style, tag.as_ref().map(|t| t.suffix.as_str()));
                let node = ParseNode::scalar(scalar, span);
                if anchor != 0 {
                    self.anchors.insert(anchor, node.clone());
                }
                self.push_node(node);
            }
            Event::Alias(anchor) => {
                // An alias to an anchor still under construction is an
                // anchor cycle; it resolves to a null placeholder.
                let node = match self.anchors.get(&anchor) {
                    Some(target) => ParseNode {
                        span,
                        kind: target.kind.clone(),
                    },
                    None => {
                        self.diagnostics.push(ParseDiagnostic {
                            message: "Alias refers to an unknown or cyclic anchor".to_string(),
                            span,
                        });
                        ParseNode::scalar(ScalarValue::Null, span)
                    }
                };
                self.push_node(node);
            }
            Event::SequenceStart(anchor, _tag) => {
                self.stack.push(Frame::Sequence {
                    start: span.start,
                    anchor,
                    items: Vec::new(),
                });
            }
            Event::SequenceEnd => {
                if let Some(Frame::Sequence { start, anchor, items }) = self.stack.pop() {
                    let node = ParseNode {
                        span: Span::new(start, span.end),
                        kind: NodeKind::Sequence(items),
                    };
                    if anchor != 0 {
                        self.anchors.insert(anchor, node.clone());
                    }
                    self.push_node(node);
                }
            }
            Event::MappingStart(anchor, _tag) => {
                self.stack.push(Frame::Mapping {
                    start: span.start,
                    anchor,
                    entries: Vec::new(),
                    pending_key: None,
                });
            }
            Event::MappingEnd => {
                if let Some(Frame::Mapping {
                    start,
                    anchor,
                    entries,
                    ..
                }) = self.stack.pop()
                {
                    let node = ParseNode {
                        span: Span::new(start, span.end),
                        kind: NodeKind::Mapping(entries),
                    };
                    if anchor != 0 {
                        self.anchors.insert(anchor, node.clone());
                    }
                    self.push_node(node);
                }
            }
        }
    }

    fn push_node(&mut self, node: ParseNode) {
        match self.stack.last_mut() {
            None => {
                if self.documents_seen == 0 && self.root.is_none() {
                    self.root = Some(node);
                } else if self.documents_seen > 0 && self.root.is_some() {
                    self.diagnostics.push(ParseDiagnostic {
                        message: "Multiple YAML documents; only the first is used".to_string(),
                        span: node.span,
                    });
                }
            }
            Some(Frame::Sequence { items, .. }) => items.push(node),
            Some(Frame::Mapping {
                entries,
                pending_key,
                ..
            }) => match pending_key.take() {
                None => {
                    let (key, duplicate) = match &node.kind {
                        NodeKind::Scalar(ScalarValue::String(s)) => (s.clone(), false),
                        NodeKind::Scalar(other) => {
                            self.diagnostics.push(ParseDiagnostic {
                                message: format!(
                                    "Mapping key is {}, not a string",
                                    other.kind_name()
                                ),
                                span: node.span,
                            });
                            (other.to_key_string(), false)
                        }
                        _ => {
                            self.diagnostics.push(ParseDiagnostic {
                                message: "Mapping key is not a scalar".to_string(),
                                span: node.span,
                            });
                            (String::new(), true)
                        }
                    };
                    let duplicate = duplicate || entries.iter().any(|e| e.key == key);
                    if duplicate && !key.is_empty() {
                        self.diagnostics.push(ParseDiagnostic {
                            message: format!(
                                "Duplicate mapping key `{}`; only the first value is used",
                                key
                            ),
                            span: node.span,
                        });
                    }
                    *pending_key = Some(PendingKey {
                        key,
                        span: node.span,
                        duplicate,
                    });
                }
                Some(pending) => {
                    if !pending.duplicate {
                        entries.push(MapEntry {
                            key: pending.key,
                            key_span: pending.span,
                            value: node,
                        });
                    }
                }
            },
        }
    }
}

fn to_span(span: EventSpan) -> Span {
    Span::new(span.start.index(), span.end.index())
}

fn resolve_scalar(text: &str, style: TScalarStyle, tag: Option<&str>) -> ScalarValue {
    if style != TScalarStyle::Plain {
        return ScalarValue::String(text.to_string());
    }
    if let Some(tag) = tag {
        // An explicit tag forces the kind; `!!str 1` stays a string.
        return match tag {
            "str" => ScalarValue::String(text.to_string()),
            "null" => ScalarValue::Null,
            "bool" => ScalarValue::Bool(text == "true" || text == "True" || text == "TRUE"),
            "int" => parse_int(text)
                .map(ScalarValue::Int)
                .unwrap_or_else(|| ScalarValue::String(text.to_string())),
            "float" => parse_float(text)
                .map(ScalarValue::Float)
                .unwrap_or_else(|| ScalarValue::String(text.to_string())),
            _ => ScalarValue::String(text.to_string()),
        };
    }
    match text {
        "" | "~" | "null" | "Null" | "NULL" => return ScalarValue::Null,
        "true" | "True" | "TRUE" => return ScalarValue::Bool(true),
        "false" | "False" | "FALSE" => return ScalarValue::Bool(false),
        _ => {}
    }
    if let Some(i) = parse_int(text) {
        return ScalarValue::Int(i);
    }
    if let Some(f) = parse_float(text) {
        return ScalarValue::Float(f);
    }
    ScalarValue::String(text.to_string())
}

fn parse_int(text: &str) -> Option<i64> {
    let (sign, body) = match text.strip_prefix('-') {
        Some(rest) => (-1i64, rest),
        None => (1i64, text.strip_prefix('+').unwrap_or(text)),
    };
    if body.is_empty() {
        return None;
    }
    let value = if let Some(hex) = body.strip_prefix("0x") {
        i64::from_str_radix(hex, 16).ok()?
    } else if let Some(oct) = body.strip_prefix("0o") {
        i64::from_str_radix(oct, 8).ok()?
    } else {
        if !body.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        body.parse::<i64>().ok()?
    };
    Some(sign * value)
}

fn parse_float(text: &str) -> Option<f64> {
    match text {
        ".inf" | "+.inf" | ".Inf" => return Some(f64::INFINITY),
        "-.inf" | "-.Inf" => return Some(f64::NEG_INFINITY),
        ".nan" | ".NaN" => return Some(f64::NAN),
        _ => {}
    }
    // Reject plain integers and anything f64::from_str would accept but
    // YAML would not (leading/trailing junk is already excluded by parse).
    if !text.contains(['.', 'e', 'E']) {
        return None;
    }
    let body = text.strip_prefix(['+', '-']).unwrap_or(text);
    if body.is_empty() || !body.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
        return None;
    }
    text.parse::<f64>().ok()
}

fn scan_tab_indentation(text: &str, diagnostics: &mut Vec<ParseDiagnostic>) {
    // Flow-style documents (JSON) may legitimately indent with tabs.
    if matches!(text.trim_start().chars().next(), Some('{') | Some('[')) {
        return;
    }
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        let indent_len = line.len() - line.trim_start_matches([' ', '\t']).len();
        if line[..indent_len].contains('\t') {
            diagnostics.push(ParseDiagnostic {
                message: "Tab character used for indentation".to_string(),
                span: Span::new(offset, offset + indent_len),
            });
        }
        offset += line.len();
    }
}
