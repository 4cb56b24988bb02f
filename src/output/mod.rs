//! Problem output formatters.
//!
//! This module provides formatters for emitting lint problems in
//! different formats (stylish terminal output, JSON, checkstyle XML).

pub mod checkstyle;
pub mod json;
pub mod stylish;

use std::io::Write;

use crate::problems::{LocationStep, Problem, Totals};
use crate::source::SourceStore;

pub use checkstyle::CheckstyleFormatter;
pub use json::JsonFormatter;
pub use stylish::StylishFormatter;

/// Output format for lint results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Stylish,
    Json,
    Checkstyle,
}

impl OutputFormat {
    /// Parse a CLI format name.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "stylish" => Some(Self::Stylish),
            "json" => Some(Self::Json),
            "checkstyle" => Some(Self::Checkstyle),
            _ => None,
        }
    }
}

/// Trait for formatting lint output.
pub trait ProblemFormatter {
    /// Format problems to the given writer. The store supplies line and
    /// column positions for locations.
    fn format<W: Write>(
        &self,
        problems: &[Problem],
        totals: &Totals,
        store: &SourceStore,
        writer: &mut W,
    ) -> std::io::Result<()>;
}

/// Resolve a location step to a 1-indexed `(line, col)` pair.
pub(crate) fn position_of(store: &SourceStore, step: &LocationStep) -> (usize, usize) {
    let Some(source) = store.get(&step.source) else {
        return (1, 1);
    };
    let span = if step.report_on_key {
        source
            .key_span_at(&step.pointer)
            .or_else(|| source.node_at(&step.pointer).map(|n| n.span))
    } else {
        source.node_at(&step.pointer).map(|n| n.span)
    };
    span.map(|s| source.position_of(s.start)).unwrap_or((1, 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_format_names() {
        assert_eq!(OutputFormat::parse("stylish"), Some(OutputFormat::Stylish));
        assert_eq!(OutputFormat::parse("json"), Some(OutputFormat::Json));
        assert_eq!(
            OutputFormat::parse("checkstyle"),
            Some(OutputFormat::Checkstyle)
        );
        assert_eq!(OutputFormat::parse("sarif"), None);
    }

    #[test]
    fn position_of_reads_spans_from_the_store() {
        let store = SourceStore::new();
        store
            .open_inline("doc.yaml", "a: 1\nb:\n  c: 2\n")
            .unwrap();
        let step = LocationStep::new("doc.yaml", "#/b/c");
        assert_eq!(position_of(&store, &step), (3, 6));
        let key_step = LocationStep::new("doc.yaml", "#/b/c").on_key();
        assert_eq!(position_of(&store, &key_step), (3, 3));
    }
}
