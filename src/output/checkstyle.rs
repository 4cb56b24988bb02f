//! Checkstyle XML output formatter.
//!
//! Emits the checkstyle report format understood by most CI annotation
//! tools. Problems are grouped per source file.

use std::collections::BTreeMap;
use std::io::Write;

use super::{position_of, ProblemFormatter};
use crate::problems::{Problem, Severity, Totals};
use crate::source::SourceStore;

/// Formats lint output as checkstyle XML.
pub struct CheckstyleFormatter;

impl CheckstyleFormatter {
    /// Create a new checkstyle formatter.
    pub fn new() -> Self {
        Self
    }
}

impl Default for CheckstyleFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProblemFormatter for CheckstyleFormatter {
    fn format<W: Write>(
        &self,
        problems: &[Problem],
        _totals: &Totals,
        store: &SourceStore,
        writer: &mut W,
    ) -> std::io::Result<()> {
        let mut by_file: BTreeMap<&str, Vec<&Problem>> = BTreeMap::new();
        for problem in problems {
            let file = problem
                .location
                .first()
                .map(|step| step.source.as_str())
                .unwrap_or("");
            by_file.entry(file).or_default().push(problem);
        }

        writeln!(writer, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
        writeln!(writer, r#"<checkstyle version="4.3">"#)?;
        for (file, problems) in by_file {
            writeln!(writer, r#"<file name="{}">"#, xml_escape(file))?;
            for problem in problems {
                let (line, column) = problem
                    .location
                    .first()
                    .map(|step| position_of(store, step))
                    .unwrap_or((1, 1));
                let severity = match problem.severity {
                    Severity::Error => "error",
                    Severity::Warn => "warning",
                };
                writeln!(
                    writer,
                    r#"<error line="{}" column="{}" severity="{}" message="{}" source="{}"/>"#,
                    line,
                    column,
                    severity,
                    xml_escape(&problem.message),
                    xml_escape(&problem.rule_id)
                )?;
            }
            writeln!(writer, "</file>")?;
        }
        writeln!(writer, "</checkstyle>")
    }
}

fn xml_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problems::LocationStep;

    #[test]
    fn escapes_xml_special_characters() {
        assert_eq!(xml_escape("a<b>&\"c\""), "a&lt;b&gt;&amp;&quot;c&quot;");
    }

    #[test]
    fn groups_problems_per_file() {
        let store = SourceStore::new();
        store.open_inline("a.yaml", "x: 1\n").unwrap();
        store.open_inline("b.yaml", "y: 2\n").unwrap();
        let problems = vec![
            Problem {
                rule_id: "spec".into(),
                severity: Severity::Error,
                message: "first".into(),
                suggest: vec![],
                location: vec![LocationStep::new("b.yaml", "#/y")],
                from: None,
            },
            Problem {
                rule_id: "spec".into(),
                severity: Severity::Warn,
                message: "second".into(),
                suggest: vec![],
                location: vec![LocationStep::new("a.yaml", "#/x")],
                from: None,
            },
        ];

        let mut output = Vec::new();
        CheckstyleFormatter::new()
            .format(&problems, &Totals::default(), &store, &mut output)
            .unwrap();
        let text = String::from_utf8(output).unwrap();

        assert!(text.contains(r#"<file name="a.yaml">"#));
        assert!(text.contains(r#"<file name="b.yaml">"#));
        assert!(text.contains(r#"severity="warning""#));
        assert!(text.find("a.yaml").unwrap() < text.find("b.yaml").unwrap());
    }
}
