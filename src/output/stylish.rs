//! Human-readable output formatter.
//!
//! Formats problems for terminal display with optional color support.

use std::io::Write;

use super::{position_of, ProblemFormatter};
use crate::problems::{Problem, Severity, Totals};
use crate::source::SourceStore;

/// Formats lint output for human consumption.
pub struct StylishFormatter {
    /// Whether to use colors (ANSI escape codes).
    pub use_color: bool,
}

impl StylishFormatter {
    /// Create a new stylish formatter.
    pub fn new(use_color: bool) -> Self {
        Self { use_color }
    }

    fn severity_label(&self, severity: Severity) -> String {
        if !self.use_color {
            return severity.to_string();
        }
        match severity {
            Severity::Error => console::style("error").red().to_string(),
            Severity::Warn => console::style("warn").yellow().to_string(),
        }
    }
}

impl ProblemFormatter for StylishFormatter {
    fn format<W: Write>(
        &self,
        problems: &[Problem],
        totals: &Totals,
        store: &SourceStore,
        writer: &mut W,
    ) -> std::io::Result<()> {
        for problem in problems {
            writeln!(
                writer,
                "{}[{}]: {}",
                self.severity_label(problem.severity),
                problem.rule_id,
                problem.message
            )?;

            if let Some(step) = problem.location.first() {
                let (line, col) = position_of(store, step);
                writeln!(
                    writer,
                    "  --> {}:{}:{} ({})",
                    step.source, line, col, step.pointer
                )?;
            }
            if let Some(from) = &problem.from {
                writeln!(writer, "   = referenced from {} ({})", from.source, from.pointer)?;
            }
            for suggestion in &problem.suggest {
                writeln!(writer, "   = help: did you mean `{}`?", suggestion)?;
            }
            writeln!(writer)?;
        }

        if totals.errors > 0 || totals.warnings > 0 {
            writeln!(
                writer,
                "Found {} error(s) and {} warning(s){}",
                totals.errors,
                totals.warnings,
                if totals.ignored > 0 {
                    format!("; {} ignored", totals.ignored)
                } else {
                    String::new()
                }
            )?;
        } else {
            writeln!(writer, "No problems found")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problems::LocationStep;

    fn sample_problem() -> Problem {
        Problem {
            rule_id: "spec".into(),
            severity: Severity::Error,
            message: "The field `info` must be present on this level.".into(),
            suggest: vec![],
            location: vec![LocationStep::new("doc.yaml", "#/").on_key()],
            from: None,
        }
    }

    fn store() -> SourceStore {
        let store = SourceStore::new();
        store.open_inline("doc.yaml", "openapi: 3.0.0\n").unwrap();
        store
    }

    #[test]
    fn prints_rule_id_and_location() {
        let formatter = StylishFormatter::new(false);
        let totals = Totals {
            errors: 1,
            warnings: 0,
            ignored: 0,
        };
        let mut output = Vec::new();
        formatter
            .format(&[sample_problem()], &totals, &store(), &mut output)
            .unwrap();
        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("error[spec]"));
        assert!(text.contains("doc.yaml:1:1"));
        assert!(text.contains("Found 1 error(s) and 0 warning(s)"));
    }

    #[test]
    fn reports_clean_runs() {
        let formatter = StylishFormatter::new(false);
        let mut output = Vec::new();
        formatter
            .format(&[], &Totals::default(), &store(), &mut output)
            .unwrap();
        assert!(String::from_utf8(output).unwrap().contains("No problems found"));
    }
}
