//! JSON output formatter.
//!
//! Emits the stable problem record shape for tooling integration.

use std::io::Write;

use serde::Serialize;

use super::{position_of, ProblemFormatter};
use crate::problems::{Problem, Totals};
use crate::source::SourceStore;

/// Formats lint output as JSON.
pub struct JsonFormatter;

#[derive(Serialize)]
struct JsonOutput<'a> {
    problems: Vec<JsonProblem<'a>>,
    totals: &'a Totals,
}

#[derive(Serialize)]
struct JsonProblem<'a> {
    #[serde(flatten)]
    problem: &'a Problem,
    line: usize,
    column: usize,
}

impl JsonFormatter {
    /// Create a new JSON formatter.
    pub fn new() -> Self {
        Self
    }
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProblemFormatter for JsonFormatter {
    fn format<W: Write>(
        &self,
        problems: &[Problem],
        totals: &Totals,
        store: &SourceStore,
        writer: &mut W,
    ) -> std::io::Result<()> {
        let output = JsonOutput {
            problems: problems
                .iter()
                .map(|problem| {
                    let (line, column) = problem
                        .location
                        .first()
                        .map(|step| position_of(store, step))
                        .unwrap_or((1, 1));
                    JsonProblem {
                        problem,
                        line,
                        column,
                    }
                })
                .collect(),
            totals,
        };
        serde_json::to_writer_pretty(writer, &output).map_err(std::io::Error::other)
    }
}
