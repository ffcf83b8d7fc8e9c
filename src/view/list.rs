use std::fmt::Write;

use crate::api::{MatchResult, ResultsCollection};

/// Pure projection of a results collection into display rows.
///
/// Rows come out in the order the server sent them; nothing is sorted,
/// deduplicated or checked for empty names.
pub struct ResultsList<'a> {
    data: &'a ResultsCollection,
}

impl<'a> ResultsList<'a> {
    pub fn new(data: &'a ResultsCollection) -> Self {
        ResultsList { data }
    }

    pub fn rows(&self) -> Vec<String> {
        self.data.results.iter().map(row).collect()
    }

    /// Numbered list, one line per row.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (i, line) in self.rows().iter().enumerate() {
            let _ = writeln!(out, "  {}. {}", i + 1, line);
        }
        out
    }
}

fn row(result: &MatchResult) -> String {
    format!("black = {}, white = {}", result.black, result.white)
}
