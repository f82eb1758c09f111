//! Ranking and the word-frequency report.

use super::counter::FrequencyTable;
use serde::Serialize;
use std::io::{self, Write};

/// A word and how often it appeared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedWord {
    pub word: String,
    pub count: usize,
}

/// Repeated words ordered by count, most frequent first.
///
/// Words with equal counts keep the order in which they were first seen in
/// the headlines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RankedResult {
    words: Vec<RankedWord>,
}

impl RankedResult {
    /// Rank a filtered table. The sort is stable, so ties stay in first-seen order.
    pub fn from_table(table: &FrequencyTable) -> Self {
        let mut words: Vec<RankedWord> = table
            .iter()
            .map(|(word, count)| RankedWord {
                word: word.to_string(),
                count,
            })
            .collect();
        words.sort_by(|a, b| b.count.cmp(&a.count));
        Self { words }
    }

    /// Number of distinct words that survived filtering.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn get(&self, word: &str) -> Option<usize> {
        self.words.iter().find(|w| w.word == word).map(|w| w.count)
    }

    pub fn words(&self) -> &[RankedWord] {
        &self.words
    }
}

const BANNER_WIDTH: usize = 60;

/// Write the human-readable analysis report.
///
/// An empty result produces an explicit "no words found" line instead of an
/// empty table.
pub fn render_report<W: Write>(
    result: &RankedResult,
    min_occurrences: usize,
    out: &mut W,
) -> io::Result<()> {
    let banner = "=".repeat(BANNER_WIDTH);
    writeln!(out, "\n{banner}")?;
    writeln!(out, "WORD FREQUENCY ANALYSIS")?;
    writeln!(out, "{banner}")?;
    writeln!(
        out,
        "\nWords appearing at least {min_occurrences} times:\n"
    )?;

    if result.is_empty() {
        writeln!(
            out,
            "No words found appearing at least {min_occurrences} times."
        )?;
    } else {
        writeln!(out, "{:<20} {:>10}", "Word", "Count")?;
        writeln!(out, "{}", "-".repeat(32))?;
        for entry in result.words() {
            writeln!(out, "{:<20} {:>10}", entry.word, entry.count)?;
        }
    }

    writeln!(out, "\n{banner}\n")?;
    Ok(())
}
