//! Word counting across a batch of headlines.

use super::normalizer::tokenize;
use indexmap::IndexMap;
use tracing::debug;

/// Occurrence counts for one analysis run.
///
/// Entries iterate in the order each word was first seen. Equality ignores
/// that order and compares only words and counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrequencyTable {
    counts: IndexMap<String, usize>,
}

impl FrequencyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one occurrence of `word`.
    pub fn record(&mut self, word: impl Into<String>) {
        *self.counts.entry(word.into()).or_insert(0) += 1;
    }

    /// Occurrences of `word`, or `0` if it was never seen.
    pub fn count(&self, word: &str) -> usize {
        self.counts.get(word).copied().unwrap_or(0)
    }

    pub fn contains(&self, word: &str) -> bool {
        self.counts.contains_key(word)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Largest count in the table, `0` when empty.
    pub fn max_count(&self) -> usize {
        self.counts.values().copied().max().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.counts.iter().map(|(word, count)| (word.as_str(), *count))
    }
}

impl FromIterator<(String, usize)> for FrequencyTable {
    fn from_iter<I: IntoIterator<Item = (String, usize)>>(iter: I) -> Self {
        let mut table = FrequencyTable::new();
        for (word, count) in iter {
            if count > 0 {
                *table.counts.entry(word).or_insert(0) += count;
            }
        }
        table
    }
}

/// Tokenize every headline and sum the occurrences of each word.
pub fn count_words<S: AsRef<str>>(headlines: &[S]) -> FrequencyTable {
    let mut table = FrequencyTable::new();
    for headline in headlines {
        for token in tokenize(headline.as_ref()) {
            table.record(token);
        }
    }
    debug!(
        headlines = headlines.len(),
        unique_words = table.len(),
        "Counted words"
    );
    table
}
