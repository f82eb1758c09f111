//! Headline tokenization.
//!
//! Text is lowercased and scanned for word-bounded runs of `a`..`z`. The word
//! boundary is Unicode-aware, so a run glued to an accented letter, a digit or
//! an underscore is not a token at all: `"política"` yields nothing and
//! `"covid19"` yields nothing. Candidates shorter than [`MIN_TOKEN_LEN`] are
//! dropped.

use once_cell::sync::Lazy;
use regex::Regex;

/// Shortest word that survives tokenization.
pub const MIN_TOKEN_LEN: usize = 3;

static WORD_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[a-z]+\b").unwrap());

/// Split a headline into normalized tokens, in order of appearance.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(tokenize("A big ox"), vec!["big"]);
/// assert_eq!(tokenize("The Cat!"), vec!["the", "cat"]);
/// ```
pub fn tokenize(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    WORD_PATTERN
        .find_iter(&lower)
        .map(|m| m.as_str())
        .filter(|word| word.len() >= MIN_TOKEN_LEN)
        .map(str::to_owned)
        .collect()
}
