//! Word-frequency analysis of translated headlines.
//!
//! The analysis is a short, pure pipeline:
//!
//! 1. [`normalizer`]: lowercase and split each headline into tokens
//! 2. [`counter`]: sum token occurrences into a [`FrequencyTable`]
//! 3. [`filter`]: keep words seen at least `min_occurrences` times
//! 4. [`presenter`]: rank by count and render the report
//!
//! Every call to [`analyze`] builds its own table; nothing is shared between
//! runs. Headlines that failed translation arrive in their original language
//! and are counted like any other text.

pub mod counter;
pub mod filter;
pub mod normalizer;
pub mod presenter;

pub use counter::{FrequencyTable, count_words};
pub use filter::filter_repeated;
pub use presenter::{RankedResult, render_report};

use thiserror::Error;
use tracing::{info, instrument};

/// Default minimum number of occurrences for a word to be reported.
pub const DEFAULT_MIN_OCCURRENCES: usize = 3;

/// Errors raised by the analysis core.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("invalid configuration: min_occurrences must be a positive integer, got {min_occurrences}")]
    InvalidConfiguration { min_occurrences: usize },
}

/// Count, filter and rank the words of `headlines`.
///
/// # Errors
///
/// [`AnalysisError::InvalidConfiguration`] when `min_occurrences` is zero.
///
/// # Examples
///
/// ```ignore
/// let ranked = analyze(&["The crisis", "The vote", "The end"], 3)?;
/// assert_eq!(ranked.get("the"), Some(3));
/// ```
#[instrument(level = "info", skip(headlines), fields(headlines = headlines.len()))]
pub fn analyze<S: AsRef<str>>(
    headlines: &[S],
    min_occurrences: usize,
) -> Result<RankedResult, AnalysisError> {
    let counts = count_words(headlines);
    let repeated = filter_repeated(&counts, min_occurrences)?;
    let ranked = RankedResult::from_table(&repeated);
    info!(
        unique_words = counts.len(),
        repeated_words = ranked.len(),
        "Word frequency analysis complete"
    );
    Ok(ranked)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyze_headers() {
        let headers = [
            "The European Union and the crisis",
            "The political crisis in Europe",
            "European leaders discuss the situation",
        ];

        let results = analyze(&headers, 3).unwrap();

        // "the" occurs twice in the first headline, once in each of the others.
        assert_eq!(results.get("the"), Some(4));
        assert_eq!(results.get("european"), None);
    }

    #[test]
    fn test_analyze_empty_headers() {
        let headers: Vec<String> = Vec::new();
        assert!(analyze(&headers, 3).unwrap().is_empty());
    }

    #[test]
    fn test_analyze_case_insensitive() {
        assert_eq!(
            analyze(&["The Cat"], 1).unwrap(),
            analyze(&["the cat"], 1).unwrap()
        );
    }

    #[test]
    fn test_analyze_short_words_excluded() {
        let results = analyze(&["A big ox"], 1).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results.get("big"), Some(1));
        assert_eq!(results.get("a"), None);
        assert_eq!(results.get("ox"), None);
    }

    #[test]
    fn test_analyze_threshold_bounds() {
        let headers = ["red fox", "red hen", "red owl"];
        let all = analyze(&headers, 1).unwrap();
        assert_eq!(all.len(), 4);

        let none = analyze(&headers, 4).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_analyze_mixed_language_input() {
        let headers = ["The vote", "La votación", "The result", "The end"];
        let results = analyze(&headers, 3).unwrap();
        assert_eq!(results.get("the"), Some(3));
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn test_analyze_zero_threshold() {
        assert_eq!(
            analyze(&["anything"], 0),
            Err(AnalysisError::InvalidConfiguration { min_occurrences: 0 })
        );
    }

    #[test]
    fn test_analyze_logging_is_scoped() {
        use tracing::subscriber::with_default;
        use tracing_subscriber::fmt;

        let subscriber = fmt().with_writer(std::io::sink).finish();
        let results = with_default(subscriber, || analyze(&["same same same"], 3).unwrap());
        assert_eq!(results.get("same"), Some(3));
    }
}
