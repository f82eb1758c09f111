//! Minimum-occurrence filtering.

use super::AnalysisError;
use super::counter::FrequencyTable;
use tracing::info;

/// Keep only words seen at least `min_occurrences` times.
///
/// # Errors
///
/// [`AnalysisError::InvalidConfiguration`] when `min_occurrences` is zero.
pub fn filter_repeated(
    table: &FrequencyTable,
    min_occurrences: usize,
) -> Result<FrequencyTable, AnalysisError> {
    if min_occurrences == 0 {
        return Err(AnalysisError::InvalidConfiguration {
            min_occurrences,
        });
    }

    let repeated: FrequencyTable = table
        .iter()
        .filter(|(_, count)| *count >= min_occurrences)
        .map(|(word, count)| (word.to_string(), count))
        .collect();

    info!(
        words = repeated.len(),
        min_occurrences, "Filtered repeated words"
    );
    Ok(repeated)
}
