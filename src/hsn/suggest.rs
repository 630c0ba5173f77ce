//! Fuzzy "did you mean" suggestions for unknown codes
//!
//! Similarity is `strsim::normalized_levenshtein`: one minus the edit
//! distance divided by the longer string's length. Codes are compared as
//! plain strings, so "01021090" vs "01021099" scores 0.875.

use super::CodeTable;
use serde::Serialize;
use std::cmp::Ordering;

/// A known code close to the one that was asked for
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CodeSuggestion {
    pub code: String,
    pub description: String,
    pub score: f64,
}

/// Tunables for suggestion ranking
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SuggestionConfig {
    /// Maximum number of suggestions returned
    pub limit: usize,
    /// Minimum similarity (inclusive)
    pub cutoff: f64,
}

impl Default for SuggestionConfig {
    fn default() -> Self {
        Self {
            limit: 5,
            cutoff: 0.5,
        }
    }
}

impl From<&crate::config::HsnConfig> for SuggestionConfig {
    fn from(config: &crate::config::HsnConfig) -> Self {
        Self {
            limit: config.max_suggestions,
            cutoff: config.suggestion_cutoff,
        }
    }
}

/// Similarity between two codes in [0, 1]
pub fn code_similarity(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(a, b)
}

/// Rank table codes by similarity to `code`
///
/// Ties are broken by ascending code so results are stable.
pub fn suggest(table: &CodeTable, code: &str, config: SuggestionConfig) -> Vec<CodeSuggestion> {
    if config.limit == 0 {
        return Vec::new();
    }

    let mut scored: Vec<(f64, &str, &str)> = table
        .iter()
        .map(|(candidate, description)| (code_similarity(code, candidate), candidate, description))
        .filter(|(score, _, _)| *score >= config.cutoff)
        .collect();

    scored.sort_by(|a, b| {
        b.0.partial_cmp(&a.0)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.1.cmp(b.1))
    });
    scored.truncate(config.limit);

    scored
        .into_iter()
        .map(|(score, candidate, description)| CodeSuggestion {
            code: candidate.to_string(),
            description: description.to_string(),
            score,
        })
        .collect()
}
