//! Validation of free-text code lists

use super::{
    is_well_formed_code, suggest, CodeSuggestion, CodeTable, SuggestionConfig, HIERARCHY_LEVELS,
};
use serde::Serialize;
use std::fmt::Write as _;

/// Reason attached to malformed codes
pub const INVALID_FORMAT_REASON: &str = "must be 2–8 digits";

/// Description shown for hierarchy levels missing from the table
pub const NO_ENTRY: &str = "(no entry in master)";

/// One level of a code's parent chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HierarchyEntry {
    pub code: String,
    pub description: String,
    pub exists: bool,
}

/// Outcome for a single candidate code
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ValidationResult {
    InvalidFormat {
        code: String,
        reason: String,
    },
    NotFound {
        code: String,
        suggestions: Vec<CodeSuggestion>,
        message: String,
    },
    Valid {
        code: String,
        description: String,
        hierarchy: Vec<HierarchyEntry>,
        message: String,
    },
}

impl ValidationResult {
    pub fn code(&self) -> &str {
        match self {
            Self::InvalidFormat { code, .. }
            | Self::NotFound { code, .. }
            | Self::Valid { code, .. } => code,
        }
    }

    pub fn status(&self) -> &'static str {
        match self {
            Self::InvalidFormat { .. } => "invalid_format",
            Self::NotFound { .. } => "not_found",
            Self::Valid { .. } => "valid",
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. })
    }
}

/// Split user input on whitespace and commas, dropping empty tokens
pub fn tokenize_codes(raw: &str) -> Vec<&str> {
    raw.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|token| !token.is_empty())
        .collect()
}

/// Validate every code mentioned in `raw`, preserving input order
pub fn validate_codes(
    table: &CodeTable,
    raw: &str,
    suggestions: SuggestionConfig,
) -> Vec<ValidationResult> {
    tokenize_codes(raw)
        .into_iter()
        .map(|code| validate_code(table, code, suggestions))
        .collect()
}

/// Validate a single token
pub fn validate_code(
    table: &CodeTable,
    code: &str,
    suggestions: SuggestionConfig,
) -> ValidationResult {
    if !is_well_formed_code(code) {
        return ValidationResult::InvalidFormat {
            code: code.to_string(),
            reason: INVALID_FORMAT_REASON.to_string(),
        };
    }

    let Some(description) = table.get(code) else {
        let matches = suggest(table, code, suggestions);
        let message = not_found_message(code, &matches);
        return ValidationResult::NotFound {
            code: code.to_string(),
            suggestions: matches,
            message,
        };
    };

    let hierarchy = build_hierarchy(table, code);
    let message = valid_message(code, description, &hierarchy);

    ValidationResult::Valid {
        code: code.to_string(),
        description: description.to_string(),
        hierarchy,
        message,
    }
}

/// Prefixes of `code` at the fixed hierarchy levels it is long enough for
pub fn build_hierarchy(table: &CodeTable, code: &str) -> Vec<HierarchyEntry> {
    HIERARCHY_LEVELS
        .iter()
        .filter(|&&len| code.len() >= len)
        .map(|&len| {
            let prefix = &code[..len];
            match table.described(prefix) {
                Some(description) => HierarchyEntry {
                    code: prefix.to_string(),
                    description: description.to_string(),
                    exists: true,
                },
                None => HierarchyEntry {
                    code: prefix.to_string(),
                    description: NO_ENTRY.to_string(),
                    exists: false,
                },
            }
        })
        .collect()
}

fn valid_message(code: &str, description: &str, hierarchy: &[HierarchyEntry]) -> String {
    let mut message = format!(
        "The HSN code {} is valid and corresponds to:\n\n    {}\n\nIt sits under this hierarchy (broadest → specific):",
        code, description
    );
    for entry in hierarchy {
        let _ = write!(message, "\n- {}: {}", entry.code, entry.description);
    }
    message
}

fn not_found_message(code: &str, suggestions: &[CodeSuggestion]) -> String {
    if suggestions.is_empty() {
        return format!(
            "The HSN code {} was not found in the master list, and no similar codes were found.",
            code
        );
    }

    let mut message = format!(
        "The HSN code {} was not found in the master list. Did you mean one of these?",
        code
    );
    for s in suggestions {
        let _ = write!(message, "\n- {}: {}", s.code, s.description);
    }
    message.push_str("\n\nPlease confirm one of these codes or describe the product/service.");
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> CodeTable {
        [
            ("01", "LIVE ANIMALS"),
            ("0102", "LIVE BOVINE ANIMALS"),
            ("010210", "LIVE BOVINE ANIMALS – BULLS"),
            ("01021090", "PURE-BRED BREEDING ANIMALS OTHER"),
        ]
        .into_iter()
        .collect()
    }

    fn entry(code: &str, description: &str, exists: bool) -> HierarchyEntry {
        HierarchyEntry {
            code: code.to_string(),
            description: description.to_string(),
            exists,
        }
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(
            tokenize_codes(" 0102, 01021090\n\t99 ,,x"),
            vec!["0102", "01021090", "99", "x"]
        );
        assert!(tokenize_codes(" , ").is_empty());
    }

    #[test]
    fn test_valid_code_with_full_hierarchy() {
        let results = validate_codes(&table(), "01021090", SuggestionConfig::default());
        assert_eq!(results.len(), 1);

        match &results[0] {
            ValidationResult::Valid {
                code,
                description,
                hierarchy,
                message,
            } => {
                assert_eq!(code, "01021090");
                assert_eq!(description, "PURE-BRED BREEDING ANIMALS OTHER");
                assert_eq!(
                    hierarchy,
                    &vec![
                        entry("01", "LIVE ANIMALS", true),
                        entry("0102", "LIVE BOVINE ANIMALS", true),
                        entry("010210", "LIVE BOVINE ANIMALS – BULLS", true),
                        entry("01021090", "PURE-BRED BREEDING ANIMALS OTHER", true),
                    ]
                );
                assert!(message.contains("    PURE-BRED BREEDING ANIMALS OTHER"));
                assert!(message.contains("- 0102: LIVE BOVINE ANIMALS"));
            }
            other => panic!("expected valid, got {other:?}"),
        }
    }

    #[test]
    fn test_hierarchy_marks_missing_levels() {
        let t: CodeTable = [("01", "LIVE ANIMALS"), ("010210", "BULLS")]
            .into_iter()
            .collect();
        let hierarchy = build_hierarchy(&t, "010210");
        assert_eq!(
            hierarchy,
            vec![
                entry("01", "LIVE ANIMALS", true),
                entry("0102", NO_ENTRY, false),
                entry("010210", "BULLS", true),
            ]
        );
    }

    #[test]
    fn test_hierarchy_only_includes_levels_within_length() {
        let t = table();
        for code in ["01", "010", "0102", "01021", "010210", "0102109", "01021090"] {
            let hierarchy = build_hierarchy(&t, code);
            let expected: Vec<usize> = HIERARCHY_LEVELS
                .into_iter()
                .filter(|&l| l <= code.len())
                .collect();
            let lengths: Vec<usize> = hierarchy.iter().map(|h| h.code.len()).collect();
            assert_eq!(lengths, expected, "code {code}");
            assert!(hierarchy.iter().all(|h| code.starts_with(&h.code)));
        }
    }

    #[test]
    fn test_single_digit_is_invalid_format() {
        let results = validate_codes(&table(), "1", SuggestionConfig::default());
        assert_eq!(
            results,
            vec![ValidationResult::InvalidFormat {
                code: "1".to_string(),
                reason: INVALID_FORMAT_REASON.to_string(),
            }]
        );
    }

    #[test]
    fn test_malformed_codes_skip_lookup() {
        // "01" exists, but the padded and lettered variants never reach the table
        let results = validate_codes(&table(), "01a 010210901 ab", SuggestionConfig::default());
        assert!(results.iter().all(|r| r.status() == "invalid_format"));
    }

    #[test]
    fn test_absent_code_gets_bounded_suggestions() {
        let t = table();
        let results = validate_codes(&t, "99999999 01021099", SuggestionConfig::default());

        match &results[0] {
            ValidationResult::NotFound {
                suggestions,
                message,
                ..
            } => {
                assert!(suggestions.len() <= 5);
                assert!(suggestions.iter().all(|s| s.score >= 0.5));
                assert!(suggestions.is_empty());
                assert!(message.contains("no similar codes"));
            }
            other => panic!("expected not_found, got {other:?}"),
        }

        match &results[1] {
            ValidationResult::NotFound {
                suggestions,
                message,
                ..
            } => {
                assert_eq!(suggestions[0].code, "01021090");
                assert!(suggestions.iter().all(|s| t.contains(&s.code)));
                assert!(message.contains("Did you mean"));
            }
            other => panic!("expected not_found, got {other:?}"),
        }
    }

    #[test]
    fn test_results_follow_input_order() {
        let results = validate_codes(&table(), "0102,1,55555555", SuggestionConfig::default());
        let statuses: Vec<(&str, &str)> = results.iter().map(|r| (r.code(), r.status())).collect();
        assert_eq!(
            statuses,
            vec![
                ("0102", "valid"),
                ("1", "invalid_format"),
                ("55555555", "not_found"),
            ]
        );
    }

    #[test]
    fn test_serialized_shape() {
        let result = validate_code(&table(), "0102", SuggestionConfig::default());
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "valid");
        assert_eq!(json["code"], "0102");
        assert_eq!(json["hierarchy"][0]["exists"], true);
    }
}
