//! "ends with / begins with / contains <digits>" searches over the table

use super::CodeTable;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::fmt::Write as _;
use std::sync::OnceLock;

/// Ancestor levels inspected when explaining a catch-all entry, longest first
const OTHER_ANCESTOR_LEVELS: [usize; 3] = [6, 4, 2];

/// How the digits are matched against each code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternMode {
    EndsWith,
    BeginsWith,
    Contains,
}

impl PatternMode {
    fn matches(self, code: &str, digits: &str) -> bool {
        match self {
            Self::EndsWith => code.ends_with(digits),
            Self::BeginsWith => code.starts_with(digits),
            Self::Contains => code.contains(digits),
        }
    }
}

impl fmt::Display for PatternMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EndsWith => write!(f, "ends with"),
            Self::BeginsWith => write!(f, "begins with"),
            Self::Contains => write!(f, "contains"),
        }
    }
}

/// A recognised pattern request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodePattern {
    pub mode: PatternMode,
    pub digits: String,
}

/// A code matching the pattern
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatternSuggestion {
    pub code: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

/// Result of a pattern search the matcher accepted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PatternOutcome {
    Suggestions {
        pattern: CodePattern,
        suggestions: Vec<PatternSuggestion>,
        message: String,
    },
    NoMatches {
        pattern: CodePattern,
        message: String,
    },
}

fn pattern_regexes() -> &'static [(PatternMode, Regex); 3] {
    static PATTERNS: OnceLock<[(PatternMode, Regex); 3]> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            (
                PatternMode::EndsWith,
                Regex::new(r"(?i)ends? with ([0-9]+)").unwrap(),
            ),
            (
                PatternMode::BeginsWith,
                Regex::new(r"(?i)(?:begins|starts) with ([0-9]+)").unwrap(),
            ),
            (
                PatternMode::Contains,
                Regex::new(r"(?i)(?:contains|has) ([0-9]+)").unwrap(),
            ),
        ]
    })
}

/// Recognise a pattern request in free text
///
/// When several phrases appear, ends-with wins over begins-with, which wins
/// over contains.
pub fn detect_pattern(text: &str) -> Option<CodePattern> {
    pattern_regexes().iter().find_map(|(mode, re)| {
        re.captures(text).map(|caps| CodePattern {
            mode: *mode,
            digits: caps[1].to_string(),
        })
    })
}

fn is_other(description: &str) -> bool {
    description.trim().eq_ignore_ascii_case("OTHER")
}

/// Explanation for an "OTHER" entry naming its nearest meaningful ancestor
pub fn explain_other(table: &CodeTable, code: &str) -> Option<String> {
    OTHER_ANCESTOR_LEVELS
        .iter()
        .filter(|&&len| len < code.len())
        .find_map(|&len| {
            table
                .described(&code[..len])
                .filter(|description| !is_other(description))
        })
        .map(|ancestor| {
            format!(
                "This 'OTHER' is the catch-all category under '{}'.",
                ancestor
            )
        })
}

/// Run a pattern search for `text`
///
/// Returns `None` when the table is empty or no pattern phrase is present,
/// leaving the caller to fall back to retrieval.
pub fn match_pattern(table: &CodeTable, text: &str, limit: usize) -> Option<PatternOutcome> {
    if table.is_empty() {
        return None;
    }
    let pattern = detect_pattern(text)?;
    Some(search(table, pattern, limit))
}

/// Filter the table by an already-detected pattern
pub fn search(table: &CodeTable, pattern: CodePattern, limit: usize) -> PatternOutcome {
    let suggestions: Vec<PatternSuggestion> = table
        .iter()
        .filter(|(code, _)| pattern.mode.matches(code, &pattern.digits))
        .take(limit)
        .map(|(code, description)| PatternSuggestion {
            code: code.to_string(),
            description: description.to_string(),
            explanation: if is_other(description) {
                explain_other(table, code)
            } else {
                None
            },
        })
        .collect();

    if suggestions.is_empty() {
        let message = format!(
            "No HSN codes {} '{}' were found in the master list.",
            pattern.mode, pattern.digits
        );
        return PatternOutcome::NoMatches { pattern, message };
    }

    let mut message = format!(
        "I found these HSN codes that {} '{}':",
        pattern.mode, pattern.digits
    );
    for s in &suggestions {
        let _ = write!(message, "\n- {}: {}", s.code, s.description);
        if let Some(explanation) = &s.explanation {
            let _ = write!(message, " — {}", explanation);
        }
    }
    message.push_str("\n\nDo any of these look right? Or tell me more about the product/service.");

    PatternOutcome::Suggestions {
        pattern,
        suggestions,
        message,
    }
}
