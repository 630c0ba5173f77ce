//! HSN (Harmonized System Nomenclature) code table and lookups
//!
//! This module provides:
//! - Loading the master table from CSV/TSV or a spreadsheet
//! - Validation of free-text code lists with hierarchy reconstruction
//! - Fuzzy suggestions for unknown codes
//! - "ends with / begins with / contains" pattern search

mod loader;
mod pattern;
mod suggest;
mod validate;

pub use loader::*;
pub use pattern::*;
pub use suggest::*;
pub use validate::*;

use std::collections::BTreeMap;

/// Prefix lengths that make up the code hierarchy, broadest first
pub const HIERARCHY_LEVELS: [usize; 4] = [2, 4, 6, 8];

/// Shortest valid code length
pub const MIN_CODE_LEN: usize = 2;

/// Longest valid code length
pub const MAX_CODE_LEN: usize = 8;

/// Whether `code` is 2-8 ASCII digits
pub fn is_well_formed_code(code: &str) -> bool {
    (MIN_CODE_LEN..=MAX_CODE_LEN).contains(&code.len()) && code.bytes().all(|b| b.is_ascii_digit())
}

/// In-memory HSN master table: code -> description, ordered by code
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeTable {
    entries: BTreeMap<String, String>,
}

impl CodeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an entry. Returns false if the code is malformed.
    pub fn insert(&mut self, code: impl Into<String>, description: impl Into<String>) -> bool {
        let code = code.into();
        if !is_well_formed_code(&code) {
            return false;
        }
        self.entries.insert(code, description.into());
        true
    }

    pub fn get(&self, code: &str) -> Option<&str> {
        self.entries.get(code).map(String::as_str)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.entries.contains_key(code)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Codes in ascending order
    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// (code, description) pairs in ascending code order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(c, d)| (c.as_str(), d.as_str()))
    }

    /// Description for `code` if it has a non-blank one
    pub(crate) fn described(&self, code: &str) -> Option<&str> {
        self.get(code).map(str::trim).filter(|d| !d.is_empty())
    }
}

impl<C, D> FromIterator<(C, D)> for CodeTable
where
    C: Into<String>,
    D: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (C, D)>>(iter: I) -> Self {
        let mut table = CodeTable::new();
        for (code, description) in iter {
            table.insert(code, description);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_well_formed_codes() {
        assert!(is_well_formed_code("01"));
        assert!(is_well_formed_code("01021090"));
        assert!(!is_well_formed_code("1"));
        assert!(!is_well_formed_code("010210901"));
        assert!(!is_well_formed_code("01a2"));
        assert!(!is_well_formed_code("٠١٠٢"));
        assert!(!is_well_formed_code(""));
    }

    #[test]
    fn test_table_rejects_malformed_codes() {
        let mut table = CodeTable::new();
        assert!(table.insert("0102", "LIVE BOVINE ANIMALS"));
        assert!(!table.insert("x1", "bad"));
        assert!(!table.insert("123456789", "too long"));
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("0102"), Some("LIVE BOVINE ANIMALS"));
    }

    #[test]
    fn test_table_iterates_in_code_order() {
        let table: CodeTable = [("0300", "c"), ("0199", "a"), ("0299", "b")]
            .into_iter()
            .collect();
        let codes: Vec<&str> = table.codes().collect();
        assert_eq!(codes, vec!["0199", "0299", "0300"]);
    }
}
