//! Master table loading from delimited text or spreadsheets

use super::{is_well_formed_code, CodeTable};
use calamine::{open_workbook_auto, Data, Range, Reader};
use csv::ReaderBuilder;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Column holding the code
pub const CODE_COLUMN: &str = "HSNCode";

/// Column holding the description
pub const DESCRIPTION_COLUMN: &str = "Description";

const SPREADSHEET_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Why a master file could not be turned into a table
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("HSN master file not found: {}", .path.display())]
    FileNotFound { path: PathBuf },

    #[error("Could not parse {}: {reason}", .path.display())]
    ParseFailure { path: PathBuf, reason: String },

    #[error("Expected columns {expected:?} but found {found:?}")]
    MissingColumns {
        expected: Vec<String>,
        found: Vec<String>,
    },
}

/// A freshly loaded table plus bookkeeping for the caller
#[derive(Debug, Clone)]
pub struct LoadedTable {
    pub table: CodeTable,
    pub report: LoadReport,
}

/// Summary of a load
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LoadReport {
    pub path: String,
    pub loaded_rows: usize,
    pub skipped_rows: usize,
}

/// Header row plus data rows, before column selection
#[derive(Debug)]
struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RawTable {
    fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    fn has_required_columns(&self) -> bool {
        self.column(CODE_COLUMN).is_some() && self.column(DESCRIPTION_COLUMN).is_some()
    }
}

/// Strip whitespace, a BOM, and surrounding quotes from a header cell
fn normalize_header(raw: &str) -> String {
    raw.trim()
        .trim_matches('\u{feff}')
        .trim()
        .trim_matches('"')
        .trim_matches('\'')
        .to_string()
}

fn is_spreadsheet(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SPREADSHEET_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Load the master table at `path`
///
/// Spreadsheets are read from their first worksheet. Text files are parsed
/// comma-delimited first and tab-delimited when that pass fails or does not
/// produce the required columns.
pub fn load_code_table(path: &Path) -> Result<LoadedTable, LoadError> {
    if !path.exists() {
        return Err(LoadError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let raw = if is_spreadsheet(path) {
        read_spreadsheet(path)?
    } else {
        read_delimited_any(path)?
    };

    let loaded = build_table(path, raw)?;
    info!(
        "Loaded {} HSN codes from {} ({} rows skipped)",
        loaded.report.loaded_rows,
        path.display(),
        loaded.report.skipped_rows
    );
    Ok(loaded)
}

fn read_delimited_any(path: &Path) -> Result<RawTable, LoadError> {
    match read_delimited(path, b',') {
        Ok(raw) if raw.has_required_columns() => Ok(raw),
        comma => {
            debug!(
                "Comma-delimited pass unusable for {}, retrying tab-delimited",
                path.display()
            );
            match (comma, read_delimited(path, b'\t')) {
                (_, Ok(tab)) if tab.has_required_columns() => Ok(tab),
                (Ok(raw), _) => Ok(raw),
                (Err(_), Ok(tab)) => Ok(tab),
                (Err(err), Err(_)) => Err(LoadError::ParseFailure {
                    path: path.to_path_buf(),
                    reason: format!("neither comma- nor tab-delimited parsing succeeded ({})", err),
                }),
            }
        }
    }
}

fn read_delimited(path: &Path, delimiter: u8) -> Result<RawTable, csv::Error> {
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(false)
        .from_path(path)?;

    let headers = reader.headers()?.iter().map(normalize_header).collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(ToString::to_string).collect());
    }

    Ok(RawTable { headers, rows })
}

fn read_spreadsheet(path: &Path) -> Result<RawTable, LoadError> {
    let parse_failure = |reason: String| LoadError::ParseFailure {
        path: path.to_path_buf(),
        reason,
    };

    let mut workbook = open_workbook_auto(path).map_err(|e| parse_failure(e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| parse_failure("workbook has no worksheets".to_string()))?
        .map_err(|e| parse_failure(e.to_string()))?;

    raw_from_range(&range).ok_or_else(|| parse_failure("worksheet is empty".to_string()))
}

/// First row is the header; code cells go through [`code_cell`]
fn raw_from_range(range: &Range<Data>) -> Option<RawTable> {
    let mut rows = range.rows();

    let headers: Vec<String> = rows
        .next()?
        .iter()
        .map(|h| normalize_header(&h.to_string()))
        .collect();
    let code_idx = headers.iter().position(|h| h == CODE_COLUMN);

    let rows = rows
        .map(|row| {
            row.iter()
                .enumerate()
                .map(|(idx, cell)| {
                    if Some(idx) == code_idx {
                        code_cell(cell)
                    } else {
                        cell.to_string()
                    }
                })
                .collect()
        })
        .collect();

    Some(RawTable { headers, rows })
}

/// Render a code cell as text
///
/// Numeric cells have lost their leading zeros. Codes always have an even
/// number of digits, so an odd-length number gets its zero back.
fn code_cell(cell: &Data) -> String {
    let digits = match cell {
        Data::Int(n) if *n >= 0 => n.to_string(),
        Data::Float(f) if *f >= 0.0 && f.fract() == 0.0 && *f < 1e15 => format!("{}", *f as u64),
        other => return other.to_string(),
    };

    if digits.len() % 2 == 1 {
        let padded = format!("0{}", digits);
        warn!(
            "Numeric HSN code cell {} read as {} (leading zero restored)",
            digits, padded
        );
        padded
    } else {
        digits
    }
}

fn build_table(path: &Path, raw: RawTable) -> Result<LoadedTable, LoadError> {
    let (code_idx, desc_idx) = match (raw.column(CODE_COLUMN), raw.column(DESCRIPTION_COLUMN)) {
        (Some(c), Some(d)) => (c, d),
        _ => {
            return Err(LoadError::MissingColumns {
                expected: vec![CODE_COLUMN.to_string(), DESCRIPTION_COLUMN.to_string()],
                found: raw.headers,
            })
        }
    };

    let mut table = CodeTable::new();
    let mut skipped_rows = 0;

    for (line, row) in raw.rows.iter().enumerate() {
        let code = row.get(code_idx).map(|c| c.trim()).unwrap_or("");
        if code.is_empty() {
            skipped_rows += 1;
            continue;
        }

        if !is_well_formed_code(code) {
            // +2: one for the header, one for 1-based numbering
            warn!("Skipping row {}: '{}' is not a 2-8 digit code", line + 2, code);
            skipped_rows += 1;
            continue;
        }

        let description = row.get(desc_idx).map(|d| d.trim()).unwrap_or("");
        table.insert(code, description);
    }

    Ok(LoadedTable {
        report: LoadReport {
            path: path.display().to_string(),
            loaded_rows: table.len(),
            skipped_rows,
        },
        table,
    })
}
