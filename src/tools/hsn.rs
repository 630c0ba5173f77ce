//! HSN master loading and code validation tools

use super::{ToolContext, ToolResponse};
use crate::hsn::{validate_codes, SuggestionConfig};
use std::path::PathBuf;
use tracing::{error, info};

/// Message returned when validation has no table to work with
pub const MASTER_UNAVAILABLE: &str = "Failed to load HSN master. Please check the CSV path.";

/// Load (or reload) the HSN master table into the session
///
/// `path` defaults to `hsn.master_path` when empty or absent.
pub fn load_hsn_master(ctx: &ToolContext, path: Option<&str>) -> ToolResponse {
    let path = match path.map(str::trim).filter(|p| !p.is_empty()) {
        Some(p) => PathBuf::from(p),
        None => ctx.session.default_master_path().to_path_buf(),
    };

    match ctx.session.reload_code_table(&path) {
        Ok(report) => {
            info!(
                "Loaded {} HSN codes from {} ({} skipped)",
                report.loaded_rows, report.path, report.skipped_rows
            );
            ToolResponse::success(format!(
                "Loaded {} HSN codes from {}",
                report.loaded_rows, report.path
            ))
            .with("loaded_rows", report.loaded_rows)
            .with("skipped_rows", report.skipped_rows)
            .with("path", &report.path)
        }
        Err(e) => {
            error!("Failed to load HSN master: {}", e);
            ToolResponse::error(e.to_string()).with("path", path.display().to_string())
        }
    }
}

/// Validate every code mentioned in `codes`
pub fn validate_hsn_code(ctx: &ToolContext, codes: &str) -> ToolResponse {
    let table = match ctx.session.ensure_code_table() {
        Ok(table) if !table.is_empty() => table,
        Ok(_) => return ToolResponse::error(MASTER_UNAVAILABLE),
        Err(e) => {
            error!("Failed to load HSN master: {}", e);
            return ToolResponse::error(MASTER_UNAVAILABLE).with("detail", e.to_string());
        }
    };

    let results = validate_codes(&table, codes, SuggestionConfig::from(&ctx.config.hsn));
    let valid = results.iter().filter(|r| r.is_valid()).count();
    ToolResponse::success(format!(
        "Checked {} code(s): {} valid, {} not valid",
        results.len(),
        valid,
        results.len() - valid
    ))
    .with("results", results)
}
