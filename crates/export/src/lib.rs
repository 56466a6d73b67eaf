//! `vaptrack-export`: findings rendered as CSV, spreadsheet, and PDF.
//!
//! All three formats consume the same row matrix from [`finding_rows`], so
//! they cannot drift apart in column order or cell values.

use vaptrack_domain::Finding;

pub mod csv_export;
pub mod pdf;
pub mod xlsx;

pub use csv_export::findings_to_csv;
pub use pdf::{GenpdfRenderer, ReportDoc, ReportRenderer};
pub use xlsx::findings_to_xlsx;

/// Fixed export column order, shared by CSV and spreadsheet output.
pub const COLUMNS: [&str; 7] = [
    "id",
    "project_id",
    "title",
    "severity",
    "status",
    "description",
    "poc_path",
];

/// Render findings into the shared row matrix (no header row).
pub fn finding_rows(findings: &[Finding]) -> Vec<[String; 7]> {
    findings
        .iter()
        .map(|f| {
            [
                f.id.to_string(),
                f.project_id.to_string(),
                f.title.clone(),
                f.severity.clone(),
                f.status.clone(),
                f.description.clone(),
                f.poc_path.clone().unwrap_or_default(),
            ]
        })
        .collect()
}
