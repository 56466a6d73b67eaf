use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vaptrack_core::{ProjectId, ReportId, UserId};

use crate::Finding;

/// Summary prefix marking a report produced by regeneration.
pub const REGENERATED_PREFIX: &str = "Regenerated — ";

/// A generated report artifact. Immutable once created: regeneration inserts
/// a new row pointing at a new file and never touches the old one, so old
/// download URLs keep resolving.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub id: ReportId,
    pub project_id: ProjectId,
    pub tester_id: UserId,
    pub file_path: String,
    /// Text snapshot taken at generation time.
    pub summary: String,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a report row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReport {
    pub project_id: ProjectId,
    pub tester_id: UserId,
    pub file_path: String,
    pub summary: String,
}

/// Single-line project summary: total findings plus Critical/High counts.
pub fn summary_line(total: usize, critical: usize, high: usize) -> String {
    format!("Findings: {total} (Critical: {critical}, High: {high})")
}

/// Compute the summary line for a set of findings.
///
/// Severity is free text, so matching is exact on the conventional values.
pub fn summarize_findings(findings: &[Finding]) -> String {
    let critical = findings.iter().filter(|f| f.severity == "Critical").count();
    let high = findings.iter().filter(|f| f.severity == "High").count();
    summary_line(findings.len(), critical, high)
}
