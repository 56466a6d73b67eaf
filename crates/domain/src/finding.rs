use serde::{Deserialize, Serialize};

use vaptrack_core::{FindingId, ProjectId, UserId};

/// Default status a finding is created with.
pub const STATUS_OPEN: &str = "open";

/// A reported security issue, owned by the tester who uploaded it.
///
/// Findings are append-only: created once, never updated (a status-mutation
/// endpoint is a known gap). `severity` and `status` are stored as free text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub id: FindingId,
    pub project_id: ProjectId,
    pub tester_id: UserId,
    pub title: String,
    pub severity: String,
    pub description: String,
    pub poc_path: Option<String>,
    pub status: String,
}

/// Insert payload for a finding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFinding {
    pub project_id: ProjectId,
    pub tester_id: UserId,
    pub title: String,
    pub severity: String,
    pub description: String,
    pub poc_path: Option<String>,
}
