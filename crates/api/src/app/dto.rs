use chrono::NaiveDate;
use serde::Deserialize;

use vaptrack_core::ProjectId;
use vaptrack_domain::Stage;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub project_id: ProjectId,
    pub title: String,
    pub severity: String,
    #[serde(default)]
    pub description: String,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct MoveTaskRequest {
    pub stage: Stage,
    pub order_index: Option<i64>,
}

// -------------------------
// Query DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct ProjectQuery {
    pub project_id: ProjectId,
}

#[derive(Debug, Deserialize)]
pub struct ReportsQuery {
    pub project_id: Option<ProjectId>,
}
