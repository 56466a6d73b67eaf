use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use vaptrack_core::ProjectId;

/// An engagement a tester can be assigned to.
///
/// `client_name` is a soft link (see [`crate::Client`]); `status` is free
/// text by design ("Not Started", "In Progress", ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub client_name: String,
    pub title: String,
    pub status: String,
    pub due_date: Option<NaiveDate>,
}

/// Insert payload for a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProject {
    pub client_name: String,
    pub title: String,
    pub status: String,
    pub due_date: Option<NaiveDate>,
}
