use core::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use vaptrack_core::{DomainError, ProjectId, TaskId, UserId};

/// Kanban pipeline stage, displayed in this fixed order.
///
/// The pipeline reads forward (not_started → in_progress → validated) but
/// the move operation accepts any target stage from any source stage; that
/// flexibility exists for manual correction and is intentional.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    NotStarted,
    InProgress,
    Validated,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::NotStarted => "not_started",
            Stage::InProgress => "in_progress",
            Stage::Validated => "validated",
        }
    }
}

impl core::fmt::Display for Stage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_started" => Ok(Stage::NotStarted),
            "in_progress" => Ok(Stage::InProgress),
            "validated" => Ok(Stage::Validated),
            other => Err(DomainError::validation(format!("unknown stage: {other}"))),
        }
    }
}

/// A kanban work item tracking pentest workflow progress, independent of
/// findings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceTask {
    pub id: TaskId,
    pub project_id: ProjectId,
    pub tester_id: UserId,
    pub title: String,
    pub description: String,
    pub severity: String,
    pub stage: Stage,
    pub due_date: Option<NaiveDate>,
    /// Display position within the task's (project, tester, stage) bucket.
    /// Assigned max+1 on insert, never re-packed; duplicates from concurrent
    /// inserts are tolerated and tie-broken by id descending.
    pub order_index: i64,
}

/// Insert payload for a service task. New tasks always land in
/// `Stage::NotStarted`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub project_id: ProjectId,
    pub tester_id: UserId,
    pub title: String,
    pub description: String,
    pub severity: String,
    pub due_date: Option<NaiveDate>,
    pub order_index: i64,
}

/// The three stage buckets a project board is partitioned into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Board {
    pub not_started: Vec<ServiceTask>,
    pub in_progress: Vec<ServiceTask>,
    pub validated: Vec<ServiceTask>,
}

/// Next order index for an insert, given the current per-bucket maximum.
pub fn next_order_index(current_max: Option<i64>) -> i64 {
    current_max.unwrap_or(0) + 1
}

/// Partition tasks into stage buckets, each ordered by `order_index`
/// ascending with id descending as the tie-break.
pub fn partition_board(mut tasks: Vec<ServiceTask>) -> Board {
    tasks.sort_by(|a, b| {
        a.order_index
            .cmp(&b.order_index)
            .then(b.id.cmp(&a.id))
    });

    let mut board = Board::default();
    for task in tasks {
        match task.stage {
            Stage::NotStarted => board.not_started.push(task),
            Stage::InProgress => board.in_progress.push(task),
            Stage::Validated => board.validated.push(task),
        }
    }
    board
}
