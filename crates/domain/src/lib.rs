//! `vaptrack-domain`: entity records and pure workflow logic.
//!
//! Nothing in this crate touches storage, files, or HTTP. Board ordering,
//! summary formatting, and client aggregation are plain functions over rows
//! so they can be tested without a database.

pub mod client;
pub mod finding;
pub mod project;
pub mod report;
pub mod summaries;
pub mod task;
pub mod user;

pub use client::{Client, NewClient};
pub use finding::{Finding, NewFinding, STATUS_OPEN};
pub use project::{NewProject, Project};
pub use report::{NewReport, REGENERATED_PREFIX, Report, summary_line, summarize_findings};
pub use summaries::{ClientSummary, client_summaries};
pub use task::{Board, NewTask, ServiceTask, Stage, next_order_index, partition_board};
pub use user::User;
