//! `vaptrack-store`: persistence boundary.
//!
//! Entity access is defined as traits so handlers can be exercised against
//! the in-memory backend while production runs on Postgres. All tester-owned
//! data access takes the tester id explicitly; there is no way to query
//! findings, tasks, or reports without naming an owner.

use std::collections::HashMap;

use async_trait::async_trait;

use vaptrack_auth::Role;
use vaptrack_core::{ClientId, DomainError, DomainResult, ProjectId, ReportId, TaskId, UserId};
use vaptrack_domain::{
    Client, Finding, NewClient, NewFinding, NewProject, NewReport, NewTask, Project, Report,
    ServiceTask, Stage, User,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::{PgStore, ensure_schema};

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user; fails with `Conflict` on a duplicate email.
    async fn insert_user(&self, email: &str, password_hash: &str, role: Role)
    -> DomainResult<User>;

    async fn user_by_email(&self, email: &str) -> DomainResult<Option<User>>;
}

#[async_trait]
pub trait ClientStore: Send + Sync {
    /// Insert a client; fails with `Conflict` on a duplicate name.
    async fn insert_client(&self, new: &NewClient) -> DomainResult<Client>;

    async fn client_by_id(&self, id: ClientId) -> DomainResult<Option<Client>>;

    /// Client rows whose names exactly match any of `names`.
    async fn clients_by_names(&self, names: &[String]) -> DomainResult<Vec<Client>>;
}

#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn insert_project(&self, new: &NewProject) -> DomainResult<Project>;

    async fn project_by_title(&self, title: &str) -> DomainResult<Option<Project>>;

    /// Projects the tester holds an assignment for, id ascending.
    async fn assigned_projects(&self, tester_id: UserId) -> DomainResult<Vec<Project>>;
}

#[async_trait]
pub trait AssignmentStore: Send + Sync {
    /// Grant the tester rights over the project. Idempotent: an existing
    /// pair is left alone rather than duplicated.
    async fn assign(&self, project_id: ProjectId, tester_id: UserId) -> DomainResult<()>;

    async fn is_assigned(&self, tester_id: UserId, project_id: ProjectId) -> DomainResult<bool>;

    /// Gate for every project-scoped tester operation. Side-effect-free.
    async fn ensure_assigned(&self, tester_id: UserId, project_id: ProjectId) -> DomainResult<()> {
        if self.is_assigned(tester_id, project_id).await? {
            Ok(())
        } else {
            Err(DomainError::forbidden("not assigned to this project"))
        }
    }
}

#[async_trait]
pub trait FindingStore: Send + Sync {
    /// Insert a finding with status "open".
    async fn insert_finding(&self, new: &NewFinding) -> DomainResult<Finding>;

    /// Findings for (project, tester), newest first (id descending).
    async fn findings_for(&self, project_id: ProjectId, tester_id: UserId)
    -> DomainResult<Vec<Finding>>;

    /// Open-finding count per project for this tester, keyed by project id.
    /// Projects with no open findings are absent from the map.
    async fn open_finding_counts(
        &self,
        tester_id: UserId,
        project_ids: &[ProjectId],
    ) -> DomainResult<HashMap<ProjectId, i64>>;
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Insert a task in `Stage::NotStarted` at `new.order_index`.
    ///
    /// The caller computes `order_index` from [`TaskStore::max_order_index`];
    /// the read and the insert are deliberately separate calls, so
    /// concurrent creations can assign duplicate indices (accepted
    /// best-effort ordering, tie-broken on read by id descending).
    async fn insert_task(&self, new: &NewTask) -> DomainResult<ServiceTask>;

    /// Highest order_index in the (project, tester, stage) bucket.
    async fn max_order_index(
        &self,
        project_id: ProjectId,
        tester_id: UserId,
        stage: Stage,
    ) -> DomainResult<Option<i64>>;

    /// The task, only if it exists and belongs to `tester_id`.
    async fn task_owned(&self, id: TaskId, tester_id: UserId)
    -> DomainResult<Option<ServiceTask>>;

    /// Move a task to `stage`, optionally repositioning it. Sibling indices
    /// are never re-packed. `NotFound` if the task is missing or not owned.
    async fn update_task_stage(
        &self,
        id: TaskId,
        tester_id: UserId,
        stage: Stage,
        order_index: Option<i64>,
    ) -> DomainResult<ServiceTask>;

    /// All of the tester's tasks in the project, unordered.
    async fn tasks_for(&self, project_id: ProjectId, tester_id: UserId)
    -> DomainResult<Vec<ServiceTask>>;
}

#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn insert_report(&self, new: &NewReport) -> DomainResult<Report>;

    /// The report, only if it exists and belongs to `tester_id`.
    async fn report_owned(&self, id: ReportId, tester_id: UserId)
    -> DomainResult<Option<Report>>;

    /// The tester's reports, newest first (created_at descending), optionally
    /// restricted to one project.
    async fn reports_for(
        &self,
        tester_id: UserId,
        project_id: Option<ProjectId>,
    ) -> DomainResult<Vec<Report>>;
}

/// Everything the application layer needs from persistence.
pub trait Store:
    UserStore + ClientStore + ProjectStore + AssignmentStore + FindingStore + TaskStore + ReportStore
{
}

impl<T> Store for T where
    T: UserStore
        + ClientStore
        + ProjectStore
        + AssignmentStore
        + FindingStore
        + TaskStore
        + ReportStore
{
}
