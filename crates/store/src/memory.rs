//! In-memory store backend.
//!
//! Backs tests and local development; semantics mirror the Postgres backend,
//! including the non-serialized max-then-insert ordering for task indices.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use vaptrack_auth::Role;
use vaptrack_core::{ClientId, DomainError, DomainResult, ProjectId, ReportId, TaskId, UserId};
use vaptrack_domain::{
    Client, Finding, NewClient, NewFinding, NewProject, NewReport, NewTask, Project, Report,
    STATUS_OPEN, ServiceTask, Stage, User,
};

use crate::{
    AssignmentStore, ClientStore, FindingStore, ProjectStore, ReportStore, TaskStore, UserStore,
};

#[derive(Debug, Default)]
struct Tables {
    users: Vec<User>,
    clients: Vec<Client>,
    projects: Vec<Project>,
    assignments: Vec<(ProjectId, UserId)>,
    findings: Vec<Finding>,
    tasks: Vec<ServiceTask>,
    reports: Vec<Report>,
    next_id: HashMap<&'static str, i64>,
}

impl Tables {
    fn next(&mut self, table: &'static str) -> i64 {
        let counter = self.next_id.entry(table).or_insert(0);
        *counter += 1;
        *counter
    }
}

/// Mutex-guarded tables with serial id assignment.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Tables> {
        // Lock poisoning only happens after a panic in another test thread;
        // propagate it as a panic rather than a fake store error.
        self.inner.lock().expect("memory store mutex poisoned")
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(
        &self,
        email: &str,
        password_hash: &str,
        role: Role,
    ) -> DomainResult<User> {
        let mut tables = self.lock();
        if tables.users.iter().any(|u| u.email == email) {
            return Err(DomainError::conflict(format!("email already exists: {email}")));
        }
        let user = User {
            id: UserId::new(tables.next("users")),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            role,
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn user_by_email(&self, email: &str) -> DomainResult<Option<User>> {
        Ok(self.lock().users.iter().find(|u| u.email == email).cloned())
    }
}

#[async_trait]
impl ClientStore for MemoryStore {
    async fn insert_client(&self, new: &NewClient) -> DomainResult<Client> {
        let mut tables = self.lock();
        if tables.clients.iter().any(|c| c.name == new.name) {
            return Err(DomainError::conflict(format!("client already exists: {}", new.name)));
        }
        let client = Client {
            id: ClientId::new(tables.next("clients")),
            name: new.name.clone(),
            contact_name: new.contact_name.clone(),
            contact_email: new.contact_email.clone(),
            contact_phone: new.contact_phone.clone(),
            notes: new.notes.clone(),
        };
        tables.clients.push(client.clone());
        Ok(client)
    }

    async fn client_by_id(&self, id: ClientId) -> DomainResult<Option<Client>> {
        Ok(self.lock().clients.iter().find(|c| c.id == id).cloned())
    }

    async fn clients_by_names(&self, names: &[String]) -> DomainResult<Vec<Client>> {
        Ok(self
            .lock()
            .clients
            .iter()
            .filter(|c| names.contains(&c.name))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ProjectStore for MemoryStore {
    async fn insert_project(&self, new: &NewProject) -> DomainResult<Project> {
        let mut tables = self.lock();
        let project = Project {
            id: ProjectId::new(tables.next("projects")),
            client_name: new.client_name.clone(),
            title: new.title.clone(),
            status: new.status.clone(),
            due_date: new.due_date,
        };
        tables.projects.push(project.clone());
        Ok(project)
    }

    async fn project_by_title(&self, title: &str) -> DomainResult<Option<Project>> {
        Ok(self.lock().projects.iter().find(|p| p.title == title).cloned())
    }

    async fn assigned_projects(&self, tester_id: UserId) -> DomainResult<Vec<Project>> {
        let tables = self.lock();
        let mut projects: Vec<Project> = tables
            .projects
            .iter()
            .filter(|p| {
                tables
                    .assignments
                    .iter()
                    .any(|(pid, tid)| *pid == p.id && *tid == tester_id)
            })
            .cloned()
            .collect();
        projects.sort_by_key(|p| p.id);
        Ok(projects)
    }
}

#[async_trait]
impl AssignmentStore for MemoryStore {
    async fn assign(&self, project_id: ProjectId, tester_id: UserId) -> DomainResult<()> {
        let mut tables = self.lock();
        if !tables
            .assignments
            .iter()
            .any(|(pid, tid)| *pid == project_id && *tid == tester_id)
        {
            tables.assignments.push((project_id, tester_id));
        }
        Ok(())
    }

    async fn is_assigned(&self, tester_id: UserId, project_id: ProjectId) -> DomainResult<bool> {
        Ok(self
            .lock()
            .assignments
            .iter()
            .any(|(pid, tid)| *pid == project_id && *tid == tester_id))
    }
}

#[async_trait]
impl FindingStore for MemoryStore {
    async fn insert_finding(&self, new: &NewFinding) -> DomainResult<Finding> {
        let mut tables = self.lock();
        let finding = Finding {
            id: vaptrack_core::FindingId::new(tables.next("findings")),
            project_id: new.project_id,
            tester_id: new.tester_id,
            title: new.title.clone(),
            severity: new.severity.clone(),
            description: new.description.clone(),
            poc_path: new.poc_path.clone(),
            status: STATUS_OPEN.to_string(),
        };
        tables.findings.push(finding.clone());
        Ok(finding)
    }

    async fn findings_for(
        &self,
        project_id: ProjectId,
        tester_id: UserId,
    ) -> DomainResult<Vec<Finding>> {
        let mut findings: Vec<Finding> = self
            .lock()
            .findings
            .iter()
            .filter(|f| f.project_id == project_id && f.tester_id == tester_id)
            .cloned()
            .collect();
        findings.sort_by_key(|f| std::cmp::Reverse(f.id));
        Ok(findings)
    }

    async fn open_finding_counts(
        &self,
        tester_id: UserId,
        project_ids: &[ProjectId],
    ) -> DomainResult<HashMap<ProjectId, i64>> {
        let tables = self.lock();
        let mut counts = HashMap::new();
        for finding in &tables.findings {
            if finding.tester_id == tester_id
                && finding.status == STATUS_OPEN
                && project_ids.contains(&finding.project_id)
            {
                *counts.entry(finding.project_id).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn insert_task(&self, new: &NewTask) -> DomainResult<ServiceTask> {
        let mut tables = self.lock();
        let task = ServiceTask {
            id: TaskId::new(tables.next("tasks")),
            project_id: new.project_id,
            tester_id: new.tester_id,
            title: new.title.clone(),
            description: new.description.clone(),
            severity: new.severity.clone(),
            stage: Stage::NotStarted,
            due_date: new.due_date,
            order_index: new.order_index,
        };
        tables.tasks.push(task.clone());
        Ok(task)
    }

    async fn max_order_index(
        &self,
        project_id: ProjectId,
        tester_id: UserId,
        stage: Stage,
    ) -> DomainResult<Option<i64>> {
        Ok(self
            .lock()
            .tasks
            .iter()
            .filter(|t| t.project_id == project_id && t.tester_id == tester_id && t.stage == stage)
            .map(|t| t.order_index)
            .max())
    }

    async fn task_owned(
        &self,
        id: TaskId,
        tester_id: UserId,
    ) -> DomainResult<Option<ServiceTask>> {
        Ok(self
            .lock()
            .tasks
            .iter()
            .find(|t| t.id == id && t.tester_id == tester_id)
            .cloned())
    }

    async fn update_task_stage(
        &self,
        id: TaskId,
        tester_id: UserId,
        stage: Stage,
        order_index: Option<i64>,
    ) -> DomainResult<ServiceTask> {
        let mut tables = self.lock();
        let task = tables
            .tasks
            .iter_mut()
            .find(|t| t.id == id && t.tester_id == tester_id)
            .ok_or(DomainError::NotFound)?;
        task.stage = stage;
        if let Some(index) = order_index {
            task.order_index = index;
        }
        Ok(task.clone())
    }

    async fn tasks_for(
        &self,
        project_id: ProjectId,
        tester_id: UserId,
    ) -> DomainResult<Vec<ServiceTask>> {
        Ok(self
            .lock()
            .tasks
            .iter()
            .filter(|t| t.project_id == project_id && t.tester_id == tester_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ReportStore for MemoryStore {
    async fn insert_report(&self, new: &NewReport) -> DomainResult<Report> {
        let mut tables = self.lock();
        let report = Report {
            id: ReportId::new(tables.next("reports")),
            project_id: new.project_id,
            tester_id: new.tester_id,
            file_path: new.file_path.clone(),
            summary: new.summary.clone(),
            created_at: Utc::now(),
        };
        tables.reports.push(report.clone());
        Ok(report)
    }

    async fn report_owned(
        &self,
        id: ReportId,
        tester_id: UserId,
    ) -> DomainResult<Option<Report>> {
        Ok(self
            .lock()
            .reports
            .iter()
            .find(|r| r.id == id && r.tester_id == tester_id)
            .cloned())
    }

    async fn reports_for(
        &self,
        tester_id: UserId,
        project_id: Option<ProjectId>,
    ) -> DomainResult<Vec<Report>> {
        let mut reports: Vec<Report> = self
            .lock()
            .reports
            .iter()
            .filter(|r| r.tester_id == tester_id)
            .filter(|r| project_id.is_none_or(|p| r.project_id == p))
            .cloned()
            .collect();
        reports.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AssignmentStore;

    fn new_task(project: i64, tester: i64, order_index: i64) -> NewTask {
        NewTask {
            project_id: ProjectId::new(project),
            tester_id: UserId::new(tester),
            title: "recon".to_string(),
            description: String::new(),
            severity: "Medium".to_string(),
            due_date: None,
            order_index,
        }
    }

    #[tokio::test]
    async fn assign_is_idempotent() {
        let store = MemoryStore::new();
        let (p, t) = (ProjectId::new(1), UserId::new(2));

        store.assign(p, t).await.unwrap();
        store.assign(p, t).await.unwrap();

        assert!(store.is_assigned(t, p).await.unwrap());
        assert_eq!(store.lock().assignments.len(), 1);
    }

    #[tokio::test]
    async fn ensure_assigned_rejects_missing_pair() {
        let store = MemoryStore::new();
        let err = store
            .ensure_assigned(UserId::new(1), ProjectId::new(9))
            .await
            .unwrap_err();
        match err {
            DomainError::Forbidden(_) => {}
            other => panic!("expected Forbidden, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn findings_list_newest_first() {
        let store = MemoryStore::new();
        for title in ["first", "second"] {
            store
                .insert_finding(&NewFinding {
                    project_id: ProjectId::new(1),
                    tester_id: UserId::new(2),
                    title: title.to_string(),
                    severity: "High".to_string(),
                    description: String::new(),
                    poc_path: None,
                })
                .await
                .unwrap();
        }

        let findings = store
            .findings_for(ProjectId::new(1), UserId::new(2))
            .await
            .unwrap();
        assert_eq!(findings[0].title, "second");
        assert_eq!(findings[1].title, "first");
        assert!(findings.iter().all(|f| f.status == STATUS_OPEN));
    }

    #[tokio::test]
    async fn interleaved_max_then_insert_duplicates_order_index() {
        // Two creations read the bucket maximum before either inserts.
        // This is the accepted ordering race: both land on the same index.
        let store = MemoryStore::new();
        let (p, t) = (ProjectId::new(1), UserId::new(2));

        let max_a = store.max_order_index(p, t, Stage::NotStarted).await.unwrap();
        let max_b = store.max_order_index(p, t, Stage::NotStarted).await.unwrap();

        let a = store
            .insert_task(&new_task(1, 2, vaptrack_domain::next_order_index(max_a)))
            .await
            .unwrap();
        let b = store
            .insert_task(&new_task(1, 2, vaptrack_domain::next_order_index(max_b)))
            .await
            .unwrap();

        assert_eq!(a.order_index, 1);
        assert_eq!(b.order_index, 1);

        // Reads stay deterministic: the duplicate resolves by id descending.
        let board =
            vaptrack_domain::partition_board(store.tasks_for(p, t).await.unwrap());
        let ids: Vec<i64> = board.not_started.iter().map(|t| t.id.as_i64()).collect();
        assert_eq!(ids, vec![b.id.as_i64(), a.id.as_i64()]);
    }

    #[tokio::test]
    async fn update_task_stage_requires_ownership() {
        let store = MemoryStore::new();
        let task = store.insert_task(&new_task(1, 2, 1)).await.unwrap();

        let err = store
            .update_task_stage(task.id, UserId::new(99), Stage::Validated, None)
            .await
            .unwrap_err();
        assert_eq!(err, DomainError::NotFound);

        let moved = store
            .update_task_stage(task.id, UserId::new(2), Stage::Validated, Some(5))
            .await
            .unwrap();
        assert_eq!(moved.stage, Stage::Validated);
        assert_eq!(moved.order_index, 5);
        assert_eq!(moved.id, task.id);
    }
}
