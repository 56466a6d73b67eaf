//! Postgres store backend (sqlx).
//!
//! Every tester-owned query carries `tester_id` in the WHERE clause, so
//! cross-tester access is impossible at the SQL level. There are no foreign
//! keys: referential integrity is soft by design (orphans legal on both
//! sides of the Project↔Client name link, no cascades).

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};

use vaptrack_auth::Role;
use vaptrack_core::{ClientId, DomainError, DomainResult, ProjectId, ReportId, TaskId, UserId};
use vaptrack_domain::{
    Client, Finding, NewClient, NewFinding, NewProject, NewReport, NewTask, Project, Report,
    STATUS_OPEN, ServiceTask, Stage, User,
};

use crate::{
    AssignmentStore, ClientStore, FindingStore, ProjectStore, ReportStore, TaskStore, UserStore,
};

/// Create tables if they do not exist yet.
///
/// Schema management is deliberately startup-time DDL rather than versioned
/// migrations; the serial ids must stay `BIGSERIAL` because filenames and
/// download URLs embed them.
pub async fn ensure_schema(pool: &PgPool) -> DomainResult<()> {
    const DDL: &[&str] = &[
        "CREATE TABLE IF NOT EXISTS users (
            id BIGSERIAL PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            role TEXT NOT NULL
        )",
        "CREATE TABLE IF NOT EXISTS clients (
            id BIGSERIAL PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            contact_name TEXT,
            contact_email TEXT,
            contact_phone TEXT,
            notes TEXT
        )",
        "CREATE TABLE IF NOT EXISTS projects (
            id BIGSERIAL PRIMARY KEY,
            client_name TEXT NOT NULL,
            title TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'Not Started',
            due_date DATE
        )",
        "CREATE TABLE IF NOT EXISTS assignments (
            id BIGSERIAL PRIMARY KEY,
            project_id BIGINT NOT NULL,
            tester_id BIGINT NOT NULL
        )",
        "CREATE TABLE IF NOT EXISTS findings (
            id BIGSERIAL PRIMARY KEY,
            project_id BIGINT NOT NULL,
            tester_id BIGINT NOT NULL,
            title TEXT NOT NULL,
            severity TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            poc_path TEXT,
            status TEXT NOT NULL DEFAULT 'open'
        )",
        "CREATE TABLE IF NOT EXISTS service_tasks (
            id BIGSERIAL PRIMARY KEY,
            project_id BIGINT NOT NULL,
            tester_id BIGINT NOT NULL,
            title TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            severity TEXT NOT NULL,
            stage TEXT NOT NULL,
            due_date DATE,
            order_index BIGINT NOT NULL
        )",
        "CREATE TABLE IF NOT EXISTS reports (
            id BIGSERIAL PRIMARY KEY,
            project_id BIGINT NOT NULL,
            tester_id BIGINT NOT NULL,
            file_path TEXT NOT NULL,
            summary TEXT NOT NULL DEFAULT '',
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )",
    ];

    for statement in DDL {
        sqlx::query(statement).execute(pool).await.map_err(store_err)?;
    }
    Ok(())
}

/// Postgres-backed implementation of every store trait.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn store_err(e: sqlx::Error) -> DomainError {
    DomainError::store(e.to_string())
}

fn row_to_user(row: &PgRow) -> DomainResult<User> {
    let role: String = row.try_get("role").map_err(store_err)?;
    Ok(User {
        id: UserId::new(row.try_get("id").map_err(store_err)?),
        email: row.try_get("email").map_err(store_err)?,
        password_hash: row.try_get("password_hash").map_err(store_err)?,
        role: role
            .parse::<Role>()
            .map_err(|_| DomainError::store(format!("corrupt role value: {role}")))?,
    })
}

fn row_to_client(row: &PgRow) -> DomainResult<Client> {
    Ok(Client {
        id: ClientId::new(row.try_get("id").map_err(store_err)?),
        name: row.try_get("name").map_err(store_err)?,
        contact_name: row.try_get("contact_name").map_err(store_err)?,
        contact_email: row.try_get("contact_email").map_err(store_err)?,
        contact_phone: row.try_get("contact_phone").map_err(store_err)?,
        notes: row.try_get("notes").map_err(store_err)?,
    })
}

fn row_to_project(row: &PgRow) -> DomainResult<Project> {
    let due_date: Option<NaiveDate> = row.try_get("due_date").map_err(store_err)?;
    Ok(Project {
        id: ProjectId::new(row.try_get("id").map_err(store_err)?),
        client_name: row.try_get("client_name").map_err(store_err)?,
        title: row.try_get("title").map_err(store_err)?,
        status: row.try_get("status").map_err(store_err)?,
        due_date,
    })
}

fn row_to_finding(row: &PgRow) -> DomainResult<Finding> {
    Ok(Finding {
        id: vaptrack_core::FindingId::new(row.try_get("id").map_err(store_err)?),
        project_id: ProjectId::new(row.try_get("project_id").map_err(store_err)?),
        tester_id: UserId::new(row.try_get("tester_id").map_err(store_err)?),
        title: row.try_get("title").map_err(store_err)?,
        severity: row.try_get("severity").map_err(store_err)?,
        description: row.try_get("description").map_err(store_err)?,
        poc_path: row.try_get("poc_path").map_err(store_err)?,
        status: row.try_get("status").map_err(store_err)?,
    })
}

fn row_to_task(row: &PgRow) -> DomainResult<ServiceTask> {
    let stage: String = row.try_get("stage").map_err(store_err)?;
    let due_date: Option<NaiveDate> = row.try_get("due_date").map_err(store_err)?;
    Ok(ServiceTask {
        id: TaskId::new(row.try_get("id").map_err(store_err)?),
        project_id: ProjectId::new(row.try_get("project_id").map_err(store_err)?),
        tester_id: UserId::new(row.try_get("tester_id").map_err(store_err)?),
        title: row.try_get("title").map_err(store_err)?,
        description: row.try_get("description").map_err(store_err)?,
        severity: row.try_get("severity").map_err(store_err)?,
        stage: stage
            .parse::<Stage>()
            .map_err(|_| DomainError::store(format!("corrupt stage value: {stage}")))?,
        due_date,
        order_index: row.try_get("order_index").map_err(store_err)?,
    })
}

fn row_to_report(row: &PgRow) -> DomainResult<Report> {
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(store_err)?;
    Ok(Report {
        id: ReportId::new(row.try_get("id").map_err(store_err)?),
        project_id: ProjectId::new(row.try_get("project_id").map_err(store_err)?),
        tester_id: UserId::new(row.try_get("tester_id").map_err(store_err)?),
        file_path: row.try_get("file_path").map_err(store_err)?,
        summary: row.try_get("summary").map_err(store_err)?,
        created_at,
    })
}

#[async_trait]
impl UserStore for PgStore {
    async fn insert_user(
        &self,
        email: &str,
        password_hash: &str,
        role: Role,
    ) -> DomainResult<User> {
        let row = sqlx::query(
            "INSERT INTO users (email, password_hash, role)
             VALUES ($1, $2, $3)
             RETURNING id, email, password_hash, role",
        )
        .bind(email)
        .bind(password_hash)
        .bind(role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                DomainError::conflict(format!("email already exists: {email}"))
            }
            _ => store_err(e),
        })?;
        row_to_user(&row)
    }

    async fn user_by_email(&self, email: &str) -> DomainResult<Option<User>> {
        let row = sqlx::query(
            "SELECT id, email, password_hash, role FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;
        row.as_ref().map(row_to_user).transpose()
    }
}

#[async_trait]
impl ClientStore for PgStore {
    async fn insert_client(&self, new: &NewClient) -> DomainResult<Client> {
        let row = sqlx::query(
            "INSERT INTO clients (name, contact_name, contact_email, contact_phone, notes)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id, name, contact_name, contact_email, contact_phone, notes",
        )
        .bind(&new.name)
        .bind(&new.contact_name)
        .bind(&new.contact_email)
        .bind(&new.contact_phone)
        .bind(&new.notes)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                DomainError::conflict(format!("client already exists: {}", new.name))
            }
            _ => store_err(e),
        })?;
        row_to_client(&row)
    }

    async fn client_by_id(&self, id: ClientId) -> DomainResult<Option<Client>> {
        let row = sqlx::query(
            "SELECT id, name, contact_name, contact_email, contact_phone, notes
             FROM clients WHERE id = $1",
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;
        row.as_ref().map(row_to_client).transpose()
    }

    async fn clients_by_names(&self, names: &[String]) -> DomainResult<Vec<Client>> {
        let rows = sqlx::query(
            "SELECT id, name, contact_name, contact_email, contact_phone, notes
             FROM clients WHERE name = ANY($1)",
        )
        .bind(names)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;
        rows.iter().map(row_to_client).collect()
    }
}

#[async_trait]
impl ProjectStore for PgStore {
    async fn insert_project(&self, new: &NewProject) -> DomainResult<Project> {
        let row = sqlx::query(
            "INSERT INTO projects (client_name, title, status, due_date)
             VALUES ($1, $2, $3, $4)
             RETURNING id, client_name, title, status, due_date",
        )
        .bind(&new.client_name)
        .bind(&new.title)
        .bind(&new.status)
        .bind(new.due_date)
        .fetch_one(&self.pool)
        .await
        .map_err(store_err)?;
        row_to_project(&row)
    }

    async fn project_by_title(&self, title: &str) -> DomainResult<Option<Project>> {
        let row = sqlx::query(
            "SELECT id, client_name, title, status, due_date FROM projects WHERE title = $1",
        )
        .bind(title)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;
        row.as_ref().map(row_to_project).transpose()
    }

    async fn assigned_projects(&self, tester_id: UserId) -> DomainResult<Vec<Project>> {
        let rows = sqlx::query(
            "SELECT p.id, p.client_name, p.title, p.status, p.due_date
             FROM projects p
             JOIN assignments a ON a.project_id = p.id
             WHERE a.tester_id = $1
             GROUP BY p.id
             ORDER BY p.id",
        )
        .bind(tester_id.as_i64())
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;
        rows.iter().map(row_to_project).collect()
    }
}

#[async_trait]
impl AssignmentStore for PgStore {
    async fn assign(&self, project_id: ProjectId, tester_id: UserId) -> DomainResult<()> {
        sqlx::query(
            "INSERT INTO assignments (project_id, tester_id)
             SELECT $1, $2
             WHERE NOT EXISTS (
                 SELECT 1 FROM assignments WHERE project_id = $1 AND tester_id = $2
             )",
        )
        .bind(project_id.as_i64())
        .bind(tester_id.as_i64())
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(())
    }

    async fn is_assigned(&self, tester_id: UserId, project_id: ProjectId) -> DomainResult<bool> {
        let row = sqlx::query(
            "SELECT 1 AS one FROM assignments WHERE project_id = $1 AND tester_id = $2 LIMIT 1",
        )
        .bind(project_id.as_i64())
        .bind(tester_id.as_i64())
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(row.is_some())
    }
}

#[async_trait]
impl FindingStore for PgStore {
    async fn insert_finding(&self, new: &NewFinding) -> DomainResult<Finding> {
        let row = sqlx::query(
            "INSERT INTO findings (project_id, tester_id, title, severity, description, poc_path, status)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING id, project_id, tester_id, title, severity, description, poc_path, status",
        )
        .bind(new.project_id.as_i64())
        .bind(new.tester_id.as_i64())
        .bind(&new.title)
        .bind(&new.severity)
        .bind(&new.description)
        .bind(&new.poc_path)
        .bind(STATUS_OPEN)
        .fetch_one(&self.pool)
        .await
        .map_err(store_err)?;
        row_to_finding(&row)
    }

    async fn findings_for(
        &self,
        project_id: ProjectId,
        tester_id: UserId,
    ) -> DomainResult<Vec<Finding>> {
        let rows = sqlx::query(
            "SELECT id, project_id, tester_id, title, severity, description, poc_path, status
             FROM findings
             WHERE project_id = $1 AND tester_id = $2
             ORDER BY id DESC",
        )
        .bind(project_id.as_i64())
        .bind(tester_id.as_i64())
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;
        rows.iter().map(row_to_finding).collect()
    }

    async fn open_finding_counts(
        &self,
        tester_id: UserId,
        project_ids: &[ProjectId],
    ) -> DomainResult<HashMap<ProjectId, i64>> {
        let ids: Vec<i64> = project_ids.iter().map(|p| p.as_i64()).collect();
        let rows = sqlx::query(
            "SELECT project_id, COUNT(*) AS open_count
             FROM findings
             WHERE tester_id = $1 AND status = $2 AND project_id = ANY($3)
             GROUP BY project_id",
        )
        .bind(tester_id.as_i64())
        .bind(STATUS_OPEN)
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;

        let mut counts = HashMap::new();
        for row in rows {
            let project_id: i64 = row.try_get("project_id").map_err(store_err)?;
            let open_count: i64 = row.try_get("open_count").map_err(store_err)?;
            counts.insert(ProjectId::new(project_id), open_count);
        }
        Ok(counts)
    }
}

#[async_trait]
impl TaskStore for PgStore {
    async fn insert_task(&self, new: &NewTask) -> DomainResult<ServiceTask> {
        let row = sqlx::query(
            "INSERT INTO service_tasks
                 (project_id, tester_id, title, description, severity, stage, due_date, order_index)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING id, project_id, tester_id, title, description, severity, stage, due_date, order_index",
        )
        .bind(new.project_id.as_i64())
        .bind(new.tester_id.as_i64())
        .bind(&new.title)
        .bind(&new.description)
        .bind(&new.severity)
        .bind(Stage::NotStarted.as_str())
        .bind(new.due_date)
        .bind(new.order_index)
        .fetch_one(&self.pool)
        .await
        .map_err(store_err)?;
        row_to_task(&row)
    }

    async fn max_order_index(
        &self,
        project_id: ProjectId,
        tester_id: UserId,
        stage: Stage,
    ) -> DomainResult<Option<i64>> {
        let row = sqlx::query(
            "SELECT MAX(order_index) AS max_index
             FROM service_tasks
             WHERE project_id = $1 AND tester_id = $2 AND stage = $3",
        )
        .bind(project_id.as_i64())
        .bind(tester_id.as_i64())
        .bind(stage.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(store_err)?;
        row.try_get::<Option<i64>, _>("max_index").map_err(store_err)
    }

    async fn task_owned(
        &self,
        id: TaskId,
        tester_id: UserId,
    ) -> DomainResult<Option<ServiceTask>> {
        let row = sqlx::query(
            "SELECT id, project_id, tester_id, title, description, severity, stage, due_date, order_index
             FROM service_tasks
             WHERE id = $1 AND tester_id = $2",
        )
        .bind(id.as_i64())
        .bind(tester_id.as_i64())
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;
        row.as_ref().map(row_to_task).transpose()
    }

    async fn update_task_stage(
        &self,
        id: TaskId,
        tester_id: UserId,
        stage: Stage,
        order_index: Option<i64>,
    ) -> DomainResult<ServiceTask> {
        let row = sqlx::query(
            "UPDATE service_tasks
             SET stage = $3, order_index = COALESCE($4, order_index)
             WHERE id = $1 AND tester_id = $2
             RETURNING id, project_id, tester_id, title, description, severity, stage, due_date, order_index",
        )
        .bind(id.as_i64())
        .bind(tester_id.as_i64())
        .bind(stage.as_str())
        .bind(order_index)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;
        match row {
            Some(row) => row_to_task(&row),
            None => Err(DomainError::NotFound),
        }
    }

    async fn tasks_for(
        &self,
        project_id: ProjectId,
        tester_id: UserId,
    ) -> DomainResult<Vec<ServiceTask>> {
        let rows = sqlx::query(
            "SELECT id, project_id, tester_id, title, description, severity, stage, due_date, order_index
             FROM service_tasks
             WHERE project_id = $1 AND tester_id = $2",
        )
        .bind(project_id.as_i64())
        .bind(tester_id.as_i64())
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;
        rows.iter().map(row_to_task).collect()
    }
}

#[async_trait]
impl ReportStore for PgStore {
    async fn insert_report(&self, new: &NewReport) -> DomainResult<Report> {
        let row = sqlx::query(
            "INSERT INTO reports (project_id, tester_id, file_path, summary)
             VALUES ($1, $2, $3, $4)
             RETURNING id, project_id, tester_id, file_path, summary, created_at",
        )
        .bind(new.project_id.as_i64())
        .bind(new.tester_id.as_i64())
        .bind(&new.file_path)
        .bind(&new.summary)
        .fetch_one(&self.pool)
        .await
        .map_err(store_err)?;
        row_to_report(&row)
    }

    async fn report_owned(
        &self,
        id: ReportId,
        tester_id: UserId,
    ) -> DomainResult<Option<Report>> {
        let row = sqlx::query(
            "SELECT id, project_id, tester_id, file_path, summary, created_at
             FROM reports
             WHERE id = $1 AND tester_id = $2",
        )
        .bind(id.as_i64())
        .bind(tester_id.as_i64())
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;
        row.as_ref().map(row_to_report).transpose()
    }

    async fn reports_for(
        &self,
        tester_id: UserId,
        project_id: Option<ProjectId>,
    ) -> DomainResult<Vec<Report>> {
        let rows = sqlx::query(
            "SELECT id, project_id, tester_id, file_path, summary, created_at
             FROM reports
             WHERE tester_id = $1 AND ($2::BIGINT IS NULL OR project_id = $2)
             ORDER BY created_at DESC, id DESC",
        )
        .bind(tester_id.as_i64())
        .bind(project_id.map(|p| p.as_i64()))
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;
        rows.iter().map(row_to_report).collect()
    }
}
