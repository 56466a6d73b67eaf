//! Application services: the business operations behind the HTTP handlers.
//!
//! Handlers stay thin; everything here takes the caller's identity
//! explicitly and returns `DomainResult`, so the same logic is exercised by
//! the black-box tests against the in-memory store.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;

use vaptrack_auth::{Role, TokenService, verify_password};
use vaptrack_core::{ClientId, DomainError, DomainResult, ProjectId, ReportId, TaskId, UserId};
use vaptrack_domain::{
    Board, Client, ClientSummary, Finding, NewFinding, NewReport, NewTask, Project,
    REGENERATED_PREFIX, Report, ServiceTask, Stage, client_summaries, next_order_index,
    partition_board, summarize_findings,
};
use vaptrack_export::{ReportDoc, ReportRenderer, findings_to_csv, findings_to_xlsx};
use vaptrack_store::Store;

/// Client profile detail: contact record plus the caller's view of its work.
pub struct ClientProfile {
    pub client: Client,
    pub projects: Vec<Project>,
    pub open_findings: i64,
}

/// Recent-project cap on the client profile view.
const PROFILE_PROJECT_LIMIT: usize = 10;

pub struct AppServices {
    store: Arc<dyn Store>,
    tokens: Arc<dyn TokenService>,
    renderer: Arc<dyn ReportRenderer>,
    uploads_dir: PathBuf,
}

impl AppServices {
    pub fn new(
        store: Arc<dyn Store>,
        tokens: Arc<dyn TokenService>,
        renderer: Arc<dyn ReportRenderer>,
        uploads_dir: PathBuf,
    ) -> Self {
        Self {
            store,
            tokens,
            renderer,
            uploads_dir,
        }
    }

    pub fn tokens(&self) -> Arc<dyn TokenService> {
        Arc::clone(&self.tokens)
    }

    /// Verify credentials and mint an access token.
    ///
    /// Unknown email and wrong password are indistinguishable to the caller.
    pub async fn login(&self, email: &str, password: &str) -> DomainResult<(String, Role)> {
        let user = self
            .store
            .user_by_email(email)
            .await?
            .ok_or(DomainError::Unauthenticated)?;

        if !verify_password(password, &user.password_hash) {
            return Err(DomainError::Unauthenticated);
        }

        let token = self.tokens.issue(user.id, user.role, Utc::now())?;
        tracing::info!(user_id = %user.id, role = %user.role, "login succeeded");
        Ok((token, user.role))
    }

    pub async fn my_projects(&self, tester_id: UserId) -> DomainResult<Vec<Project>> {
        self.store.assigned_projects(tester_id).await
    }

    /// Per-client rollup across the tester's assignments.
    pub async fn client_summary(&self, tester_id: UserId) -> DomainResult<Vec<ClientSummary>> {
        let projects = self.store.assigned_projects(tester_id).await?;
        let project_ids: Vec<ProjectId> = projects.iter().map(|p| p.id).collect();
        let open = self
            .store
            .open_finding_counts(tester_id, &project_ids)
            .await?;

        let names: Vec<String> = projects.iter().map(|p| p.client_name.clone()).collect();
        let clients = self.store.clients_by_names(&names).await?;

        Ok(client_summaries(&clients, &projects, &open))
    }

    /// Contact detail for one client, scoped to the caller's assignments.
    pub async fn client_profile(
        &self,
        tester_id: UserId,
        client_id: ClientId,
    ) -> DomainResult<ClientProfile> {
        let client = self
            .store
            .client_by_id(client_id)
            .await?
            .ok_or(DomainError::NotFound)?;

        let mut projects: Vec<Project> = self
            .store
            .assigned_projects(tester_id)
            .await?
            .into_iter()
            .filter(|p| p.client_name == client.name)
            .collect();

        // Count over every matching project, so the profile agrees with the
        // summary rollup; the display cap below only trims the list.
        let project_ids: Vec<ProjectId> = projects.iter().map(|p| p.id).collect();
        let open: HashMap<ProjectId, i64> = self
            .store
            .open_finding_counts(tester_id, &project_ids)
            .await?;
        let open_findings = open.values().sum();

        // Most recent first, capped.
        projects.sort_by(|a, b| b.id.cmp(&a.id));
        projects.truncate(PROFILE_PROJECT_LIMIT);

        Ok(ClientProfile {
            client,
            projects,
            open_findings,
        })
    }

    /// Persist an uploaded finding, writing the proof-of-concept file first.
    pub async fn upload_finding(
        &self,
        tester_id: UserId,
        project_id: ProjectId,
        title: String,
        severity: String,
        description: String,
        poc: Option<(String, Vec<u8>)>,
    ) -> DomainResult<Finding> {
        self.store.ensure_assigned(tester_id, project_id).await?;

        if title.trim().is_empty() {
            return Err(DomainError::validation("title must not be empty"));
        }

        let poc_path = match poc {
            Some((filename, bytes)) => {
                Some(self.write_poc(tester_id, &filename, &bytes).await?)
            }
            None => None,
        };

        let finding = self
            .store
            .insert_finding(&NewFinding {
                project_id,
                tester_id,
                title,
                severity,
                description,
                poc_path,
            })
            .await?;

        tracing::info!(finding_id = %finding.id, %project_id, "finding uploaded");
        Ok(finding)
    }

    async fn write_poc(
        &self,
        tester_id: UserId,
        filename: &str,
        bytes: &[u8],
    ) -> DomainResult<String> {
        // Only the final path component of the client-supplied name is used.
        let base = Path::new(filename)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload.bin");
        let dest = self.uploads_dir.join(format!("poc_{tester_id}_{base}"));

        tokio::fs::create_dir_all(&self.uploads_dir)
            .await
            .map_err(|e| DomainError::store(format!("uploads dir unavailable: {e}")))?;
        tokio::fs::write(&dest, bytes)
            .await
            .map_err(|e| DomainError::store(format!("upload write failed: {e}")))?;

        Ok(dest.to_string_lossy().into_owned())
    }

    pub async fn list_findings(
        &self,
        tester_id: UserId,
        project_id: ProjectId,
    ) -> DomainResult<Vec<Finding>> {
        self.store.ensure_assigned(tester_id, project_id).await?;
        self.store.findings_for(project_id, tester_id).await
    }

    pub async fn export_csv(
        &self,
        tester_id: UserId,
        project_id: ProjectId,
    ) -> DomainResult<Vec<u8>> {
        let findings = self.list_findings(tester_id, project_id).await?;
        findings_to_csv(&findings)
    }

    pub async fn export_xlsx(
        &self,
        tester_id: UserId,
        project_id: ProjectId,
    ) -> DomainResult<Vec<u8>> {
        let findings = self.list_findings(tester_id, project_id).await?;
        findings_to_xlsx(&findings)
    }

    /// Render a fresh report for the project and record it.
    pub async fn generate_report(
        &self,
        tester_id: UserId,
        project_id: ProjectId,
    ) -> DomainResult<Report> {
        self.store.ensure_assigned(tester_id, project_id).await?;
        let findings = self.store.findings_for(project_id, tester_id).await?;
        let summary = summarize_findings(&findings);

        let filename = format!("report_proj{project_id}_tester{tester_id}.pdf");
        let file_path = self.render_report(tester_id, project_id, &summary, findings, &filename).await?;

        let report = self
            .store
            .insert_report(&NewReport {
                project_id,
                tester_id,
                file_path,
                summary,
            })
            .await?;
        tracing::info!(report_id = %report.id, %project_id, "report generated");
        Ok(report)
    }

    /// Produce a new report row and file from an existing report's project.
    ///
    /// The old row and file are untouched, so previously handed-out download
    /// URLs keep working.
    pub async fn regenerate_report(
        &self,
        tester_id: UserId,
        report_id: ReportId,
    ) -> DomainResult<Report> {
        let old = self
            .store
            .report_owned(report_id, tester_id)
            .await?
            .ok_or(DomainError::NotFound)?;

        let project_id = old.project_id;
        self.store.ensure_assigned(tester_id, project_id).await?;

        let findings = self.store.findings_for(project_id, tester_id).await?;
        let summary = format!("{REGENERATED_PREFIX}{}", summarize_findings(&findings));

        let filename = format!("report_proj{project_id}_tester{tester_id}_re_{report_id}.pdf");
        let file_path = self
            .render_report(tester_id, project_id, &summary, findings, &filename)
            .await?;

        let report = self
            .store
            .insert_report(&NewReport {
                project_id,
                tester_id,
                file_path,
                summary,
            })
            .await?;
        tracing::info!(report_id = %report.id, from = %old.id, "report regenerated");
        Ok(report)
    }

    async fn render_report(
        &self,
        tester_id: UserId,
        project_id: ProjectId,
        summary: &str,
        findings: Vec<Finding>,
        filename: &str,
    ) -> DomainResult<String> {
        tokio::fs::create_dir_all(&self.uploads_dir)
            .await
            .map_err(|e| DomainError::store(format!("uploads dir unavailable: {e}")))?;

        let dest = self.uploads_dir.join(filename);
        let doc = ReportDoc {
            project_id,
            tester_id,
            generated_at: Utc::now(),
            summary: summary.to_string(),
            findings,
        };
        self.renderer.render(&doc, &dest)?;

        Ok(dest.to_string_lossy().into_owned())
    }

    pub async fn list_reports(
        &self,
        tester_id: UserId,
        project_id: Option<ProjectId>,
    ) -> DomainResult<Vec<Report>> {
        self.store.reports_for(tester_id, project_id).await
    }

    /// The report row plus its file bytes; 404 if either is gone.
    pub async fn report_file(
        &self,
        tester_id: UserId,
        report_id: ReportId,
    ) -> DomainResult<(Report, Vec<u8>)> {
        let report = self
            .store
            .report_owned(report_id, tester_id)
            .await?
            .ok_or(DomainError::NotFound)?;

        let bytes = tokio::fs::read(&report.file_path)
            .await
            .map_err(|_e| DomainError::NotFound)?;

        Ok((report, bytes))
    }

    /// Create a kanban task at the back of the not_started bucket.
    ///
    /// The max read and the insert are separate store calls; two concurrent
    /// creations can both observe the same maximum and share an index. The
    /// board sort tolerates that.
    pub async fn create_task(
        &self,
        tester_id: UserId,
        project_id: ProjectId,
        title: String,
        severity: String,
        description: String,
        due_date: Option<chrono::NaiveDate>,
    ) -> DomainResult<ServiceTask> {
        self.store.ensure_assigned(tester_id, project_id).await?;

        if title.trim().is_empty() {
            return Err(DomainError::validation("title must not be empty"));
        }

        let max = self
            .store
            .max_order_index(project_id, tester_id, Stage::NotStarted)
            .await?;

        self.store
            .insert_task(&NewTask {
                project_id,
                tester_id,
                title,
                description,
                severity,
                due_date,
                order_index: next_order_index(max),
            })
            .await
    }

    /// Move a task between stages, optionally repositioning it.
    pub async fn move_task(
        &self,
        tester_id: UserId,
        task_id: TaskId,
        stage: Stage,
        order_index: Option<i64>,
    ) -> DomainResult<ServiceTask> {
        let task = self
            .store
            .task_owned(task_id, tester_id)
            .await?
            .ok_or(DomainError::NotFound)?;

        // Assignments can be revoked after task creation.
        self.store
            .ensure_assigned(tester_id, task.project_id)
            .await?;

        self.store
            .update_task_stage(task_id, tester_id, stage, order_index)
            .await
    }

    pub async fn board(&self, tester_id: UserId, project_id: ProjectId) -> DomainResult<Board> {
        self.store.ensure_assigned(tester_id, project_id).await?;
        let tasks = self.store.tasks_for(project_id, tester_id).await?;
        Ok(partition_board(tasks))
    }
}
