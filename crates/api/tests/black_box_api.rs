use std::path::Path;
use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::json;

use vaptrack_api::app::{AppServices, build_app};
use vaptrack_api::seed;
use vaptrack_auth::{AccessClaims, Hs256TokenService, Role};
use vaptrack_core::{DomainError, DomainResult, UserId};
use vaptrack_domain::NewProject;
use vaptrack_export::{ReportDoc, ReportRenderer};
use vaptrack_store::{MemoryStore, Store};

const JWT_SECRET: &str = "test-secret";

/// Renderer stand-in: writes a recognizable file without needing fonts.
struct StubRenderer;

impl ReportRenderer for StubRenderer {
    fn render(&self, doc: &ReportDoc, dest: &Path) -> DomainResult<()> {
        std::fs::write(dest, format!("%PDF-stub {}", doc.summary))
            .map_err(|e| DomainError::store(e.to_string()))
    }
}

struct TestServer {
    base_url: String,
    store: Arc<dyn Store>,
    handle: tokio::task::JoinHandle<()>,
    _uploads: tempfile::TempDir,
}

impl TestServer {
    /// Same router as prod, backed by the in-memory store, seeded with the
    /// demo tester/project, bound to an ephemeral port.
    async fn spawn() -> Self {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        seed::run(&store).await.expect("seeding failed");

        let uploads = tempfile::tempdir().expect("failed to create uploads dir");
        let tokens = Arc::new(Hs256TokenService::new(
            JWT_SECRET.as_bytes(),
            ChronoDuration::hours(8),
        ));
        let services = Arc::new(AppServices::new(
            Arc::clone(&store),
            tokens,
            Arc::new(StubRenderer),
            uploads.path().to_path_buf(),
        ));

        let app = build_app(services, None);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            store,
            handle,
            _uploads: uploads,
        }
    }

    async fn login(&self, client: &reqwest::Client) -> String {
        let res = client
            .post(format!("{}/auth/login", self.base_url))
            .json(&json!({ "email": seed::SEED_EMAIL, "password": seed::SEED_PASSWORD }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body: serde_json::Value = res.json().await.unwrap();
        body["access_token"].as_str().unwrap().to_string()
    }

    /// An extra project for the seeded client, assigned to the seeded tester.
    async fn assigned_project(&self, title: &str) -> i64 {
        let project = self
            .store
            .insert_project(&NewProject {
                client_name: seed::SEED_CLIENT.to_string(),
                title: title.to_string(),
                status: "In Progress".to_string(),
                due_date: None,
            })
            .await
            .unwrap();
        self.store
            .assign(project.id, UserId::new(1))
            .await
            .unwrap();
        project.id.as_i64()
    }

    /// A project the seeded tester is *not* assigned to.
    async fn unassigned_project(&self) -> i64 {
        let project = self
            .store
            .insert_project(&NewProject {
                client_name: "Globex".to_string(),
                title: "Internal Network VAPT".to_string(),
                status: "Not Started".to_string(),
                due_date: None,
            })
            .await
            .unwrap();
        project.id.as_i64()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(user_id: i64, role: Role) -> String {
    let now = Utc::now();
    let claims = AccessClaims {
        sub: UserId::new(user_id),
        role,
        iat: now.timestamp(),
        exp: (now + ChronoDuration::minutes(10)).timestamp(),
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("failed to encode jwt")
}

async fn upload_finding(
    client: &reqwest::Client,
    base_url: &str,
    token: &str,
    project_id: i64,
    title: &str,
    severity: &str,
) -> serde_json::Value {
    let form = reqwest::multipart::Form::new()
        .text("project_id", project_id.to_string())
        .text("title", title.to_string())
        .text("severity", severity.to_string())
        .text("description", format!("details of {title}"))
        .part(
            "poc",
            reqwest::multipart::Part::bytes(b"poc-bytes".to_vec()).file_name("evidence.png"),
        );

    let res = client
        .post(format!("{}/tester/findings", base_url))
        .bearer_auth(token)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    res.json().await.unwrap()
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn().await;

    let res = reqwest::get(format!("{}/health", srv.base_url)).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["ok"], json!(true));
}

#[tokio::test]
async fn auth_required_for_tester_endpoints() {
    let srv = TestServer::spawn().await;

    let client = reqwest::Client::new();
    let res = client
        .get(format!("{}/tester/projects", srv.base_url))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    // Middleware rejections carry the same envelope as handler errors.
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], json!("unauthenticated"));
}

#[tokio::test]
async fn wrong_role_is_forbidden() {
    let srv = TestServer::spawn().await;

    let token = mint_jwt(1, Role::Manager);
    let client = reqwest::Client::new();
    let res = client
        .get(format!("{}/tester/projects", srv.base_url))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], json!("forbidden"));
}

#[tokio::test]
async fn login_round_trips_identity_and_role() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/auth/login", srv.base_url))
        .json(&json!({ "email": seed::SEED_EMAIL, "password": seed::SEED_PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["role"], json!("tester"));
    let token = body["access_token"].as_str().unwrap();

    let res = client
        .get(format!("{}/tester/whoami", srv.base_url))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let whoami: serde_json::Value = res.json().await.unwrap();
    assert_eq!(whoami["role"], json!("tester"));
    assert_eq!(whoami["user_id"], json!(1));
}

#[tokio::test]
async fn wrong_password_is_rejected() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/auth/login", srv.base_url))
        .json(&json!({ "email": seed::SEED_EMAIL, "password": "not-the-password" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unassigned_project_access_is_forbidden() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = srv.login(&client).await;
    let other = srv.unassigned_project().await;

    let res = client
        .get(format!(
            "{}/tester/findings/list?project_id={}",
            srv.base_url, other
        ))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], json!("forbidden"));
    assert_eq!(body["message"], json!("not assigned to this project"));

    // Task creation is gated by the same check.
    let res = client
        .post(format!("{}/tester/services", srv.base_url))
        .bearer_auth(&token)
        .json(&json!({ "project_id": other, "title": "Recon", "severity": "Low" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn assigned_projects_are_listed() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = srv.login(&client).await;
    srv.unassigned_project().await;

    let res = client
        .get(format!("{}/tester/projects", srv.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let projects: serde_json::Value = res.json().await.unwrap();
    let projects = projects.as_array().unwrap();
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0]["title"], json!(seed::SEED_PROJECT));
}

#[tokio::test]
async fn finding_upload_then_newest_first_listing() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = srv.login(&client).await;

    let first = upload_finding(&client, &srv.base_url, &token, 1, "SQLi on /login", "Critical").await;
    assert_eq!(first["message"], json!("Upload successful"));
    upload_finding(&client, &srv.base_url, &token, 1, "XSS in search", "High").await;

    let res = client
        .get(format!("{}/tester/findings/list?project_id=1", srv.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let findings: serde_json::Value = res.json().await.unwrap();
    let findings = findings.as_array().unwrap();
    assert_eq!(findings.len(), 2);
    assert_eq!(findings[0]["title"], json!("XSS in search"));
    assert_eq!(findings[1]["title"], json!("SQLi on /login"));
    assert_eq!(findings[1]["status"], json!("open"));
    let poc = findings[1]["poc_path"].as_str().unwrap();
    assert!(poc.ends_with("poc_1_evidence.png"), "unexpected poc path: {poc}");
}

#[tokio::test]
async fn client_summary_covers_assignments() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = srv.login(&client).await;
    upload_finding(&client, &srv.base_url, &token, 1, "SQLi on /login", "Critical").await;

    let res = client
        .get(format!("{}/tester/clients", srv.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let summaries: serde_json::Value = res.json().await.unwrap();
    let summaries = summaries.as_array().unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0]["name"], json!(seed::SEED_CLIENT));
    assert_eq!(summaries[0]["project_count"], json!(1));
    assert_eq!(summaries[0]["open_findings"], json!(1));

    let client_id = summaries[0]["client_id"].as_i64().unwrap();
    let res = client
        .get(format!("{}/tester/clients/{}", srv.base_url, client_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let profile: serde_json::Value = res.json().await.unwrap();
    assert_eq!(profile["client"]["name"], json!(seed::SEED_CLIENT));
    assert_eq!(profile["projects"].as_array().unwrap().len(), 1);
    assert_eq!(profile["open_findings"], json!(1));
}

#[tokio::test]
async fn profile_counts_open_findings_beyond_the_display_cap() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = srv.login(&client).await;

    // Ten newer projects push the seeded one (id 1) past the ten-project
    // display cap; its finding must still be counted.
    for n in 0..10 {
        srv.assigned_project(&format!("Follow-up VAPT {n}")).await;
    }
    upload_finding(&client, &srv.base_url, &token, 1, "SQLi on /login", "Critical").await;

    let res = client
        .get(format!("{}/tester/clients/1", srv.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let profile: serde_json::Value = res.json().await.unwrap();

    let shown = profile["projects"].as_array().unwrap();
    assert_eq!(shown.len(), 10);
    assert!(shown.iter().all(|p| p["id"].as_i64().unwrap() != 1));
    assert_eq!(profile["open_findings"], json!(1));

    // The summary rollup and the profile agree on the count.
    let res = client
        .get(format!("{}/tester/clients", srv.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let summaries: serde_json::Value = res.json().await.unwrap();
    assert_eq!(summaries.as_array().unwrap()[0]["open_findings"], json!(1));
}

#[tokio::test]
async fn unknown_client_profile_is_not_found() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = srv.login(&client).await;

    let res = client
        .get(format!("{}/tester/clients/999", srv.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn task_creation_appends_to_not_started() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = srv.login(&client).await;

    let res = client
        .post(format!("{}/tester/services", srv.base_url))
        .bearer_auth(&token)
        .json(&json!({ "project_id": 1, "title": "Recon", "severity": "Low" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let first: serde_json::Value = res.json().await.unwrap();
    assert_eq!(first["stage"], json!("not_started"));
    assert_eq!(first["order_index"], json!(1));

    let res = client
        .post(format!("{}/tester/services", srv.base_url))
        .bearer_auth(&token)
        .json(&json!({ "project_id": 1, "title": "Port scan", "severity": "Low" }))
        .send()
        .await
        .unwrap();
    let second: serde_json::Value = res.json().await.unwrap();
    assert_eq!(second["order_index"], json!(2));
}

#[tokio::test]
async fn task_move_preserves_identity_and_board_buckets() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = srv.login(&client).await;

    let res = client
        .post(format!("{}/tester/services", srv.base_url))
        .bearer_auth(&token)
        .json(&json!({ "project_id": 1, "title": "Recon", "severity": "Low" }))
        .send()
        .await
        .unwrap();
    let task: serde_json::Value = res.json().await.unwrap();
    let id = task["id"].as_i64().unwrap();

    let res = client
        .patch(format!("{}/tester/services/{}/stage", srv.base_url, id))
        .bearer_auth(&token)
        .json(&json!({ "stage": "in_progress" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let moved: serde_json::Value = res.json().await.unwrap();
    assert_eq!(moved["id"], json!(id));
    assert_eq!(moved["stage"], json!("in_progress"));
    // Index untouched when the move carries no new position.
    assert_eq!(moved["order_index"], task["order_index"]);

    let res = client
        .get(format!("{}/tester/services?project_id=1", srv.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let board: serde_json::Value = res.json().await.unwrap();
    assert!(board["not_started"].as_array().unwrap().is_empty());
    assert_eq!(board["in_progress"].as_array().unwrap().len(), 1);
    assert!(board["validated"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn moving_a_missing_task_is_not_found() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = srv.login(&client).await;

    let res = client
        .patch(format!("{}/tester/services/999/stage", srv.base_url))
        .bearer_auth(&token)
        .json(&json!({ "stage": "validated" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn csv_export_carries_header_and_rows() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = srv.login(&client).await;
    upload_finding(&client, &srv.base_url, &token, 1, "SQLi on /login", "Critical").await;

    let res = client
        .get(format!(
            "{}/tester/findings/export.csv?project_id=1",
            srv.base_url
        ))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let disposition = res
        .headers()
        .get(reqwest::header::CONTENT_DISPOSITION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.contains("findings.csv"));

    let text = res.text().await.unwrap();
    let mut lines = text.lines();
    assert_eq!(
        lines.next().unwrap(),
        "id,project_id,title,severity,status,description,poc_path"
    );
    assert!(lines.next().unwrap().contains("SQLi on /login"));
}

#[tokio::test]
async fn xlsx_export_is_a_zip_container() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = srv.login(&client).await;
    upload_finding(&client, &srv.base_url, &token, 1, "SQLi on /login", "Critical").await;

    let res = client
        .get(format!(
            "{}/tester/findings/export.xlsx?project_id=1",
            srv.base_url
        ))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let bytes = res.bytes().await.unwrap();
    assert_eq!(&bytes[..2], b"PK");
}

#[tokio::test]
async fn report_generation_and_regeneration() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = srv.login(&client).await;
    upload_finding(&client, &srv.base_url, &token, 1, "SQLi on /login", "Critical").await;
    upload_finding(&client, &srv.base_url, &token, 1, "XSS in search", "High").await;

    let res = client
        .post(format!(
            "{}/tester/reports/generate?project_id=1",
            srv.base_url
        ))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let generated: serde_json::Value = res.json().await.unwrap();
    let report_id = generated["report_id"].as_i64().unwrap();
    let download_url = generated["download_url"].as_str().unwrap().to_string();
    assert_eq!(download_url, format!("/tester/reports/{report_id}/download"));

    let res = client
        .post(format!(
            "{}/tester/reports/{}/regenerate",
            srv.base_url, report_id
        ))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let regenerated: serde_json::Value = res.json().await.unwrap();
    let new_id = regenerated["report_id"].as_i64().unwrap();
    assert_ne!(new_id, report_id);

    let res = client
        .get(format!("{}/tester/reports", srv.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let reports: serde_json::Value = res.json().await.unwrap();
    let reports = reports.as_array().unwrap();
    assert_eq!(reports.len(), 2);
    // Newest first; the regenerated summary carries the prefix over the
    // same counts.
    assert_eq!(reports[0]["id"].as_i64().unwrap(), new_id);
    assert_eq!(
        reports[0]["summary"],
        json!("Regenerated — Findings: 2 (Critical: 1, High: 1)")
    );
    assert_eq!(reports[1]["summary"], json!("Findings: 2 (Critical: 1, High: 1)"));

    // The original file is untouched and still downloadable.
    let res = client
        .get(format!("{}{}", srv.base_url, download_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.text().await.unwrap();
    assert!(body.starts_with("%PDF-stub"));
}

#[tokio::test]
async fn downloading_a_missing_report_is_not_found() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = srv.login(&client).await;

    let res = client
        .get(format!("{}/tester/reports/42/download", srv.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn report_generation_requires_assignment() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = srv.login(&client).await;
    let other = srv.unassigned_project().await;

    let res = client
        .post(format!(
            "{}/tester/reports/generate?project_id={}",
            srv.base_url, other
        ))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}
