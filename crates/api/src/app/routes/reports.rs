use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
};

use vaptrack_core::ReportId;
use vaptrack_domain::Report;

use crate::app::routes::findings::attachment;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::CallerContext;

fn download_url(id: ReportId) -> String {
    format!("/tester/reports/{id}/download")
}

fn report_json(report: &Report) -> serde_json::Value {
    serde_json::json!({
        "id": report.id,
        "project_id": report.project_id,
        "summary": report.summary,
        "created_at": report.created_at,
        "download_url": download_url(report.id),
    })
}

pub async fn generate(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Query(query): Query<dto::ProjectQuery>,
) -> axum::response::Response {
    match services
        .generate_report(caller.user_id(), query.project_id)
        .await
    {
        Ok(report) => (
            StatusCode::CREATED,
            Json(serde_json::json!({
                "report_id": report.id,
                "download_url": download_url(report.id),
            })),
        )
            .into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn regenerate(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<ReportId>,
) -> axum::response::Response {
    match services.regenerate_report(caller.user_id(), id).await {
        Ok(report) => (
            StatusCode::CREATED,
            Json(serde_json::json!({
                "report_id": report.id,
                "download_url": download_url(report.id),
            })),
        )
            .into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn list(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Query(query): Query<dto::ReportsQuery>,
) -> axum::response::Response {
    match services.list_reports(caller.user_id(), query.project_id).await {
        Ok(reports) => {
            Json(reports.iter().map(report_json).collect::<Vec<_>>()).into_response()
        }
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn download(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<ReportId>,
) -> axum::response::Response {
    match services.report_file(caller.user_id(), id).await {
        Ok((report, bytes)) => {
            let filename = std::path::Path::new(&report.file_path)
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("report.pdf")
                .to_string();
            attachment(bytes, "application/pdf", &filename)
        }
        Err(e) => errors::domain_error_to_response(e),
    }
}
