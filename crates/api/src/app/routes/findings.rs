use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Multipart, Query},
    http::{StatusCode, header},
    response::IntoResponse,
};

use vaptrack_core::ProjectId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::CallerContext;

/// Multipart form fields for a finding upload.
#[derive(Default)]
struct UploadForm {
    project_id: Option<ProjectId>,
    title: Option<String>,
    severity: Option<String>,
    description: Option<String>,
    poc: Option<(String, Vec<u8>)>,
}

async fn read_form(mut multipart: Multipart) -> Result<UploadForm, axum::response::Response> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        errors::json_error(StatusCode::BAD_REQUEST, "validation_error", e.to_string())
    })? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "project_id" => {
                let text = read_text(field).await?;
                let id = text.parse::<ProjectId>().map_err(|e| {
                    errors::json_error(StatusCode::BAD_REQUEST, "validation_error", e.to_string())
                })?;
                form.project_id = Some(id);
            }
            "title" => form.title = Some(read_text(field).await?),
            "severity" => form.severity = Some(read_text(field).await?),
            "description" => form.description = Some(read_text(field).await?),
            "poc" => {
                let filename = field.file_name().unwrap_or("upload.bin").to_string();
                let bytes = field.bytes().await.map_err(|e| {
                    errors::json_error(StatusCode::BAD_REQUEST, "validation_error", e.to_string())
                })?;
                form.poc = Some((filename, bytes.to_vec()));
            }
            _ => {}
        }
    }

    Ok(form)
}

async fn read_text(
    field: axum::extract::multipart::Field<'_>,
) -> Result<String, axum::response::Response> {
    field.text().await.map_err(|e| {
        errors::json_error(StatusCode::BAD_REQUEST, "validation_error", e.to_string())
    })
}

fn require<T>(value: Option<T>, name: &str) -> Result<T, axum::response::Response> {
    value.ok_or_else(|| {
        errors::json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            format!("missing field: {name}"),
        )
    })
}

pub async fn upload(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    multipart: Multipart,
) -> axum::response::Response {
    let form = match read_form(multipart).await {
        Ok(f) => f,
        Err(res) => return res,
    };

    let (project_id, title, severity) = match (
        require(form.project_id, "project_id"),
        require(form.title, "title"),
        require(form.severity, "severity"),
    ) {
        (Ok(p), Ok(t), Ok(s)) => (p, t, s),
        (Err(res), _, _) | (_, Err(res), _) | (_, _, Err(res)) => return res,
    };

    match services
        .upload_finding(
            caller.user_id(),
            project_id,
            title,
            severity,
            form.description.unwrap_or_default(),
            form.poc,
        )
        .await
    {
        Ok(finding) => (
            StatusCode::CREATED,
            Json(serde_json::json!({
                "id": finding.id,
                "message": "Upload successful",
            })),
        )
            .into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn list(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Query(query): Query<dto::ProjectQuery>,
) -> axum::response::Response {
    match services.list_findings(caller.user_id(), query.project_id).await {
        Ok(findings) => Json(findings).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn export_csv(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Query(query): Query<dto::ProjectQuery>,
) -> axum::response::Response {
    match services.export_csv(caller.user_id(), query.project_id).await {
        Ok(bytes) => attachment(bytes, "text/csv", "findings.csv"),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn export_xlsx(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Query(query): Query<dto::ProjectQuery>,
) -> axum::response::Response {
    match services.export_xlsx(caller.user_id(), query.project_id).await {
        Ok(bytes) => attachment(
            bytes,
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            "findings.xlsx",
        ),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub(crate) fn attachment(
    bytes: Vec<u8>,
    content_type: &'static str,
    filename: &str,
) -> axum::response::Response {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        bytes,
    )
        .into_response()
}
