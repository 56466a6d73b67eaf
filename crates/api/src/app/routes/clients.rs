use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path},
    response::IntoResponse,
};

use vaptrack_core::ClientId;

use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::CallerContext;

pub async fn list(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
) -> axum::response::Response {
    match services.client_summary(caller.user_id()).await {
        Ok(summaries) => Json(summaries).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn profile(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<ClientId>,
) -> axum::response::Response {
    match services.client_profile(caller.user_id(), id).await {
        Ok(profile) => Json(serde_json::json!({
            "client": profile.client,
            "projects": profile.projects,
            "open_findings": profile.open_findings,
        }))
        .into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}
