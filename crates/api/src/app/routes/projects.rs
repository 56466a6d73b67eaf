use std::sync::Arc;

use axum::{Json, extract::Extension, response::IntoResponse};

use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::CallerContext;

pub async fn list(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
) -> axum::response::Response {
    match services.my_projects(caller.user_id()).await {
        Ok(projects) => Json(projects).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}
