use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
};

use vaptrack_core::TaskId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::CallerContext;

pub async fn board(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Query(query): Query<dto::ProjectQuery>,
) -> axum::response::Response {
    match services.board(caller.user_id(), query.project_id).await {
        Ok(board) => Json(board).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn create(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Json(body): Json<dto::CreateTaskRequest>,
) -> axum::response::Response {
    match services
        .create_task(
            caller.user_id(),
            body.project_id,
            body.title,
            body.severity,
            body.description,
            body.due_date,
        )
        .await
    {
        Ok(task) => (StatusCode::CREATED, Json(task)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn move_stage(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Path(id): Path<TaskId>,
    Json(body): Json<dto::MoveTaskRequest>,
) -> axum::response::Response {
    match services
        .move_task(caller.user_id(), id, body.stage, body.order_index)
        .await
    {
        Ok(task) => Json(task).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}
