use axum::{Json, extract::Extension, response::IntoResponse};

use crate::context::CallerContext;

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "ok": true }))
}

pub async fn whoami(Extension(caller): Extension<CallerContext>) -> impl IntoResponse {
    Json(serde_json::json!({
        "user_id": caller.user_id(),
        "role": caller.role().as_str(),
    }))
}
