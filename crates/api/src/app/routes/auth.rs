use std::sync::Arc;

use axum::{Json, extract::Extension, response::IntoResponse};

use crate::app::{dto, errors};
use crate::app::services::AppServices;

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::LoginRequest>,
) -> axum::response::Response {
    match services.login(&body.email, &body.password).await {
        Ok((access_token, role)) => Json(serde_json::json!({
            "access_token": access_token,
            "role": role.as_str(),
        }))
        .into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}
