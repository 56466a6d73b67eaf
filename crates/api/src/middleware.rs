use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use vaptrack_auth::{Role, TokenService};
use vaptrack_core::UserId;

use crate::app::errors;
use crate::context::CallerContext;

#[derive(Clone)]
pub struct AuthState {
    pub tokens: Arc<dyn TokenService>,
    /// Role this route tree is restricted to.
    pub required: Role,
    /// Development-only identity substitution (see `AppConfig::auth_bypass`).
    pub bypass: Option<UserId>,
}

pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    if let Some(user_id) = state.bypass {
        tracing::warn!(%user_id, "auth bypass active; skipping token validation");
        req.extensions_mut()
            .insert(CallerContext::new(user_id, state.required));
        return next.run(req).await;
    }

    let token = match extract_bearer(req.headers()) {
        Ok(token) => token,
        Err(res) => return res,
    };

    let claims = match state.tokens.decode(token, Utc::now()) {
        Ok(claims) => claims,
        Err(_e) => return unauthenticated(),
    };

    if claims.role != state.required {
        return errors::json_error(
            StatusCode::FORBIDDEN,
            "forbidden",
            format!("requires role: {}", state.required),
        );
    }

    req.extensions_mut()
        .insert(CallerContext::new(claims.sub, claims.role));

    next.run(req).await
}

fn unauthenticated() -> Response {
    errors::json_error(StatusCode::UNAUTHORIZED, "unauthenticated", "unauthenticated")
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, Response> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(unauthenticated)?;

    let header = header.to_str().map_err(|_| unauthenticated())?;

    let header = header
        .strip_prefix("Bearer ")
        .ok_or_else(unauthenticated)?;

    let token = header.trim();
    if token.is_empty() {
        return Err(unauthenticated());
    }

    Ok(token)
}
