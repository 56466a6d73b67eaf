//! HTTP API application wiring (Axum router + service wiring).
//!
//! Folder layout:
//! - `services.rs`: business operations behind the handlers
//! - `routes/`: HTTP routes + handlers (one file per domain area)
//! - `dto.rs`: request/query DTOs
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get, routing::post};

use vaptrack_auth::Role;
use vaptrack_core::UserId;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::AppServices;

/// Build the full HTTP router (public entrypoint used by `main.rs` and the
/// black-box tests).
pub fn build_app(services: Arc<AppServices>, auth_bypass: Option<UserId>) -> Router {
    let auth_state = middleware::AuthState {
        tokens: services.tokens(),
        required: Role::Tester,
        bypass: auth_bypass,
    };

    // Tester routes: require a valid token carrying the tester role.
    let tester = routes::router().layer(axum::middleware::from_fn_with_state(
        auth_state,
        middleware::auth_middleware,
    ));

    Router::new()
        .route("/health", get(routes::system::health))
        .route("/auth/login", post(routes::auth::login))
        .nest("/tester", tester)
        .layer(Extension(services))
}
