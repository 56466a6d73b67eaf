use axum::{
    Router,
    routing::{get, patch, post},
};

pub mod auth;
pub mod clients;
pub mod findings;
pub mod projects;
pub mod reports;
pub mod services;
pub mod system;

/// Router for all authenticated tester endpoints (nested under `/tester`).
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .route("/projects", get(projects::list))
        .route("/clients", get(clients::list))
        .route("/clients/:id", get(clients::profile))
        .route("/findings", post(findings::upload))
        .route("/findings/list", get(findings::list))
        .route("/findings/export.csv", get(findings::export_csv))
        .route("/findings/export.xlsx", get(findings::export_xlsx))
        .route("/services", get(services::board).post(services::create))
        .route("/services/:id/stage", patch(services::move_stage))
        .route("/reports", get(reports::list))
        .route("/reports/generate", post(reports::generate))
        .route("/reports/:id/regenerate", post(reports::regenerate))
        .route("/reports/:id/download", get(reports::download))
}
