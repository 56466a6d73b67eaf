use std::sync::Arc;

use vaptrack_api::app::{AppServices, build_app};
use vaptrack_api::config::AppConfig;
use vaptrack_api::seed;
use vaptrack_auth::Hs256TokenService;
use vaptrack_export::GenpdfRenderer;
use vaptrack_store::{PgStore, Store, ensure_schema};

#[tokio::main]
async fn main() {
    vaptrack_observability::init();

    let config = AppConfig::from_env();

    let pool = sqlx::postgres::PgPoolOptions::new()
        .connect(&config.database_url)
        .await
        .expect("failed to connect to postgres");
    ensure_schema(&pool).await.expect("schema setup failed");

    let store: Arc<dyn Store> = Arc::new(PgStore::new(pool));

    if std::env::var("VAPTRACK_SEED").as_deref() == Ok("1") {
        seed::run(&store).await.expect("seeding failed");
    }

    let tokens = Arc::new(Hs256TokenService::new(
        config.jwt_secret.as_bytes(),
        config.token_ttl,
    ));
    let renderer = Arc::new(GenpdfRenderer::default());
    let services = Arc::new(AppServices::new(
        store,
        tokens,
        renderer,
        config.uploads_dir.clone(),
    ));

    let app = build_app(services, config.auth_bypass);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {e}", config.bind_addr));

    tracing::info!("listening on {}", listener.local_addr().unwrap());

    axum::serve(listener, app).await.unwrap();
}
