// File: dispatcher/src/web/server.rs
use crate::config::Config;
use crate::cron::CronRunner;
use crate::services::BatchService;
use crate::web::{handlers, AppState};
use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub async fn start_web_server(
    config: Arc<Config>,
    batch_service: Arc<BatchService>,
    cron_runner: Arc<CronRunner>,
) -> Result<()> {
    let state = AppState::new(config.clone(), batch_service, cron_runner);

    let app = create_router(state);
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server running on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

fn create_router(state: AppState) -> Router {
    Router::new()
        // === BATCH OPERATION ROUTES ===
        .route("/api/scale", post(handlers::scale))
        .route("/api/restart", post(handlers::restart))
        .route("/api/update-image", post(handlers::update_image))
        // === CRON ROUTES ===
        .route(
            "/api/cron",
            post(handlers::register_cron)
                .get(handlers::list_cron)
                .delete(handlers::unregister_cron),
        )
        // === ENVIRONMENT TABLE ===
        .route("/api/environments", get(handlers::list_environments))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
