pub mod handlers;
mod types;

pub use handlers::AppState;
pub use types::*;

use crate::{
    Result,
    config::Config,
    fetch::HttpFetcher,
    model::CommandModel,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use std::{net::SocketAddr, sync::Arc};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

pub async fn run(config: Config) -> Result<()> {
    // Initialize collaborators
    let fetcher = Arc::new(HttpFetcher::new(&config.fetch)?);
    let model = Arc::new(CommandModel::new(&config.model));

    // Create application state
    let app_state = AppState::new(&config, model, fetcher).await?;

    let app = router(app_state);

    // Start server
    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

pub fn router(app_state: AppState) -> Router {
    let upload_limit = app_state.upload_limit;

    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/get_config", get(handlers::get_config))
        .route("/api/get_legal", get(handlers::get_legal))
        .route("/api/get_model_io", get(handlers::get_model_io))
        .route("/api/get_samples", get(handlers::get_samples))
        .route("/api/samples/:name", get(handlers::sample_file))
        .route("/api/get_thumbnail", get(handlers::get_thumbnail))
        .route("/api/thumbnail/:name", get(handlers::thumbnail_file))
        .route("/api/get_model_files", get(handlers::get_model_files))
        .route(
            "/api/predict",
            get(handlers::predict_url).post(handlers::predict_upload),
        )
        .route("/api/predict_manifest", post(handlers::predict_manifest))
        .route("/api/predict_sample", get(handlers::predict_sample))
        .layer(DefaultBodyLimit::max(upload_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}
